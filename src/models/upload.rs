use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Input format of an uploaded file (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadFormat {
    Ldif,
    Ml,
    Pem,
    Der,
    P7b,
    Crl,
}

impl fmt::Display for UploadFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UploadFormat::Ldif => "LDIF",
            UploadFormat::Ml => "ML",
            UploadFormat::Pem => "PEM",
            UploadFormat::Der => "DER",
            UploadFormat::P7b => "P7B",
            UploadFormat::Crl => "CRL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for UploadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LDIF" => Ok(UploadFormat::Ldif),
            "ML" => Ok(UploadFormat::Ml),
            "PEM" => Ok(UploadFormat::Pem),
            "DER" => Ok(UploadFormat::Der),
            "P7B" => Ok(UploadFormat::P7b),
            "CRL" => Ok(UploadFormat::Crl),
            other => Err(format!("unknown upload format: {other}")),
        }
    }
}

/// Upload lifecycle stage (§3, §4.3). Advances linearly, terminal on
/// `Completed`/`Failed`/`CompletedWithErrors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Pending,
    Parsing,
    Validating,
    SavingDb,
    SavingLdap,
    Completed,
    Failed,
    CompletedWithErrors,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Failed | UploadStatus::CompletedWithErrors
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UploadStatus::Pending => "PENDING",
            UploadStatus::Parsing => "PARSING",
            UploadStatus::Validating => "VALIDATING",
            UploadStatus::SavingDb => "SAVING_DB",
            UploadStatus::SavingLdap => "SAVING_LDAP",
            UploadStatus::Completed => "COMPLETED",
            UploadStatus::Failed => "FAILED",
            UploadStatus::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
        };
        write!(f, "{s}")
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(UploadStatus::Pending),
            "PARSING" => Ok(UploadStatus::Parsing),
            "VALIDATING" => Ok(UploadStatus::Validating),
            "SAVING_DB" => Ok(UploadStatus::SavingDb),
            "SAVING_LDAP" => Ok(UploadStatus::SavingLdap),
            "COMPLETED" => Ok(UploadStatus::Completed),
            "FAILED" => Ok(UploadStatus::Failed),
            "COMPLETED_WITH_ERRORS" => Ok(UploadStatus::CompletedWithErrors),
            other => Err(format!("unknown upload status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingErrorCategory {
    Parse,
    DbSave,
    LdapSave,
}

impl ProcessingErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingErrorCategory::Parse => "PARSE",
            ProcessingErrorCategory::DbSave => "DB_SAVE",
            ProcessingErrorCategory::LdapSave => "LDAP_SAVE",
        }
    }
}

impl fmt::Display for ProcessingErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingErrorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARSE" => Ok(ProcessingErrorCategory::Parse),
            "DB_SAVE" => Ok(ProcessingErrorCategory::DbSave),
            "LDAP_SAVE" => Ok(ProcessingErrorCategory::LdapSave),
            other => Err(format!("unknown processing error category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingError {
    pub category: ProcessingErrorCategory,
    pub message: String,
    /// Fingerprint of the offending certificate/CRL, if one was recovered.
    pub fingerprint: Option<String>,
}

/// Aggregate per-type counts carried on an upload record (§3, §8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadCounts {
    pub csca_count: u32,
    pub dsc_count: u32,
    pub dsc_nc_count: u32,
    pub mlsc_count: u32,
    pub crl_count: u32,
    pub ml_count: u32,
    pub duplicate_count: u32,
    pub valid_count: u32,
    pub invalid_count: u32,
    pub expired_valid_count: u32,
    pub pending_count: u32,
    pub ldap_stored_count: u32,
}

/// One upload's lifecycle record (§3). Keyed by file hash for idempotency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    pub file_name: String,
    /// SHA-256 of the raw file bytes; unique, drives `DUPLICATE_FILE` (§4.3).
    pub file_hash: String,
    pub format: UploadFormat,
    pub status: UploadStatus,
    pub counts: UploadCounts,
    pub errors: Vec<ProcessingError>,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
}
