use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Certificate validation status (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Pending,
    Valid,
    ExpiredValid,
    Invalid,
    Expired,
    Revoked,
    NotYetValid,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "PENDING",
            ValidationStatus::Valid => "VALID",
            ValidationStatus::ExpiredValid => "EXPIRED_VALID",
            ValidationStatus::Invalid => "INVALID",
            ValidationStatus::Expired => "EXPIRED",
            ValidationStatus::Revoked => "REVOKED",
            ValidationStatus::NotYetValid => "NOT_YET_VALID",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ValidationStatus::Pending),
            "VALID" => Ok(ValidationStatus::Valid),
            "EXPIRED_VALID" => Ok(ValidationStatus::ExpiredValid),
            "INVALID" => Ok(ValidationStatus::Invalid),
            "EXPIRED" => Ok(ValidationStatus::Expired),
            "REVOKED" => Ok(ValidationStatus::Revoked),
            "NOT_YET_VALID" => Ok(ValidationStatus::NotYetValid),
            other => Err(format!("unknown validation status: {other}")),
        }
    }
}

/// Outcome of a CRL revocation check (§4.2 step 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrlStatus {
    Valid,
    Revoked,
    CrlUnavailable,
    CrlExpired,
    CrlInvalid,
    NotChecked,
}

impl fmt::Display for CrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            CrlStatus::Valid => "VALID",
            CrlStatus::Revoked => "REVOKED",
            CrlStatus::CrlUnavailable => "CRL_UNAVAILABLE",
            CrlStatus::CrlExpired => "CRL_EXPIRED",
            CrlStatus::CrlInvalid => "CRL_INVALID",
            CrlStatus::NotChecked => "NOT_CHECKED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CrlStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(CrlStatus::Valid),
            "REVOKED" => Ok(CrlStatus::Revoked),
            "CRL_UNAVAILABLE" => Ok(CrlStatus::CrlUnavailable),
            "CRL_EXPIRED" => Ok(CrlStatus::CrlExpired),
            "CRL_INVALID" => Ok(CrlStatus::CrlInvalid),
            "NOT_CHECKED" => Ok(CrlStatus::NotChecked),
            other => Err(format!("unknown CRL status: {other}")),
        }
    }
}

/// Overall expiration classification of a chain validation (§4.2 step 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirationStatus {
    Valid,
    Expired,
    Invalid,
}

impl fmt::Display for ExpirationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ExpirationStatus::Valid => "VALID",
            ExpirationStatus::Expired => "EXPIRED",
            ExpirationStatus::Invalid => "INVALID",
        };
        write!(f, "{s}")
    }
}

/// RFC 5280 §5.3.1 CRLReason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrlReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl CrlReason {
    pub fn from_code(code: u8) -> Option<CrlReason> {
        Some(match code {
            0 => CrlReason::Unspecified,
            1 => CrlReason::KeyCompromise,
            2 => CrlReason::CaCompromise,
            3 => CrlReason::AffiliationChanged,
            4 => CrlReason::Superseded,
            5 => CrlReason::CessationOfOperation,
            6 => CrlReason::CertificateHold,
            8 => CrlReason::RemoveFromCrl,
            9 => CrlReason::PrivilegeWithdrawn,
            10 => CrlReason::AaCompromise,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrlReason::Unspecified => "unspecified",
            CrlReason::KeyCompromise => "keyCompromise",
            CrlReason::CaCompromise => "cACompromise",
            CrlReason::AffiliationChanged => "affiliationChanged",
            CrlReason::Superseded => "superseded",
            CrlReason::CessationOfOperation => "cessationOfOperation",
            CrlReason::CertificateHold => "certificateHold",
            CrlReason::RemoveFromCrl => "removeFromCRL",
            CrlReason::PrivilegeWithdrawn => "privilegeWithdrawn",
            CrlReason::AaCompromise => "aACompromise",
        }
    }
}

impl fmt::Display for CrlReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The flat result record returned by `validate_chain` (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResult {
    pub valid: bool,
    pub signature_verified: bool,
    /// Set when the CSCA was picked by DN match alone, without signature
    /// verification succeeding against any DN-matching candidate (§4.2 step 3).
    pub signature_verified_by_dn_only: bool,
    pub valid_at_signing_time: bool,
    pub expiration_status: ExpirationStatus,
    pub chain_path: String,
    pub chain_depth: u32,
    pub csca_subject_dn: String,
    pub csca_serial: String,
    pub crl_status: CrlStatus,
    pub crl_this_update: Option<DateTime<Utc>>,
    pub crl_next_update: Option<DateTime<Utc>>,
    pub revocation_reason: Option<CrlReason>,
    pub signature_algorithm: String,
    pub key_algorithm: String,
    pub key_size_bits: u32,
    pub algorithm_warning: Option<String>,
    pub unknown_critical_extensions: Vec<String>,
    pub non_conformant: bool,
    pub error_code: Option<String>,
}

/// One row of the `validation_result` table: appended per (cert, run), last
/// row per cert is authoritative (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub cert_fingerprint: String,
    pub cert_type: super::certificate::CertType,
    pub status: ValidationStatus,
    pub trust_chain_valid: bool,
    pub trust_chain_path: String,
    pub signature_verified: bool,
    pub validity_check_passed: bool,
    pub crl_status: CrlStatus,
    pub error_code: Option<String>,
    pub validated_at: DateTime<Utc>,
    pub duration_ms: u64,
}
