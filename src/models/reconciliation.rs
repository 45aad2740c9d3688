use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    Manual,
    Auto,
    DailySync,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TriggerSource::Manual => "MANUAL",
            TriggerSource::Auto => "AUTO",
            TriggerSource::DailySync => "DAILY_SYNC",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TriggerSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(TriggerSource::Manual),
            "AUTO" => Ok(TriggerSource::Auto),
            "DAILY_SYNC" => Ok(TriggerSource::DailySync),
            other => Err(format!("unknown trigger source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    InProgress,
    Completed,
    Failed,
    Partial,
    Aborted,
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ReconciliationStatus::InProgress => "IN_PROGRESS",
            ReconciliationStatus::Completed => "COMPLETED",
            ReconciliationStatus::Failed => "FAILED",
            ReconciliationStatus::Partial => "PARTIAL",
            ReconciliationStatus::Aborted => "ABORTED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReconciliationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(ReconciliationStatus::InProgress),
            "COMPLETED" => Ok(ReconciliationStatus::Completed),
            "FAILED" => Ok(ReconciliationStatus::Failed),
            "PARTIAL" => Ok(ReconciliationStatus::Partial),
            "ABORTED" => Ok(ReconciliationStatus::Aborted),
            other => Err(format!("unknown reconciliation status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LdapOperation {
    Add,
    Delete,
}

impl fmt::Display for LdapOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            LdapOperation::Add => "ADD",
            LdapOperation::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LdapOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(LdapOperation::Add),
            "DELETE" => Ok(LdapOperation::Delete),
            other => Err(format!("unknown LDAP operation: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Success,
    Failed,
    Skipped,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "SUCCESS",
            OperationStatus::Failed => "FAILED",
            OperationStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(OperationStatus::Success),
            "FAILED" => Ok(OperationStatus::Failed),
            "SKIPPED" => Ok(OperationStatus::Skipped),
            other => Err(format!("unknown operation status: {other}")),
        }
    }
}

/// Aggregate counters for a reconciliation run, per cert-type scope
/// (CSCA/DSC/CRL — DSC_NC is excluded per §4.4 step 2 and §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationCounts {
    pub csca_added: u32,
    pub dsc_added: u32,
    pub crl_added: u32,
    pub success_count: u32,
    pub failed_count: u32,
}

/// One reconciliation run's summary row (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub id: i64,
    pub triggered_by: TriggerSource,
    pub dry_run: bool,
    pub status: ReconciliationStatus,
    pub counts: ReconciliationCounts,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-operation audit row. Keyed by certificate fingerprint, not a UUID
/// FK, because rows can be re-inserted under a new UUID after a clean and
/// the fingerprint is what survives that (§3, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationLog {
    pub summary_id: i64,
    pub cert_fingerprint: String,
    pub operation: LdapOperation,
    pub status: OperationStatus,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}
