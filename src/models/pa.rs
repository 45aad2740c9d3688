use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::validation::ChainResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaStatus {
    Valid,
    Invalid,
    Error,
}

impl fmt::Display for PaStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PaStatus::Valid => "VALID",
            PaStatus::Invalid => "INVALID",
            PaStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(PaStatus::Valid),
            "INVALID" => Ok(PaStatus::Invalid),
            "ERROR" => Ok(PaStatus::Error),
            other => Err(format!("unknown PA status: {other}")),
        }
    }
}

/// Per-data-group hash comparison result (§4.5 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataGroupResult {
    pub dg_number: u8,
    pub valid: bool,
    /// Present when the LDS table had no entry at all for this DG.
    pub declared_hash_missing: bool,
}

/// One immutable PA verification record (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaVerification {
    pub id: String,
    pub status: PaStatus,
    pub issuing_country: String,
    pub document_number: Option<String>,
    pub chain_result: Option<ChainResult>,
    pub sod_signature_valid: bool,
    pub dg_results: BTreeMap<u8, DataGroupResult>,
    pub valid_groups: u32,
    pub total_groups: u32,
    pub signing_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub dg_hashes_message: Option<String>,
    pub expiration_message: Option<String>,
}

impl PaVerification {
    pub fn all_groups_valid(&self) -> bool {
        self.total_groups > 0 && self.valid_groups == self.total_groups
    }
}
