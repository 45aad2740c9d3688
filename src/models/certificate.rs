use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::validation::ValidationStatus;

/// Tagged variant over certificate kind (§9: polymorphism over certificate
/// kind, not inheritance). Classification is a pure function of
/// `(type, is_self_signed, source)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertType {
    Csca,
    Dsc,
    /// Legacy non-conformant DSC branch, deprecated by ICAO in 2021.
    DscNc,
    Mlsc,
    /// Link Certificate: a non-self-signed CSCA bridging key rollovers.
    Lc,
}

impl CertType {
    /// `CSCA ∧ ¬is_self_signed ⇒ LC` (spec §3 invariant, §9 classification).
    pub fn classify_csca(is_self_signed: bool) -> CertType {
        if is_self_signed {
            CertType::Csca
        } else {
            CertType::Lc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CertType::Csca => "CSCA",
            CertType::Dsc => "DSC",
            CertType::DscNc => "DSC_NC",
            CertType::Mlsc => "MLSC",
            CertType::Lc => "LC",
        }
    }
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CSCA" => Ok(CertType::Csca),
            "DSC" => Ok(CertType::Dsc),
            "DSC_NC" => Ok(CertType::DscNc),
            "MLSC" => Ok(CertType::Mlsc),
            "LC" => Ok(CertType::Lc),
            other => Err(format!("unknown cert type: {other}")),
        }
    }
}

/// How a certificate row entered the Trust Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Upload,
    PaExtracted,
    MasterList,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Upload => "UPLOAD",
            SourceType::PaExtracted => "PA_EXTRACTED",
            SourceType::MasterList => "MASTER_LIST",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOAD" => Ok(SourceType::Upload),
            "PA_EXTRACTED" => Ok(SourceType::PaExtracted),
            "MASTER_LIST" => Ok(SourceType::MasterList),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// Public-key algorithm class (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
    Dsa,
    RsaPss,
    Other,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Ecdsa => "ECDSA",
            KeyAlgorithm::Dsa => "DSA",
            KeyAlgorithm::RsaPss => "RSA-PSS",
            KeyAlgorithm::Other => "OTHER",
        };
        write!(f, "{s}")
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSA" => Ok(KeyAlgorithm::Rsa),
            "ECDSA" => Ok(KeyAlgorithm::Ecdsa),
            "DSA" => Ok(KeyAlgorithm::Dsa),
            "RSA-PSS" => Ok(KeyAlgorithm::RsaPss),
            "OTHER" => Ok(KeyAlgorithm::Other),
            other => Err(format!("unknown key algorithm: {other}")),
        }
    }
}

/// KeyUsage / extKeyUsage / policy extension set extracted by the codec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionSet {
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
    /// RFC 5280 KeyUsage bits, in bit-number order (0 = digitalSignature .. 8 = decipherOnly).
    pub key_usage_bits: Vec<u8>,
    pub ext_key_usage_oids: Vec<String>,
    pub subject_alt_names: Vec<String>,
    pub crl_distribution_points: Vec<String>,
    pub authority_key_identifier: Option<String>,
    pub subject_key_identifier: Option<String>,
    pub certificate_policy_oids: Vec<String>,
    /// OIDs of extensions marked critical that this codec doesn't recognize.
    pub unknown_critical_oids: Vec<String>,
}

impl ExtensionSet {
    pub fn has_key_usage_bit(&self, bit: u8) -> bool {
        self.key_usage_bits.contains(&bit)
    }
}

/// A certificate row in the Trust Store (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub cert_type: CertType,
    pub country: String,
    pub subject_dn: String,
    pub issuer_dn: String,
    /// Colon-separated uppercase hex of the unsigned serial magnitude.
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Lowercase hex SHA-256 over the DER bytes.
    pub fingerprint: String,
    pub der_bytes: Vec<u8>,
    pub signature_algorithm: String,
    pub key_algorithm: KeyAlgorithm,
    pub key_size_bits: u32,
    pub extensions: ExtensionSet,
    pub is_self_signed: bool,
    pub is_link_certificate: bool,
    pub validation_status: ValidationStatus,
    pub stored_in_ldap: bool,
    pub source_type: SourceType,
    pub source_context: serde_json::Value,
}

impl Certificate {
    /// §3 invariant: `is_link_certificate ⇔ (type=CSCA ∧ ¬is_self_signed)`.
    pub fn link_certificate_invariant_holds(&self) -> bool {
        self.is_link_certificate == (self.cert_type == CertType::Lc)
    }
}
