//! Entities of §3: the relational shape the Trust Store persists and the
//! PKD components pass between each other.

pub mod certificate;
pub mod crl;
pub mod pa;
pub mod reconciliation;
pub mod upload;
pub mod validation;

pub use certificate::{Certificate, CertType, ExtensionSet, KeyAlgorithm, SourceType};
pub use crl::Crl;
pub use pa::{DataGroupResult, PaStatus, PaVerification};
pub use reconciliation::{
    LdapOperation, OperationStatus, ReconciliationCounts, ReconciliationLog, ReconciliationStatus,
    ReconciliationSummary, TriggerSource,
};
pub use upload::{
    ProcessingError, ProcessingErrorCategory, UploadCounts, UploadFormat, UploadRecord,
    UploadStatus,
};
pub use validation::{ChainResult, CrlStatus, ExpirationStatus, ValidationResult, ValidationStatus};
