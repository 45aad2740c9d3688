//! Ingestion Pipeline (§4.3): turns an uploaded file into Trust Store rows
//! and, when an LDAP pool is configured, mirrored directory entries.

pub mod pipeline;
pub mod progress;

pub use pipeline::{IngestionOutcome, Pipeline};
pub use progress::{CurrentCertificate, ProgressEvent, ProgressPublisher, Stage};
