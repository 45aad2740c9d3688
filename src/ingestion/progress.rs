//! Ordered SSE-shaped progress events for one upload (§4.3): `connected →
//! PARSING_STARTED(10) → PARSING_COMPLETED(50) → VALIDATION_STARTED(55) →
//! DB_SAVING_STARTED(72) → DB_SAVING_COMPLETED(85) → LDAP_SAVING_STARTED(87)
//! → LDAP_SAVING_COMPLETED(100) → COMPLETED`, or a terminal `FAILED`.

use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::models::upload::UploadCounts;

/// A single certificate/CRL currently being processed, surfaced to
/// progress listeners so a UI can show "now processing X".
#[derive(Debug, Clone, Serialize)]
pub struct CurrentCertificate {
    pub fingerprint: String,
    pub cert_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percentage: u8,
    pub processed_count: u32,
    pub total_count: u32,
    pub current_certificate: Option<CurrentCertificate>,
    pub statistics: UploadCounts,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Connected,
    ParsingStarted,
    ParsingCompleted,
    ValidationStarted,
    DbSavingStarted,
    DbSavingCompleted,
    LdapSavingStarted,
    LdapSavingCompleted,
    Completed,
    Failed,
}

impl Stage {
    /// The fixed percentage milestone each stage transition reports (§4.3).
    pub fn percentage(&self) -> u8 {
        match self {
            Stage::Connected => 0,
            Stage::ParsingStarted => 10,
            Stage::ParsingCompleted => 50,
            Stage::ValidationStarted => 55,
            Stage::DbSavingStarted => 72,
            Stage::DbSavingCompleted => 85,
            Stage::LdapSavingStarted => 87,
            Stage::LdapSavingCompleted => 100,
            Stage::Completed => 100,
            Stage::Failed => 0,
        }
    }
}

/// Publishes `ProgressEvent`s to whoever is listening. A closed receiver
/// (no one subscribed, or the SSE client disconnected) is not an error —
/// the pipeline keeps running; progress is best-effort.
pub struct ProgressPublisher {
    sender: Option<Sender<ProgressEvent>>,
    total_count: u32,
    processed_count: u32,
    statistics: UploadCounts,
}

impl ProgressPublisher {
    pub fn new(sender: Option<Sender<ProgressEvent>>, total_count: u32) -> Self {
        ProgressPublisher {
            sender,
            total_count,
            processed_count: 0,
            statistics: UploadCounts::default(),
        }
    }

    pub fn statistics_mut(&mut self) -> &mut UploadCounts {
        &mut self.statistics
    }

    pub fn publish(&mut self, stage: Stage) {
        self.publish_at(stage, None);
    }

    pub fn publish_failed(&mut self, error_message: String) {
        let event = ProgressEvent {
            stage: Stage::Failed,
            percentage: Stage::Failed.percentage(),
            processed_count: self.processed_count,
            total_count: self.total_count,
            current_certificate: None,
            statistics: self.statistics.clone(),
            error_message: Some(error_message),
        };
        self.send(event);
    }

    fn publish_at(&mut self, stage: Stage, current_certificate: Option<CurrentCertificate>) {
        let event = ProgressEvent {
            stage,
            percentage: stage.percentage(),
            processed_count: self.processed_count,
            total_count: self.total_count,
            current_certificate,
            statistics: self.statistics.clone(),
            error_message: None,
        };
        self.send(event);
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
