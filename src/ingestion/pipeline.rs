//! Ingestion Pipeline (§4.3): `parse → validate → DB save → LDAP save`,
//! strictly sequenced within one upload, emitting progress events along
//! the way. AUTO runs all four stages in one call; MANUAL exposes the
//! same stages as separate methods driven by an upload ID.

use std::sync::mpsc::Sender;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::ingestion::progress::{ProgressPublisher, Stage};
use crate::ldap::mirror;
use crate::ldap::pool::LdapPool;
use crate::models::certificate::{CertType, Certificate, SourceType};
use crate::models::crl::Crl;
use crate::models::upload::{ProcessingError, ProcessingErrorCategory, UploadCounts, UploadFormat, UploadRecord, UploadStatus};
use crate::models::validation::{ChainResult, ValidationResult, ValidationStatus};
use crate::processing::ldif::{parse_ldif, LdifAttributeKind};
use crate::processing::{certificate_row, decode_certificate, decode_crl, parse_master_list};
use crate::store::Store;
use crate::utils::error::PkdError;
use crate::validation::{country_from_dn, validate_chain};

/// The outcome of one AUTO-mode ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub upload_id: String,
    pub status: UploadStatus,
    pub counts: UploadCounts,
}

pub struct Pipeline<'a> {
    store: &'a Store,
    ldap_pool: Option<&'a LdapPool>,
    root_base: String,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a Store, ldap_pool: Option<&'a LdapPool>, root_base: impl Into<String>) -> Self {
        Pipeline {
            store,
            ldap_pool,
            root_base: root_base.into(),
        }
    }

    /// Runs all four stages for one uploaded file in order, publishing
    /// progress to `progress_sender` if given. Returns `DUPLICATE_FILE`
    /// (§4.3) without touching any state if this exact byte sequence was
    /// already ingested.
    pub fn ingest_auto(
        &self,
        file_bytes: &[u8],
        format: UploadFormat,
        progress_sender: Option<Sender<crate::ingestion::progress::ProgressEvent>>,
    ) -> Result<IngestionOutcome, PkdError> {
        let file_hash = hex::encode(Sha256::digest(file_bytes));
        if let Some(existing_id) = self.store.find_upload_by_hash(&file_hash)? {
            return Err(PkdError::DuplicateFile(existing_id));
        }

        let upload_id = Uuid::new_v4().to_string();
        let mut record = UploadRecord {
            id: upload_id.clone(),
            file_name: upload_id.clone(),
            file_hash,
            format,
            status: UploadStatus::Pending,
            counts: UploadCounts::default(),
            errors: Vec::new(),
            created_at: Utc::now(),
            error_message: None,
        };
        self.store.insert_upload_record(&record)?;

        let mut progress = ProgressPublisher::new(progress_sender, 0);
        progress.publish(Stage::Connected);

        let result = self.run_stages(file_bytes, format, &upload_id, &mut record, &mut progress);

        match &result {
            Ok(()) => {
                let status = if record.errors.is_empty() {
                    UploadStatus::Completed
                } else {
                    UploadStatus::CompletedWithErrors
                };
                record.status = status;
                self.store.update_upload_status(&upload_id, status)?;
                progress.publish(Stage::Completed);
            }
            Err(e) => {
                record.status = UploadStatus::Failed;
                record.error_message = Some(e.to_string());
                self.store.update_upload_status(&upload_id, UploadStatus::Failed)?;
                progress.publish_failed(e.to_string());
            }
        }

        Ok(IngestionOutcome {
            upload_id,
            status: record.status,
            counts: record.counts,
        })
    }

    fn run_stages(
        &self,
        file_bytes: &[u8],
        format: UploadFormat,
        upload_id: &str,
        record: &mut UploadRecord,
        progress: &mut ProgressPublisher,
    ) -> Result<(), PkdError> {
        progress.publish(Stage::ParsingStarted);
        let items = self.parse(file_bytes, format, upload_id, record)?;
        progress.publish(Stage::ParsingCompleted);

        progress.publish(Stage::ValidationStarted);
        progress.publish(Stage::DbSavingStarted);
        let mut persisted: Vec<(CertType, Certificate)> = Vec::new();
        for item in items.certificates {
            self.validate_and_persist(item, upload_id, record, &mut persisted)?;
        }
        for crl in items.crls {
            self.persist_crl(crl, upload_id, record)?;
        }
        progress.publish(Stage::DbSavingCompleted);

        progress.publish(Stage::LdapSavingStarted);
        if let Some(pool) = self.ldap_pool {
            for (cert_type, cert) in &persisted {
                if let Err(e) = self.mirror_one(pool, *cert_type, cert) {
                    record.errors.push(ProcessingError {
                        category: ProcessingErrorCategory::LdapSave,
                        message: e.to_string(),
                        fingerprint: Some(cert.fingerprint.clone()),
                    });
                }
            }
        }
        progress.publish(Stage::LdapSavingCompleted);

        Ok(())
    }

    fn parse(&self, file_bytes: &[u8], format: UploadFormat, upload_id: &str, record: &mut UploadRecord) -> Result<ParsedItems, PkdError> {
        let mut items = ParsedItems::default();

        match format {
            UploadFormat::Ldif => {
                let entries = parse_ldif(std::io::Cursor::new(file_bytes))?;
                for entry in entries {
                    let country = country_from_ldif_dn(&entry.dn).unwrap_or_default();
                    match entry.kind {
                        LdifAttributeKind::Certificate => match decode_certificate(&entry.der_bytes) {
                            Ok(decoded) => {
                                let cert_type = cert_type_from_ldif_dn(&entry.dn, decoded.is_self_signed);
                                items.certificates.push(PendingCertificate {
                                    decoded,
                                    country,
                                    cert_type,
                                    source_type: SourceType::Upload,
                                    source_context: serde_json::json!({ "uploadId": upload_id }),
                                })
                            }
                            Err(e) => self.record_parse_error(record, e.to_string(), None),
                        },
                        LdifAttributeKind::Crl => match decode_crl(&entry.der_bytes) {
                            Ok(crl) => items.crls.push(crl),
                            Err(e) => self.record_parse_error(record, e.to_string(), None),
                        },
                    }
                }
            }
            UploadFormat::Ml => {
                let descriptor = parse_master_list(file_bytes)?;
                let mlsc_fingerprint = descriptor.mlsc.fingerprint.clone();
                items.certificates.push(PendingCertificate {
                    decoded: descriptor.mlsc,
                    country: String::new(),
                    cert_type: CertType::Mlsc,
                    source_type: SourceType::MasterList,
                    source_context: serde_json::json!({ "mlUploadId": upload_id, "mlscFingerprint": mlsc_fingerprint }),
                });
                for csca in descriptor.cscas {
                    let country = country_from_dn(&csca.subject_dn).unwrap_or_default();
                    let cert_type = CertType::classify_csca(csca.is_self_signed);
                    items.certificates.push(PendingCertificate {
                        decoded: csca,
                        country,
                        cert_type,
                        source_type: SourceType::MasterList,
                        source_context: serde_json::json!({ "mlUploadId": upload_id, "mlscFingerprint": mlsc_fingerprint }),
                    });
                }
            }
            UploadFormat::Pem | UploadFormat::Der | UploadFormat::P7b => match decode_certificate(file_bytes) {
                Ok(decoded) => {
                    let country = country_from_dn(&decoded.issuer_dn).unwrap_or_default();
                    // A standalone certificate upload carries no LDIF/Master
                    // List container to classify by; self-signed uploads are
                    // treated as CSCAs, everything else as a DSC.
                    let cert_type = if decoded.is_self_signed { CertType::Csca } else { CertType::Dsc };
                    items.certificates.push(PendingCertificate {
                        decoded,
                        country,
                        cert_type,
                        source_type: SourceType::Upload,
                        source_context: serde_json::json!({ "uploadId": upload_id }),
                    })
                }
                Err(e) => self.record_parse_error(record, e.to_string(), None),
            },
            UploadFormat::Crl => match decode_crl(file_bytes) {
                Ok(crl) => items.crls.push(crl),
                Err(e) => self.record_parse_error(record, e.to_string(), None),
            },
        }

        Ok(items)
    }

    fn record_parse_error(&self, record: &mut UploadRecord, message: String, fingerprint: Option<String>) {
        record.errors.push(ProcessingError {
            category: ProcessingErrorCategory::Parse,
            message,
            fingerprint,
        });
    }

    fn validate_and_persist(
        &self,
        item: PendingCertificate,
        upload_id: &str,
        record: &mut UploadRecord,
        persisted: &mut Vec<(CertType, Certificate)>,
    ) -> Result<(), PkdError> {
        let cert_type = item.cert_type;
        update_parse_counts(&mut record.counts, cert_type, 1);

        let mut row = certificate_row(&item.decoded, cert_type, &item.country, item.source_type, item.source_context);

        if matches!(cert_type, CertType::Dsc | CertType::DscNc) {
            match validate_chain(&row, Some(&item.country), None, self.store, Utc::now()) {
                Ok(chain) => {
                    row.validation_status = status_from_chain(&chain);
                    apply_chain_counts(&mut record.counts, row.validation_status);
                    self.record_validation(upload_id, &row, &chain)?;
                }
                Err(e) => {
                    row.validation_status = ValidationStatus::Invalid;
                    record.counts.invalid_count += 1;
                    self.record_validation_error(upload_id, &row, &e)?;
                }
            }
        }

        match self.store.insert_certificate(&row) {
            Ok(true) => persisted.push((cert_type, row)),
            Ok(false) => record.counts.duplicate_count += 1,
            Err(e) => record.errors.push(ProcessingError {
                category: ProcessingErrorCategory::DbSave,
                message: e.to_string(),
                fingerprint: Some(row.fingerprint.clone()),
            }),
        }

        Ok(())
    }

    fn persist_crl(&self, crl: crate::processing::DecodedCrl, upload_id: &str, record: &mut UploadRecord) -> Result<(), PkdError> {
        record.counts.crl_count += 1;
        let country = country_from_dn(&crl.issuer_dn).unwrap_or_default();
        let row = Crl {
            country,
            issuer_dn: crl.issuer_dn,
            fingerprint: crl.fingerprint.clone(),
            this_update: crl.this_update,
            next_update: crl.next_update,
            crl_number: crl.crl_number,
            revoked_count: crl.revoked.len() as u32,
            der_bytes: crl.der_bytes,
            stored_in_ldap: false,
        };
        match self.store.insert_crl(&row, &crl.revoked) {
            Ok(_) => Ok(()),
            Err(e) => {
                record.errors.push(ProcessingError {
                    category: ProcessingErrorCategory::DbSave,
                    message: format!("{e} (upload {upload_id})"),
                    fingerprint: Some(row.fingerprint),
                });
                Ok(())
            }
        }
    }

    fn record_validation(&self, upload_id: &str, cert: &Certificate, chain: &ChainResult) -> Result<(), PkdError> {
        self.store.insert_validation_result(&ValidationResult {
            cert_fingerprint: cert.fingerprint.clone(),
            cert_type: cert.cert_type,
            status: cert.validation_status,
            trust_chain_valid: chain.valid,
            trust_chain_path: chain.chain_path.clone(),
            signature_verified: chain.signature_verified,
            validity_check_passed: chain.valid_at_signing_time,
            crl_status: chain.crl_status,
            error_code: chain.error_code.clone(),
            validated_at: Utc::now(),
            duration_ms: 0,
        })?;
        let _ = upload_id;
        Ok(())
    }

    fn record_validation_error(&self, upload_id: &str, cert: &Certificate, error: &PkdError) -> Result<(), PkdError> {
        self.store.insert_validation_result(&ValidationResult {
            cert_fingerprint: cert.fingerprint.clone(),
            cert_type: cert.cert_type,
            status: ValidationStatus::Invalid,
            trust_chain_valid: false,
            trust_chain_path: String::new(),
            signature_verified: false,
            validity_check_passed: false,
            crl_status: crate::models::validation::CrlStatus::NotChecked,
            error_code: Some(error.code().to_string()),
            validated_at: Utc::now(),
            duration_ms: 0,
        })?;
        let _ = upload_id;
        Ok(())
    }

    fn mirror_one(&self, pool: &LdapPool, cert_type: CertType, cert: &Certificate) -> Result<(), PkdError> {
        let mut conn = pool
            .get()
            .map_err(|e| PkdError::Ldap(crate::utils::error::LdapError::Connection(e.to_string())))?;
        let container = mirror::container_name(cert_type);
        let data_base = if cert_type == CertType::DscNc { "dc=nc-data" } else { "dc=data" };
        mirror::ensure_parent_containers(&mut conn, &cert.country, container, data_base, &self.root_base)?;
        mirror::add_certificate_entry(&mut conn, cert, &self.root_base)?;
        self.store.mark_certificate_stored_in_ldap(cert_type, &cert.fingerprint)?;
        Ok(())
    }
}

#[derive(Default)]
struct ParsedItems {
    certificates: Vec<PendingCertificate>,
    crls: Vec<crate::processing::DecodedCrl>,
}

struct PendingCertificate {
    decoded: crate::processing::DecodedCertificate,
    country: String,
    cert_type: CertType,
    source_type: SourceType,
    source_context: serde_json::Value,
}

/// Classifies a standalone LDIF certificate entry by the container its own
/// DN names (`o=csca`/`o=dsc`/`o=mlsc`) and whether it hangs off the
/// `dc=nc-data` branch, mirroring the branch naming in `ldap::dn`.
fn cert_type_from_ldif_dn(dn: &str, is_self_signed: bool) -> CertType {
    let lower = dn.to_ascii_lowercase();
    let non_conformant = lower.contains("dc=nc-data");
    if lower.contains("o=dsc") {
        if non_conformant {
            CertType::DscNc
        } else {
            CertType::Dsc
        }
    } else if lower.contains("o=mlsc") {
        CertType::Mlsc
    } else if lower.contains("o=csca") {
        CertType::classify_csca(is_self_signed)
    } else if is_self_signed {
        CertType::classify_csca(is_self_signed)
    } else {
        CertType::Dsc
    }
}

fn status_from_chain(chain: &ChainResult) -> ValidationStatus {
    if chain.valid {
        ValidationStatus::Valid
    } else if chain.crl_status == crate::models::validation::CrlStatus::Revoked {
        ValidationStatus::Revoked
    } else if chain.expiration_status == crate::models::validation::ExpirationStatus::Expired {
        ValidationStatus::ExpiredValid
    } else if !chain.valid_at_signing_time {
        ValidationStatus::NotYetValid
    } else {
        ValidationStatus::Invalid
    }
}

fn update_parse_counts(counts: &mut UploadCounts, cert_type: CertType, n: u32) {
    match cert_type {
        CertType::Csca | CertType::Lc => counts.csca_count += n,
        CertType::Dsc => counts.dsc_count += n,
        CertType::DscNc => counts.dsc_nc_count += n,
        CertType::Mlsc => counts.mlsc_count += n,
    }
}

fn apply_chain_counts(counts: &mut UploadCounts, status: ValidationStatus) {
    match status {
        ValidationStatus::Valid => counts.valid_count += 1,
        ValidationStatus::ExpiredValid => counts.expired_valid_count += 1,
        ValidationStatus::Pending => counts.pending_count += 1,
        _ => counts.invalid_count += 1,
    }
}

/// Extracts `c=XX` from an LDIF entry's own DN (the entry lives under
/// `o=...,c=XX,dc=data,...`).
fn country_from_ldif_dn(dn: &str) -> Option<String> {
    dn.split(',').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("c=").map(|v| v.to_uppercase())
    })
}
