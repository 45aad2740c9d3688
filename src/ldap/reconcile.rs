//! Reconciliation algorithm (§4.4): the Trust Store is the source of truth,
//! the LDAP mirror is a projection. Each run walks `stored_in_ldap=false`
//! rows in bounded batches, `ADD`s them, and flips the flag — failures are
//! logged per-row and never abort the batch.

use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;

use crate::ldap::mirror;
use crate::ldap::pool::LdapPool;
use crate::models::certificate::CertType;
use crate::models::reconciliation::{
    LdapOperation, OperationStatus, ReconciliationCounts, ReconciliationLog, ReconciliationStatus, TriggerSource,
};
use crate::store::Store;
use crate::utils::error::PkdError;

/// Cert types reconciled in order; `DSC_NC` is excluded per §4.4 step 2
/// (deprecated, not actively mirrored).
const RECONCILED_CERT_TYPES: [CertType; 2] = [CertType::Csca, CertType::Dsc];

/// Owns the single-writer guard the reconciliation run serializes on, so
/// that concurrent triggers (daily cron, on-demand, post-upload AUTO) block
/// briefly then coalesce — the second run simply finds nothing left to do.
pub struct ReconciliationEngine {
    ldap_pool: LdapPool,
    root_base: String,
    data_base: String,
    nc_data_base: String,
    writer_guard: Mutex<()>,
}

impl ReconciliationEngine {
    pub fn new(ldap_pool: LdapPool, root_base: impl Into<String>) -> Self {
        ReconciliationEngine {
            ldap_pool,
            root_base: root_base.into(),
            data_base: "dc=data".to_string(),
            nc_data_base: "dc=nc-data".to_string(),
            writer_guard: Mutex::new(()),
        }
    }

    /// Runs one reconciliation pass, bounded to `max_batch_size` rows per
    /// cert type and per CRL table. `dry_run` logs would-be operations
    /// without writing to LDAP or flipping `stored_in_ldap`.
    pub fn run(
        &self,
        store: &Store,
        triggered_by: TriggerSource,
        dry_run: bool,
        max_batch_size: usize,
    ) -> Result<ReconciliationRunResult, PkdError> {
        let _guard = self.writer_guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let started = Instant::now();
        let summary_id = store.create_reconciliation_summary(triggered_by, dry_run)?;
        let mut counts = ReconciliationCounts::default();
        let mut skipped_count: u32 = 0;

        for cert_type in RECONCILED_CERT_TYPES {
            let rows = store.pending_ldap_certificates(cert_type, max_batch_size)?;
            for cert in rows {
                let row_started = Instant::now();
                let outcome = if dry_run {
                    log::info!(
                        "dry-run: would ADD {} {} ({})",
                        cert.cert_type,
                        cert.fingerprint,
                        cert.subject_dn
                    );
                    skipped_count += 1;
                    OperationStatus::Skipped
                } else {
                    match self.mirror_certificate(&cert) {
                        Ok(()) => {
                            store.mark_certificate_stored_in_ldap(cert.cert_type, &cert.fingerprint)?;
                            match cert.cert_type {
                                CertType::Csca | CertType::Lc => counts.csca_added += 1,
                                CertType::Dsc | CertType::DscNc => counts.dsc_added += 1,
                                CertType::Mlsc => {}
                            }
                            counts.success_count += 1;
                            OperationStatus::Success
                        }
                        Err(e) => {
                            log::warn!("LDAP ADD failed for {}: {e}", cert.fingerprint);
                            counts.failed_count += 1;
                            OperationStatus::Failed
                        }
                    }
                };

                let error_message = match outcome {
                    OperationStatus::Failed => Some("LDAP add failed".to_string()),
                    _ => None,
                };
                store.insert_reconciliation_log(&ReconciliationLog {
                    summary_id,
                    cert_fingerprint: cert.fingerprint.clone(),
                    operation: LdapOperation::Add,
                    status: outcome,
                    error_message,
                    duration_ms: row_started.elapsed().as_millis() as u64,
                    recorded_at: Utc::now(),
                })?;
            }
        }

        let crls = store.pending_ldap_crls(max_batch_size)?;
        for crl in crls {
            let row_started = Instant::now();
            let outcome = if dry_run {
                log::info!("dry-run: would ADD CRL {} ({})", crl.fingerprint, crl.issuer_dn);
                skipped_count += 1;
                OperationStatus::Skipped
            } else {
                match self.mirror_crl(&crl) {
                    Ok(()) => {
                        store.mark_crl_stored_in_ldap(&crl.fingerprint)?;
                        counts.crl_added += 1;
                        counts.success_count += 1;
                        OperationStatus::Success
                    }
                    Err(e) => {
                        log::warn!("LDAP ADD failed for CRL {}: {e}", crl.fingerprint);
                        counts.failed_count += 1;
                        OperationStatus::Failed
                    }
                }
            };

            let error_message = match outcome {
                OperationStatus::Failed => Some("LDAP add failed".to_string()),
                _ => None,
            };
            store.insert_reconciliation_log(&ReconciliationLog {
                summary_id,
                cert_fingerprint: crl.fingerprint.clone(),
                operation: LdapOperation::Add,
                status: outcome,
                error_message,
                duration_ms: row_started.elapsed().as_millis() as u64,
                recorded_at: Utc::now(),
            })?;
        }

        let status = if counts.failed_count == 0 {
            ReconciliationStatus::Completed
        } else if counts.success_count == 0 {
            ReconciliationStatus::Failed
        } else {
            ReconciliationStatus::Partial
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        store.finalize_reconciliation_summary(
            summary_id,
            status,
            counts.success_count,
            counts.failed_count,
            skipped_count,
            duration_ms,
        )?;

        Ok(ReconciliationRunResult {
            summary_id,
            status,
            counts,
            duration_ms,
        })
    }

    fn mirror_certificate(&self, cert: &crate::models::certificate::Certificate) -> Result<(), PkdError> {
        let mut conn = self.ldap_pool.get().map_err(|e| PkdError::Ldap(crate::utils::error::LdapError::Connection(e.to_string())))?;
        let container = mirror::container_name(cert.cert_type);
        let data_base = if cert.cert_type == CertType::DscNc {
            &self.nc_data_base
        } else {
            &self.data_base
        };
        mirror::ensure_parent_containers(&mut conn, &cert.country, container, data_base, &self.root_base)?;
        mirror::add_certificate_entry(&mut conn, cert, &self.root_base)?;
        Ok(())
    }

    fn mirror_crl(&self, crl: &crate::models::crl::Crl) -> Result<(), PkdError> {
        let mut conn = self.ldap_pool.get().map_err(|e| PkdError::Ldap(crate::utils::error::LdapError::Connection(e.to_string())))?;
        mirror::ensure_parent_containers(&mut conn, &crl.country, "crl", &self.data_base, &self.root_base)?;
        mirror::add_crl_entry(&mut conn, crl, &self.root_base)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReconciliationRunResult {
    pub summary_id: i64,
    pub status: ReconciliationStatus,
    pub counts: ReconciliationCounts,
    pub duration_ms: u64,
}
