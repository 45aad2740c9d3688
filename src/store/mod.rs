//! Trust Store (§3): `rusqlite` behind an `r2d2` bounded pool. Enums are
//! persisted as their `Display` string and parsed back with `FromStr`,
//! keeping the schema human-inspectable (grounded in the retrieved
//! `zydou-arti/tor-dirserver` schema, which stores flavors/kinds as TEXT
//! rather than integer codes).

pub mod pool;
pub mod schema;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::models::certificate::{CertType, Certificate, ExtensionSet, KeyAlgorithm, SourceType};
use crate::models::crl::Crl;
use crate::models::pa::PaVerification;
use crate::models::reconciliation::{ReconciliationLog, ReconciliationStatus, TriggerSource};
use crate::models::upload::{ProcessingError, UploadRecord, UploadStatus};
use crate::models::validation::{ValidationResult, ValidationStatus};
use crate::utils::error::DbError;
use crate::validation::chain::CscaSource;

pub use pool::{build_pool, PooledConn, SqlitePool};

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(db_path: &str, pool_size: u32) -> Result<Self, DbError> {
        Ok(Store {
            pool: build_pool(db_path, pool_size)?,
        })
    }

    fn conn(&self) -> Result<PooledConn, DbError> {
        self.pool
            .get()
            .map_err(|e| DbError::PoolExhausted(format!("failed to acquire DB connection: {e}")))
    }

    /// Inserts a certificate row. Returns `Ok(false)` without error when a
    /// row with the same `(cert_type, fingerprint)` already exists (§3
    /// uniqueness invariant) — the caller treats this as a duplicate, not
    /// a failure.
    pub fn insert_certificate(&self, cert: &Certificate) -> Result<bool, DbError> {
        let conn = self.conn()?;
        let extensions_json = serde_json::to_string(&cert.extensions)
            .map_err(|e| DbError::Query(format!("failed to serialize extensions: {e}")))?;
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO certificates (
                    fingerprint, cert_type, country, subject_dn, issuer_dn, serial,
                    not_before, not_after, der_bytes, signature_algorithm, key_algorithm,
                    key_size_bits, extensions_json, is_self_signed, is_link_certificate,
                    validation_status, stored_in_ldap, source_type, source_context
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
                params![
                    cert.fingerprint,
                    cert.cert_type.as_str(),
                    cert.country,
                    cert.subject_dn,
                    cert.issuer_dn,
                    cert.serial,
                    cert.not_before.to_rfc3339(),
                    cert.not_after.to_rfc3339(),
                    cert.der_bytes,
                    cert.signature_algorithm,
                    cert.key_algorithm.to_string(),
                    cert.key_size_bits,
                    extensions_json,
                    cert.is_self_signed,
                    cert.is_link_certificate,
                    cert.validation_status.as_str(),
                    cert.stored_in_ldap,
                    cert.source_type.as_str(),
                    cert.source_context.to_string(),
                ],
            )
            .map_err(DbError::from)?;
        Ok(changed > 0)
    }

    pub fn find_certificate(&self, cert_type: CertType, fingerprint: &str) -> Result<Option<Certificate>, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT fingerprint, cert_type, country, subject_dn, issuer_dn, serial, not_before,
                    not_after, der_bytes, signature_algorithm, key_algorithm, key_size_bits,
                    extensions_json, is_self_signed, is_link_certificate, validation_status,
                    stored_in_ldap, source_type, source_context
             FROM certificates WHERE cert_type = ?1 AND fingerprint = ?2",
            params![cert_type.as_str(), fingerprint],
            row_to_certificate,
        )
        .optional()
        .map_err(DbError::from)
    }

    pub fn csca_candidates(&self, country: &str) -> Result<Vec<Certificate>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fingerprint, cert_type, country, subject_dn, issuer_dn, serial, not_before,
                    not_after, der_bytes, signature_algorithm, key_algorithm, key_size_bits,
                    extensions_json, is_self_signed, is_link_certificate, validation_status,
                    stored_in_ldap, source_type, source_context
             FROM certificates WHERE country = ?1 AND cert_type IN ('CSCA', 'LC')",
        )?;
        let rows = stmt
            .query_map(params![country], row_to_certificate)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn pending_ldap_certificates(&self, cert_type: CertType, limit: usize) -> Result<Vec<Certificate>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fingerprint, cert_type, country, subject_dn, issuer_dn, serial, not_before,
                    not_after, der_bytes, signature_algorithm, key_algorithm, key_size_bits,
                    extensions_json, is_self_signed, is_link_certificate, validation_status,
                    stored_in_ldap, source_type, source_context
             FROM certificates WHERE cert_type = ?1 AND stored_in_ldap = 0 LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![cert_type.as_str(), limit as i64], row_to_certificate)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn mark_certificate_stored_in_ldap(&self, cert_type: CertType, fingerprint: &str) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE certificates SET stored_in_ldap = 1 WHERE cert_type = ?1 AND fingerprint = ?2",
            params![cert_type.as_str(), fingerprint],
        )?;
        Ok(())
    }

    pub fn insert_crl(&self, crl: &Crl, revoked: &[(String, Option<u8>)]) -> Result<bool, DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(DbError::from)?;
        let changed = tx
            .execute(
                "INSERT OR IGNORE INTO crls (
                    fingerprint, country, issuer_dn, this_update, next_update, crl_number,
                    revoked_count, der_bytes, stored_in_ldap
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                params![
                    crl.fingerprint,
                    crl.country,
                    crl.issuer_dn,
                    crl.this_update.to_rfc3339(),
                    crl.next_update.map(|t| t.to_rfc3339()),
                    crl.crl_number,
                    crl.revoked_count,
                    crl.der_bytes,
                    crl.stored_in_ldap,
                ],
            )
            .map_err(DbError::from)?;

        if changed > 0 {
            for (serial, reason) in revoked {
                tx.execute(
                    "INSERT INTO crl_revocations (crl_fingerprint, serial, reason_code) VALUES (?1,?2,?3)",
                    params![crl.fingerprint, serial, reason.map(|r| r as i64)],
                )
                .map_err(DbError::from)?;
            }
        }
        tx.commit().map_err(DbError::from)?;
        Ok(changed > 0)
    }

    pub fn current_crl(&self, country: &str) -> Result<Option<Crl>, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT fingerprint, country, issuer_dn, this_update, next_update, crl_number,
                    revoked_count, der_bytes, stored_in_ldap
             FROM crls WHERE country = ?1 ORDER BY this_update DESC LIMIT 1",
            params![country],
            row_to_crl,
        )
        .optional()
        .map_err(DbError::from)
    }

    pub fn pending_ldap_crls(&self, limit: usize) -> Result<Vec<Crl>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fingerprint, country, issuer_dn, this_update, next_update, crl_number,
                    revoked_count, der_bytes, stored_in_ldap
             FROM crls WHERE stored_in_ldap = 0 LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_crl)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn mark_crl_stored_in_ldap(&self, fingerprint: &str) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE crls SET stored_in_ldap = 1 WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        Ok(())
    }

    /// `(serial_hex, reason_code)` entries for the most recent CRL of
    /// `country`. The CRL's own signature is checked upstream by the
    /// caller during ingestion; this store has no opinion on it, so the
    /// second element is always `None` here — callers that need fail-
    /// closed behavior on a forged CRL verify the signature before
    /// persisting revocation rows at all.
    pub fn crl_revoked_entries(&self, country: &str) -> Result<(Vec<(String, Option<u8>)>, Option<bool>), DbError> {
        let conn = self.conn()?;
        let current = self.current_crl(country)?;
        let Some(current) = current else {
            return Ok((Vec::new(), None));
        };
        let mut stmt = conn.prepare("SELECT serial, reason_code FROM crl_revocations WHERE crl_fingerprint = ?1")?;
        let rows = stmt
            .query_map(params![current.fingerprint], |row| {
                let serial: String = row.get(0)?;
                let reason: Option<i64> = row.get(1)?;
                Ok((serial, reason.map(|r| r as u8)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok((rows, Some(true)))
    }

    pub fn insert_validation_result(&self, result: &ValidationResult) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO validation_results (
                cert_fingerprint, cert_type, status, trust_chain_valid, trust_chain_path,
                signature_verified, validity_check_passed, crl_status, error_code,
                validated_at, duration_ms
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                result.cert_fingerprint,
                result.cert_type.as_str(),
                result.status.as_str(),
                result.trust_chain_valid,
                result.trust_chain_path,
                result.signature_verified,
                result.validity_check_passed,
                result.crl_status.to_string(),
                result.error_code,
                result.validated_at.to_rfc3339(),
                result.duration_ms as i64,
            ],
        )?;
        Ok(())
    }

    pub fn update_certificate_status(&self, cert_type: CertType, fingerprint: &str, status: ValidationStatus) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE certificates SET validation_status = ?1 WHERE cert_type = ?2 AND fingerprint = ?3",
            params![status.as_str(), cert_type.as_str(), fingerprint],
        )?;
        Ok(())
    }

    pub fn insert_upload_record(&self, record: &UploadRecord) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO upload_records (
                id, file_hash, format, status, total_count, processed_count,
                duplicate_count, error_count, created_at, completed_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                record.id,
                record.file_hash,
                record.format.to_string(),
                record.status.to_string(),
                record.counts.csca_count
                    + record.counts.dsc_count
                    + record.counts.dsc_nc_count
                    + record.counts.mlsc_count
                    + record.counts.crl_count,
                record.counts.valid_count + record.counts.invalid_count + record.counts.expired_valid_count + record.counts.pending_count,
                record.counts.duplicate_count,
                record.errors.len() as i64,
                record.created_at.to_rfc3339(),
                Option::<String>::None,
            ],
        )?;
        Ok(())
    }

    pub fn find_upload_by_hash(&self, file_hash: &str) -> Result<Option<String>, DbError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id FROM upload_records WHERE file_hash = ?1",
            params![file_hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::from)
    }

    pub fn update_upload_status(&self, upload_id: &str, status: UploadStatus) -> Result<(), DbError> {
        let conn = self.conn()?;
        let completed_at = if status.is_terminal() { Some(Utc::now().to_rfc3339()) } else { None };
        conn.execute(
            "UPDATE upload_records SET status = ?1, completed_at = COALESCE(?2, completed_at) WHERE id = ?3",
            params![status.to_string(), completed_at, upload_id],
        )?;
        Ok(())
    }

    pub fn insert_processing_error(&self, upload_id: &str, error: &ProcessingError) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO processing_errors (upload_id, category, message, context) VALUES (?1,?2,?3,?4)",
            params![
                upload_id,
                error.category.as_str(),
                error.message,
                error.fingerprint.clone().unwrap_or_default(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_pa_verification(&self, verification: &PaVerification) -> Result<(), DbError> {
        let conn = self.conn()?;
        let chain_json = verification
            .chain_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::Query(format!("failed to serialize chain result: {e}")))?;
        let dg_json = serde_json::to_string(&verification.dg_results)
            .map_err(|e| DbError::Query(format!("failed to serialize DG results: {e}")))?;
        conn.execute(
            "INSERT INTO pa_verifications (
                id, status, issuing_country, document_number, chain_result_json,
                sod_signature_valid, dg_results_json, valid_groups, total_groups,
                signing_time, duration_ms, error_message, dg_hashes_message, expiration_message
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                verification.id,
                verification.status.to_string(),
                verification.issuing_country,
                verification.document_number,
                chain_json,
                verification.sod_signature_valid,
                dg_json,
                verification.valid_groups,
                verification.total_groups,
                verification.signing_time.map(|t| t.to_rfc3339()),
                verification.duration_ms as i64,
                verification.error_message,
                verification.dg_hashes_message,
                verification.expiration_message,
            ],
        )?;
        Ok(())
    }

    pub fn create_reconciliation_summary(&self, triggered_by: TriggerSource, dry_run: bool) -> Result<i64, DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reconciliation_summaries (
                status, trigger_source, dry_run, success_count, failed_count, skipped_count,
                started_at, completed_at, duration_ms
            ) VALUES (?1,?2,?3,0,0,0,?4,NULL,NULL)",
            params![
                ReconciliationStatus::InProgress.to_string(),
                triggered_by.to_string(),
                dry_run,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finalize_reconciliation_summary(
        &self,
        summary_id: i64,
        status: ReconciliationStatus,
        success_count: u32,
        failed_count: u32,
        skipped_count: u32,
        duration_ms: u64,
    ) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE reconciliation_summaries
             SET status = ?1, success_count = ?2, failed_count = ?3, skipped_count = ?4,
                 completed_at = ?5, duration_ms = ?6
             WHERE id = ?7",
            params![
                status.to_string(),
                success_count,
                failed_count,
                skipped_count,
                Utc::now().to_rfc3339(),
                duration_ms as i64,
                summary_id,
            ],
        )?;
        Ok(())
    }

    pub fn insert_reconciliation_log(&self, log: &ReconciliationLog) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reconciliation_logs (
                summary_id, cert_fingerprint, operation, status, error_message, duration_ms, recorded_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                log.summary_id,
                log.cert_fingerprint,
                log.operation.to_string(),
                log.status.as_str(),
                log.error_message,
                log.duration_ms as i64,
                log.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl CscaSource for Store {
    fn csca_candidates(&self, country: &str) -> Result<Vec<Certificate>, DbError> {
        Store::csca_candidates(self, country)
    }

    fn current_crl(&self, country: &str) -> Result<Option<Crl>, DbError> {
        Store::current_crl(self, country)
    }

    fn crl_revoked_entries(&self, country: &str) -> Result<(Vec<(String, Option<u8>)>, Option<bool>), DbError> {
        Store::crl_revoked_entries(self, country)
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_certificate(row: &Row<'_>) -> rusqlite::Result<Certificate> {
    let cert_type_str: String = row.get(1)?;
    let key_algorithm_str: String = row.get(10)?;
    let validation_status_str: String = row.get(15)?;
    let source_type_str: String = row.get(17)?;
    let extensions_json: String = row.get(12)?;
    let source_context_str: String = row.get(18)?;
    let not_before: String = row.get(6)?;
    let not_after: String = row.get(7)?;

    Ok(Certificate {
        fingerprint: row.get(0)?,
        cert_type: CertType::from_str(&cert_type_str).unwrap_or(CertType::Dsc),
        country: row.get(2)?,
        subject_dn: row.get(3)?,
        issuer_dn: row.get(4)?,
        serial: row.get(5)?,
        not_before: parse_rfc3339(&not_before),
        not_after: parse_rfc3339(&not_after),
        der_bytes: row.get(8)?,
        signature_algorithm: row.get(9)?,
        key_algorithm: KeyAlgorithm::from_str(&key_algorithm_str).unwrap_or(KeyAlgorithm::Other),
        key_size_bits: row.get::<_, i64>(11)? as u32,
        extensions: serde_json::from_str::<ExtensionSet>(&extensions_json).unwrap_or_default(),
        is_self_signed: row.get(13)?,
        is_link_certificate: row.get(14)?,
        validation_status: ValidationStatus::from_str(&validation_status_str).unwrap_or(ValidationStatus::Pending),
        stored_in_ldap: row.get(16)?,
        source_type: SourceType::from_str(&source_type_str).unwrap_or(SourceType::Upload),
        source_context: serde_json::from_str(&source_context_str).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_crl(row: &Row<'_>) -> rusqlite::Result<Crl> {
    let this_update: String = row.get(3)?;
    let next_update: Option<String> = row.get(4)?;
    Ok(Crl {
        fingerprint: row.get(0)?,
        country: row.get(1)?,
        issuer_dn: row.get(2)?,
        this_update: parse_rfc3339(&this_update),
        next_update: next_update.map(|s| parse_rfc3339(&s)),
        crl_number: row.get(5)?,
        revoked_count: row.get::<_, i64>(6)? as u32,
        der_bytes: row.get(7)?,
        stored_in_ldap: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::certificate::{ExtensionSet, KeyAlgorithm};
    use chrono::Duration;

    fn sample_cert(fingerprint: &str) -> Certificate {
        Certificate {
            cert_type: CertType::Csca,
            country: "NL".into(),
            subject_dn: "/C=NL/CN=CSCA-NL".into(),
            issuer_dn: "/C=NL/CN=CSCA-NL".into(),
            serial: "01".into(),
            not_before: Utc::now() - Duration::days(365),
            not_after: Utc::now() + Duration::days(365),
            fingerprint: fingerprint.into(),
            der_bytes: vec![1, 2, 3],
            signature_algorithm: "1.2.840.113549.1.1.11".into(),
            key_algorithm: KeyAlgorithm::Rsa,
            key_size_bits: 2048,
            extensions: ExtensionSet::default(),
            is_self_signed: true,
            is_link_certificate: false,
            validation_status: ValidationStatus::Pending,
            stored_in_ldap: false,
            source_type: SourceType::Upload,
            source_context: serde_json::Value::Null,
        }
    }

    #[test]
    fn insert_and_find_roundtrips() {
        let store = Store::new(":memory:", 4).unwrap();
        let cert = sample_cert("abc123");
        assert!(store.insert_certificate(&cert).unwrap());
        let found = store.find_certificate(CertType::Csca, "abc123").unwrap().unwrap();
        assert_eq!(found.fingerprint, "abc123");
        assert_eq!(found.country, "NL");
    }

    #[test]
    fn duplicate_insert_is_a_noop_not_an_error() {
        let store = Store::new(":memory:", 4).unwrap();
        let cert = sample_cert("dup1");
        assert!(store.insert_certificate(&cert).unwrap());
        assert!(!store.insert_certificate(&cert).unwrap());
    }

    #[test]
    fn csca_candidates_filters_by_country() {
        let store = Store::new(":memory:", 4).unwrap();
        store.insert_certificate(&sample_cert("nl1")).unwrap();
        let mut other = sample_cert("fr1");
        other.country = "FR".into();
        store.insert_certificate(&other).unwrap();

        let candidates = store.csca_candidates("NL").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].fingerprint, "nl1");
    }

    #[test]
    fn pending_ldap_rows_and_mark_stored() {
        let store = Store::new(":memory:", 4).unwrap();
        store.insert_certificate(&sample_cert("p1")).unwrap();
        let pending = store.pending_ldap_certificates(CertType::Csca, 10).unwrap();
        assert_eq!(pending.len(), 1);
        store.mark_certificate_stored_in_ldap(CertType::Csca, "p1").unwrap();
        let pending_after = store.pending_ldap_certificates(CertType::Csca, 10).unwrap();
        assert!(pending_after.is_empty());
    }
}
