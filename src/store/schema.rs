//! `CREATE TABLE IF NOT EXISTS` schema for every entity in §3, run once per
//! pooled connection handed out (idempotent, matching the retrieved
//! `tor-dirserver` mirror-operation module's migration-on-connect shape).

use rusqlite::Connection;

use crate::utils::error::DbError;

pub fn ensure_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS certificates (
            fingerprint TEXT NOT NULL,
            cert_type TEXT NOT NULL,
            country TEXT NOT NULL,
            subject_dn TEXT NOT NULL,
            issuer_dn TEXT NOT NULL,
            serial TEXT NOT NULL,
            not_before TEXT NOT NULL,
            not_after TEXT NOT NULL,
            der_bytes BLOB NOT NULL,
            signature_algorithm TEXT NOT NULL,
            key_algorithm TEXT NOT NULL,
            key_size_bits INTEGER NOT NULL,
            extensions_json TEXT NOT NULL,
            is_self_signed INTEGER NOT NULL,
            is_link_certificate INTEGER NOT NULL,
            validation_status TEXT NOT NULL,
            stored_in_ldap INTEGER NOT NULL,
            source_type TEXT NOT NULL,
            source_context TEXT NOT NULL,
            PRIMARY KEY (cert_type, fingerprint)
        );
        CREATE INDEX IF NOT EXISTS idx_certificates_country_type
            ON certificates (country, cert_type);
        CREATE INDEX IF NOT EXISTS idx_certificates_not_stored
            ON certificates (cert_type, stored_in_ldap);

        CREATE TABLE IF NOT EXISTS crls (
            fingerprint TEXT NOT NULL PRIMARY KEY,
            country TEXT NOT NULL,
            issuer_dn TEXT NOT NULL,
            this_update TEXT NOT NULL,
            next_update TEXT,
            crl_number TEXT,
            revoked_count INTEGER NOT NULL,
            der_bytes BLOB NOT NULL,
            stored_in_ldap INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_crls_country_this_update
            ON crls (country, this_update);

        CREATE TABLE IF NOT EXISTS crl_revocations (
            crl_fingerprint TEXT NOT NULL,
            serial TEXT NOT NULL,
            reason_code INTEGER,
            FOREIGN KEY (crl_fingerprint) REFERENCES crls (fingerprint)
        );
        CREATE INDEX IF NOT EXISTS idx_crl_revocations_crl
            ON crl_revocations (crl_fingerprint);

        CREATE TABLE IF NOT EXISTS validation_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cert_fingerprint TEXT NOT NULL,
            cert_type TEXT NOT NULL,
            status TEXT NOT NULL,
            trust_chain_valid INTEGER NOT NULL,
            trust_chain_path TEXT NOT NULL,
            signature_verified INTEGER NOT NULL,
            validity_check_passed INTEGER NOT NULL,
            crl_status TEXT NOT NULL,
            error_code TEXT,
            validated_at TEXT NOT NULL,
            duration_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_validation_results_fingerprint
            ON validation_results (cert_fingerprint);

        CREATE TABLE IF NOT EXISTS upload_records (
            id TEXT NOT NULL PRIMARY KEY,
            file_hash TEXT NOT NULL UNIQUE,
            format TEXT NOT NULL,
            status TEXT NOT NULL,
            total_count INTEGER NOT NULL,
            processed_count INTEGER NOT NULL,
            duplicate_count INTEGER NOT NULL,
            error_count INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            completed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS processing_errors (
            upload_id TEXT NOT NULL,
            category TEXT NOT NULL,
            message TEXT NOT NULL,
            context TEXT NOT NULL,
            FOREIGN KEY (upload_id) REFERENCES upload_records (id)
        );

        CREATE TABLE IF NOT EXISTS pa_verifications (
            id TEXT NOT NULL PRIMARY KEY,
            status TEXT NOT NULL,
            issuing_country TEXT NOT NULL,
            document_number TEXT,
            chain_result_json TEXT,
            sod_signature_valid INTEGER NOT NULL,
            dg_results_json TEXT NOT NULL,
            valid_groups INTEGER NOT NULL,
            total_groups INTEGER NOT NULL,
            signing_time TEXT,
            duration_ms INTEGER NOT NULL,
            error_message TEXT,
            dg_hashes_message TEXT,
            expiration_message TEXT
        );

        CREATE TABLE IF NOT EXISTS reconciliation_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL,
            trigger_source TEXT NOT NULL,
            dry_run INTEGER NOT NULL,
            success_count INTEGER NOT NULL,
            failed_count INTEGER NOT NULL,
            skipped_count INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            duration_ms INTEGER
        );

        CREATE TABLE IF NOT EXISTS reconciliation_logs (
            summary_id INTEGER NOT NULL,
            cert_fingerprint TEXT NOT NULL,
            operation TEXT NOT NULL,
            status TEXT NOT NULL,
            error_message TEXT,
            duration_ms INTEGER NOT NULL,
            recorded_at TEXT NOT NULL,
            FOREIGN KEY (summary_id) REFERENCES reconciliation_summaries (id)
        );
        ",
    )
    .map_err(|e| DbError::Query(format!("schema creation failed: {e}")))?;

    Ok(())
}
