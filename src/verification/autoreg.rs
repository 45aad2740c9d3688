//! DSC Auto-Registration (§4.6): best-effort side effect of PA verification.
//! A DSC observed only inside a SOD is persisted so the next reconciliation
//! pass mirrors it into LDAP like any other Trust Store row. Failures here
//! never change the PA result — they are logged and swallowed.

use crate::models::certificate::{CertType, SourceType};
use crate::models::pa::PaVerification;
use crate::processing::x509::{certificate_row, decode_certificate};
use crate::store::Store;

/// Registers `dsc_der` (the DSC extracted from a SOD during `pa::verify`)
/// if it is not already present by `(type=DSC, fingerprint)`. Called on
/// both `VALID` and `INVALID` PA outcomes, never on `ERROR` (no recoverable
/// DSC in that case).
pub fn register(store: &Store, verification: &PaVerification, dsc_der: &[u8]) {
    let decoded = match decode_certificate(dsc_der) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("auto-registration: DSC undecodable, skipping: {e}");
            return;
        }
    };

    match store.find_certificate(CertType::Dsc, &decoded.fingerprint) {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(e) => {
            log::warn!("auto-registration: lookup failed, skipping: {e}");
            return;
        }
    }

    let source_context = serde_json::json!({
        "verificationId": verification.id,
        "verificationStatus": verification.status.to_string(),
    });
    let row = certificate_row(
        &decoded,
        CertType::Dsc,
        &verification.issuing_country,
        SourceType::PaExtracted,
        source_context,
    );

    if let Err(e) = store.insert_certificate(&row) {
        log::warn!("auto-registration: insert failed for DSC {}: {e}", decoded.fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pa::PaStatus;
    use std::collections::BTreeMap;

    #[test]
    fn garbage_der_is_swallowed_not_panicked() {
        let store = Store::new(":memory:", 1).expect("in-memory store");
        let verification = PaVerification {
            id: "v1".into(),
            status: PaStatus::Valid,
            issuing_country: "NL".into(),
            document_number: None,
            chain_result: None,
            sod_signature_valid: true,
            dg_results: BTreeMap::new(),
            valid_groups: 0,
            total_groups: 0,
            signing_time: None,
            duration_ms: 0,
            error_message: None,
            dg_hashes_message: None,
            expiration_message: None,
        };
        register(&store, &verification, b"not a certificate");
    }
}
