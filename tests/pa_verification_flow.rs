//! End-to-end wiring of the PA Verification Engine (§4.5) through
//! `verify_and_persist`: parse failure, persistence, and the
//! auto-registration side effect (§4.6) composed together against a real
//! (empty) Trust Store.

use std::collections::BTreeMap;

use icao_pkd_mirror::models::pa::PaStatus;
use icao_pkd_mirror::store::Store;
use icao_pkd_mirror::verification::{verify_and_persist, PaRequest};

#[test]
fn garbage_sod_yields_error_status_and_is_persisted_without_panicking() {
    let store = Store::new(":memory:", 2).unwrap();
    let request = PaRequest {
        sod_bytes: b"this is not a CMS SignedData",
        data_groups: &BTreeMap::new(),
        document_number: Some("P1234567".to_string()),
        country_hint: Some("NL".to_string()),
    };

    let record = verify_and_persist(&request, &store);

    assert_eq!(record.status, PaStatus::Error);
    assert!(record.error_message.is_some());
    assert!(record.chain_result.is_none());
    // No DSC could be recovered from a SOD that never parsed, so
    // auto-registration must not have created a spurious DSC row.
    assert!(store.csca_candidates("NL").unwrap().is_empty());
}

#[test]
fn empty_sod_bytes_do_not_panic() {
    let store = Store::new(":memory:", 1).unwrap();
    let request = PaRequest {
        sod_bytes: &[],
        data_groups: &BTreeMap::new(),
        document_number: None,
        country_hint: None,
    };

    let record = verify_and_persist(&request, &store);
    assert_eq!(record.status, PaStatus::Error);
}
