//! Passive Authentication (§4.5) and its DSC Auto-Registration side effect
//! (§4.6).

pub mod autoreg;
pub mod pa;

pub use pa::{verify, PaRequest};

use crate::models::pa::{PaStatus, PaVerification};
use crate::store::Store;

/// Runs the full PA request lifecycle: verify, persist the record, then
/// best-effort auto-register the extracted DSC (§4.5 step 6). The returned
/// record reflects only the verification outcome — persistence/
/// registration failures are logged, not surfaced, per §4.6.
pub fn verify_and_persist(request: &PaRequest, store: &Store) -> PaVerification {
    let (record, dsc_der) = pa::verify(request, store);

    if let Err(e) = store.insert_pa_verification(&record) {
        log::warn!("PA verification {}: failed to persist record: {e}", record.id);
    }

    if matches!(record.status, PaStatus::Valid | PaStatus::Invalid) {
        if let Some(der) = &dsc_der {
            autoreg::register(store, &record, der);
        }
    }

    record
}
