//! PA Verification Engine (§4.5): parses a SOD, validates its embedded DSC
//! against the Trust Store, verifies the CMS signature, and compares each
//! supplied data group's digest against the `LDSSecurityObject`.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::models::certificate::{CertType, SourceType};
use crate::models::pa::{DataGroupResult, PaStatus, PaVerification};
use crate::processing::cms::{econtent_bytes, parse_signed_data, verify_signed_data_signature};
use crate::processing::lds::parse_security_object;
use crate::processing::oid::digest_bytes;
use crate::processing::x509::{certificate_row, decode_certificate};
use crate::validation::{validate_chain, CscaSource};

/// One PA verification request: SOD bytes, the DG bytes the caller can
/// supply, and optional hints the gateway forwards from the MRZ read.
pub struct PaRequest<'a> {
    pub sod_bytes: &'a [u8],
    pub data_groups: &'a BTreeMap<u8, Vec<u8>>,
    pub document_number: Option<String>,
    pub country_hint: Option<String>,
}

/// Runs the PA Engine's full algorithm (§4.5 steps 1-5); step 6
/// (Auto-Registration) is the caller's responsibility — see
/// `verification::autoreg`, which needs the resulting record's id and the
/// extracted DSC bytes.
pub fn verify(request: &PaRequest, store: &dyn CscaSource) -> (PaVerification, Option<Vec<u8>>) {
    let started = Instant::now();
    let id = Uuid::new_v4().to_string();

    let descriptor = match parse_signed_data(request.sod_bytes) {
        Ok(d) => d,
        Err(e) => return (error_record(id, request, started, e.to_string()), None),
    };
    let dsc_der = match &descriptor.first_certificate_der {
        Some(der) => der.clone(),
        None => {
            return (
                error_record(id, request, started, "SOD carries no embedded DSC".to_string()),
                None,
            )
        }
    };
    let decoded = match decode_certificate(&dsc_der) {
        Ok(d) => d,
        Err(e) => return (error_record(id, request, started, e.to_string()), None),
    };

    let country = request
        .country_hint
        .clone()
        .or_else(|| crate::validation::country_from_dn(&decoded.issuer_dn))
        .unwrap_or_default();

    let dsc_row = certificate_row(
        &decoded,
        CertType::Dsc,
        &country,
        SourceType::PaExtracted,
        serde_json::Value::Null,
    );

    let signing_time = descriptor.signing_time;
    let chain = match validate_chain(&dsc_row, Some(&country), signing_time, store, Utc::now()) {
        Ok(c) => c,
        Err(e) => return (error_record(id, request, started, e.to_string()), Some(dsc_der)),
    };

    let sod_signature_valid = verify_signed_data_signature(&descriptor, &decoded.public_key_der, decoded.key_algorithm);

    let econtent = econtent_bytes(&descriptor).unwrap_or_default();
    let security_object = parse_security_object(&econtent);

    let mut dg_results = BTreeMap::new();
    let mut valid_groups = 0u32;
    let total_groups = request.data_groups.len() as u32;
    let mut dg_hashes_message = None;

    for (dg_number, dg_bytes) in request.data_groups {
        let declared = security_object.data_group_hashes.get(&dg_number.to_string());
        let valid = match (declared, &security_object.hash_algorithm_oid) {
            (Some(declared_hash), Some(oid)) => {
                digest_bytes(oid, dg_bytes).as_deref() == Some(declared_hash.as_slice())
            }
            _ => false,
        };
        if valid {
            valid_groups += 1;
        }
        dg_results.insert(
            *dg_number,
            DataGroupResult {
                dg_number: *dg_number,
                valid,
                declared_hash_missing: declared.is_none(),
            },
        );
    }

    if security_object.hash_algorithm_oid.is_none() {
        dg_hashes_message = Some("LDSSecurityObject hashAlgorithm could not be determined".to_string());
    }

    let expiration_message = match chain.expiration_status {
        crate::models::validation::ExpirationStatus::Expired => Some(match signing_time {
            Some(t) => format!("DSC or CSCA had already expired at signing time {t}"),
            None => "DSC or CSCA has expired since signing".to_string(),
        }),
        crate::models::validation::ExpirationStatus::Invalid => Some(match signing_time {
            Some(t) => format!("DSC is not yet valid at signing time {t}"),
            None => "DSC is not yet valid at signing time".to_string(),
        }),
        crate::models::validation::ExpirationStatus::Valid => None,
    };

    // §4.5 edge case: an empty DG list is allowed to pass on chain+signature
    // alone, but is flagged so the caller knows coverage was partial.
    let groups_pass = if total_groups == 0 {
        dg_hashes_message = Some(
            dg_hashes_message
                .map(|m| format!("{m}; no data groups supplied, PA covers chain and signature only"))
                .unwrap_or_else(|| "no data groups supplied, PA covers chain and signature only".to_string()),
        );
        true
    } else {
        valid_groups == total_groups
    };

    let status = if chain.valid && sod_signature_valid && groups_pass {
        PaStatus::Valid
    } else {
        PaStatus::Invalid
    };

    let record = PaVerification {
        id,
        status,
        issuing_country: country,
        document_number: request.document_number.clone(),
        chain_result: Some(chain),
        sod_signature_valid,
        dg_results,
        valid_groups,
        total_groups,
        signing_time,
        duration_ms: started.elapsed().as_millis() as u64,
        error_message: None,
        dg_hashes_message,
        expiration_message,
    };

    (record, Some(dsc_der))
}

fn error_record(id: String, request: &PaRequest, started: Instant, message: String) -> PaVerification {
    PaVerification {
        id,
        status: PaStatus::Error,
        issuing_country: request.country_hint.clone().unwrap_or_default(),
        document_number: request.document_number.clone(),
        chain_result: None,
        sod_signature_valid: false,
        dg_results: BTreeMap::new(),
        valid_groups: 0,
        total_groups: request.data_groups.len() as u32,
        signing_time: None,
        duration_ms: started.elapsed().as_millis() as u64,
        error_message: Some(message),
        dg_hashes_message: None,
        expiration_message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::crl::Crl;
    use crate::utils::error::DbError;

    struct EmptySource;
    impl CscaSource for EmptySource {
        fn csca_candidates(&self, _country: &str) -> Result<Vec<crate::models::certificate::Certificate>, DbError> {
            Ok(vec![])
        }
        fn current_crl(&self, _country: &str) -> Result<Option<Crl>, DbError> {
            Ok(None)
        }
        fn crl_revoked_entries(&self, _country: &str) -> Result<(Vec<(String, Option<u8>)>, Option<bool>), DbError> {
            Ok((vec![], None))
        }
    }

    #[test]
    fn garbage_sod_is_an_error_record() {
        let request = PaRequest {
            sod_bytes: b"not a sod",
            data_groups: &BTreeMap::new(),
            document_number: None,
            country_hint: None,
        };
        let (record, dsc_der) = verify(&request, &EmptySource);
        assert_eq!(record.status, PaStatus::Error);
        assert!(record.error_message.is_some());
        assert!(dsc_der.is_none());
    }
}
