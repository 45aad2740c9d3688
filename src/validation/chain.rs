//! Validation Engine (§4.2): `validate_chain(dsc, countryCode, signingTime?)
//! → ChainResult`. Takes a `&dyn CscaSource` so the algorithm is testable
//! against an in-memory fixture without a real Trust Store connection.

use chrono::{DateTime, Utc};

use crate::models::certificate::Certificate;
use crate::models::crl::Crl;
use crate::models::validation::{ChainResult, CrlStatus, ExpirationStatus};
use crate::processing::signature::verify_cert_signed_by;
use crate::processing::x509::decode_certificate;
use crate::utils::error::{DbError, PkdError};
use crate::validation::algorithms::check_algorithm_compliance;
use crate::validation::crl_checker::check_revocation;
use crate::validation::extensions::{check_csca_extensions, check_dsc_extensions};

/// Everything the chain validator needs to read from the Trust Store.
/// Implemented by `store::Store`; a test fixture can implement it directly
/// over a `Vec`/`HashMap` without touching SQLite.
pub trait CscaSource {
    fn csca_candidates(&self, country: &str) -> Result<Vec<Certificate>, DbError>;
    fn current_crl(&self, country: &str) -> Result<Option<Crl>, DbError>;
    /// `(serial_hex, crl_reason_code)` pairs for every entry the current
    /// CRL revokes, and whether the CRL's own signature validated.
    fn crl_revoked_entries(&self, country: &str) -> Result<(Vec<(String, Option<u8>)>, Option<bool>), DbError>;
}

/// Extracts `/C=XX` from a oneline DN built by `processing::x509::oneline_dn`.
pub fn country_from_dn(dn: &str) -> Option<String> {
    dn.split('/')
        .find(|part| part.starts_with("C="))
        .map(|part| part.trim_start_matches("C=").to_string())
}

pub fn validate_chain(
    dsc: &Certificate,
    country_code: Option<&str>,
    signing_time: Option<DateTime<Utc>>,
    source: &dyn CscaSource,
    now: DateTime<Utc>,
) -> Result<ChainResult, PkdError> {
    // Step 1: resolve the country.
    let country = country_code
        .map(|c| c.to_string())
        .or_else(|| country_from_dn(&dsc.issuer_dn))
        .unwrap_or_default();

    // Step 2: candidate CSCAs for the country.
    let candidates = source.csca_candidates(&country)?;

    // Step 3/4: DN-matching candidates, try-all-then-first-verifies.
    let dn_matches: Vec<&Certificate> = candidates
        .iter()
        .filter(|c| c.subject_dn.eq_ignore_ascii_case(&dsc.issuer_dn))
        .collect();

    if dn_matches.is_empty() {
        return Err(PkdError::CscaNotFound(format!(
            "no CSCA found for country {country} matching issuer DN {}",
            dsc.issuer_dn
        )));
    }

    let mut chosen: Option<&Certificate> = None;
    let mut signature_verified = false;
    for candidate in &dn_matches {
        let decoded_candidate = match decode_certificate(&candidate.der_bytes) {
            Ok(d) => d,
            Err(_) => continue,
        };
        if verify_cert_signed_by(&dsc.der_bytes, &decoded_candidate.public_key_der, candidate.key_algorithm) {
            chosen = Some(candidate);
            signature_verified = true;
            break;
        }
    }
    let signature_verified_by_dn_only = chosen.is_none();
    let csca = chosen.unwrap_or(dn_matches[0]);

    // Step 5: CSCA self-signature, if applicable.
    if csca.is_self_signed {
        let decoded_csca = decode_certificate(&csca.der_bytes)
            .map_err(|e| PkdError::CscaSelfSignatureFailed(format!("CSCA undecodable: {e}")))?;
        if !verify_cert_signed_by(&csca.der_bytes, &decoded_csca.public_key_der, csca.key_algorithm) {
            return Err(PkdError::CscaSelfSignatureFailed(csca.subject_dn.clone()));
        }
    }

    // Step 6: extension validation.
    let dsc_ext = check_dsc_extensions(&dsc.extensions);
    let csca_ext = check_csca_extensions(&csca.extensions);
    let mut unknown_critical_extensions = dsc_ext.unknown_critical_extensions.clone();
    unknown_critical_extensions.extend(csca_ext.unknown_critical_extensions.clone());

    // Step 7: algorithm compliance (evaluated over the DSC's own signature
    // scheme and key, since that is what the chain's trust rests on).
    let algo = check_algorithm_compliance(&dsc.signature_algorithm, dsc.key_algorithm, dsc.key_size_bits);
    let mut non_conformant = algo.non_conformant || dsc_ext.violation.is_some() || csca_ext.violation.is_some();
    let mut algorithm_warning = algo.warning.clone();
    if let Some(w) = &csca_ext.warning {
        algorithm_warning = Some(match algorithm_warning {
            Some(existing) => format!("{existing}; {w}"),
            None => w.clone(),
        });
    }

    // Step 8: point-in-time validity.
    let reference_time = signing_time.unwrap_or(now);
    let not_yet_valid_at_reference = reference_time < dsc.not_before;
    let expired_at_reference = reference_time > dsc.not_after;
    let valid_at_signing_time = !not_yet_valid_at_reference && !expired_at_reference;

    // Step 9: revocation check.
    let (revoked_entries, crl_signature_valid) = source.crl_revoked_entries(&country)?;
    let crl = source.current_crl(&country)?;
    let crl_check = check_revocation(
        crl.as_ref(),
        now,
        &dsc.serial,
        &revoked_entries,
        crl_signature_valid,
    );

    if crl_check.status == CrlStatus::CrlInvalid {
        non_conformant = true;
    }

    // Step 10: overall verdict.
    let revoked = crl_check.status == CrlStatus::Revoked || crl_check.status == CrlStatus::CrlInvalid;
    let valid = signature_verified && !revoked && valid_at_signing_time
        && dsc_ext.violation.is_none()
        && csca_ext.violation.is_none();

    // An expired-but-otherwise-valid DSC resolves to `Expired`, never
    // `Invalid`; only a reference time strictly before `not_before` counts
    // as not-yet-valid.
    let expiration_status = if expired_at_reference || now > dsc.not_after || now > csca.not_after {
        ExpirationStatus::Expired
    } else if not_yet_valid_at_reference {
        ExpirationStatus::Invalid
    } else {
        ExpirationStatus::Valid
    };

    let error_code = if !signature_verified && signature_verified_by_dn_only {
        Some("SIGNATURE_INVALID".to_string())
    } else if !valid_at_signing_time {
        Some("NOT_VALID_AT_SIGNING_TIME".to_string())
    } else if revoked {
        Some("REVOKED".to_string())
    } else {
        None
    };

    Ok(ChainResult {
        valid,
        signature_verified,
        signature_verified_by_dn_only,
        valid_at_signing_time,
        expiration_status,
        chain_path: format!("DSC → {}", short_subject_prefix(&csca.subject_dn)),
        chain_depth: 2,
        csca_subject_dn: csca.subject_dn.clone(),
        csca_serial: csca.serial.clone(),
        crl_status: crl_check.status,
        crl_this_update: crl_check.this_update,
        crl_next_update: crl_check.next_update,
        revocation_reason: crl_check.reason,
        signature_algorithm: dsc.signature_algorithm.clone(),
        key_algorithm: dsc.key_algorithm.to_string(),
        key_size_bits: dsc.key_size_bits,
        algorithm_warning,
        unknown_critical_extensions,
        non_conformant,
        error_code,
    })
}

fn short_subject_prefix(dn: &str) -> String {
    dn.split('/').find(|p| p.starts_with("CN=")).unwrap_or(dn).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::certificate::{CertType, ExtensionSet, KeyAlgorithm, SourceType};
    use crate::models::validation::ValidationStatus;
    use chrono::Duration;

    struct FixtureSource {
        cscas: Vec<Certificate>,
        crl: Option<Crl>,
        revoked: Vec<(String, Option<u8>)>,
        crl_sig_valid: Option<bool>,
    }

    impl CscaSource for FixtureSource {
        fn csca_candidates(&self, country: &str) -> Result<Vec<Certificate>, DbError> {
            Ok(self.cscas.iter().filter(|c| c.country == country).cloned().collect())
        }
        fn current_crl(&self, _country: &str) -> Result<Option<Crl>, DbError> {
            Ok(self.crl.clone())
        }
        fn crl_revoked_entries(&self, _country: &str) -> Result<(Vec<(String, Option<u8>)>, Option<bool>), DbError> {
            Ok((self.revoked.clone(), self.crl_sig_valid))
        }
    }

    fn base_cert(cert_type: CertType, subject: &str, issuer: &str) -> Certificate {
        Certificate {
            cert_type,
            country: "NL".into(),
            subject_dn: subject.into(),
            issuer_dn: issuer.into(),
            serial: "01".into(),
            not_before: Utc::now() - Duration::days(365),
            not_after: Utc::now() + Duration::days(365),
            fingerprint: "fp".into(),
            der_bytes: vec![],
            signature_algorithm: "1.2.840.113549.1.1.11".into(),
            key_algorithm: KeyAlgorithm::Rsa,
            key_size_bits: 2048,
            extensions: ExtensionSet {
                key_usage_bits: vec![0, 5, 6],
                ..Default::default()
            },
            is_self_signed: subject == issuer,
            is_link_certificate: false,
            validation_status: ValidationStatus::Pending,
            stored_in_ldap: false,
            source_type: SourceType::Upload,
            source_context: serde_json::Value::Null,
        }
    }

    #[test]
    fn missing_csca_is_not_found() {
        let dsc = base_cert(CertType::Dsc, "/C=NL/CN=DSC", "/C=NL/CN=CSCA-NL");
        let source = FixtureSource {
            cscas: vec![],
            crl: None,
            revoked: vec![],
            crl_sig_valid: None,
        };
        let result = validate_chain(&dsc, Some("NL"), None, &source, Utc::now());
        assert!(matches!(result, Err(PkdError::CscaNotFound(_))));
    }

    #[test]
    fn dn_match_without_signature_verification_falls_back_with_warning() {
        let dsc = base_cert(CertType::Dsc, "/C=NL/CN=DSC", "/C=NL/CN=CSCA-NL");
        let csca = base_cert(CertType::Csca, "/C=NL/CN=CSCA-NL", "/C=NL/CN=CSCA-NL");
        let source = FixtureSource {
            cscas: vec![csca],
            crl: None,
            revoked: vec![],
            crl_sig_valid: None,
        };
        // No real DER bytes here, so signature verification cannot succeed —
        // this exercises the DN-only fallback path.
        let result = validate_chain(&dsc, Some("NL"), None, &source, Utc::now()).unwrap();
        assert!(!result.signature_verified);
        assert!(result.signature_verified_by_dn_only);
        assert!(!result.valid);
    }

    #[test]
    fn point_in_time_validity_outside_dsc_window_fails() {
        let mut dsc = base_cert(CertType::Dsc, "/C=NL/CN=DSC", "/C=NL/CN=CSCA-NL");
        dsc.not_after = Utc::now() - Duration::days(1);
        let csca = base_cert(CertType::Csca, "/C=NL/CN=CSCA-NL", "/C=NL/CN=CSCA-NL");
        let source = FixtureSource {
            cscas: vec![csca],
            crl: None,
            revoked: vec![],
            crl_sig_valid: None,
        };
        let result = validate_chain(&dsc, Some("NL"), Some(Utc::now()), &source, Utc::now()).unwrap();
        assert!(!result.valid_at_signing_time);
        assert!(!result.valid);
    }

    #[test]
    fn expired_dsc_with_no_signing_time_is_expired_not_not_yet_valid() {
        let mut dsc = base_cert(CertType::Dsc, "/C=NL/CN=DSC", "/C=NL/CN=CSCA-NL");
        dsc.not_after = Utc::now() - Duration::days(1);
        let csca = base_cert(CertType::Csca, "/C=NL/CN=CSCA-NL", "/C=NL/CN=CSCA-NL");
        let source = FixtureSource {
            cscas: vec![csca],
            crl: None,
            revoked: vec![],
            crl_sig_valid: None,
        };
        let result = validate_chain(&dsc, Some("NL"), None, &source, Utc::now()).unwrap();
        assert_eq!(result.expiration_status, ExpirationStatus::Expired);
    }

    #[test]
    fn not_yet_valid_dsc_is_invalid_not_expired() {
        let mut dsc = base_cert(CertType::Dsc, "/C=NL/CN=DSC", "/C=NL/CN=CSCA-NL");
        dsc.not_before = Utc::now() + Duration::days(1);
        let csca = base_cert(CertType::Csca, "/C=NL/CN=CSCA-NL", "/C=NL/CN=CSCA-NL");
        let source = FixtureSource {
            cscas: vec![csca],
            crl: None,
            revoked: vec![],
            crl_sig_valid: None,
        };
        let result = validate_chain(&dsc, Some("NL"), None, &source, Utc::now()).unwrap();
        assert_eq!(result.expiration_status, ExpirationStatus::Invalid);
    }
}
