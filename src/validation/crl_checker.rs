//! Revocation check (§4.2 step 9). Fail-open for absence/expiry
//! (WARNING, chain stays valid); fail-closed for an invalid CRL signature
//! (CRITICAL, chain is rejected). Never invert this (§9 design note).

use chrono::{DateTime, Utc};

use crate::models::crl::Crl;
use crate::models::validation::{CrlReason, CrlStatus};

pub struct CrlCheckResult {
    pub status: CrlStatus,
    pub reason: Option<CrlReason>,
    pub this_update: Option<DateTime<Utc>>,
    pub next_update: Option<DateTime<Utc>>,
}

/// `revoked_serials` is the set of serial-hex entries the CRL actually
/// revokes, each paired with an optional `CRLReason` code (RFC 5280
/// §5.3.1). `crl_signature_valid` is `None` when no self-contained
/// signature check was performed (caller treats the CRL as trusted once
/// it was accepted from the Trust Store).
pub fn check_revocation(
    crl: Option<&Crl>,
    now: DateTime<Utc>,
    cert_serial_hex: &str,
    revoked_serials: &[(String, Option<u8>)],
    crl_signature_valid: Option<bool>,
) -> CrlCheckResult {
    if let Some(false) = crl_signature_valid {
        return CrlCheckResult {
            status: CrlStatus::CrlInvalid,
            reason: None,
            this_update: crl.map(|c| c.this_update),
            next_update: crl.and_then(|c| c.next_update),
        };
    }

    let crl = match crl {
        None => {
            return CrlCheckResult {
                status: CrlStatus::CrlUnavailable,
                reason: None,
                this_update: None,
                next_update: None,
            }
        }
        Some(c) => c,
    };

    if crl.is_expired(now) {
        return CrlCheckResult {
            status: CrlStatus::CrlExpired,
            reason: None,
            this_update: Some(crl.this_update),
            next_update: crl.next_update,
        };
    }

    let hit = revoked_serials
        .iter()
        .find(|(serial, _)| serial.eq_ignore_ascii_case(cert_serial_hex));

    match hit {
        Some((_, code)) => CrlCheckResult {
            status: CrlStatus::Revoked,
            reason: code.and_then(|c| CrlReason::from_code(c)).or(Some(CrlReason::Unspecified)),
            this_update: Some(crl.this_update),
            next_update: crl.next_update,
        },
        None => CrlCheckResult {
            status: CrlStatus::Valid,
            reason: None,
            this_update: Some(crl.this_update),
            next_update: crl.next_update,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_crl(next_update: Option<DateTime<Utc>>) -> Crl {
        Crl {
            country: "NL".into(),
            issuer_dn: "/C=NL/O=State/CN=CSCA-NL".into(),
            fingerprint: "abc123".into(),
            this_update: Utc::now() - Duration::days(1),
            next_update,
            crl_number: Some("1".into()),
            revoked_count: 1,
            der_bytes: vec![],
            stored_in_ldap: true,
        }
    }

    #[test]
    fn missing_crl_is_unavailable() {
        let result = check_revocation(None, Utc::now(), "01", &[], None);
        assert_eq!(result.status, CrlStatus::CrlUnavailable);
    }

    #[test]
    fn expired_crl_fails_open_with_expired_status() {
        let crl = sample_crl(Some(Utc::now() - Duration::days(1)));
        let result = check_revocation(Some(&crl), Utc::now(), "01", &[], None);
        assert_eq!(result.status, CrlStatus::CrlExpired);
    }

    #[test]
    fn invalid_signature_fails_closed() {
        let crl = sample_crl(Some(Utc::now() + Duration::days(30)));
        let result = check_revocation(Some(&crl), Utc::now(), "01", &[], Some(false));
        assert_eq!(result.status, CrlStatus::CrlInvalid);
    }

    #[test]
    fn revoked_serial_populates_reason() {
        let crl = sample_crl(Some(Utc::now() + Duration::days(30)));
        let result = check_revocation(
            Some(&crl),
            Utc::now(),
            "01:02",
            &[("01:02".to_string(), Some(1))],
            Some(true),
        );
        assert_eq!(result.status, CrlStatus::Revoked);
        assert_eq!(result.reason, Some(CrlReason::KeyCompromise));
    }

    #[test]
    fn unlisted_serial_is_valid() {
        let crl = sample_crl(Some(Utc::now() + Duration::days(30)));
        let result = check_revocation(
            Some(&crl),
            Utc::now(),
            "FF",
            &[("01:02".to_string(), None)],
            Some(true),
        );
        assert_eq!(result.status, CrlStatus::Valid);
    }
}
