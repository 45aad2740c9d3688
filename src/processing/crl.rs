//! CRL Codec (§4.1, §6): DER `CertificateList` → structured descriptor,
//! grounded in the same `x509-cert` usage as the certificate codec.

use chrono::{DateTime, Utc};
use der::Decode;
use sha2::{Digest, Sha256};
use der::asn1::Uint;
use x509_cert::crl::CertificateList;
use x509_cert::time::Time;

const CRL_NUMBER_OID: &str = "2.5.29.20";
const CRL_REASON_OID: &str = "2.5.29.21";

use crate::utils::error::CodecError;

/// Everything the ingestion pipeline and Validation Engine need out of a
/// parsed CRL.
#[derive(Debug, Clone)]
pub struct DecodedCrl {
    pub der_bytes: Vec<u8>,
    pub fingerprint: String,
    pub issuer_dn: String,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub crl_number: Option<String>,
    /// `(serial_hex, reason_code)` for each listed entry.
    pub revoked: Vec<(String, Option<u8>)>,
}

/// Decodes a DER `CertificateList` into a [`DecodedCrl`]. PEM-wrapped input
/// is accepted the same way the certificate codec accepts it.
pub fn decode_crl(bytes: &[u8]) -> Result<DecodedCrl, CodecError> {
    let der_bytes = to_der(bytes)?;
    let list = CertificateList::from_der(&der_bytes).map_err(|e| CodecError::ParseError(format!("CRL decode failed: {e}")))?;

    let tbs = &list.tbs_cert_list;
    let issuer_dn = super::x509::oneline_dn(&tbs.issuer);
    let this_update = time_to_utc(&tbs.this_update)?;
    let next_update = tbs.next_update.as_ref().map(time_to_utc).transpose()?;

    let crl_number = tbs
        .crl_extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|e| e.extn_id.to_string() == CRL_NUMBER_OID))
        .and_then(|e| Uint::from_der(e.extn_value.as_bytes()).ok())
        .map(|n| super::x509::hex_colon_uppercase(n.as_bytes()));

    let mut revoked = Vec::new();
    if let Some(entries) = &tbs.revoked_certificates {
        for entry in entries {
            let serial_hex = super::x509::hex_colon_uppercase(entry.serial_number.as_bytes());
            let reason_code = entry.crl_entry_extensions.as_ref().and_then(|exts| {
                exts.iter()
                    .find(|e| e.extn_id.to_string() == CRL_REASON_OID)
                    .and_then(|e| e.extn_value.as_bytes().last().copied())
            });
            revoked.push((serial_hex, reason_code));
        }
    }

    let fingerprint = fingerprint_der(&der_bytes);

    Ok(DecodedCrl {
        der_bytes,
        fingerprint,
        issuer_dn,
        this_update,
        next_update,
        crl_number,
        revoked,
    })
}

/// SHA-256 hex fingerprint over the DER bytes, matching the certificate
/// codec's `fingerprint_der`.
pub fn fingerprint_der(der_bytes: &[u8]) -> String {
    let digest = Sha256::digest(der_bytes);
    hex::encode(digest)
}

fn to_der(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    if bytes.starts_with(b"-----BEGIN") {
        let text = std::str::from_utf8(bytes).map_err(|e| CodecError::ParseError(format!("PEM is not valid UTF-8: {e}")))?;
        let parsed = pem::parse(text).map_err(|e| CodecError::ParseError(format!("PEM decode failed: {e}")))?;
        Ok(parsed.contents().to_vec())
    } else {
        Ok(bytes.to_vec())
    }
}

fn time_to_utc(time: &Time) -> Result<DateTime<Utc>, CodecError> {
    let system_time: std::time::SystemTime = time.to_system_time();
    Ok(DateTime::<Utc>::from(system_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_a_codec_error() {
        let err = decode_crl(b"not a crl").unwrap_err();
        assert!(matches!(err, CodecError::ParseError(_)));
    }
}
