//! CMS/SOD parser (§4.1): unwraps the ICAO outer `0x77` tag, decodes
//! `SignedData`, and extracts the embedded certificate, signer algorithm
//! identifiers, and signed `signingTime` attribute.
//!
//! Grounded in the `cascette-rs` `cms_parser.rs` shape: `ContentInfo` →
//! check the SignedData OID → decode `SignedData` → walk
//! `signer_infos`/`certificates`.

use chrono::{DateTime, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerInfo};
use der::asn1::OctetString;
use der::Decode;

use crate::models::certificate::KeyAlgorithm;
use crate::processing::oid::SIGNED_DATA_OID;
use crate::processing::signature::verify_raw;
use crate::utils::error::CodecError;

/// Result of parsing one CMS `SignedData` (a SOD or a Master List).
pub struct CmsDescriptor {
    pub signed_data: SignedData,
    /// DER bytes of the first embedded certificate (DSC for a SOD, MLSC
    /// for a Master List), if the certificate set was present.
    pub first_certificate_der: Option<Vec<u8>>,
    pub digest_algorithm_oid: Option<String>,
    pub signature_algorithm_oid: Option<String>,
    pub signing_time: Option<DateTime<Utc>>,
}

/// Strips the ICAO outer `0x77` application tag (if present) and returns
/// the inner CMS bytes. `0x77` is followed by a BER/DER length in short or
/// long form; every length read is bounds-checked.
pub fn unwrap_icao_outer_tag(bytes: &[u8]) -> &[u8] {
    if bytes.is_empty() || bytes[0] != 0x77 {
        return bytes;
    }
    match read_ber_length(&bytes[1..]) {
        Some((_, header_len)) => {
            let offset = 1 + header_len;
            if offset <= bytes.len() {
                &bytes[offset..]
            } else {
                bytes
            }
        }
        None => bytes,
    }
}

/// Reads a BER/DER length (short or long form) from the start of `buf`.
/// Returns `(declared_length, bytes_consumed_by_the_length_field)`. Never
/// reads past `buf`'s end.
fn read_ber_length(buf: &[u8]) -> Option<(usize, usize)> {
    let first = *buf.first()?;
    if first & 0x80 == 0 {
        Some((first as usize, 1))
    } else {
        let num_bytes = (first & 0x7f) as usize;
        if num_bytes == 0 || num_bytes > 8 || buf.len() < 1 + num_bytes {
            return None;
        }
        let mut len = 0usize;
        for &b in &buf[1..1 + num_bytes] {
            len = (len << 8) | b as usize;
        }
        Some((len, 1 + num_bytes))
    }
}

/// Parses a CMS `SignedData` (after the outer ICAO tag, if any, has been
/// unwrapped by the caller or is absent).
pub fn parse_signed_data(bytes: &[u8]) -> Result<CmsDescriptor, CodecError> {
    let inner = unwrap_icao_outer_tag(bytes);

    let content_info = ContentInfo::from_der(inner)
        .map_err(|e| CodecError::ParseError(format!("CMS ContentInfo decode failed: {e}")))?;

    if content_info.content_type.to_string() != SIGNED_DATA_OID {
        return Err(CodecError::UnexpectedContentType(format!(
            "expected SignedData ({SIGNED_DATA_OID}), got {}",
            content_info.content_type
        )));
    }

    let signed_data_der = der::Encode::to_der(&content_info.content)
        .map_err(|e| CodecError::ParseError(format!("re-encoding CMS content failed: {e}")))?;
    let signed_data = SignedData::from_der(&signed_data_der)
        .map_err(|e| CodecError::ParseError(format!("SignedData decode failed: {e}")))?;

    let first_certificate_der = signed_data.certificates.as_ref().and_then(|set| {
        set.0.iter().find_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => der::Encode::to_der(cert).ok(),
            _ => None,
        })
    });

    let signer_info: Option<&SignerInfo> = signed_data.signer_infos.0.as_slice().first();
    let digest_algorithm_oid = signer_info.map(|si| si.digest_alg.oid.to_string());
    let signature_algorithm_oid = signer_info.map(|si| si.signature_algorithm.oid.to_string());
    let signing_time = signer_info.and_then(extract_signing_time);

    Ok(CmsDescriptor {
        signed_data,
        first_certificate_der,
        digest_algorithm_oid,
        signature_algorithm_oid,
        signing_time,
    })
}

/// Extracts and formats the signed `signingTime` attribute
/// (`YYYY-MM-DDTHH:MM:SSZ`), if present, from either `UTCTime` or
/// `GeneralizedTime` encoding.
fn extract_signing_time(signer_info: &SignerInfo) -> Option<DateTime<Utc>> {
    let signed_attrs = signer_info.signed_attrs.as_ref()?;
    for attr in signed_attrs.iter() {
        if attr.oid.to_string() == crate::processing::oid::SIGNING_TIME_OID {
            for value in attr.values.iter() {
                if let Ok(t) = value.decode_as::<der::asn1::UtcTime>() {
                    return Some(DateTime::<Utc>::from(t.to_system_time()));
                }
                if let Ok(t) = value.decode_as::<der::asn1::GeneralizedTime>() {
                    return Some(DateTime::<Utc>::from(t.to_system_time()));
                }
            }
        }
    }
    None
}

/// Raw `eContent` bytes (the DER body inside the OCTET STRING the CMS
/// content carries — an `LDSSecurityObject` for a SOD, a `CscaMasterList`
/// for a Master List).
pub fn econtent_bytes(descriptor: &CmsDescriptor) -> Result<Vec<u8>, CodecError> {
    let econtent = descriptor
        .signed_data
        .encap_content_info
        .econtent
        .clone()
        .ok_or_else(|| CodecError::ParseError("eContent is absent".into()))?;
    let octet_string = econtent
        .decode_as::<OctetString>()
        .map_err(|e| CodecError::ParseError(format!("eContent is not an OCTET STRING: {e}")))?;
    Ok(octet_string.as_bytes().to_vec())
}

/// The byte sequence the SignerInfo's signature actually covers: the
/// re-encoded `signedAttrs` SET (RFC 5652 §5.4) if present, else `eContent`
/// directly.
fn message_to_verify(descriptor: &CmsDescriptor) -> Result<Vec<u8>, CodecError> {
    let signer_info = first_signer_info(descriptor)?;
    match &signer_info.signed_attrs {
        Some(signed_attrs) => der::Encode::to_der(signed_attrs)
            .map_err(|e| CodecError::ParseError(format!("re-encoding signedAttrs failed: {e}"))),
        None => econtent_bytes(descriptor),
    }
}

fn first_signer_info(descriptor: &CmsDescriptor) -> Result<&SignerInfo, CodecError> {
    descriptor
        .signed_data
        .signer_infos
        .0
        .as_slice()
        .first()
        .ok_or_else(|| CodecError::ParseError("SignedData has no SignerInfo".into()))
}

/// Verifies the CMS `SignedData`'s signature against `signer_public_key_der`
/// (§4.5 step 3: SOD signature against the embedded DSC). Never panics;
/// any decode failure is treated as an unverified signature.
pub fn verify_signed_data_signature(
    descriptor: &CmsDescriptor,
    signer_public_key_der: &[u8],
    signer_key_algorithm: KeyAlgorithm,
) -> bool {
    let signer_info = match first_signer_info(descriptor) {
        Ok(si) => si,
        Err(_) => return false,
    };
    let message = match message_to_verify(descriptor) {
        Ok(m) => m,
        Err(_) => return false,
    };
    let signature_bytes = signer_info.signature.as_bytes();
    let sig_oid = signer_info.signature_algorithm.oid.to_string();

    verify_raw(&sig_oid, signer_key_algorithm, signer_public_key_der, &message, signature_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_short_form_outer_tag() {
        let inner = vec![0x30, 0x03, 0x01, 0x02, 0x03];
        let mut wrapped = vec![0x77, inner.len() as u8];
        wrapped.extend_from_slice(&inner);
        assert_eq!(unwrap_icao_outer_tag(&wrapped), &inner[..]);
    }

    #[test]
    fn unwraps_long_form_outer_tag() {
        let inner = vec![0u8; 200];
        let mut wrapped = vec![0x77, 0x81, 200u8];
        wrapped.extend_from_slice(&inner);
        assert_eq!(unwrap_icao_outer_tag(&wrapped), &inner[..]);
    }

    #[test]
    fn passthrough_when_no_outer_tag() {
        let bytes = vec![0x30, 0x03, 0x01, 0x02, 0x03];
        assert_eq!(unwrap_icao_outer_tag(&bytes), &bytes[..]);
    }

    #[test]
    fn truncated_outer_tag_does_not_panic() {
        let bytes = vec![0x77, 0x85];
        assert_eq!(unwrap_icao_outer_tag(&bytes), &bytes[..]);
    }

    #[test]
    fn garbage_does_not_panic_parse_signed_data() {
        assert!(parse_signed_data(b"not cms").is_err());
    }
}
