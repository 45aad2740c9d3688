//! ICAO Master List parser (§4.1, §4.3, §6): a CMS `SignedData` whose
//! `eContent` is a `CscaMasterList` (`SEQUENCE OF Certificate`), signed by
//! the Master List Signer Certificate (MLSC).

use der::asn1::OctetString;
use der::Decode;
use x509_cert::certificate::Certificate as X509Certificate;

use crate::processing::cms::parse_signed_data;
use crate::processing::oid::CSCA_MASTER_LIST_CONTENT_TYPE_OID;
use crate::processing::x509::{decode_certificate, DecodedCertificate};
use crate::utils::error::CodecError;

pub struct MasterListDescriptor {
    /// The Master List Signer Certificate, extracted from the SignerInfo
    /// certificate stack.
    pub mlsc: DecodedCertificate,
    /// Every CSCA certificate carried in the `CscaMasterList` eContent.
    pub cscas: Vec<DecodedCertificate>,
}

/// Parses a CMS-wrapped `CscaMasterList`. CSCA extraction is best-effort
/// per entry: a malformed certificate inside an otherwise valid Master
/// List is skipped, not fatal to the whole parse.
pub fn parse_master_list(bytes: &[u8]) -> Result<MasterListDescriptor, CodecError> {
    let descriptor = parse_signed_data(bytes)?;

    let econtent_type = descriptor.signed_data.encap_content_info.econtent_type.to_string();
    if econtent_type != CSCA_MASTER_LIST_CONTENT_TYPE_OID {
        log::debug!(
            "master list eContentType {econtent_type} does not match the expected CscaMasterList OID; continuing best-effort"
        );
    }

    let mlsc_der = descriptor
        .first_certificate_der
        .ok_or_else(|| CodecError::ParseError("master list has no MLSC in SignerInfo certificate stack".into()))?;
    let mlsc = decode_certificate(&mlsc_der)?;

    let econtent = descriptor
        .signed_data
        .encap_content_info
        .econtent
        .ok_or_else(|| CodecError::ParseError("master list eContent is absent".into()))?;
    let octet_string = econtent
        .decode_as::<OctetString>()
        .map_err(|e| CodecError::ParseError(format!("eContent is not an OCTET STRING: {e}")))?;

    let cscas = parse_csca_sequence(octet_string.as_bytes());

    Ok(MasterListDescriptor { mlsc, cscas })
}

/// `CscaMasterList ::= SEQUENCE { version INTEGER, certList SEQUENCE OF Certificate }`.
/// Each certificate is decoded independently; failures are skipped with a
/// warning rather than aborting the whole list.
fn parse_csca_sequence(bytes: &[u8]) -> Vec<DecodedCertificate> {
    let mut out = Vec::new();

    // CscaMasterList doesn't map cleanly onto a single typed der::Sequence
    // without its own ASN.1 module; walk it as a raw SEQUENCE { INTEGER,
    // SEQUENCE OF Certificate } and decode each embedded certificate.
    if let Ok(top) = der::asn1::SequenceRef::from_der(bytes) {
        let mut decoder = der::SliceReader::new(top.value()).ok();
        if let Some(decoder) = decoder.as_mut() {
            // Skip the version INTEGER.
            let _: Result<der::asn1::Int, _> = der::Decode::decode(decoder);
            if let Ok(cert_seq) = der::asn1::SequenceRef::decode(decoder) {
                if let Ok(mut inner) = der::SliceReader::new(cert_seq.value()) {
                    while !inner.is_finished() {
                        match X509Certificate::decode(&mut inner) {
                            Ok(cert) => {
                                if let Ok(cert_der) = der::Encode::to_der(&cert) {
                                    match decode_certificate(&cert_der) {
                                        Ok(decoded) => out.push(decoded),
                                        Err(e) => log::warn!(
                                            "skipping unparsable CSCA in master list: {e}"
                                        ),
                                    }
                                }
                            }
                            Err(_) => break,
                        }
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_input_is_a_codec_error() {
        assert!(parse_master_list(b"not a master list").is_err());
    }
}
