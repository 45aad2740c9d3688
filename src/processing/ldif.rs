//! LDIF (RFC 2849) streaming parser (§4.3, §6): yields `(cert_type, binary)`
//! tuples from `userCertificate;binary` and
//! `certificateRevocationList;binary` attributes without buffering the
//! whole file in a parsed form.

use std::io::BufRead;

use crate::utils::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdifAttributeKind {
    Certificate,
    Crl,
}

/// One parsed LDIF entry's certificate/CRL payload.
pub struct LdifEntry {
    pub dn: String,
    pub kind: LdifAttributeKind,
    pub der_bytes: Vec<u8>,
}

/// Streams `reader` line by line, grouping RFC 2849 entries (separated by
/// blank lines) and decoding base64 `attr;binary::` values for the two
/// attributes this system cares about. Unrecognized attributes are
/// ignored. A line-folding continuation (a line starting with a single
/// space) is joined onto the previous line per RFC 2849 §2.
pub fn parse_ldif<R: BufRead>(reader: R) -> Result<Vec<LdifEntry>, CodecError> {
    let mut entries = Vec::new();
    let mut current_dn: Option<String> = None;
    let mut pending: Vec<(LdifAttributeKind, String)> = Vec::new();
    let mut unfolded_lines: Vec<String> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| CodecError::MalformedLdif(format!("read error: {e}")))?;
        if line.starts_with(' ') {
            if let Some(last) = unfolded_lines.last_mut() {
                last.push_str(line.trim_start_matches(' '));
            }
            continue;
        }
        unfolded_lines.push(line);
    }

    let mut flush = |dn: &mut Option<String>,
                     pending: &mut Vec<(LdifAttributeKind, String)>,
                     entries: &mut Vec<LdifEntry>|
     -> Result<(), CodecError> {
        if let Some(dn_value) = dn.take() {
            for (kind, b64) in pending.drain(..) {
                let der_bytes = base64::Engine::decode(
                    &base64::engine::general_purpose::STANDARD,
                    b64.trim(),
                )
                .map_err(|e| CodecError::MalformedLdif(format!("bad base64: {e}")))?;
                entries.push(LdifEntry {
                    dn: dn_value.clone(),
                    kind,
                    der_bytes,
                });
            }
        } else {
            pending.clear();
        }
        Ok(())
    };

    for raw_line in unfolded_lines {
        if raw_line.trim().is_empty() {
            flush(&mut current_dn, &mut pending, &mut entries)?;
            continue;
        }
        if raw_line.starts_with('#') {
            continue;
        }
        let (attr, value) = match raw_line.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };

        if attr.eq_ignore_ascii_case("dn") {
            let value = value.strip_prefix(':').unwrap_or(value).trim();
            current_dn = Some(value.to_string());
            continue;
        }

        if attr.eq_ignore_ascii_case("userCertificate;binary") {
            let b64 = value.strip_prefix(':').unwrap_or(value).trim().to_string();
            pending.push((LdifAttributeKind::Certificate, b64));
        } else if attr.eq_ignore_ascii_case("certificateRevocationList;binary") {
            let b64 = value.strip_prefix(':').unwrap_or(value).trim().to_string();
            pending.push((LdifAttributeKind::Crl, b64));
        }
    }
    flush(&mut current_dn, &mut pending, &mut entries)?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use std::io::Cursor;

    #[test]
    fn parses_single_entry_with_certificate() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"certbytes");
        let ldif = format!(
            "dn: o=csca,c=NL,dc=data,dc=pkd\nuserCertificate;binary:: {payload}\n\n"
        );
        let entries = parse_ldif(Cursor::new(ldif.as_bytes())).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LdifAttributeKind::Certificate);
        assert_eq!(entries[0].der_bytes, b"certbytes");
    }

    #[test]
    fn parses_crl_entry() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"crlbytes");
        let ldif = format!(
            "dn: o=crl,c=NL,dc=data,dc=pkd\ncertificateRevocationList;binary:: {payload}\n\n"
        );
        let entries = parse_ldif(Cursor::new(ldif.as_bytes())).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LdifAttributeKind::Crl);
    }

    #[test]
    fn multiple_entries_separated_by_blank_lines() {
        let p1 = base64::engine::general_purpose::STANDARD.encode(b"one");
        let p2 = base64::engine::general_purpose::STANDARD.encode(b"two");
        let ldif = format!(
            "dn: o=csca,c=NL\nuserCertificate;binary:: {p1}\n\ndn: o=csca,c=FR\nuserCertificate;binary:: {p2}\n\n"
        );
        let entries = parse_ldif(Cursor::new(ldif.as_bytes())).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn ignores_unrelated_attributes() {
        let ldif = "dn: o=csca,c=NL\nobjectClass: top\n\n";
        let entries = parse_ldif(Cursor::new(ldif.as_bytes())).unwrap();
        assert!(entries.is_empty());
    }
}
