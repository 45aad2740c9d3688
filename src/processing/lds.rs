//! Hand-rolled `LDSSecurityObject` walker (spec §4.1, explicit requirement):
//! outer SEQUENCE, skip version INTEGER, skip hashAlgorithm SEQUENCE, then
//! iterate the SEQUENCE OF `DataGroupHash` reading
//! `(dgNumber INTEGER, hashValue OCTET STRING)` pairs.
//!
//! Every length read is bounded by the buffer end. Malformed input returns
//! an empty map — this parser never panics and never re-enters without a
//! length check (§5: "never re-enter a sub-parser without length checks").

use std::collections::BTreeMap;

const TAG_INTEGER: u8 = 0x02;
const TAG_OID: u8 = 0x06;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Some(b)
    }

    /// Reads a TLV's length (short or long form), bounded by `remaining()`.
    fn read_length(&mut self) -> Option<usize> {
        let first = self.read_byte()?;
        if first & 0x80 == 0 {
            Some(first as usize)
        } else {
            let num_bytes = (first & 0x7f) as usize;
            if num_bytes == 0 || num_bytes > 8 || self.remaining() < num_bytes {
                return None;
            }
            let mut len = 0usize;
            for _ in 0..num_bytes {
                len = (len << 8) | self.read_byte()? as usize;
            }
            Some(len)
        }
    }

    /// Reads one `(tag, length, value)` TLV and advances past it. Returns
    /// `None` (without advancing past the declared length) if the value
    /// would run past the buffer end.
    fn read_tlv(&mut self) -> Option<(u8, &'a [u8])> {
        let tag = self.read_byte()?;
        let len = self.read_length()?;
        if self.remaining() < len {
            return None;
        }
        let value = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some((tag, value))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// The decoded `LdsSecurityObject`: the declared hash algorithm plus the
/// DG number → hash value map.
#[derive(Debug, Clone, Default)]
pub struct LdsSecurityObject {
    pub hash_algorithm_oid: Option<String>,
    pub data_group_hashes: BTreeMap<String, Vec<u8>>,
}

/// Parses `LdsSecurityObject { version INTEGER, hashAlgorithm SEQUENCE,
/// dataGroupHashValues SEQUENCE OF DataGroupHash, ... }` and returns the DG
/// number (as a decimal string, `"1".."16"`) → hash value map.
///
/// Any malformed input — truncated TLVs, wrong tags, an out-of-range
/// length — yields an empty map rather than an error, per spec §4.1.
pub fn parse_data_group_hashes(der_bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    parse_security_object(der_bytes).data_group_hashes
}

/// Like [`parse_data_group_hashes`] but also surfaces the declared
/// `hashAlgorithm` OID, needed to pick the right digest in the PA Engine
/// (spec §4.5 step 4).
pub fn parse_security_object(der_bytes: &[u8]) -> LdsSecurityObject {
    parse_inner(der_bytes).unwrap_or_default()
}

fn parse_inner(der_bytes: &[u8]) -> Option<LdsSecurityObject> {
    let mut outer = Cursor::new(der_bytes);
    let (tag, body) = outer.read_tlv()?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let mut cursor = Cursor::new(body);

    // version INTEGER — skip.
    let (tag, _) = cursor.read_tlv()?;
    if tag != TAG_INTEGER {
        return None;
    }

    // hashAlgorithm AlgorithmIdentifier SEQUENCE — first element is the OID.
    let (tag, hash_alg_body) = cursor.read_tlv()?;
    if tag != TAG_SEQUENCE {
        return None;
    }
    let hash_algorithm_oid = {
        let mut inner = Cursor::new(hash_alg_body);
        match inner.read_tlv() {
            Some((t, v)) if t == TAG_OID => der::asn1::ObjectIdentifier::from_bytes(v).ok().map(|oid| oid.to_string()),
            _ => None,
        }
    };

    // dataGroupHashValues SEQUENCE OF DataGroupHash.
    let (tag, seq_body) = cursor.read_tlv()?;
    if tag != TAG_SEQUENCE {
        return None;
    }

    let mut map = BTreeMap::new();
    let mut inner = Cursor::new(seq_body);
    while !inner.at_end() {
        let (tag, entry_body) = match inner.read_tlv() {
            Some(v) => v,
            None => break,
        };
        if tag != TAG_SEQUENCE {
            continue;
        }
        let mut entry = Cursor::new(entry_body);
        let dg_number = match entry.read_tlv() {
            Some((t, v)) if t == TAG_INTEGER => decode_unsigned_integer(v),
            _ => continue,
        };
        let hash_value = match entry.read_tlv() {
            Some((t, v)) if t == TAG_OCTET_STRING => v.to_vec(),
            _ => continue,
        };
        map.insert(dg_number.to_string(), hash_value);
    }

    Some(LdsSecurityObject {
        hash_algorithm_oid,
        data_group_hashes: map,
    })
}

fn decode_unsigned_integer(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
        let mut out = vec![tag, value.len() as u8];
        out.extend_from_slice(value);
        out
    }

    fn build_lds(dg_entries: &[(u8, &[u8])]) -> Vec<u8> {
        let version = tlv(TAG_INTEGER, &[0]);
        let hash_alg = tlv(TAG_SEQUENCE, &tlv(TAG_INTEGER, &[6]));
        let mut entries = Vec::new();
        for (dg, hash) in dg_entries {
            let mut entry = tlv(TAG_INTEGER, &[*dg]);
            entry.extend(tlv(TAG_OCTET_STRING, hash));
            entries.extend(tlv(TAG_SEQUENCE, &entry));
        }
        let dg_seq = tlv(TAG_SEQUENCE, &entries);

        let mut body = version;
        body.extend(hash_alg);
        body.extend(dg_seq);
        tlv(TAG_SEQUENCE, &body)
    }

    #[test]
    fn parses_well_formed_lds() {
        let der = build_lds(&[(1, b"hash1value"), (2, b"hash2value")]);
        let map = parse_data_group_hashes(&der);
        assert_eq!(map.get("1").map(|v| v.as_slice()), Some(&b"hash1value"[..]));
        assert_eq!(map.get("2").map(|v| v.as_slice()), Some(&b"hash2value"[..]));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn truncated_input_returns_empty_map_not_panic() {
        let der = build_lds(&[(1, b"hash1value")]);
        let truncated = &der[..der.len() - 3];
        let map = parse_data_group_hashes(truncated);
        assert!(map.is_empty() || map.len() <= 1);
    }

    #[test]
    fn empty_input_returns_empty_map() {
        assert!(parse_data_group_hashes(&[]).is_empty());
    }

    #[test]
    fn extracts_hash_algorithm_oid() {
        // SHA-256: 2.16.840.1.101.3.4.2.1
        let sha256_oid = [0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];
        let version = tlv(TAG_INTEGER, &[0]);
        let hash_alg = tlv(TAG_SEQUENCE, &tlv(TAG_OID, &sha256_oid));
        let entry = {
            let mut e = tlv(TAG_INTEGER, &[1]);
            e.extend(tlv(TAG_OCTET_STRING, b"hash1value"));
            tlv(TAG_SEQUENCE, &e)
        };
        let dg_seq = tlv(TAG_SEQUENCE, &entry);
        let mut body = version;
        body.extend(hash_alg);
        body.extend(dg_seq);
        let der = tlv(TAG_SEQUENCE, &body);

        let parsed = parse_security_object(&der);
        assert_eq!(parsed.hash_algorithm_oid.as_deref(), Some("2.16.840.1.101.3.4.2.1"));
        assert_eq!(parsed.data_group_hashes.len(), 1);
    }

    #[test]
    fn random_garbage_returns_empty_map() {
        let garbage = [0xffu8; 32];
        assert!(parse_data_group_hashes(&garbage).is_empty());
    }

    #[test]
    fn dg_number_up_to_16() {
        let der = build_lds(&[(16, b"sixteen")]);
        let map = parse_data_group_hashes(&der);
        assert_eq!(map.get("16").map(|v| v.as_slice()), Some(&b"sixteen"[..]));
    }
}
