//! OID → name lookup tables (spec §4.1, exact table).

/// (OID, short name, is the hash/signature algorithm deprecated).
pub const DIGEST_ALGORITHMS: &[(&str, &str, bool)] = &[
    ("1.3.14.3.2.26", "SHA-1", true),
    ("2.16.840.1.101.3.4.2.1", "SHA-256", false),
    ("2.16.840.1.101.3.4.2.2", "SHA-384", false),
    ("2.16.840.1.101.3.4.2.3", "SHA-512", false),
];

pub const SIGNATURE_ALGORITHMS: &[(&str, &str, bool)] = &[
    ("1.2.840.113549.1.1.11", "SHA256withRSA", false),
    ("1.2.840.113549.1.1.12", "SHA384withRSA", false),
    ("1.2.840.113549.1.1.13", "SHA512withRSA", false),
    ("1.2.840.10045.4.3.2", "SHA256withECDSA", false),
    ("1.2.840.10045.4.3.3", "SHA384withECDSA", false),
    ("1.2.840.10045.4.3.4", "SHA512withECDSA", false),
    ("1.2.840.113549.1.1.10", "RSASSA-PSS", false),
    // Deprecated but compliant-with-warning per §4.2 step 7.
    ("1.2.840.113549.1.1.5", "SHA1withRSA", true),
    ("1.2.840.10045.4.1", "SHA1withECDSA", true),
];

pub const RSA_PSS_OID: &str = "1.2.840.113549.1.1.10";
pub const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";
pub const DSA_PUBLIC_KEY_OID: &str = "1.2.840.10040.4.1";

/// ICAO CSCA Master List eContent type (worldfnd-icao-9303-style constant placement).
pub const CSCA_MASTER_LIST_CONTENT_TYPE_OID: &str = "2.23.136.1.1.2";
/// `LDSSecurityObject` eContent type.
pub const LDS_SECURITY_OBJECT_CONTENT_TYPE_OID: &str = "2.23.136.1.1.1";
/// CMS `SignedData` content type.
pub const SIGNED_DATA_OID: &str = "1.2.840.113549.1.7.2";
/// PKCS#9 `signingTime` attribute OID.
pub const SIGNING_TIME_OID: &str = "1.2.840.113549.1.9.5";

pub fn digest_algorithm_name(oid: &str) -> Option<&'static str> {
    DIGEST_ALGORITHMS
        .iter()
        .find(|(o, _, _)| *o == oid)
        .map(|(_, name, _)| *name)
}

pub fn digest_algorithm_deprecated(oid: &str) -> bool {
    DIGEST_ALGORITHMS
        .iter()
        .find(|(o, _, _)| *o == oid)
        .map(|(_, _, dep)| *dep)
        .unwrap_or(false)
}

pub fn signature_algorithm_name(oid: &str) -> Option<&'static str> {
    SIGNATURE_ALGORITHMS
        .iter()
        .find(|(o, _, _)| *o == oid)
        .map(|(_, name, _)| *name)
}

pub fn signature_algorithm_deprecated(oid: &str) -> bool {
    SIGNATURE_ALGORITHMS
        .iter()
        .find(|(o, _, _)| *o == oid)
        .map(|(_, _, dep)| *dep)
        .unwrap_or(false)
}

/// Digests `message` with the hash named by `oid`. `None` for an
/// unrecognized OID (the caller records that as a mismatch, per §4.5).
pub fn digest_bytes(oid: &str, message: &[u8]) -> Option<Vec<u8>> {
    use sha1::Sha1;
    use sha2::{Digest, Sha256, Sha384, Sha512};

    match oid {
        "1.3.14.3.2.26" => Some(Sha1::digest(message).to_vec()),
        "2.16.840.1.101.3.4.2.1" => Some(Sha256::digest(message).to_vec()),
        "2.16.840.1.101.3.4.2.2" => Some(Sha384::digest(message).to_vec()),
        "2.16.840.1.101.3.4.2.3" => Some(Sha512::digest(message).to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_digest() {
        assert_eq!(
            digest_algorithm_name("2.16.840.1.101.3.4.2.1"),
            Some("SHA-256")
        );
        assert!(digest_algorithm_deprecated("1.3.14.3.2.26"));
        assert!(!digest_algorithm_deprecated("2.16.840.1.101.3.4.2.1"));
    }

    #[test]
    fn unknown_oid_is_none() {
        assert_eq!(digest_algorithm_name("1.2.3.4"), None);
    }
}
