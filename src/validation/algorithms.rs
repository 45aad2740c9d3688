//! Algorithm compliance checks (§4.2 step 7): SHA-256/384/512 with RSA,
//! RSA-PSS or ECDSA are compliant; SHA-1 variants are compliant-with-
//! warning; anything else is non-compliant. RSA keys under 2048 bits warn.

use crate::models::certificate::KeyAlgorithm;
use crate::processing::oid::signature_algorithm_deprecated;

pub struct AlgorithmCompliance {
    pub non_conformant: bool,
    pub warning: Option<String>,
}

/// `signature_algorithm_oid` identifies the CSCA/DSC signature scheme;
/// `key_algorithm`/`key_size_bits` describe the signing key itself.
pub fn check_algorithm_compliance(
    signature_algorithm_oid: &str,
    key_algorithm: KeyAlgorithm,
    key_size_bits: u32,
) -> AlgorithmCompliance {
    let known = crate::processing::oid::signature_algorithm_name(signature_algorithm_oid).is_some();

    if !known {
        return AlgorithmCompliance {
            non_conformant: true,
            warning: Some(format!(
                "unrecognized signature algorithm OID {signature_algorithm_oid}"
            )),
        };
    }

    let mut warning = None;
    if signature_algorithm_deprecated(signature_algorithm_oid) {
        warning = Some(format!(
            "{signature_algorithm_oid} uses a deprecated (SHA-1) digest"
        ));
    }

    if key_algorithm == KeyAlgorithm::Rsa || key_algorithm == KeyAlgorithm::RsaPss {
        if key_size_bits > 0 && key_size_bits < 2048 {
            warning = Some(match warning {
                Some(existing) => format!("{existing}; RSA key size {key_size_bits} bits < 2048"),
                None => format!("RSA key size {key_size_bits} bits < 2048"),
            });
        }
    }

    AlgorithmCompliance {
        non_conformant: false,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_rsa_is_compliant_no_warning() {
        let r = check_algorithm_compliance("1.2.840.113549.1.1.11", KeyAlgorithm::Rsa, 2048);
        assert!(!r.non_conformant);
        assert!(r.warning.is_none());
    }

    #[test]
    fn sha1_rsa_warns_deprecated() {
        let r = check_algorithm_compliance("1.2.840.113549.1.1.5", KeyAlgorithm::Rsa, 2048);
        assert!(!r.non_conformant);
        assert!(r.warning.unwrap().contains("deprecated"));
    }

    #[test]
    fn short_rsa_key_warns() {
        let r = check_algorithm_compliance("1.2.840.113549.1.1.11", KeyAlgorithm::Rsa, 1024);
        assert!(!r.non_conformant);
        assert!(r.warning.unwrap().contains("2048"));
    }

    #[test]
    fn unknown_oid_is_non_conformant() {
        let r = check_algorithm_compliance("9.9.9.9", KeyAlgorithm::Rsa, 2048);
        assert!(r.non_conformant);
    }

    #[test]
    fn rsa_pss_is_compliant_no_warning() {
        let r = check_algorithm_compliance("1.2.840.113549.1.1.10", KeyAlgorithm::RsaPss, 2048);
        assert!(!r.non_conformant);
        assert!(r.warning.is_none());
    }
}
