//! Extension validation per role (§4.2 step 6): DSC must carry
//! `digitalSignature` (KeyUsage bit 0); CSCA must carry `keyCertSign`
//! (bit 5); `cRLSign` on CSCA is recommended (warning, not a failure).
//! Any unknown critical extension is reported but does not by itself fail
//! the chain.

use crate::models::certificate::ExtensionSet;

const KEY_USAGE_DIGITAL_SIGNATURE: u8 = 0;
const KEY_USAGE_KEY_CERT_SIGN: u8 = 5;
const KEY_USAGE_CRL_SIGN: u8 = 6;

pub struct ExtensionCheck {
    pub violation: Option<String>,
    pub warning: Option<String>,
    pub unknown_critical_extensions: Vec<String>,
}

pub fn check_dsc_extensions(dsc: &ExtensionSet) -> ExtensionCheck {
    let violation = if !dsc.has_key_usage_bit(KEY_USAGE_DIGITAL_SIGNATURE) {
        Some("DSC KeyUsage missing digitalSignature".to_string())
    } else {
        None
    };

    ExtensionCheck {
        violation,
        warning: None,
        unknown_critical_extensions: dsc.unknown_critical_oids.clone(),
    }
}

pub fn check_csca_extensions(csca: &ExtensionSet) -> ExtensionCheck {
    let violation = if !csca.has_key_usage_bit(KEY_USAGE_KEY_CERT_SIGN) {
        Some("CSCA KeyUsage missing keyCertSign".to_string())
    } else {
        None
    };

    let warning = if !csca.has_key_usage_bit(KEY_USAGE_CRL_SIGN) {
        Some("CSCA KeyUsage missing recommended cRLSign bit".to_string())
    } else {
        None
    };

    ExtensionCheck {
        violation,
        warning,
        unknown_critical_extensions: csca.unknown_critical_oids.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with_bits(bits: &[u8]) -> ExtensionSet {
        ExtensionSet {
            key_usage_bits: bits.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn dsc_without_digital_signature_is_a_violation() {
        let result = check_dsc_extensions(&set_with_bits(&[]));
        assert!(result.violation.is_some());
    }

    #[test]
    fn dsc_with_digital_signature_passes() {
        let result = check_dsc_extensions(&set_with_bits(&[0]));
        assert!(result.violation.is_none());
    }

    #[test]
    fn csca_without_key_cert_sign_is_a_violation() {
        let result = check_csca_extensions(&set_with_bits(&[]));
        assert!(result.violation.is_some());
    }

    #[test]
    fn csca_without_crl_sign_only_warns() {
        let result = check_csca_extensions(&set_with_bits(&[5]));
        assert!(result.violation.is_none());
        assert!(result.warning.is_some());
    }
}
