//! DN construction (§4.4): `cn=<fingerprint>,o=<container>,c=<country>,
//! <dataBase>,<rootBase>`. `container` ∈ {csca, dsc, crl}; the deprecated
//! nc-data branch (DSC_NC) uses a different `<dataBase>` component.

use crate::models::certificate::CertType;

const DATA_BASE: &str = "dc=data";
const NC_DATA_BASE: &str = "dc=nc-data";

/// The `o=...` container segment for a certificate type (CRLs always use
/// `o=crl` regardless of country-specific conventions).
pub fn container_for(cert_type: CertType) -> &'static str {
    match cert_type {
        CertType::Csca | CertType::Lc => "csca",
        CertType::Dsc | CertType::DscNc => "dsc",
        CertType::Mlsc => "mlsc",
    }
}

/// The `dc=data`/`dc=nc-data` branch a certificate type is mirrored under.
fn data_base_for(cert_type: CertType) -> &'static str {
    match cert_type {
        CertType::DscNc => NC_DATA_BASE,
        _ => DATA_BASE,
    }
}

/// Full certificate entry DN under `root_base` (e.g. `dc=pkd,dc=local`).
pub fn certificate_dn(cert_type: CertType, fingerprint: &str, country: &str, root_base: &str) -> String {
    format!(
        "cn={fingerprint},o={container},c={country},{data_base},{root_base}",
        container = container_for(cert_type),
        data_base = data_base_for(cert_type),
    )
}

/// CRL entry DN — same pattern, `o=crl` container.
pub fn crl_dn(fingerprint: &str, country: &str, root_base: &str) -> String {
    format!("cn={fingerprint},o=crl,c={country},{DATA_BASE},{root_base}")
}

/// `c=<country>` parent container DN.
pub fn country_container_dn(country: &str, data_base: &str, root_base: &str) -> String {
    format!("c={country},{data_base},{root_base}")
}

/// `o=<container>,c=<country>` parent container DN.
pub fn organization_container_dn(container: &str, country: &str, data_base: &str, root_base: &str) -> String {
    format!("o={container},c={country},{data_base},{root_base}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_dn_uses_csca_container() {
        let dn = certificate_dn(CertType::Csca, "abc123", "NL", "dc=pkd,dc=local");
        assert_eq!(dn, "cn=abc123,o=csca,c=NL,dc=data,dc=pkd,dc=local");
    }

    #[test]
    fn dsc_nc_uses_nc_data_branch() {
        let dn = certificate_dn(CertType::DscNc, "fp", "FR", "dc=pkd,dc=local");
        assert_eq!(dn, "cn=fp,o=dsc,c=FR,dc=nc-data,dc=pkd,dc=local");
    }

    #[test]
    fn link_certificate_uses_csca_container_too() {
        assert_eq!(container_for(CertType::Lc), "csca");
    }

    #[test]
    fn crl_dn_uses_crl_container() {
        let dn = crl_dn("fp", "NL", "dc=pkd,dc=local");
        assert_eq!(dn, "cn=fp,o=crl,c=NL,dc=data,dc=pkd,dc=local");
    }
}
