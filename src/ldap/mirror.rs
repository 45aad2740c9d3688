//! LDAP schema/entry construction (§4.4): certificate entries use
//! `objectClass={top, person, organizationalPerson, inetOrgPerson,
//! pkdDownload}`; CRL entries use `{top, cRLDistributionPoint,
//! pkdDownload}`. Parent containers are created on demand.

use std::collections::HashSet;

use ldap3::{LdapConn, Scope};

use crate::ldap::dn::{certificate_dn, container_for, country_container_dn, crl_dn, organization_container_dn};
use crate::models::certificate::{CertType, Certificate};
use crate::models::crl::Crl;
use crate::utils::error::LdapError;

const LDAP_ALREADY_EXISTS_CODE: u32 = 68;

/// `true` if the failure is `LDAP_ALREADY_EXISTS` — treated as success by
/// the reconciliation engine (§4.4: idempotent ADD semantics).
pub fn is_already_exists(err: &ldap3::LdapError) -> bool {
    match err {
        ldap3::LdapError::LdapResult { result } => result.rc == LDAP_ALREADY_EXISTS_CODE,
        _ => false,
    }
}

/// `true` if `dn` already exists in the directory (a one-level base-object
/// search, tolerating the race between the DB read and the ADD per §4.4
/// step 2: "tolerate race: if present, mark stored").
pub fn entry_exists(conn: &mut LdapConn, dn: &str) -> Result<bool, LdapError> {
    match conn.search(dn, Scope::Base, "(objectClass=*)", vec!["dn"]) {
        Ok(result) => match result.success() {
            Ok((entries, _)) => Ok(!entries.is_empty()),
            Err(_) => Ok(false),
        },
        Err(_) => Ok(false),
    }
}

/// Ensures `c=<country>` and `o=<container>,c=<country>` exist under
/// `data_base,root_base`, creating them with minimal `objectClass` sets if
/// absent (§4.4: "Parent containers must exist and are created on demand
/// with objectClass={top,country} or {top,organization}").
pub fn ensure_parent_containers(
    conn: &mut LdapConn,
    country: &str,
    container: &str,
    data_base: &str,
    root_base: &str,
) -> Result<(), LdapError> {
    let country_dn = country_container_dn(country, data_base, root_base);
    if !entry_exists(conn, &country_dn)? {
        let top: HashSet<&[u8]> = [b"top".as_slice(), b"country".as_slice()].into_iter().collect();
        let c: HashSet<&[u8]> = [country.as_bytes()].into_iter().collect();
        let attrs: Vec<(&str, HashSet<&[u8]>)> = vec![("objectClass", top), ("c", c)];
        add_entry_idempotent(conn, &country_dn, attrs)?;
    }

    let org_dn = organization_container_dn(container, country, data_base, root_base);
    if !entry_exists(conn, &org_dn)? {
        let top: HashSet<&[u8]> = [b"top".as_slice(), b"organization".as_slice()].into_iter().collect();
        let o: HashSet<&[u8]> = [container.as_bytes()].into_iter().collect();
        let attrs: Vec<(&str, HashSet<&[u8]>)> = vec![("objectClass", top), ("o", o)];
        add_entry_idempotent(conn, &org_dn, attrs)?;
    }

    Ok(())
}

/// Mirrors one certificate row as a `pkdDownload` LDAP entry. Returns
/// `Ok(())` both for a fresh ADD and for `LDAP_ALREADY_EXISTS`.
pub fn add_certificate_entry(conn: &mut LdapConn, cert: &Certificate, root_base: &str) -> Result<(), LdapError> {
    let dn = certificate_dn(cert.cert_type, &cert.fingerprint, &cert.country, root_base);
    let description = format!("{} — {}", cert.cert_type, cert.subject_dn);

    let object_classes: HashSet<&[u8]> = [
        b"top".as_slice(),
        b"person".as_slice(),
        b"organizationalPerson".as_slice(),
        b"inetOrgPerson".as_slice(),
        b"pkdDownload".as_slice(),
    ]
    .into_iter()
    .collect();
    let cn: HashSet<&[u8]> = [cert.subject_dn.as_bytes()].into_iter().collect();
    let sn: HashSet<&[u8]> = [cert.fingerprint.as_bytes()].into_iter().collect();
    let desc: HashSet<&[u8]> = [description.as_bytes()].into_iter().collect();
    let cert_bytes: HashSet<&[u8]> = [cert.der_bytes.as_slice()].into_iter().collect();

    let attrs: Vec<(&str, HashSet<&[u8]>)> = vec![
        ("objectClass", object_classes),
        ("cn", cn),
        ("sn", sn),
        ("description", desc),
        ("userCertificate;binary", cert_bytes),
    ];

    add_entry_idempotent(conn, &dn, attrs)
}

/// Mirrors one CRL row as a `cRLDistributionPoint` LDAP entry.
pub fn add_crl_entry(conn: &mut LdapConn, crl: &Crl, root_base: &str) -> Result<(), LdapError> {
    let dn = crl_dn(&crl.fingerprint, &crl.country, root_base);

    let object_classes: HashSet<&[u8]> = [b"top".as_slice(), b"cRLDistributionPoint".as_slice(), b"pkdDownload".as_slice()]
        .into_iter()
        .collect();
    let cn: HashSet<&[u8]> = [crl.fingerprint.as_bytes()].into_iter().collect();
    let crl_bytes: HashSet<&[u8]> = [crl.der_bytes.as_slice()].into_iter().collect();

    let attrs: Vec<(&str, HashSet<&[u8]>)> = vec![
        ("objectClass", object_classes),
        ("cn", cn),
        ("certificateRevocationList;binary", crl_bytes),
    ];

    add_entry_idempotent(conn, &dn, attrs)
}

fn add_entry_idempotent(conn: &mut LdapConn, dn: &str, attrs: Vec<(&str, HashSet<&[u8]>)>) -> Result<(), LdapError> {
    match conn.add(dn, attrs) {
        Ok(result) => match result.success() {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => Ok(()),
            Err(e) => Err(LdapError::from(e)),
        },
        Err(e) if is_already_exists(&e) => Ok(()),
        Err(e) => Err(LdapError::from(e)),
    }
}

/// The `o=...` container name a certificate type mirrors under, re-exposed
/// for callers outside this module (reconciliation needs it to build
/// parent-container DNs before the entry DN itself).
pub fn container_name(cert_type: CertType) -> &'static str {
    container_for(cert_type)
}
