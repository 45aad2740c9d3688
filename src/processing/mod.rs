//! Codec layer: decoders for every wire/storage format the mirror ingests.
//!
//! - `oid`: OID → name lookup tables shared by the other codecs.
//! - `x509`: Certificate Codec (DER/PEM → structured descriptor).
//! - `cms`: CMS `SignedData` parser (SODs and Master List outer envelope).
//! - `lds`: hand-rolled `LDSSecurityObject` walker.
//! - `ldif`: RFC 2849 LDIF streaming parser.
//! - `masterlist`: ICAO CSCA Master List parser.
//! - `crl`: CRL Codec (DER `CertificateList` → structured descriptor).

pub mod cms;
pub mod crl;
pub mod ldif;
pub mod lds;
pub mod masterlist;
pub mod oid;
pub mod signature;
pub mod x509;

pub use crl::{decode_crl, DecodedCrl};
pub use lds::{parse_security_object, LdsSecurityObject};
pub use masterlist::{parse_master_list, MasterListDescriptor};
pub use x509::{certificate_row, decode_certificate, fingerprint_der, DecodedCertificate};
