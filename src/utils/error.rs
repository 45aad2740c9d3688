use std::error::Error;
use std::fmt;

/// Lower-level parse failures from the certificate/CMS/LDIF codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// ASN.1/DER decoding failed, or a length ran past the buffer end.
    ParseError(String),
    /// An LDIF entry was missing a required attribute.
    MalformedLdif(String),
    /// The CMS `eContentType` did not match the expected object.
    UnexpectedContentType(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodecError::ParseError(msg) => write!(f, "parse error: {msg}"),
            CodecError::MalformedLdif(msg) => write!(f, "malformed LDIF: {msg}"),
            CodecError::UnexpectedContentType(msg) => write!(f, "unexpected content type: {msg}"),
        }
    }
}

impl Error for CodecError {}

/// Failures talking to the Trust Store.
#[derive(Debug)]
pub enum DbError {
    Connection(String),
    Query(String),
    PoolExhausted(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DbError::Connection(msg) => write!(f, "db connection error: {msg}"),
            DbError::Query(msg) => write!(f, "db query error: {msg}"),
            DbError::PoolExhausted(msg) => write!(f, "db pool exhausted: {msg}"),
        }
    }
}

impl Error for DbError {}

/// Failures talking to the LDAP mirror.
#[derive(Debug)]
pub enum LdapError {
    Connection(String),
    Operation(String),
    AlreadyExists(String),
}

impl fmt::Display for LdapError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LdapError::Connection(msg) => write!(f, "ldap connection error: {msg}"),
            LdapError::Operation(msg) => write!(f, "ldap operation error: {msg}"),
            LdapError::AlreadyExists(msg) => write!(f, "ldap entry already exists: {msg}"),
        }
    }
}

impl Error for LdapError {}

/// Error taxonomy per spec §7. Kinds, not type names: every variant here
/// corresponds to one of the listed error codes and carries enough context
/// to reconstruct the `{code, message}` boundary payload.
#[derive(Debug)]
pub enum PkdError {
    Parse(CodecError),
    CscaNotFound(String),
    CscaDnMismatch(String),
    CscaSelfSignatureFailed(String),
    SignatureInvalid(String),
    NotYetValid(String),
    Expired(String),
    NotValidAtSigningTime(String),
    Revoked(String),
    CrlUnavailable(String),
    CrlExpired(String),
    CrlInvalid(String),
    ExtensionViolation(String),
    AlgorithmNoncompliant(String),
    DgHashMismatch(String),
    SodSignatureInvalid(String),
    DuplicateFile(String),
    Db(DbError),
    Ldap(LdapError),
}

impl PkdError {
    /// The stable error code used in boundary JSON responses (`error.code`).
    pub fn code(&self) -> &'static str {
        match self {
            PkdError::Parse(_) => "PARSE_ERROR",
            PkdError::CscaNotFound(_) => "CSCA_NOT_FOUND",
            PkdError::CscaDnMismatch(_) => "CSCA_DN_MISMATCH",
            PkdError::CscaSelfSignatureFailed(_) => "CSCA_SELF_SIGNATURE_FAILED",
            PkdError::SignatureInvalid(_) => "SIGNATURE_INVALID",
            PkdError::NotYetValid(_) => "NOT_YET_VALID",
            PkdError::Expired(_) => "EXPIRED",
            PkdError::NotValidAtSigningTime(_) => "NOT_VALID_AT_SIGNING_TIME",
            PkdError::Revoked(_) => "REVOKED",
            PkdError::CrlUnavailable(_) => "CRL_UNAVAILABLE",
            PkdError::CrlExpired(_) => "CRL_EXPIRED",
            PkdError::CrlInvalid(_) => "CRL_INVALID",
            PkdError::ExtensionViolation(_) => "EXTENSION_VIOLATION",
            PkdError::AlgorithmNoncompliant(_) => "ALGORITHM_NONCOMPLIANT",
            PkdError::DgHashMismatch(_) => "DG_HASH_MISMATCH",
            PkdError::SodSignatureInvalid(_) => "SOD_SIGNATURE_INVALID",
            PkdError::DuplicateFile(_) => "DUPLICATE_FILE",
            PkdError::Db(_) => "DB_ERROR",
            PkdError::Ldap(_) => "LDAP_ERROR",
        }
    }
}

impl fmt::Display for PkdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PkdError::Parse(e) => write!(f, "{e}"),
            PkdError::CscaNotFound(msg) => write!(f, "CSCA not found: {msg}"),
            PkdError::CscaDnMismatch(msg) => write!(f, "CSCA DN mismatch: {msg}"),
            PkdError::CscaSelfSignatureFailed(msg) => {
                write!(f, "CSCA self-signature verification failed: {msg}")
            }
            PkdError::SignatureInvalid(msg) => write!(f, "signature invalid: {msg}"),
            PkdError::NotYetValid(msg) => write!(f, "not yet valid: {msg}"),
            PkdError::Expired(msg) => write!(f, "expired: {msg}"),
            PkdError::NotValidAtSigningTime(msg) => {
                write!(f, "not valid at signing time: {msg}")
            }
            PkdError::Revoked(msg) => write!(f, "revoked: {msg}"),
            PkdError::CrlUnavailable(msg) => write!(f, "CRL unavailable: {msg}"),
            PkdError::CrlExpired(msg) => write!(f, "CRL expired: {msg}"),
            PkdError::CrlInvalid(msg) => write!(f, "CRL invalid: {msg}"),
            PkdError::ExtensionViolation(msg) => write!(f, "extension violation: {msg}"),
            PkdError::AlgorithmNoncompliant(msg) => write!(f, "algorithm non-compliant: {msg}"),
            PkdError::DgHashMismatch(msg) => write!(f, "data group hash mismatch: {msg}"),
            PkdError::SodSignatureInvalid(msg) => write!(f, "SOD signature invalid: {msg}"),
            PkdError::DuplicateFile(msg) => write!(f, "duplicate file: {msg}"),
            PkdError::Db(e) => write!(f, "{e}"),
            PkdError::Ldap(e) => write!(f, "{e}"),
        }
    }
}

impl Error for PkdError {}

impl From<CodecError> for PkdError {
    fn from(e: CodecError) -> Self {
        PkdError::Parse(e)
    }
}

impl From<DbError> for PkdError {
    fn from(e: DbError) -> Self {
        PkdError::Db(e)
    }
}

impl From<LdapError> for PkdError {
    fn from(e: LdapError) -> Self {
        PkdError::Ldap(e)
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::Query(e.to_string())
    }
}

impl From<r2d2::Error> for DbError {
    fn from(e: r2d2::Error) -> Self {
        DbError::PoolExhausted(e.to_string())
    }
}

impl From<ldap3::LdapError> for LdapError {
    fn from(e: ldap3::LdapError) -> Self {
        LdapError::Operation(e.to_string())
    }
}
