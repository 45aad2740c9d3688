pub mod error;

pub use error::{CodecError, DbError, LdapError, PkdError};
