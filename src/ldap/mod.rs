//! LDAP mirror: DN construction, a pooled `ldap3::LdapConn`, entry/schema
//! construction, and the DB→LDAP reconciliation engine (§4.4).

pub mod dn;
pub mod mirror;
pub mod pool;
pub mod reconcile;

pub use pool::{build_pool, LdapPool, PooledLdapConn};
pub use reconcile::{ReconciliationEngine, ReconciliationRunResult};
