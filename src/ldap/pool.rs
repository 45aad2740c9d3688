//! Bounded pool over `ldap3::LdapConn` (§5: LDAP pool acquired via scoped
//! acquisition with guaranteed release on all exit paths — `r2d2`'s
//! `PooledConnection` `Drop` gives exactly that guarantee, matching the DB
//! pool's discipline in `store::pool`).

use ldap3::LdapConn;

#[derive(Debug, Clone)]
pub struct LdapConnectionManager {
    url: String,
    bind_dn: String,
    bind_password: String,
}

impl LdapConnectionManager {
    pub fn new(url: impl Into<String>, bind_dn: impl Into<String>, bind_password: impl Into<String>) -> Self {
        LdapConnectionManager {
            url: url.into(),
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
        }
    }
}

impl r2d2::ManageConnection for LdapConnectionManager {
    type Connection = LdapConn;
    type Error = ldap3::LdapError;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let mut conn = LdapConn::new(&self.url)?;
        if !self.bind_dn.is_empty() {
            conn.simple_bind(&self.bind_dn, &self.bind_password)?.success()?;
        }
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.simple_bind(&self.bind_dn, &self.bind_password)?.success()?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub type LdapPool = r2d2::Pool<LdapConnectionManager>;
pub type PooledLdapConn = r2d2::PooledConnection<LdapConnectionManager>;

pub fn build_pool(url: &str, bind_dn: &str, bind_password: &str, max_size: u32) -> Result<LdapPool, crate::utils::error::LdapError> {
    let manager = LdapConnectionManager::new(url, bind_dn, bind_password);
    r2d2::Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| crate::utils::error::LdapError::Connection(format!("failed to build LDAP pool: {e}")))
}
