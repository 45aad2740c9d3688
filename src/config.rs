//! Runtime configuration, loaded from the environment with typed defaults.
//!
//! The teacher ships no config layer of its own (it is a CLI demo); this
//! env-var-with-defaults shape follows the broader retrieved pack's
//! convention (e.g. `drift`, `cascette-rs`) rather than inventing a bespoke
//! format.

use std::env;
use std::time::Duration;

/// Default cap on rows touched by a single reconciliation pass (spec §4.4).
pub const DEFAULT_MAX_RECONCILE_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite Trust Store file, or `:memory:` for tests.
    pub db_path: String,
    /// Max pooled DB connections.
    pub db_pool_size: u32,
    /// LDAP server URL, e.g. `ldap://localhost:389`.
    pub ldap_url: String,
    /// LDAP bind DN.
    pub ldap_bind_dn: String,
    /// LDAP bind password.
    pub ldap_bind_password: String,
    /// Root base DN the mirror is rooted at, e.g. `dc=pkd,dc=local`.
    pub ldap_root_base: String,
    /// Max pooled LDAP connections.
    pub ldap_pool_size: u32,
    /// Per-call LDAP search timeout (spec §5: 5 seconds).
    pub ldap_search_timeout: Duration,
    /// Cap on rows reconciled per run, per cert-type scope.
    pub max_reconcile_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: "pkd.sqlite3".to_string(),
            db_pool_size: 8,
            ldap_url: "ldap://localhost:389".to_string(),
            ldap_bind_dn: String::new(),
            ldap_bind_password: String::new(),
            ldap_root_base: "dc=pkd,dc=local".to_string(),
            ldap_pool_size: 4,
            ldap_search_timeout: Duration::from_secs(5),
            max_reconcile_batch_size: DEFAULT_MAX_RECONCILE_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Loads configuration from `PKD_*` environment variables, falling back
    /// to [`Config::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            db_path: env::var("PKD_DB_PATH").unwrap_or(defaults.db_path),
            db_pool_size: env_parse("PKD_DB_POOL_SIZE", defaults.db_pool_size),
            ldap_url: env::var("PKD_LDAP_URL").unwrap_or(defaults.ldap_url),
            ldap_bind_dn: env::var("PKD_LDAP_BIND_DN").unwrap_or(defaults.ldap_bind_dn),
            ldap_bind_password: env::var("PKD_LDAP_BIND_PASSWORD")
                .unwrap_or(defaults.ldap_bind_password),
            ldap_root_base: env::var("PKD_LDAP_ROOT_BASE").unwrap_or(defaults.ldap_root_base),
            ldap_pool_size: env_parse("PKD_LDAP_POOL_SIZE", defaults.ldap_pool_size),
            ldap_search_timeout: Duration::from_secs(env_parse(
                "PKD_LDAP_SEARCH_TIMEOUT_SECS",
                defaults.ldap_search_timeout.as_secs(),
            )),
            max_reconcile_batch_size: env_parse(
                "PKD_MAX_RECONCILE_BATCH_SIZE",
                defaults.max_reconcile_batch_size,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.max_reconcile_batch_size, DEFAULT_MAX_RECONCILE_BATCH_SIZE);
        assert_eq!(cfg.ldap_search_timeout, Duration::from_secs(5));
    }
}
