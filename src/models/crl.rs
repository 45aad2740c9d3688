use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A CRL row in the Trust Store (§3). Replaced only by later issuance
/// (higher `this_update`/`crl_number`); writers never mutate past rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crl {
    pub country: String,
    pub issuer_dn: String,
    pub fingerprint: String,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub crl_number: Option<String>,
    pub revoked_count: u32,
    pub der_bytes: Vec<u8>,
    pub stored_in_ldap: bool,
}

impl Crl {
    /// `true` once `next_update` has passed relative to `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.next_update {
            Some(next) => now > next,
            None => false,
        }
    }
}
