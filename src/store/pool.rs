//! Bounded `r2d2`/`rusqlite` connection pool for the Trust Store.
//!
//! Grounded in the retrieved `zydou-arti/tor-dirserver` mirror-operation
//! module, which pairs `r2d2::Pool<SqliteConnectionManager>` with
//! `rusqlite::Transaction` for the same "mirror upstream data into a local
//! relational store" shape.

use r2d2_sqlite::SqliteConnectionManager;

use crate::store::schema::ensure_schema;
use crate::utils::error::DbError;

pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

pub fn build_pool(db_path: &str, max_size: u32) -> Result<SqlitePool, DbError> {
    let manager = if db_path == ":memory:" {
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(db_path)
    };
    let pool = r2d2::Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| DbError::Connection(format!("failed to build SQLite pool: {e}")))?;

    let conn = pool
        .get()
        .map_err(|e| DbError::PoolExhausted(format!("failed to acquire connection for schema setup: {e}")))?;
    ensure_schema(&conn)?;

    Ok(pool)
}
