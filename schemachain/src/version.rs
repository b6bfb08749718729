//! The one-row schema version table.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::executor::{Executor, Param};

pub(crate) const DEFAULT_VERSION_TABLE: &str = "DBVersion";

/// Stored for a database no migration has run against. Lower than any statement version,
/// including the version 0 of initial schema statements.
pub const VERSION_SENTINEL: f32 = -1.0;

/// Create the version table if needed and read the stored version.
/// A missing row is initialised with [VERSION_SENTINEL].
pub(crate) fn init_version<E: Executor>(
    conn: &mut E,
    dialect: Dialect,
    table: &str,
) -> Result<f32, Error> {
    let table = dialect.quote(table);
    conn.exec(
        &format!("CREATE TABLE IF NOT EXISTS {} (version FLOAT)", table),
        &[],
    )?;

    let rows = conn
        .query_scalar(&format!("SELECT COUNT(*) FROM {}", table), &[])?
        .and_then(|count| count.as_i64())
        .unwrap_or(0);

    if rows == 0 {
        #[cfg(feature = "tracing")]
        tracing::info!(table = %table, "Initialising schema version table");
        insert_version(conn, dialect, &table, VERSION_SENTINEL)?;
        return Ok(VERSION_SENTINEL);
    }
    if rows > 1 {
        return Err(Error::TooManyVersionRows(rows));
    }

    let version = conn
        .query_scalar(&format!("SELECT version FROM {}", table), &[])?
        .and_then(|v| v.as_f64())
        .map(|v| v as f32)
        .unwrap_or(VERSION_SENTINEL);

    #[cfg(feature = "tracing")]
    tracing::debug!(table = %table, version = version, "Loaded schema version");

    Ok(version)
}

/// Replace the stored version. Delete then insert, not atomic.
pub(crate) fn save_version<E: Executor>(
    conn: &mut E,
    dialect: Dialect,
    table: &str,
    version: f32,
) -> Result<(), Error> {
    let table = dialect.quote(table);
    conn.exec(&format!("DELETE FROM {}", table), &[])?;
    insert_version(conn, dialect, &table, version)
}

fn insert_version<E: Executor>(
    conn: &mut E,
    dialect: Dialect,
    quoted_table: &str,
    version: f32,
) -> Result<(), Error> {
    conn.exec(
        &format!(
            "INSERT INTO {} (version) VALUES ({})",
            quoted_table,
            dialect.placeholder(1)
        ),
        &[Param::from(version)],
    )?;
    Ok(())
}
