//! SQLite support through [`rusqlite`](https://crates.io/crates/rusqlite).
//!
//! ```
//! use schemachain::{record, DbHelper, HelperOptions, InsertOptions, CreateTableOptions};
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct User {
//!         #[orm = "pk,ai"]
//!         pub id: i64,
//!         pub name: String,
//!     }
//! }
//!
//! let mut db = DbHelper::open_sqlite(":memory:", HelperOptions::default()).unwrap();
//! db.create_table::<User>(&CreateTableOptions::default()).unwrap();
//!
//! let mut user = User { name: "alice".to_string(), ..Default::default() };
//! db.insert_mut(&mut user, &InsertOptions::default().set_generated_key()).unwrap();
//! assert_eq!(user.id, 1);
//! ```

use crate::dialect::Dialect;
use crate::dsn::{build_dsn, DsnParams};
use crate::error::Error;
use crate::executor::{ExecResult, Executor, Param, Row};
use crate::helper::{DbHelper, HelperOptions};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

// Re-export rusqlite types for callers building their own connections
pub use rusqlite::Connection as SqliteConnection;

fn to_values(params: &[Param]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            Param::Null => Value::Null,
            Param::Int(v) => Value::Integer(*v),
            Param::Float(v) => Value::Real(*v),
            Param::Text(v) => Value::Text(v.clone()),
        })
        .collect()
}

fn from_value(value: Value) -> Param {
    match value {
        Value::Null => Param::Null,
        Value::Integer(v) => Param::Int(v),
        Value::Real(v) => Param::Float(v),
        Value::Text(v) => Param::Text(v),
        Value::Blob(v) => Param::Text(String::from_utf8_lossy(&v).into_owned()),
    }
}

impl Executor for Connection {
    fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error> {
        let rows = self.execute(sql, params_from_iter(to_values(params)))?;
        Ok(ExecResult {
            rows_affected: rows as u64,
            last_insert_id: Some(self.last_insert_rowid()),
        })
    }

    fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error> {
        let mut stmt = self.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(to_values(params)))?;
        let value = match rows.next()? {
            Some(row) => Some(from_value(row.get::<_, Value>(0)?)),
            None => None,
        };
        Ok(value)
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, Error> {
        let mut stmt = self.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(to_values(params)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                record.push(column.as_str(), from_value(row.get::<_, Value>(index)?));
            }
            out.push(record);
        }
        Ok(out)
    }
}

impl DbHelper<Connection> {
    /// Open (or create) a SQLite database file. `":memory:"` opens an in-memory database.
    pub fn open_sqlite(path: &str, options: HelperOptions) -> Result<Self, Error> {
        if path.trim().is_empty() {
            return Err(Error::ArgumentMissing("file"));
        }
        #[cfg(feature = "tracing")]
        tracing::info!(path = path, "Opening sqlite database");
        Self::new(Dialect::Sqlite, Connection::open(path)?, options)
    }

    /// Open an encrypted SQLite database. Requires the `sqlcipher` feature, which links SQLCipher
    /// in place of plain SQLite. The key is applied through `PRAGMA key`.
    ///
    /// Fails with [Error::EncryptionUnavailable] when the linked library can't encrypt, instead
    /// of silently writing plaintext.
    pub fn open_sqlite_encrypted(
        path: &str,
        key: &str,
        options: HelperOptions,
    ) -> Result<Self, Error> {
        // validates path and key before touching the file system
        build_dsn(
            Dialect::SqliteEncrypted,
            &DsnParams::sqlite_encrypted(path, key),
        )?;
        #[cfg(feature = "tracing")]
        tracing::info!(path = path, "Opening encrypted sqlite database");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "key", key)?;
        // plain SQLite ignores unknown pragmas, cipher_version only answers under SQLCipher
        let cipher: Option<String> = conn
            .query_row("PRAGMA cipher_version", [], |row| row.get(0))
            .optional()?;
        if cipher.map_or(true, |v| v.is_empty()) {
            return Err(Error::EncryptionUnavailable);
        }
        Self::new(Dialect::SqliteEncrypted, conn, options)
    }
}
