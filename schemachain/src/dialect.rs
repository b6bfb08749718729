//! The closed set of supported SQL engines and the SQL fragments that differ between them.

use serde::{Deserialize, Serialize};

/// The target SQL engine of a [DbHelper](crate::DbHelper).
/// Fixed when the handle is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// File-based embedded SQLite.
    Sqlite,
    /// SQLite opened with an encryption key (SQLCipher).
    SqliteEncrypted,
    Mysql,
    Postgres,
}

impl Dialect {
    /// True for both SQLite flavours.
    pub fn is_sqlite(self) -> bool {
        matches!(self, Dialect::Sqlite | Dialect::SqliteEncrypted)
    }

    /// Quote an identifier (table or column name).
    pub fn quote(self, ident: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{}\"", ident),
            Dialect::Sqlite | Dialect::SqliteEncrypted | Dialect::Mysql => format!("`{}`", ident),
        }
    }

    /// The qualifier appended to a column type for server-generated values.
    /// PostgreSQL has none, it uses serial types instead.
    pub fn auto_increment(self) -> Option<&'static str> {
        match self {
            Dialect::Mysql => Some("AUTO_INCREMENT"),
            Dialect::Sqlite | Dialect::SqliteEncrypted => Some("AUTOINCREMENT"),
            Dialect::Postgres => None,
        }
    }

    pub fn supports_unsigned(self) -> bool {
        matches!(self, Dialect::Mysql)
    }

    /// The expression converting unix epoch seconds into a timestamp value.
    pub fn from_unix_timestamp(self, seconds: i64) -> String {
        match self {
            Dialect::Mysql => format!("FROM_UNIXTIME({})", seconds),
            Dialect::Sqlite | Dialect::SqliteEncrypted => {
                format!("datetime({}, 'unixepoch')", seconds)
            }
            Dialect::Postgres => format!("to_timestamp({})", seconds),
        }
    }

    /// The positional placeholder for the `index`th (1-based) bound parameter.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Sqlite | Dialect::SqliteEncrypted | Dialect::Mysql => "?".to_string(),
        }
    }

    /// The statement inserting a row where every column takes its default.
    pub fn insert_defaults(self, table: &str) -> String {
        match self {
            Dialect::Mysql => format!("INSERT INTO {} () VALUES ()", table),
            Dialect::Sqlite | Dialect::SqliteEncrypted | Dialect::Postgres => {
                format!("INSERT INTO {} DEFAULT VALUES", table)
            }
        }
    }
}
