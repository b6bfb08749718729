#![cfg_attr(docsrs, feature(doc_cfg))]
//! `schemachain` maps plain Rust structs to SQL tables and keeps a database schema current through
//! versioned migration chains.
//!
//! Core concepts:
//! - A [Record] describes a struct's fields, their column names and their annotations. The
//!   [record!] macro writes the implementation from field attributes.
//! - A [DbHelper] wraps a connection of one [Dialect]. It creates tables for records, inserts
//!   record instances and runs [MigrationGroup]s.
//! - The database remembers a single floating point schema version. A migration statement runs
//!   when the version it was added in is greater than the stored version, so re-running a chain
//!   only applies what is new.
//!
//! ```
//! use schemachain::{DbHelper, HelperOptions, MigrationGroup};
//!
//! let mut db = DbHelper::open_sqlite(":memory:", HelperOptions::default())?;
//! db.add_group(
//!     MigrationGroup::new("users", 0)
//!         .add(0.0, "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
//!         .add(1.1, "ALTER TABLE users ADD email TEXT"),
//! );
//! let report = db.run_update(false, false)?;
//! assert_eq!(report.statements_run, 2);
//! assert_eq!(db.current_version(), 1.1);
//! # Ok::<(), schemachain::Error>(())
//! ```
//!
//! # Features
//! - Tracing integration - available with the `tracing` feature flag, on by default.
//! - Testing utilities - available with the `testing` feature flag.
//!
//! # Database support
//!
//! - [`SQLite`](sqlite) - available with the `sqlite` feature flag, on by default.
//! - [`MySQL`](mysql) - available with the `mysql` feature flag.
//! - [`PostgreSQL`](postgres) - available with the `postgres` feature flag.

mod annotation;
pub use annotation::Annotations;

mod dialect;
pub use dialect::Dialect;

mod dsn;
pub use dsn::{build_dsn, DsnParams};

mod engine;
pub use engine::{StatementFailure, UpdateReport};

mod error;
pub use error::Error;

mod executor;
pub use executor::{text_params, ExecResult, Executor, Param, Row};

mod helper;
pub use helper::{DbHelper, HelperOptions};

mod hook;
pub use hook::ErrHookOptions;

mod insert;
pub use insert::{build_insert, insert_sql, InsertOptions, InsertStatement};

#[macro_use]
mod macros;

mod migration;
pub use migration::{
    fill_template, init_version_statements, InitStatement, MigrationGroup, MigrationStatement,
};

mod record;
pub use record::{FieldDef, Record, RecordShape, SqlField, Value};

mod schema;
pub use schema::{build_create_table, create_table_sql, CreateTableOptions};

mod typemap;
pub use typemap::{map_type, FieldType};

mod version;
pub use version::VERSION_SENTINEL;

#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite;

#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql;

#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
