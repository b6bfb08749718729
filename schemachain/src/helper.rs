//! [DbHelper], the handle tying a connection to its dialect, options and migrations.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::executor::{text_params, ExecResult, Executor, Param};
use crate::hook::{route, ErrHookOptions, ErrorHook};
use crate::insert::{build_insert, InsertOptions};
use crate::migration::{fill_template, MigrationGroup};
use crate::record::Record;
use crate::schema::{build_create_table, CreateTableOptions};
use crate::version::{init_version, DEFAULT_VERSION_TABLE, VERSION_SENTINEL};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options of a [DbHelper].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperOptions {
    /// Abort [DbHelper::run_update] at the first failing statement.
    pub stop_on_error: bool,
    /// Keep the schema version in a table of the database. Required for migrations.
    pub store_version_in_db: bool,
    /// Advance the stored version after a run in which statements failed. Failed statements
    /// are then never retried.
    pub advance_version_on_failure: bool,
    /// Name of the schema version table.
    pub version_table: String,
}

impl Default for HelperOptions {
    fn default() -> Self {
        Self {
            stop_on_error: false,
            store_version_in_db: true,
            advance_version_on_failure: true,
            version_table: DEFAULT_VERSION_TABLE.to_string(),
        }
    }
}

impl HelperOptions {
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn store_version_in_db(mut self, store: bool) -> Self {
        self.store_version_in_db = store;
        self
    }

    pub fn advance_version_on_failure(mut self, advance: bool) -> Self {
        self.advance_version_on_failure = advance;
        self
    }

    pub fn version_table(mut self, table: impl Into<String>) -> Self {
        self.version_table = table.into();
        self
    }
}

/// A database handle with struct mapping and versioned migrations.
///
/// Construct it with one of the driver specific `open_*` functions, or with [DbHelper::new]
/// around any [Executor].
pub struct DbHelper<E: Executor> {
    pub(crate) dialect: Dialect,
    pub(crate) conn: E,
    pub(crate) options: HelperOptions,
    pub(crate) current_version: f32,
    pub(crate) groups: Vec<MigrationGroup>,
    pub(crate) error_hook: Option<ErrorHook>,
}

// Manual Debug impl since the connection and hook don't implement Debug
impl<E: Executor> std::fmt::Debug for DbHelper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHelper")
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .field("current_version", &self.current_version)
            .field("groups", &self.groups)
            .field("error_hook", &self.error_hook)
            .finish()
    }
}

impl<E: Executor> DbHelper<E> {
    /// Wrap an open connection. With `store_version_in_db` the version table is created if
    /// needed and the stored version is loaded.
    pub fn new(dialect: Dialect, conn: E, options: HelperOptions) -> Result<Self, Error> {
        let mut helper = Self {
            dialect,
            conn,
            options,
            current_version: VERSION_SENTINEL,
            groups: Vec::new(),
            error_hook: None,
        };
        if helper.options.store_version_in_db {
            helper.current_version =
                init_version(&mut helper.conn, dialect, &helper.options.version_table)?;
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Schema version is not stored in the database");
        }
        Ok(helper)
    }

    /// Install an error hook. Every error returned by this handle is passed to `callback`
    /// first; with [ErrHookOptions::return_none_on_err] the call reports success instead.
    pub fn on_error<F>(mut self, callback: F, options: ErrHookOptions) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.error_hook = Some(ErrorHook::new(Box::new(callback), options));
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> &HelperOptions {
        &self.options
    }

    /// The schema version loaded from, or last written to, the version table.
    pub fn current_version(&self) -> f32 {
        self.current_version
    }

    pub fn groups(&self) -> &[MigrationGroup] {
        &self.groups
    }

    pub fn connection(&mut self) -> &mut E {
        &mut self.conn
    }

    pub fn into_connection(self) -> E {
        self.conn
    }

    pub(crate) fn handle<T>(
        &self,
        per_call: Option<&ErrHookOptions>,
        result: Result<T, Error>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, Error> {
        route(self.error_hook.as_ref(), per_call, result, fallback)
    }

    /// Execute a statement with positional parameters.
    pub fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = sql, params = ?params, "Executing statement");
        let result = self.conn.exec(sql, params);
        self.handle(None, result, ExecResult::default)
    }

    /// Execute a templated statement: `%s` placeholders in `template` are filled from
    /// `fmt_params`, then `params` are bound.
    pub fn exec_fmt(
        &mut self,
        template: &str,
        fmt_params: &[String],
        params: &[Param],
    ) -> Result<ExecResult, Error> {
        match fill_template(template, fmt_params) {
            Ok(sql) => self.exec(&sql, params),
            Err(err) => self.handle(None, Err(err), ExecResult::default),
        }
    }

    /// Run a query returning a single value.
    pub fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error> {
        let result = self.conn.query_scalar(sql, params);
        self.handle(None, result, || None)
    }

    /// Run a query and read every returned row into a new `R`.
    ///
    /// Columns are matched to fields by column name, case insensitively. A column without a
    /// matching field fails with [Error::MissingDestination]; fields without a column keep their
    /// default value.
    pub fn query_rows<R: Record + Default>(
        &mut self,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<R>, Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = sql, params = ?params, "Querying rows");
        let result = self.conn.query_rows(sql, params).and_then(|rows| {
            rows.iter()
                .map(|row| {
                    let mut record = R::default();
                    record.read_row(row)?;
                    Ok(record)
                })
                .collect()
        });
        self.handle(None, result, Vec::new)
    }

    /// Like [DbHelper::query_rows], keeping only the first row. `None` when the query returned
    /// nothing.
    pub fn query_row<R: Record + Default>(
        &mut self,
        sql: &str,
        params: &[Param],
    ) -> Result<Option<R>, Error> {
        self.query_rows(sql, params)
            .map(|rows| rows.into_iter().next())
    }

    /// [DbHelper::query_rows] on a `%s` template filled from `fmt_params`.
    pub fn query_rows_fmt<R: Record + Default>(
        &mut self,
        template: &str,
        fmt_params: &[String],
        params: &[Param],
    ) -> Result<Vec<R>, Error> {
        match fill_template(template, fmt_params) {
            Ok(sql) => self.query_rows(&sql, params),
            Err(err) => self.handle(None, Err(err), Vec::new),
        }
    }

    /// [DbHelper::query_row] on a `%s` template filled from `fmt_params`.
    pub fn query_row_fmt<R: Record + Default>(
        &mut self,
        template: &str,
        fmt_params: &[String],
        params: &[Param],
    ) -> Result<Option<R>, Error> {
        self.query_rows_fmt(template, fmt_params, params)
            .map(|rows| rows.into_iter().next())
    }

    /// Build and execute the `CREATE TABLE` statement for `R`.
    pub fn create_table<R: Record>(&mut self, options: &CreateTableOptions) -> Result<(), Error> {
        let result = build_create_table::<R>(self.dialect, options).and_then(|sql| {
            #[cfg(feature = "tracing")]
            tracing::debug!(sql = %sql, "Creating table");
            self.conn.exec(&sql, &[]).map(|_| ())
        });
        self.handle(options.error_hook.as_ref(), result, || ())
    }

    /// Insert `record`. Fails with [Error::CannotAddress] before executing anything if
    /// `set_generated_key` is requested for a record with a generated key, since a shared
    /// reference can't receive it; use [DbHelper::insert_mut] for that.
    pub fn insert<R: Record>(
        &mut self,
        record: &R,
        options: &InsertOptions,
    ) -> Result<ExecResult, Error> {
        let result = build_insert(record, self.dialect, options).and_then(|stmt| {
            if options.set_generated_key && stmt.generated_key.is_some() {
                return Err(Error::CannotAddress);
            }
            self.conn.exec(&stmt.sql, &[])
        });
        self.handle(options.error_hook.as_ref(), result, ExecResult::default)
    }

    /// Insert `record` and, with `set_generated_key`, write the id reported by the driver into
    /// its primary key autoincrement field.
    pub fn insert_mut<R: Record>(
        &mut self,
        record: &mut R,
        options: &InsertOptions,
    ) -> Result<ExecResult, Error> {
        let result = build_insert(&*record, self.dialect, options).and_then(|stmt| {
            let exec = self.conn.exec(&stmt.sql, &[])?;
            if let (true, Some(index)) = (options.set_generated_key, stmt.generated_key) {
                let id = exec.last_insert_id()?;
                record.set_generated_key(index, id)?;
                #[cfg(feature = "tracing")]
                tracing::debug!(id = id, "Wrote generated key back into record");
            }
            Ok(exec)
        });
        self.handle(options.error_hook.as_ref(), result, ExecResult::default)
    }

    /// Register a migration group. Groups are applied by [DbHelper::run_update].
    pub fn add_group(&mut self, group: MigrationGroup) -> &mut Self {
        self.groups.push(group);
        self
    }

    /// Register the statements of a `.sql` file as a version 0 group.
    pub fn load_sql_file(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        order: i32,
    ) -> Result<(), Error> {
        match MigrationGroup::load_sql_file(name, path, order) {
            Ok(group) => {
                self.groups.push(group);
                Ok(())
            }
            Err(err) => self.handle(None, Err(err), || ()),
        }
    }

    /// Execute one migration statement, template first.
    pub(crate) fn exec_statement(
        &mut self,
        statement: &crate::migration::MigrationStatement,
    ) -> Result<ExecResult, Error> {
        let params = text_params(&statement.params);
        if statement.query_fmt.is_empty() {
            self.exec(&statement.query, &params)
        } else {
            self.exec_fmt(&statement.query_fmt, &statement.fmt_params, &params)
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::record;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    record! {
        #[derive(Debug, Default)]
        struct Note {
            #[orm = "pk,ai"]
            id: u32,
            body: String,
            #[orm = "-"]
            draft: bool,
        }
    }

    fn open() -> DbHelper<Connection> {
        DbHelper::open_sqlite(":memory:", HelperOptions::default()).unwrap()
    }

    #[test]
    fn opening_initialises_version() {
        let db = open();
        assert_eq!(db.current_version(), VERSION_SENTINEL);
    }

    #[test]
    fn without_version_storage_no_table_is_created() {
        let options = HelperOptions {
            store_version_in_db: false,
            ..Default::default()
        };
        let mut db = DbHelper::new(Dialect::Sqlite, Connection::open_in_memory().unwrap(), options)
            .unwrap();
        let tables = db
            .query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='DBVersion'",
                &[],
            )
            .unwrap();
        assert_eq!(tables, Some(Param::Int(0)));
    }

    #[test]
    fn create_and_insert_with_generated_key() {
        let mut db = open();
        db.create_table::<Note>(&CreateTableOptions::default())
            .unwrap();
        let mut first = Note {
            body: "one".to_string(),
            ..Default::default()
        };
        let mut second = Note {
            body: "two".to_string(),
            ..Default::default()
        };
        let options = InsertOptions::default().set_generated_key();
        db.insert_mut(&mut first, &options).unwrap();
        db.insert_mut(&mut second, &options).unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let body = db
            .query_scalar("SELECT body FROM Note WHERE id = ?", &[Param::Int(2)])
            .unwrap();
        assert_eq!(body, Some(Param::Text("two".to_string())));
    }

    #[test]
    fn generated_key_through_shared_reference_fails_before_sql() {
        let mut db = open();
        let note = Note::default();
        // the table doesn't exist, so any executed SQL would fail with a driver error
        let err = db
            .insert(&note, &InsertOptions::default().set_generated_key())
            .unwrap_err();
        assert_eq!(err, Error::CannotAddress);
    }

    #[test]
    fn insert_without_writeback_accepts_shared_reference() {
        let mut db = open();
        db.create_table::<Note>(&CreateTableOptions::default())
            .unwrap();
        let result = db
            .insert(
                &Note {
                    body: "x".to_string(),
                    ..Default::default()
                },
                &InsertOptions::default(),
            )
            .unwrap();
        assert_eq!(result.rows_affected, 1);
    }

    #[test]
    fn error_hook_observes_and_suppresses() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut db = open().on_error(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            ErrHookOptions::suppress(),
        );
        assert_eq!(db.exec("NOT SQL", &[]), Ok(ExecResult::default()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // per call options win over the handle's options
        let keep = CreateTableOptions {
            error_hook: Some(ErrHookOptions::default()),
            ..Default::default()
        };
        db.create_table::<Note>(&keep).unwrap();
        assert!(db.create_table::<Note>(&keep).is_err());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn exec_fmt_fills_template() {
        let mut db = open();
        db.exec_fmt(
            "CREATE TABLE %s (v TEXT)",
            &["kv".to_string()],
            &[],
        )
        .unwrap();
        db.exec("INSERT INTO kv (v) VALUES (?)", &[Param::from("a")])
            .unwrap();
        assert_eq!(
            db.query_scalar("SELECT COUNT(*) FROM kv", &[]).unwrap(),
            Some(Param::Int(1))
        );
    }

    fn seeded() -> DbHelper<Connection> {
        let mut db = open();
        db.create_table::<Note>(&CreateTableOptions::default())
            .unwrap();
        for body in ["one", "two", "three"] {
            db.insert(
                &Note {
                    body: body.to_string(),
                    ..Default::default()
                },
                &InsertOptions::default(),
            )
            .unwrap();
        }
        db
    }

    #[test]
    fn query_rows_reads_records() {
        let mut db = seeded();
        let notes: Vec<Note> = db
            .query_rows("SELECT id, body FROM Note WHERE id > ? ORDER BY id", &[Param::Int(1)])
            .unwrap();
        let read: Vec<(u32, &str)> = notes.iter().map(|n| (n.id, n.body.as_str())).collect();
        assert_eq!(read, vec![(2, "two"), (3, "three")]);
        assert!(notes.iter().all(|n| !n.draft));
    }

    #[test]
    fn query_row_takes_the_first_row() {
        let mut db = seeded();
        let note: Option<Note> = db
            .query_row("SELECT ID, Body FROM Note ORDER BY id DESC", &[])
            .unwrap();
        assert_eq!(note.map(|n| n.body), Some("three".to_string()));

        let missing: Option<Note> = db
            .query_row("SELECT id, body FROM Note WHERE id = 99", &[])
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn query_row_fmt_fills_template() {
        let mut db = seeded();
        let note: Option<Note> = db
            .query_row_fmt(
                "SELECT id, body FROM %s WHERE body = ?",
                &["Note".to_string()],
                &[Param::from("two")],
            )
            .unwrap();
        assert_eq!(note.map(|n| n.id), Some(2));

        let notes: Vec<Note> = db
            .query_rows_fmt("SELECT %s FROM Note", &["body".to_string()], &[])
            .unwrap();
        assert_eq!(notes.len(), 3);
        assert!(db
            .query_rows_fmt::<Note>("SELECT %s FROM %s", &["body".to_string()], &[])
            .is_err());
    }

    #[test]
    fn query_rows_without_destination_fails() {
        let mut db = seeded();
        assert_eq!(
            db.query_rows::<Note>("SELECT id, body, 1 AS extra FROM Note", &[])
                .unwrap_err(),
            Error::MissingDestination("extra".to_string())
        );
    }

    #[test]
    fn query_rows_errors_reach_the_hook() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut db = seeded().on_error(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            ErrHookOptions::suppress(),
        );
        assert!(db.query_rows::<Note>("SELECT * FROM missing", &[]).unwrap().is_empty());
        assert!(db.query_row::<Note>("SELECT draft FROM Note", &[]).unwrap().is_none());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: HelperOptions = serde_json::from_str(r#"{"stop_on_error": true}"#).unwrap();
        assert!(options.stop_on_error);
        assert!(options.store_version_in_db);
        assert_eq!(options.version_table, "DBVersion");
    }
}
