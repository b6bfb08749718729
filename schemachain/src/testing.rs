//! Testing utilities for code built on schemachain.
//!
//! [RecordingExecutor] stands in for a database connection: it records every statement it is
//! given, fails on scripted patterns and answers scalar queries with scripted values. This makes
//! migration chains testable for the server dialects without a running server.
//!
//! ```
//! use schemachain::testing::RecordingExecutor;
//! use schemachain::{DbHelper, Dialect, HelperOptions, MigrationGroup};
//!
//! let mut db = DbHelper::new(Dialect::Postgres, RecordingExecutor::new(), HelperOptions::default())?;
//! db.add_group(
//!     MigrationGroup::new("users", 0)
//!         .add(1.0, "CREATE TABLE users (id SERIAL)")
//!         .add(2.0, "ALTER TABLE users ADD name TEXT"),
//! );
//! let report = db.run_update(false, false)?;
//! assert_eq!(report.new_version, 2.0);
//! assert!(db.connection().executed("ALTER TABLE users ADD name TEXT"));
//! # Ok::<(), schemachain::Error>(())
//! ```

use crate::error::Error;
use crate::executor::{ExecResult, Executor, Param, Row};

/// A statement seen by a [RecordingExecutor].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<Param>,
}

/// An in-memory [Executor] recording what it's asked to run.
///
/// Scalar queries against the version table are answered from an internal version cell, so a
/// [DbHelper](crate::DbHelper) built on it behaves like one on a fresh database.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: Vec<RecordedStatement>,
    fail_on: Vec<String>,
    scalar: Option<Param>,
    rows: Vec<Row>,
    last_insert_id: Option<i64>,
    version_rows: Vec<f64>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `pattern`.
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on.push(pattern.into());
        self
    }

    /// Value returned by scalar queries that don't target the version table.
    pub fn with_scalar(mut self, value: Param) -> Self {
        self.scalar = Some(value);
        self
    }

    /// Rows returned by every row query.
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Id reported by every successful statement.
    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    /// Pretend the version table already holds `version`.
    pub fn with_stored_version(mut self, version: f32) -> Self {
        self.version_rows = vec![f64::from(version)];
        self
    }

    /// All executed statements, in order.
    pub fn statements(&self) -> &[RecordedStatement] {
        &self.statements
    }

    /// Executed SQL, in order, skipping version table bookkeeping.
    pub fn sql(&self) -> Vec<&str> {
        self.statements
            .iter()
            .map(|s| s.sql.as_str())
            .filter(|sql| !is_version_statement(sql))
            .collect()
    }

    pub fn executed(&self, sql: &str) -> bool {
        self.statements.iter().any(|s| s.sql == sql)
    }

    /// The version currently held by the simulated version table.
    pub fn stored_version(&self) -> Option<f64> {
        self.version_rows.first().copied()
    }
}

fn is_version_statement(sql: &str) -> bool {
    sql.contains("(version FLOAT)")
        || sql.contains("(version) VALUES")
        || sql.starts_with("DELETE FROM")
        || sql.starts_with("SELECT")
}

impl Executor for RecordingExecutor {
    fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error> {
        self.statements.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        if let Some(pattern) = self.fail_on.iter().find(|p| sql.contains(p.as_str())) {
            return Err(Error::Generic(format!("scripted failure on '{}'", pattern)));
        }
        if sql.starts_with("DELETE FROM") {
            self.version_rows.clear();
        } else if sql.contains("(version) VALUES") {
            let version = params.first().and_then(Param::as_f64).unwrap_or_default();
            self.version_rows.push(version);
        }
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: self.last_insert_id,
        })
    }

    fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error> {
        self.statements.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        if sql.starts_with("SELECT COUNT(*)") {
            return Ok(Some(Param::Int(self.version_rows.len() as i64)));
        }
        if sql.starts_with("SELECT version") {
            return Ok(self.version_rows.first().map(|v| Param::Float(*v)));
        }
        Ok(self.scalar.clone())
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, Error> {
        self.statements.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        if let Some(pattern) = self.fail_on.iter().find(|p| sql.contains(p.as_str())) {
            return Err(Error::Generic(format!("scripted failure on '{}'", pattern)));
        }
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_fails_on_pattern() {
        let mut exec = RecordingExecutor::new().fail_on("DROP");
        exec.exec("CREATE TABLE a (id INT)", &[]).unwrap();
        assert!(exec.exec("DROP TABLE a", &[]).is_err());
        assert_eq!(exec.sql(), vec!["CREATE TABLE a (id INT)", "DROP TABLE a"]);
    }

    #[test]
    fn simulates_version_table() {
        let mut exec = RecordingExecutor::new().with_stored_version(1.5);
        assert_eq!(
            exec.query_scalar("SELECT COUNT(*) FROM \"DBVersion\"", &[]).unwrap(),
            Some(Param::Int(1))
        );
        exec.exec("DELETE FROM \"DBVersion\"", &[]).unwrap();
        exec.exec(
            "INSERT INTO \"DBVersion\" (version) VALUES ($1)",
            &[Param::Float(3.0)],
        )
        .unwrap();
        assert_eq!(exec.stored_version(), Some(3.0));
        assert!(exec.sql().is_empty());
    }

    #[test]
    fn scripted_rows() {
        let row = Row::new().with("id", Param::Int(1));
        let mut exec = RecordingExecutor::new()
            .with_rows(vec![row.clone()])
            .fail_on("broken");
        assert_eq!(exec.query_rows("SELECT id FROM t", &[]).unwrap(), vec![row]);
        assert!(exec.query_rows("SELECT broken", &[]).is_err());
    }

    #[test]
    fn scripted_scalar_and_insert_id() {
        let mut exec = RecordingExecutor::new()
            .with_scalar(Param::Text("x".to_string()))
            .with_last_insert_id(9);
        assert_eq!(
            exec.query_scalar("PRAGMA user_version", &[]).unwrap(),
            Some(Param::Text("x".to_string()))
        );
        assert_eq!(exec.exec("INSERT INTO t DEFAULT VALUES", &[]).unwrap().last_insert_id(), Ok(9));
    }
}
