//! The connection seam: everything schemachain needs from a database driver.

use crate::error::Error;

/// A positional statement parameter, or a scalar read back from a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Param {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Param::Int(v) => Some(*v),
            Param::Float(v) => Some(*v as i64),
            Param::Text(v) => v.trim().parse().ok(),
            Param::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Param::Int(v) => Some(*v as f64),
            Param::Float(v) => Some(*v),
            Param::Text(v) => v.trim().parse().ok(),
            Param::Null => None,
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<f32> for Param {
    fn from(value: f32) -> Self {
        Param::Float(f64::from(value))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Float(value)
    }
}

/// The outcome of [Executor::exec].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// The id generated by the statement, for drivers that report one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn last_insert_id(&self) -> Result<i64, Error> {
        self.last_insert_id.ok_or(Error::NoLastInsertId)
    }
}

/// One result row: column names and their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Param>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: Param) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: Param) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// The value of `column`, compared case-insensitively.
    pub fn get(&self, column: &str) -> Option<&Param> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A connection statements can be executed on.
///
/// Implemented for `rusqlite::Connection` (feature `sqlite`), `mysql::Conn` (feature `mysql`)
/// and `postgres::Client` (feature `postgres`). Placeholders in `sql` use the driver's own
/// syntax.
pub trait Executor {
    fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error>;

    /// Run a query and return the first column of the first row, `None` without rows.
    fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error>;

    /// Run a query and return every row.
    fn query_rows(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, Error>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error> {
        (**self).exec(sql, params)
    }

    fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error> {
        (**self).query_scalar(sql, params)
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, Error> {
        (**self).query_rows(sql, params)
    }
}

/// Turn string parameters, as stored in migration statements, into [Param]s.
pub fn text_params(params: &[String]) -> Vec<Param> {
    params.iter().map(|p| Param::Text(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversions() {
        assert_eq!(Param::Int(3).as_f64(), Some(3.0));
        assert_eq!(Param::Float(2.5).as_i64(), Some(2));
        assert_eq!(Param::Text(" 4 ".to_string()).as_i64(), Some(4));
        assert_eq!(Param::Null.as_f64(), None);
    }

    #[test]
    fn missing_insert_id() {
        assert_eq!(
            ExecResult::default().last_insert_id(),
            Err(Error::NoLastInsertId)
        );
        let result = ExecResult {
            rows_affected: 1,
            last_insert_id: Some(9),
        };
        assert_eq!(result.last_insert_id(), Ok(9));
    }

    #[test]
    fn row_lookup_ignores_case() {
        let row = Row::new()
            .with("ID", Param::Int(1))
            .with("name", Param::from("ann"));
        assert_eq!(row.get("id"), Some(&Param::Int(1)));
        assert_eq!(row.get("NAME"), Some(&Param::Text("ann".to_string())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.iter().map(|(c, _)| c).collect::<Vec<_>>(), vec!["ID", "name"]);
    }
}
