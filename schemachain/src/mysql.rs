//! MySQL support through the [`mysql`](https://crates.io/crates/mysql) crate.
//!
//! DDL statements cause an implicit commit in MySQL. Migration statements that ran before a
//! failing one stay applied; schemachain never rolls them back.

use crate::dialect::Dialect;
use crate::dsn::{build_dsn, DsnParams};
use crate::error::Error;
use crate::executor::{ExecResult, Executor, Param, Row};
use crate::helper::{DbHelper, HelperOptions};
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, Params, Value};

// Re-export mysql types for use by callers
pub use mysql::Conn as MysqlConn;

fn to_params(params: &[Param]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(
        params
            .iter()
            .map(|p| match p {
                Param::Null => Value::NULL,
                Param::Int(v) => Value::Int(*v),
                Param::Float(v) => Value::Double(*v),
                Param::Text(v) => Value::Bytes(v.clone().into_bytes()),
            })
            .collect(),
    )
}

fn from_value(value: Value) -> Param {
    match value {
        Value::NULL => Param::Null,
        Value::Int(v) => Param::Int(v),
        Value::UInt(v) => Param::Int(v as i64),
        Value::Float(v) => Param::Float(f64::from(v)),
        Value::Double(v) => Param::Float(v),
        Value::Bytes(v) => Param::Text(String::from_utf8_lossy(&v).into_owned()),
        Value::Date(year, month, day, hour, minute, second, micros) => Param::Text(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            year, month, day, hour, minute, second, micros
        )),
        other => Param::Text(other.as_sql(true)),
    }
}

impl Executor for Conn {
    fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error> {
        if params.is_empty() {
            self.query_drop(sql)?;
        } else {
            self.exec_drop(sql, to_params(params))?;
        }
        Ok(ExecResult {
            rows_affected: self.affected_rows(),
            last_insert_id: Some(self.last_insert_id() as i64),
        })
    }

    fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error> {
        let value: Option<Value> = if params.is_empty() {
            self.query_first(sql)?
        } else {
            self.exec_first(sql, to_params(params))?
        };
        Ok(value.map(from_value))
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, Error> {
        let rows: Vec<mysql::Row> = if params.is_empty() {
            Queryable::query(self, sql)?
        } else {
            Queryable::exec(self, sql, to_params(params))?
        };
        Ok(rows.iter().map(to_row).collect())
    }
}

fn to_row(row: &mysql::Row) -> Row {
    let mut out = Row::new();
    for (index, column) in row.columns_ref().iter().enumerate() {
        let value = row.as_ref(index).cloned().unwrap_or(Value::NULL);
        out.push(column.name_str().into_owned(), from_value(value));
    }
    out
}

impl DbHelper<Conn> {
    /// Connect to a MySQL server. Connection parameters are validated before any network I/O.
    pub fn open_mysql(params: &DsnParams, options: HelperOptions) -> Result<Self, Error> {
        let url = build_dsn(Dialect::Mysql, params)?;
        #[cfg(feature = "tracing")]
        tracing::info!(host = %params.host, port = params.port, "Connecting to mysql");
        let opts = Opts::from_url(&url).map_err(|e| Error::Mysql(e.to_string()))?;
        Self::new(Dialect::Mysql, Conn::new(opts)?, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_are_empty() {
        assert_eq!(to_params(&[]), Params::Empty);
    }

    #[test]
    fn params_are_positional() {
        let params = to_params(&[Param::Int(1), Param::from("a"), Param::Null]);
        assert_eq!(
            params,
            Params::Positional(vec![
                Value::Int(1),
                Value::Bytes(b"a".to_vec()),
                Value::NULL
            ])
        );
    }

    #[test]
    fn values_convert_back() {
        assert_eq!(from_value(Value::UInt(3)), Param::Int(3));
        assert_eq!(from_value(Value::Double(0.5)), Param::Float(0.5));
        assert_eq!(from_value(Value::NULL), Param::Null);
        assert_eq!(
            from_value(Value::Date(2020, 9, 13, 12, 26, 40, 0)),
            Param::from("2020-09-13 12:26:40.000000")
        );
    }

    #[test]
    fn open_validates_before_connecting() {
        let params = DsnParams::server("", "secret", "localhost", 3306, "app");
        let err = DbHelper::open_mysql(&params, HelperOptions::default()).unwrap_err();
        assert_eq!(err, Error::ArgumentMissing("username"));
    }
}
