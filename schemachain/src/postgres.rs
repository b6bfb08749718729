//! PostgreSQL support through the synchronous [`postgres`](https://crates.io/crates/postgres) client.
//!
//! Statement placeholders are `$1`, `$2`, … PostgreSQL does not report a last insert id, so
//! [`DbHelper::insert_mut`](crate::DbHelper::insert_mut) with a generated key fails with
//! [`Error::NoLastInsertId`] unless the error hook suppresses it.

use crate::dialect::Dialect;
use crate::dsn::{build_dsn, DsnParams};
use crate::error::Error;
use crate::executor::{ExecResult, Executor, Param, Row};
use crate::helper::{DbHelper, HelperOptions};
use crate::record::parse_timestamp;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres::types::{IsNull, ToSql, Type};
use postgres::{Client, NoTls};

// Re-export postgres types for callers building their own clients
pub use postgres::Client as PostgresClient;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// A [Param] bound to whatever type the server inferred for its placeholder.
///
/// Migration parameters are stored as text, while the client checks Rust types against the
/// inferred column types. Numbers, booleans and timestamps are converted to the inferred
/// type; every other type receives the text itself.
#[derive(Debug)]
struct Bound<'a>(&'a Param);

impl ToSql for Bound<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let param = self.0;
        if *param == Param::Null {
            return Ok(IsNull::Yes);
        }
        let mismatch = || format!("cannot bind {:?} as {}", param, ty);
        if *ty == Type::INT2 {
            i16::try_from(param.as_i64().ok_or_else(mismatch)?)?.to_sql(ty, out)
        } else if *ty == Type::INT4 {
            i32::try_from(param.as_i64().ok_or_else(mismatch)?)?.to_sql(ty, out)
        } else if *ty == Type::INT8 {
            param.as_i64().ok_or_else(mismatch)?.to_sql(ty, out)
        } else if *ty == Type::FLOAT4 {
            (param.as_f64().ok_or_else(mismatch)? as f32).to_sql(ty, out)
        } else if *ty == Type::FLOAT8 {
            param.as_f64().ok_or_else(mismatch)?.to_sql(ty, out)
        } else if *ty == Type::BOOL {
            let value = match param {
                Param::Int(v) => *v != 0,
                Param::Text(v) => match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "t" | "true" => true,
                    "0" | "f" | "false" => false,
                    _ => return Err(mismatch().into()),
                },
                _ => return Err(mismatch().into()),
            };
            value.to_sql(ty, out)
        } else if *ty == Type::TIMESTAMPTZ {
            parse_timestamp(param).ok_or_else(mismatch)?.to_sql(ty, out)
        } else if *ty == Type::TIMESTAMP {
            parse_timestamp(param)
                .ok_or_else(mismatch)?
                .naive_utc()
                .to_sql(ty, out)
        } else {
            let text = match param {
                Param::Int(v) => v.to_string(),
                Param::Float(v) => v.to_string(),
                Param::Text(v) => v.clone(),
                Param::Null => return Ok(IsNull::Yes),
            };
            out.extend_from_slice(text.as_bytes());
            Ok(IsNull::No)
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    fn to_sql_checked(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        self.to_sql(ty, out)
    }
}

fn bind(params: &[Param]) -> Vec<Bound<'_>> {
    params.iter().map(Bound).collect()
}

fn column_value(row: &postgres::Row, index: usize) -> Result<Param, Error> {
    let ty = row.columns()[index].type_().clone();
    let value = if ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)?.map(Param::Int)
    } else if ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)?
            .map(|v| Param::Int(i64::from(v)))
    } else if ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)?
            .map(|v| Param::Int(i64::from(v)))
    } else if ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)?.map(Param::Float)
    } else if ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)?
            .map(|v| Param::Float(f64::from(v)))
    } else if ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index)?
            .map(|v| Param::Int(i64::from(v)))
    } else if ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(index)?
            .map(|v| Param::Text(v.to_rfc3339()))
    } else if ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(index)?
            .map(|v| Param::Text(v.and_utc().to_rfc3339()))
    } else {
        row.try_get::<_, Option<String>>(index)?.map(Param::Text)
    };
    Ok(value.unwrap_or(Param::Null))
}

fn to_row(row: &postgres::Row) -> Result<Row, Error> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        out.push(column.name(), column_value(row, index)?);
    }
    Ok(out)
}

impl Executor for Client {
    fn exec(&mut self, sql: &str, params: &[Param]) -> Result<ExecResult, Error> {
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b as &(dyn ToSql + Sync)).collect();
        let rows = self.execute(sql, &refs)?;
        Ok(ExecResult {
            rows_affected: rows,
            last_insert_id: None,
        })
    }

    fn query_scalar(&mut self, sql: &str, params: &[Param]) -> Result<Option<Param>, Error> {
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b as &(dyn ToSql + Sync)).collect();
        let rows = self.query(sql, &refs)?;
        match rows.first() {
            // a row without columns, e.g. `SELECT FROM t`, has no scalar
            Some(row) if row.is_empty() => Ok(Some(Param::Null)),
            Some(row) => Ok(Some(column_value(row, 0)?)),
            None => Ok(None),
        }
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, Error> {
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b as &(dyn ToSql + Sync)).collect();
        self.query(sql, &refs)?.iter().map(to_row).collect()
    }
}

impl DbHelper<Client> {
    /// Connect to a PostgreSQL server. Connection parameters are validated before any network
    /// I/O.
    pub fn open_postgres(params: &DsnParams, options: HelperOptions) -> Result<Self, Error> {
        let dsn = build_dsn(Dialect::Postgres, params)?;
        #[cfg(feature = "tracing")]
        tracing::info!(host = %params.host, port = params.port, "Connecting to postgres");
        Self::new(Dialect::Postgres, Client::connect(&dsn, NoTls)?, options)
    }
}
