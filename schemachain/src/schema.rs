//! `CREATE TABLE` statements derived from record shapes.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::hook::ErrHookOptions;
use crate::record::{FieldDef, Record, RecordShape};
use crate::typemap::{integer_affinity, map_type, serial_type};

/// Options for [build_create_table] and [DbHelper::create_table](crate::DbHelper::create_table).
#[derive(Debug, Clone, Default)]
pub struct CreateTableOptions {
    /// Table name. Defaults to the record's type name.
    pub table_name: Option<String>,
    /// Emit `CREATE TABLE IF NOT EXISTS`.
    pub if_not_exists: bool,
    /// Overrides the handle's error hook options for this call.
    pub error_hook: Option<ErrHookOptions>,
}

impl CreateTableOptions {
    pub fn named(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            ..Default::default()
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

/// Build the `CREATE TABLE` statement for `R`.
pub fn build_create_table<R: Record>(
    dialect: Dialect,
    options: &CreateTableOptions,
) -> Result<String, Error> {
    create_table_sql(&R::shape(), dialect, options)
}

/// Build a `CREATE TABLE` statement from a shape. Nothing is returned unless every field
/// could be mapped.
pub fn create_table_sql(
    shape: &RecordShape,
    dialect: Dialect,
    options: &CreateTableOptions,
) -> Result<String, Error> {
    shape.require_fields()?;
    let table = options
        .table_name
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(shape.type_name);

    // last one wins
    let primary_key = shape
        .fields
        .iter()
        .rposition(|f| !f.annotations.is_ignored() && f.annotations.primary_key);
    // sqlite only accepts AUTOINCREMENT on an inline INTEGER PRIMARY KEY
    let inline_primary_key = dialect.is_sqlite()
        && primary_key
            .map(|i| &shape.fields[i])
            .is_some_and(|f| f.annotations.auto_increment && f.field_type.is_integer());

    let mut columns = Vec::with_capacity(shape.fields.len());
    for (index, field) in shape.fields.iter().enumerate() {
        let mut column_type = column_type(field, dialect)?;
        let annotations = &field.annotations;
        if annotations.is_ignored() {
            continue;
        }
        let column = field.column_name();

        if annotations.auto_increment {
            match dialect.auto_increment() {
                Some(qualifier) if dialect.is_sqlite() => {
                    if inline_primary_key && primary_key == Some(index) {
                        column_type = format!("{} PRIMARY KEY {}", column_type, qualifier);
                    } else {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            column = column,
                            "Dropping AUTOINCREMENT, sqlite allows it on the integer primary key only"
                        );
                    }
                }
                Some(qualifier) => column_type = format!("{} {}", column_type, qualifier),
                None => {
                    if let Some(serial) = serial_type(field.field_type) {
                        column_type = serial.to_string();
                    }
                }
            }
        }
        if annotations.not_null {
            column_type.push_str(" NOT NULL");
        }
        if let Some(default) = field.default {
            column_type.push_str(&format!(" DEFAULT '{}'", default));
        }

        columns.push(format!("{} {}", dialect.quote(column), column_type));
    }

    if columns.is_empty() {
        return Err(Error::NoColumns(table.to_string()));
    }

    if let (Some(index), false) = (primary_key, inline_primary_key) {
        let pk = shape.fields[index].column_name();
        columns.push(format!("PRIMARY KEY ({})", dialect.quote(pk)));
    }

    let sql = format!(
        "CREATE TABLE {}{} ({})",
        if options.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        },
        dialect.quote(table),
        columns.join(", ")
    );

    #[cfg(feature = "tracing")]
    tracing::debug!(table = table, sql = %sql, "Built create table statement");

    Ok(sql)
}

fn column_type(field: &FieldDef, dialect: Dialect) -> Result<String, Error> {
    if let Some(mapped) = map_type(field.field_type, dialect) {
        return Ok(mapped);
    }
    match integer_affinity(field.field_type, dialect) {
        Some(affinity) => Ok(affinity.to_string()),
        None => Err(Error::UnsupportedFieldType(format!(
            "{} (field {})",
            field.field_type.name(),
            field.name
        ))),
    }
}
