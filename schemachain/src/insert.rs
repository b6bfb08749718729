//! `INSERT` statements serialized from record instances.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::hook::ErrHookOptions;
use crate::record::{Record, RecordShape, Value};
use crate::typemap::FieldType;

/// Options for [build_insert] and [DbHelper::insert](crate::DbHelper::insert).
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Table name. Defaults to the record's type name.
    pub table_name: Option<String>,
    /// Columns never included in the statement.
    pub ignore_columns: Vec<String>,
    /// Substitute a type default for unset values instead of leaving the column out.
    pub fill_unset: bool,
    /// Write the generated key back into the record after the insert.
    pub set_generated_key: bool,
    /// Overrides the handle's error hook options for this call.
    pub error_hook: Option<ErrHookOptions>,
}

impl InsertOptions {
    pub fn named(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            ..Default::default()
        }
    }

    pub fn ignore_column(mut self, column: impl Into<String>) -> Self {
        self.ignore_columns.push(column.into());
        self
    }

    pub fn fill_unset(mut self) -> Self {
        self.fill_unset = true;
        self
    }

    pub fn set_generated_key(mut self) -> Self {
        self.set_generated_key = true;
        self
    }
}

/// A serialized insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    /// Index of the field receiving the generated key, when the record has exactly one
    /// primary key autoincrement field.
    pub generated_key: Option<usize>,
}

/// Serialize `record` into an `INSERT` statement.
///
/// String values are wrapped in single quotes without escaping; callers must not pass
/// untrusted text through this path.
pub fn build_insert<R: Record>(
    record: &R,
    dialect: Dialect,
    options: &InsertOptions,
) -> Result<InsertStatement, Error> {
    insert_sql(&R::shape(), record.values(), dialect, options)
}

/// Serialize a shape and its aligned values into an `INSERT` statement.
pub fn insert_sql(
    shape: &RecordShape,
    values: Vec<Value>,
    dialect: Dialect,
    options: &InsertOptions,
) -> Result<InsertStatement, Error> {
    shape.require_fields()?;
    if values.len() != shape.fields.len() {
        return Err(Error::Generic(format!(
            "{} describes {} fields but produced {} values",
            shape.type_name,
            shape.fields.len(),
            values.len()
        )));
    }
    let table = options
        .table_name
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(shape.type_name);

    let mut columns = Vec::new();
    let mut literals = Vec::new();

    for (field, value) in shape.fields.iter().zip(values) {
        // every value must serialize, skipped or not
        let mut literal = serialize_value(&value, dialect)?;
        let annotations = &field.annotations;
        if annotations.is_ignored() || annotations.is_generated_on_insert() {
            continue;
        }
        let column = field.column_name();
        if options.ignore_columns.iter().any(|c| c == column) {
            continue;
        }

        if literal.is_empty() {
            if !options.fill_unset {
                continue;
            }
            literal = default_literal(field.field_type, dialect);
        }
        if matches!(value, Value::Text(_)) {
            literal = format!("'{}'", literal);
        }

        columns.push(dialect.quote(column));
        literals.push(literal);
    }

    let table = dialect.quote(table);
    let sql = if columns.is_empty() {
        dialect.insert_defaults(&table)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            literals.join(", ")
        )
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(sql = %sql, "Built insert statement");

    Ok(InsertStatement {
        sql,
        generated_key: shape.generated_key_index(),
    })
}

/// The SQL literal of a value, before string quoting. Empty means unset.
fn serialize_value(value: &Value, dialect: Dialect) -> Result<String, Error> {
    let literal = match value {
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::F32(v) => format!("{:.5}", v),
        Value::F64(v) => format!("{:.5}", v),
        Value::Text(v) => v.clone(),
        Value::Bool(v) => v.to_string(),
        Value::Timestamp(None) => String::new(),
        Value::Timestamp(Some(t)) => dialect.from_unix_timestamp(t.timestamp()),
        Value::Unsupported(name) => return Err(Error::UnsupportedFieldType(name.to_string())),
    };
    Ok(literal)
}

fn default_literal(field_type: FieldType, dialect: Dialect) -> String {
    match field_type {
        FieldType::F32 | FieldType::F64 => "0.0".to_string(),
        FieldType::Text => String::new(),
        FieldType::Timestamp => dialect.from_unix_timestamp(0),
        _ => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldDef;
    use crate::{record, SqlField};
    use chrono::{TimeZone, Utc};

    record! {
        #[derive(Debug, Default, Clone)]
        struct Person {
            #[orm = "pk,ai"]
            id: i64,
            name: String,
            #[db = "nick"]
            nickname: String,
            height: f32,
            weight: f64,
            active: bool,
            #[orm = "-"]
            scratch: String,
            visits: u16,
            seen: Option<chrono::DateTime<Utc>>,
        }
    }

    fn person() -> Person {
        Person {
            id: 3,
            name: "ann".to_string(),
            height: 1.5,
            weight: 62.25,
            active: true,
            scratch: "never".to_string(),
            visits: 4,
            ..Default::default()
        }
    }

    #[test]
    fn sparse_insert_omits_unset_fields() {
        let stmt = build_insert(&person(), Dialect::Mysql, &InsertOptions::default()).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `Person` (`name`, `height`, `weight`, `active`, `visits`) \
             VALUES ('ann', 1.50000, 62.25000, true, 4)"
        );
        assert_eq!(stmt.generated_key, Some(0));
    }

    #[test]
    fn fill_unset_substitutes_defaults() {
        let stmt = build_insert(
            &person(),
            Dialect::Mysql,
            &InsertOptions::default().fill_unset(),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `Person` (`name`, `nick`, `height`, `weight`, `active`, `visits`, `seen`) \
             VALUES ('ann', '', 1.50000, 62.25000, true, 4, FROM_UNIXTIME(0))"
        );
    }

    #[test]
    fn timestamps_use_dialect_function() {
        let mut p = person();
        p.seen = Some(Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        let mysql = build_insert(&p, Dialect::Mysql, &InsertOptions::default()).unwrap();
        assert!(mysql.sql.contains("FROM_UNIXTIME(1600000000)"));
        let sqlite = build_insert(&p, Dialect::Sqlite, &InsertOptions::default()).unwrap();
        assert!(sqlite.sql.contains("datetime(1600000000, 'unixepoch')"));
    }

    #[test]
    fn ignore_list_and_explicit_table() {
        let options = InsertOptions::named("people")
            .ignore_column("weight")
            .ignore_column("visits");
        let stmt = build_insert(&person(), Dialect::Postgres, &options).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"people\" (\"name\", \"height\", \"active\") VALUES ('ann', 1.50000, true)"
        );
    }

    #[test]
    fn strings_are_not_escaped() {
        let mut p = person();
        p.name = "o'neil".to_string();
        let stmt = build_insert(&p, Dialect::Mysql, &InsertOptions::default()).unwrap();
        assert!(stmt.sql.contains("'o'neil'"));
    }

    record! {
        struct Counter {
            #[orm = "ai,iai"]
            id: i32,
            #[orm = "pk"]
            key: String,
        }
    }

    #[test]
    fn insert_override_keeps_autoincrement_value() {
        let counter = Counter {
            id: 12,
            key: "k".to_string(),
        };
        let stmt = build_insert(&counter, Dialect::Mysql, &InsertOptions::default()).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO `Counter` (`id`, `key`) VALUES (12, 'k')");
        assert_eq!(stmt.generated_key, None);
    }

    record! {
        struct OnlyKey {
            #[orm = "pk,ai"]
            id: i32,
        }
    }

    #[test]
    fn all_columns_generated() {
        let stmt = build_insert(&OnlyKey { id: 0 }, Dialect::Sqlite, &InsertOptions::default())
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO `OnlyKey` DEFAULT VALUES");
        let stmt = build_insert(&OnlyKey { id: 0 }, Dialect::Mysql, &InsertOptions::default())
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO `OnlyKey` () VALUES ()");
    }

    struct Blob;

    impl Record for Blob {
        fn shape() -> RecordShape {
            RecordShape::new("Blob")
                .field(FieldDef::new("id", FieldType::I32))
                .field(FieldDef::new("data", FieldType::Other("Vec<u8>")))
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Int(1), Value::Unsupported("Vec<u8>")]
        }

        fn fields_mut(&mut self) -> Vec<&mut dyn SqlField> {
            Vec::new()
        }
    }

    #[test]
    fn unsupported_values_fail_the_call() {
        assert_eq!(
            build_insert(&Blob, Dialect::Mysql, &InsertOptions::default()),
            Err(Error::UnsupportedFieldType("Vec<u8>".to_string()))
        );
    }

    struct Draft;

    impl Record for Draft {
        fn shape() -> RecordShape {
            RecordShape::new("Draft")
                .field(FieldDef::new("id", FieldType::I32))
                .field(FieldDef::new("scratch", FieldType::Other("Vec<u8>")).orm("-"))
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Int(1), Value::Unsupported("Vec<u8>")]
        }

        fn fields_mut(&mut self) -> Vec<&mut dyn SqlField> {
            Vec::new()
        }
    }

    #[test]
    fn ignored_unsupported_values_still_fail() {
        assert_eq!(
            build_insert(&Draft, Dialect::Sqlite, &InsertOptions::default()),
            Err(Error::UnsupportedFieldType("Vec<u8>".to_string()))
        );
    }
}
