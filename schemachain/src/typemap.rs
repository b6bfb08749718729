//! Mapping of semantic field types to dialect column types.

use crate::dialect::Dialect;

/// The semantic type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Bool,
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    /// A date/time value, stored as a timestamp column.
    Timestamp,
    /// Any type without a column mapping. Carries the type's name for error messages.
    Other(&'static str),
}

impl FieldType {
    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64
        )
    }

    /// A readable name, used when reporting unsupported types.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Bool => "bool",
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::I8 => "i8",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::U8 => "u8",
            FieldType::U16 => "u16",
            FieldType::U32 => "u32",
            FieldType::U64 => "u64",
            FieldType::Timestamp => "timestamp",
            FieldType::Other(name) => name,
        }
    }
}

/// Map a field type to the column type of `dialect`.
///
/// Returns `None` when the pairing has no mapping. That includes every integer type on the
/// SQLite dialects: SQLite has no native integer widths and callers are expected to leave
/// the width hint out entirely (see [integer_affinity]).
pub fn map_type(field_type: FieldType, dialect: Dialect) -> Option<String> {
    match field_type {
        FieldType::Text => Some("TEXT".to_string()),
        FieldType::Bool => Some(
            match dialect {
                Dialect::Sqlite | Dialect::SqliteEncrypted => "INT",
                Dialect::Mysql => "TINYINT(1)",
                Dialect::Postgres => "boolean",
            }
            .to_string(),
        ),
        FieldType::F32 => Some(
            match dialect {
                Dialect::Sqlite | Dialect::SqliteEncrypted | Dialect::Mysql => "FLOAT",
                Dialect::Postgres => "REAL",
            }
            .to_string(),
        ),
        FieldType::F64 => Some(
            match dialect {
                Dialect::Sqlite | Dialect::SqliteEncrypted | Dialect::Mysql => "DOUBLE",
                Dialect::Postgres => "numeric",
            }
            .to_string(),
        ),
        FieldType::Timestamp => Some(
            match dialect {
                Dialect::Postgres => "timestamp",
                Dialect::Sqlite | Dialect::SqliteEncrypted | Dialect::Mysql => "TIMESTAMP",
            }
            .to_string(),
        ),
        t if t.is_integer() => {
            if dialect.is_sqlite() {
                return None;
            }
            let width = integer_width(t, dialect)?;
            if t.is_unsigned() && dialect.supports_unsigned() {
                Some(format!("{} UNSIGNED", width))
            } else {
                Some(width.to_string())
            }
        }
        _ => None,
    }
}

/// The width-less integer type used where [map_type] declines integer widths.
pub fn integer_affinity(field_type: FieldType, dialect: Dialect) -> Option<&'static str> {
    (field_type.is_integer() && dialect.is_sqlite()).then_some("INTEGER")
}

/// The serial type replacing an autoincrement integer column on PostgreSQL.
pub fn serial_type(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::I8 | FieldType::I16 | FieldType::U8 | FieldType::U16 => Some("SMALLSERIAL"),
        FieldType::I32 | FieldType::U32 => Some("SERIAL"),
        FieldType::I64 | FieldType::U64 => Some("BIGSERIAL"),
        _ => None,
    }
}

fn integer_width(field_type: FieldType, dialect: Dialect) -> Option<&'static str> {
    let width = match field_type {
        FieldType::I8 | FieldType::U8 => "SMALLINT",
        // postgres has no MEDIUMINT
        FieldType::I16 | FieldType::U16 if dialect == Dialect::Postgres => "SMALLINT",
        FieldType::I16 | FieldType::U16 => "MEDIUMINT",
        FieldType::I32 | FieldType::U32 => "INT",
        FieldType::I64 | FieldType::U64 => "BIGINT",
        _ => return None,
    };
    Some(width)
}
