//! Static record descriptors.
//!
//! A [Record] describes its fields once, through [RecordShape], instead of being inspected at
//! runtime. Implement it by hand, or declare the struct through the [record!](crate::record!)
//! macro which derives the implementation from field attributes.

use crate::annotation::Annotations;
use crate::error::Error;
use crate::executor::{Param, Row};
use crate::typemap::FieldType;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// The value of a single field, as seen by the insert serializer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Bool(bool),
    /// `None` is the zero timestamp, an unset field.
    Timestamp(Option<DateTime<Utc>>),
    /// A value without a serialization rule, carrying its type name.
    Unsupported(&'static str),
}

/// A Rust type usable as a record field.
///
/// Only `Option<DateTime<Utc>>` models an unset timestamp: `None` is left out of sparse
/// inserts. A plain `DateTime<Utc>` always has a value, its default epoch included.
pub trait SqlField {
    fn field_type() -> FieldType
    where
        Self: Sized;

    fn to_value(&self) -> Value;

    /// Store a value read from a result row.
    fn assign_value(&mut self, value: &Param) -> Result<(), Error>;

    /// Store a database generated key in this field.
    fn assign_generated_key(&mut self, _id: i64) -> Result<(), Error> {
        Err(Error::UnsupportedFieldType(format!(
            "{} can't hold a generated key",
            self.type_label()
        )))
    }

    #[doc(hidden)]
    fn type_label(&self) -> &'static str;
}

fn conversion(value: &Param, target: &str) -> Error {
    Error::Conversion(format!("{:?} into {}", value, target))
}

fn fit<T: TryFrom<i64>>(id: i64, target: &str) -> Result<T, Error> {
    T::try_from(id).map_err(|_| Error::Conversion(format!("{} does not fit into {}", id, target)))
}

macro_rules! signed_field {
    ($($ty:ty => $field_type:ident),* $(,)?) => {
        $(
            impl SqlField for $ty {
                fn field_type() -> FieldType {
                    FieldType::$field_type
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
                    let v = value
                        .as_i64()
                        .ok_or_else(|| conversion(value, stringify!($ty)))?;
                    *self = fit(v, stringify!($ty))?;
                    Ok(())
                }

                fn assign_generated_key(&mut self, id: i64) -> Result<(), Error> {
                    *self = fit(id, stringify!($ty))?;
                    Ok(())
                }

                fn type_label(&self) -> &'static str {
                    stringify!($ty)
                }
            }
        )*
    };
}

macro_rules! unsigned_field {
    ($($ty:ty => $field_type:ident),* $(,)?) => {
        $(
            impl SqlField for $ty {
                fn field_type() -> FieldType {
                    FieldType::$field_type
                }

                fn to_value(&self) -> Value {
                    Value::UInt(u64::from(*self))
                }

                fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
                    let v = value
                        .as_i64()
                        .ok_or_else(|| conversion(value, stringify!($ty)))?;
                    self.assign_generated_key(v)
                }

                fn assign_generated_key(&mut self, id: i64) -> Result<(), Error> {
                    let unsigned: u64 = fit(id, stringify!($ty))?;
                    *self = <$ty>::try_from(unsigned).map_err(|_| {
                        Error::Conversion(format!("{} does not fit into {}", id, stringify!($ty)))
                    })?;
                    Ok(())
                }

                fn type_label(&self) -> &'static str {
                    stringify!($ty)
                }
            }
        )*
    };
}

signed_field!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);
unsigned_field!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);

impl SqlField for String {
    fn field_type() -> FieldType {
        FieldType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
        *self = match value {
            Param::Text(v) => v.clone(),
            Param::Int(v) => v.to_string(),
            Param::Float(v) => v.to_string(),
            Param::Null => return Err(conversion(value, "String")),
        };
        Ok(())
    }

    fn type_label(&self) -> &'static str {
        "String"
    }
}

impl SqlField for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
        *self = match value {
            Param::Int(v) => *v != 0,
            Param::Text(v) => match v.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" => true,
                "0" | "f" | "false" => false,
                _ => return Err(conversion(value, "bool")),
            },
            Param::Float(_) | Param::Null => return Err(conversion(value, "bool")),
        };
        Ok(())
    }

    fn type_label(&self) -> &'static str {
        "bool"
    }
}

impl SqlField for f32 {
    fn field_type() -> FieldType {
        FieldType::F32
    }

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
        *self = value.as_f64().ok_or_else(|| conversion(value, "f32"))? as f32;
        Ok(())
    }

    fn type_label(&self) -> &'static str {
        "f32"
    }
}

impl SqlField for f64 {
    fn field_type() -> FieldType {
        FieldType::F64
    }

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
        *self = value.as_f64().ok_or_else(|| conversion(value, "f64"))?;
        Ok(())
    }

    fn type_label(&self) -> &'static str {
        "f64"
    }
}

/// Unix seconds, RFC 3339, or `YYYY-MM-DD HH:MM:SS[.f]` as written by SQLite and MySQL.
pub(crate) fn parse_timestamp(value: &Param) -> Option<DateTime<Utc>> {
    match value {
        Param::Int(seconds) => Utc.timestamp_opt(*seconds, 0).single(),
        Param::Float(seconds) => Utc.timestamp_opt(*seconds as i64, 0).single(),
        Param::Text(text) => {
            let text = text.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(text) {
                return Some(t.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|naive| naive.and_utc())
        }
        Param::Null => None,
    }
}

impl SqlField for DateTime<Utc> {
    fn field_type() -> FieldType {
        FieldType::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(Some(*self))
    }

    fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
        *self = parse_timestamp(value).ok_or_else(|| conversion(value, "DateTime<Utc>"))?;
        Ok(())
    }

    fn type_label(&self) -> &'static str {
        "DateTime<Utc>"
    }
}

impl SqlField for Option<DateTime<Utc>> {
    fn field_type() -> FieldType {
        FieldType::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn assign_value(&mut self, value: &Param) -> Result<(), Error> {
        *self = match value {
            Param::Null => None,
            _ => Some(parse_timestamp(value).ok_or_else(|| conversion(value, "DateTime<Utc>"))?),
        };
        Ok(())
    }

    fn type_label(&self) -> &'static str {
        "Option<DateTime<Utc>>"
    }
}

/// The static description of one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// The declared field name.
    pub name: &'static str,
    pub field_type: FieldType,
    /// Explicit column name, overriding `name`.
    pub column: Option<&'static str>,
    pub annotations: Annotations,
    /// Literal used in a `DEFAULT '...'` clause.
    pub default: Option<&'static str>,
}

impl FieldDef {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            column: None,
            annotations: Annotations::default(),
            default: None,
        }
    }

    /// Add the directives of an `orm` tag, e.g. `"pk,ai"`.
    pub fn orm(mut self, tag: &str) -> Self {
        self.annotations = self.annotations.merge(Annotations::parse(tag));
        self
    }

    pub fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// The column name this field maps to.
    pub fn column_name(&self) -> &'static str {
        self.column.filter(|c| !c.is_empty()).unwrap_or(self.name)
    }
}

/// The static description of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    /// Used as the table name unless an explicit one is given.
    pub type_name: &'static str,
    pub fields: Vec<FieldDef>,
}

impl RecordShape {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// A shape without fields can't be mapped to a table.
    pub(crate) fn require_fields(&self) -> Result<(), Error> {
        if self.fields.is_empty() {
            return Err(Error::NotAStruct(self.type_name));
        }
        Ok(())
    }

    /// Index of the generated key field, if exactly one field is both primary key and
    /// autoincrement.
    pub fn generated_key_index(&self) -> Option<usize> {
        let mut keys = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.annotations.is_generated_key())
            .map(|(i, _)| i);
        match (keys.next(), keys.next()) {
            (Some(index), None) => Some(index),
            _ => None,
        }
    }
}

/// A type that maps to a table row.
///
/// `values` and `fields_mut` must list fields in the same order as `shape().fields`.
pub trait Record {
    fn shape() -> RecordShape
    where
        Self: Sized;

    fn values(&self) -> Vec<Value>;

    fn fields_mut(&mut self) -> Vec<&mut dyn SqlField>;

    /// Write a generated key into the field at `index`.
    fn set_generated_key(&mut self, index: usize, id: i64) -> Result<(), Error> {
        match self.fields_mut().into_iter().nth(index) {
            Some(field) => field.assign_generated_key(id),
            None => Err(Error::Generic(format!("no field at index {}", index))),
        }
    }

    /// Fill fields from a result row, matching columns to column names case-insensitively.
    /// Fields without a column keep their value; a column without a field is an error.
    fn read_row(&mut self, row: &Row) -> Result<(), Error>
    where
        Self: Sized,
    {
        let shape = Self::shape();
        let mut fields = self.fields_mut();
        for (column, value) in row.iter() {
            let index = shape
                .fields
                .iter()
                .position(|f| !f.annotations.is_ignored() && f.column_name().eq_ignore_ascii_case(column))
                .ok_or_else(|| Error::MissingDestination(column.to_string()))?;
            let field = fields
                .get_mut(index)
                .ok_or_else(|| Error::Generic(format!("no field at index {}", index)))?;
            field
                .assign_value(value)
                .map_err(|err| Error::Conversion(format!("column {}: {}", column, err)))?;
        }
        Ok(())
    }
}
