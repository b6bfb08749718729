use crate::dialect::Dialect;

/// Error type for the schemachain crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required connection parameter was empty.
    #[error("missing connection argument: {0}")]
    ArgumentMissing(&'static str),
    #[error("port {0} is invalid, it must be > 0 and <= 65535")]
    PortInvalid(u16),
    #[error("dialect {0:?} is not supported for this operation")]
    UnsupportedDialect(Dialect),
    /// The record shape has no fields and cannot describe a table.
    #[error("{0} is not a struct with fields")]
    NotAStruct(&'static str),
    #[error("field type {0} is not supported")]
    UnsupportedFieldType(String),
    /// A generated key was requested for a record passed by shared reference.
    #[error("cannot write the generated key back into a record passed by shared reference, use insert_mut")]
    CannotAddress,
    #[error("too many versions stored in the version table: found {0} rows, expected 1")]
    TooManyVersionRows(i64),
    #[error("can't store the schema version in the database, enable store_version_in_db")]
    CannotStoreVersion,
    #[error("table {0} has no columns left after applying annotations")]
    NoColumns(String),
    #[error("template expects {expected} parameters but {got} were given")]
    TemplateParams { expected: usize, got: usize },
    #[error("the driver did not report a last insert id")]
    NoLastInsertId,
    /// A result column has no matching record field.
    #[error("column {0} has no destination field in the record")]
    MissingDestination(String),
    #[error("cannot convert {0}")]
    Conversion(String),
    /// The linked SQLite library can't encrypt databases.
    #[error("sqlite was built without encryption support, enable the sqlcipher feature")]
    EncryptionUnavailable,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "sqlite")]
    #[error("{0}")]
    Rusqlite(rusqlite::Error),
    #[cfg(feature = "mysql")]
    #[error("{0}")]
    Mysql(String),
    #[cfg(feature = "postgres")]
    #[error("{0}")]
    Postgres(#[from] postgres::Error),
    #[error("{0}")]
    Generic(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Self::Rusqlite(value)
    }
}

#[cfg(feature = "mysql")]
impl From<mysql::Error> for Error {
    fn from(value: mysql::Error) -> Self {
        Self::Mysql(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Generic(value)
    }
}

// io, json and postgres errors don't implement PartialEq, compare their messages instead
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ArgumentMissing(a), Self::ArgumentMissing(b)) => a == b,
            (Self::PortInvalid(a), Self::PortInvalid(b)) => a == b,
            (Self::UnsupportedDialect(a), Self::UnsupportedDialect(b)) => a == b,
            (Self::NotAStruct(a), Self::NotAStruct(b)) => a == b,
            (Self::UnsupportedFieldType(a), Self::UnsupportedFieldType(b)) => a == b,
            (Self::CannotAddress, Self::CannotAddress) => true,
            (Self::TooManyVersionRows(a), Self::TooManyVersionRows(b)) => a == b,
            (Self::CannotStoreVersion, Self::CannotStoreVersion) => true,
            (Self::NoColumns(a), Self::NoColumns(b)) => a == b,
            (
                Self::TemplateParams { expected, got },
                Self::TemplateParams {
                    expected: other_expected,
                    got: other_got,
                },
            ) => expected == other_expected && got == other_got,
            (Self::NoLastInsertId, Self::NoLastInsertId) => true,
            (Self::MissingDestination(a), Self::MissingDestination(b)) => a == b,
            (Self::Conversion(a), Self::Conversion(b)) => a == b,
            (Self::EncryptionUnavailable, Self::EncryptionUnavailable) => true,
            (Self::Io(a), Self::Io(b)) => a.to_string() == b.to_string(),
            (Self::Json(a), Self::Json(b)) => a.to_string() == b.to_string(),
            #[cfg(feature = "sqlite")]
            (Self::Rusqlite(a), Self::Rusqlite(b)) => a == b,
            #[cfg(feature = "mysql")]
            (Self::Mysql(a), Self::Mysql(b)) => a == b,
            #[cfg(feature = "postgres")]
            (Self::Postgres(a), Self::Postgres(b)) => a.to_string() == b.to_string(),
            (Self::Generic(a), Self::Generic(b)) => a == b,
            _ => false,
        }
    }
}
