//! Connection strings for the supported drivers.
//!
//! Building a DSN never performs I/O. Missing arguments and invalid ports are rejected here,
//! before a driver tries to connect.

use crate::dialect::Dialect;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Connection parameters. Server dialects use the credential fields, SQLite dialects use
/// `database` as the file path and `password` as the encryption key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsnParams {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    /// Driver options, e.g. `"sslmode=disable"` or `"prefer_socket=false"`.
    #[serde(default)]
    pub options: Vec<String>,
}

impl DsnParams {
    pub fn server(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            port,
            database: database.into(),
            options: Vec::new(),
        }
    }

    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            database: path.into(),
            ..Default::default()
        }
    }

    pub fn sqlite_encrypted(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            database: path.into(),
            password: key.into(),
            ..Default::default()
        }
    }

    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

fn require(value: &str, name: &'static str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::ArgumentMissing(name));
    }
    Ok(())
}

fn query_string(options: &[String]) -> String {
    if options.is_empty() {
        String::new()
    } else {
        format!("?{}", options.join("&"))
    }
}

/// Build the connection string for `dialect`.
pub fn build_dsn(dialect: Dialect, params: &DsnParams) -> Result<String, Error> {
    match dialect {
        Dialect::Sqlite => {
            require(&params.database, "file")?;
            Ok(format!(
                "file:{}{}",
                params.database,
                query_string(&params.options)
            ))
        }
        Dialect::SqliteEncrypted => {
            require(&params.database, "file")?;
            require(&params.password, "key")?;
            let mut options = vec![format!("_crypto_key={}", params.password)];
            options.extend(params.options.iter().cloned());
            Ok(format!("file:{}{}", params.database, query_string(&options)))
        }
        Dialect::Mysql | Dialect::Postgres => {
            require(&params.username, "username")?;
            require(&params.password, "password")?;
            require(&params.host, "host")?;
            // u16 can't exceed 65535, only zero is out of range
            if params.port == 0 {
                return Err(Error::PortInvalid(params.port));
            }
            if dialect == Dialect::Mysql {
                Ok(format!(
                    "mysql://{}:{}@{}:{}/{}{}",
                    params.username,
                    params.password,
                    params.host,
                    params.port,
                    params.database,
                    query_string(&params.options)
                ))
            } else {
                let mut dsn = format!(
                    "host={} port={} user={} password={}",
                    params.host, params.port, params.username, params.password
                );
                if !params.database.is_empty() {
                    dsn.push_str(&format!(" dbname={}", params.database));
                }
                for option in &params.options {
                    dsn.push(' ');
                    dsn.push_str(option);
                }
                Ok(dsn)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_url() {
        let params = DsnParams::server("root", "pw", "localhost", 3306, "app").option("a=1");
        assert_eq!(
            build_dsn(Dialect::Mysql, &params).unwrap(),
            "mysql://root:pw@localhost:3306/app?a=1"
        );
    }

    #[test]
    fn postgres_key_value() {
        let params =
            DsnParams::server("u", "p", "db", 5432, "app").option("sslmode=disable");
        assert_eq!(
            build_dsn(Dialect::Postgres, &params).unwrap(),
            "host=db port=5432 user=u password=p dbname=app sslmode=disable"
        );
    }

    #[test]
    fn empty_arguments_are_missing() {
        for (params, missing) in [
            (DsnParams::server(" ", "p", "h", 1, "d"), "username"),
            (DsnParams::server("u", "", "h", 1, "d"), "password"),
            (DsnParams::server("u", "p", "", 1, "d"), "host"),
        ] {
            assert_eq!(
                build_dsn(Dialect::Mysql, &params),
                Err(Error::ArgumentMissing(missing))
            );
            assert_eq!(
                build_dsn(Dialect::Postgres, &params),
                Err(Error::ArgumentMissing(missing))
            );
        }
    }

    #[test]
    fn zero_port_is_invalid() {
        let params = DsnParams::server("u", "p", "h", 0, "d");
        assert_eq!(build_dsn(Dialect::Mysql, &params), Err(Error::PortInvalid(0)));
    }

    #[test]
    fn sqlite_files() {
        assert_eq!(
            build_dsn(Dialect::Sqlite, &DsnParams::sqlite("app.db").option("mode=rwc")).unwrap(),
            "file:app.db?mode=rwc"
        );
        assert_eq!(
            build_dsn(
                Dialect::SqliteEncrypted,
                &DsnParams::sqlite_encrypted("app.db", "k")
            )
            .unwrap(),
            "file:app.db?_crypto_key=k"
        );
        assert_eq!(
            build_dsn(Dialect::SqliteEncrypted, &DsnParams::sqlite("app.db")),
            Err(Error::ArgumentMissing("key"))
        );
        assert_eq!(
            build_dsn(Dialect::Sqlite, &DsnParams::default()),
            Err(Error::ArgumentMissing("file"))
        );
    }
}
