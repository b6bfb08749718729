//! Migration groups: named, ordered bundles of version tagged statements.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single statement of a [MigrationGroup].
///
/// The statement runs when `version_added` is greater than the database's recorded schema
/// version. When `query_fmt` is set it takes precedence over `query`: its `%s` placeholders
/// are filled from `fmt_params` before `params` are bound as driver parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationStatement {
    #[serde(rename = "vs")]
    pub version_added: f32,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(rename = "queryf", default)]
    pub query_fmt: String,
    #[serde(rename = "fparams", default)]
    pub fmt_params: Vec<String>,
}

impl MigrationStatement {
    pub fn new(version_added: f32, query: impl Into<String>) -> Self {
        Self {
            version_added,
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn templated(
        version_added: f32,
        query_fmt: impl Into<String>,
        fmt_params: Vec<String>,
    ) -> Self {
        Self {
            version_added,
            query_fmt: query_fmt.into(),
            fmt_params,
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    /// A statement without any text is a no-op.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.query_fmt.is_empty()
    }

    /// The SQL that will be executed: the filled template if there is one, the plain query
    /// otherwise.
    pub fn sql(&self) -> Result<String, Error> {
        if self.query_fmt.is_empty() {
            Ok(self.query.clone())
        } else {
            fill_template(&self.query_fmt, &self.fmt_params)
        }
    }
}

/// Replace `%s` placeholders positionally with `params`. `%%` is a literal `%`.
pub fn fill_template(template: &str, params: &[String]) -> Result<String, Error> {
    let expected = count_placeholders(template);
    if expected != params.len() {
        return Err(Error::TemplateParams {
            expected,
            got: params.len(),
        });
    }
    let mut out = String::with_capacity(template.len());
    let mut params = params.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                if let Some(param) = params.next() {
                    out.push_str(param);
                }
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }
    Ok(out)
}

fn count_placeholders(template: &str) -> usize {
    let mut count = 0;
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('s') => count += 1,
                Some(_) | None => {}
            }
        }
    }
    count
}

/// A named bundle of statements. Groups run in ascending `order`, statements within a group
/// in ascending version, keeping registration order between equal versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationGroup {
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "queries", default)]
    pub statements: Vec<MigrationStatement>,
}

impl MigrationGroup {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            order,
            statements: Vec::new(),
        }
    }

    pub fn push(mut self, statement: MigrationStatement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Add a plain statement introduced in `version`.
    pub fn add(self, version: f32, query: impl Into<String>) -> Self {
        self.push(MigrationStatement::new(version, query))
    }

    pub fn add_with_params(self, version: f32, query: impl Into<String>, params: Vec<String>) -> Self {
        self.push(MigrationStatement::new(version, query).with_params(params))
    }

    pub fn add_templated(
        self,
        version: f32,
        query_fmt: impl Into<String>,
        fmt_params: Vec<String>,
    ) -> Self {
        self.push(MigrationStatement::templated(version, query_fmt, fmt_params))
    }

    /// Load a group previously written by [MigrationGroup::export].
    pub fn restore(path: impl AsRef<Path>) -> Result<Self, Error> {
        let data = fs::read(path.as_ref())?;
        let group: MigrationGroup = serde_json::from_slice(&data)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            group = %group.name,
            statements = group.statements.len(),
            path = %path.as_ref().display(),
            "Restored migration group"
        );
        Ok(group)
    }

    /// Write this group as JSON.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let data = serde_json::to_vec(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Read a `.sql` file with one statement per line. Every statement gets version 0, which
    /// makes the file an initial schema: it runs on a fresh database only.
    pub fn load_sql_file(name: impl Into<String>, path: impl AsRef<Path>, order: i32) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let mut group = Self::new(name, order);
        group.statements = content
            .lines()
            .map(|line| MigrationStatement::new(0.0, line))
            .collect();
        Ok(group)
    }

    /// The statements sorted stably by version.
    pub(crate) fn sorted_statements(&self) -> Vec<&MigrationStatement> {
        let mut statements: Vec<&MigrationStatement> = self.statements.iter().collect();
        statements.sort_by(|a, b| a.version_added.total_cmp(&b.version_added));
        statements
    }
}

/// An initial-schema statement, see [init_version_statements].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitStatement {
    pub query: String,
    pub fmt_params: Vec<String>,
}

impl InitStatement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fmt_params: Vec::new(),
        }
    }

    pub fn with_fmt_params(mut self, fmt_params: Vec<String>) -> Self {
        self.fmt_params = fmt_params;
        self
    }
}

/// Version 0 statements for an initial schema. The query is stored both as plain text and as
/// a template, the template wins when the statement runs.
pub fn init_version_statements(statements: &[InitStatement]) -> Vec<MigrationStatement> {
    statements
        .iter()
        .map(|s| MigrationStatement {
            version_added: 0.0,
            query: s.query.clone(),
            params: Vec::new(),
            query_fmt: s.query.clone(),
            fmt_params: s.fmt_params.clone(),
        })
        .collect()
}
