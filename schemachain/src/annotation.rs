//! Per-field directives, parsed from `orm` tag strings such as `"pk,ai"`.

/// The directives attached to a single record field.
///
/// | token | meaning |
/// |-------|---------|
/// | `pk`  | primary key |
/// | `ai`  | autoincrement, the value is generated by the database |
/// | `nn`  | not null |
/// | `-`   | ignore the field entirely |
/// | `iai` | supply the autoincrement field on insert anyway |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub ignore: bool,
    pub insert_auto_increment: bool,
}

impl Annotations {
    /// Parse a comma separated tag. Unknown tokens are skipped.
    pub fn parse(tag: &str) -> Self {
        let mut annotations = Self::default();
        for token in tag.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                "pk" => annotations.primary_key = true,
                "ai" => annotations.auto_increment = true,
                "nn" => annotations.not_null = true,
                "-" => annotations.ignore = true,
                "iai" => annotations.insert_auto_increment = true,
                _other => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(token = _other, tag = tag, "Ignoring unknown orm tag token");
                }
            }
        }
        annotations
    }

    /// Merge the tokens of another tag into this set.
    pub fn merge(self, other: Annotations) -> Self {
        Self {
            primary_key: self.primary_key || other.primary_key,
            auto_increment: self.auto_increment || other.auto_increment,
            not_null: self.not_null || other.not_null,
            ignore: self.ignore || other.ignore,
            insert_auto_increment: self.insert_auto_increment || other.insert_auto_increment,
        }
    }

    /// Ignore wins over every other directive.
    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Whether an insert leaves this field to the database.
    pub fn is_generated_on_insert(&self) -> bool {
        self.auto_increment && !self.insert_auto_increment
    }

    /// Primary key and autoincrement together mark the generated key of a record.
    pub fn is_generated_key(&self) -> bool {
        !self.ignore && self.primary_key && self.auto_increment
    }
}
