//! Record module: normalized scraped entities
//!
//! A [`Record`] is a flat, ordered set of named scalar fields with one field
//! designated as its identity (the deduplication key). Records are normalized
//! exactly once, when they are built, and are immutable afterwards.
//!
//! # Normalization
//!
//! - Text values are stripped of leading and trailing whitespace
//! - A text value that is empty after stripping becomes `"No <field-name>"`
//! - Numeric values are stored as given

mod profile;

pub use profile::{ProfileDetail, SearchResult};

use std::fmt;
use thiserror::Error;

/// Errors that can occur while building a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Identity field '{0}' is missing")]
    MissingIdentity(String),

    #[error("Field '{0}' was set more than once")]
    DuplicateField(String),
}

/// A single field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Text(String),
    Number(i64),
}

impl Scalar {
    /// Returns the text value, if this is a text field
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    /// Returns the numeric value, if this is a numeric field
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Text(_) => None,
            Self::Number(n) => Some(*n),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One normalized scraped entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
    identity_index: usize,
}

impl Record {
    /// Starts building a record whose identity is the field named `identity_field`
    ///
    /// # Example
    ///
    /// ```
    /// use profile_harvester::record::Record;
    ///
    /// let record = Record::builder("name")
    ///     .text("name", "bill-gates")
    ///     .text("location", "  Seattle  ")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(record.identity(), "bill-gates");
    /// assert_eq!(record.get("location").unwrap().as_text(), Some("Seattle"));
    /// ```
    pub fn builder(identity_field: &str) -> RecordBuilder {
        RecordBuilder {
            identity_field: identity_field.to_string(),
            fields: Vec::new(),
        }
    }

    /// The identity value used for deduplication
    pub fn identity(&self) -> String {
        self.fields[self.identity_index].1.to_string()
    }

    /// The name of the identity field
    pub fn identity_field(&self) -> &str {
        &self.fields[self.identity_index].0
    }

    /// Field names in construction order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Looks up a field by name
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// All fields in construction order
    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }
}

/// Builder for [`Record`]; normalization happens in [`RecordBuilder::build`]
#[derive(Debug)]
pub struct RecordBuilder {
    identity_field: String,
    fields: Vec<(String, Scalar)>,
}

impl RecordBuilder {
    /// Adds a text field
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), Scalar::Text(value.into())));
        self
    }

    /// Adds a numeric field
    pub fn number(mut self, name: &str, value: i64) -> Self {
        self.fields.push((name.to_string(), Scalar::Number(value)));
        self
    }

    /// Normalizes every field and produces the immutable record
    pub fn build(self) -> Result<Record, RecordError> {
        let mut fields: Vec<(String, Scalar)> = Vec::with_capacity(self.fields.len());

        for (name, value) in self.fields {
            if fields.iter().any(|(existing, _)| *existing == name) {
                return Err(RecordError::DuplicateField(name));
            }
            let value = normalize(&name, value);
            fields.push((name, value));
        }

        let identity_index = fields
            .iter()
            .position(|(name, _)| *name == self.identity_field)
            .ok_or(RecordError::MissingIdentity(self.identity_field))?;

        Ok(Record {
            fields,
            identity_index,
        })
    }
}

fn normalize(name: &str, value: Scalar) -> Scalar {
    match value {
        Scalar::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Scalar::Text(format!("No {}", name))
            } else {
                Scalar::Text(trimmed.to_string())
            }
        }
        number => number,
    }
}
