//! Error types for cleaning, validation, resolution and loading.

use std::fmt;
use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

use crate::types::{errname, EAGAIN, EINVAL};

/// Structural failure raised by `clean` for a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{attribute}] {errmsg}")]
pub struct Error {
    /// Name of the offending attribute.
    pub attribute: String,
    /// Human-readable message.
    pub errmsg: String,
    /// Errno-style numeric code.
    pub errno: i32,
}

impl Error {
    /// New error with the default `EINVAL` code.
    pub fn new(attribute: impl Into<String>, errmsg: impl Into<String>) -> Self {
        Self::with_errno(attribute, errmsg, EINVAL)
    }

    pub fn with_errno(attribute: impl Into<String>, errmsg: impl Into<String>, errno: i32) -> Self {
        Self {
            attribute: attribute.into(),
            errmsg: errmsg.into(),
            errno,
        }
    }
}

/// A single entry of a [`ValidationErrors`] set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    /// Dotted path to the attribute (e.g. `aliases.0.address`).
    pub attribute: String,
    pub errmsg: String,
    pub errno: i32,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", errname(self.errno), self.attribute, self.errmsg)
    }
}

impl From<Error> for ValidationError {
    fn from(e: Error) -> Self {
        Self {
            attribute: e.attribute,
            errmsg: e.errmsg,
            errno: e.errno,
        }
    }
}

/// Aggregate, path-addressed collection of validation failures for one call.
///
/// Truthiness is `!is_empty()`; callers turn a non-empty set into an `Err`
/// with [`ValidationErrors::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry with an explicit code.
    pub fn add(&mut self, attribute: impl Into<String>, errmsg: impl Into<String>, errno: i32) {
        self.errors.push(ValidationError {
            attribute: attribute.into(),
            errmsg: errmsg.into(),
            errno,
        });
    }

    /// Append an entry with the default `EINVAL` code.
    pub fn add_invalid(&mut self, attribute: impl Into<String>, errmsg: impl Into<String>) {
        self.add(attribute, errmsg, EINVAL);
    }

    /// Append a clean failure as an entry.
    pub fn add_error(&mut self, error: Error) {
        self.errors.push(error.into());
    }

    /// Merge every entry of `child` under `prefix` (`prefix.attribute`).
    pub fn add_child(&mut self, prefix: &str, child: ValidationErrors) {
        for e in child.errors {
            self.errors.push(ValidationError {
                attribute: format!("{}.{}", prefix, e.attribute),
                errmsg: e.errmsg,
                errno: e.errno,
            });
        }
    }

    /// Merge every entry of `other` unchanged.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// `Err(self)` when any entry was collected.
    pub fn check(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether an entry exists for exactly this attribute path.
    pub fn contains(&self, attribute: &str) -> bool {
        self.errors.iter().any(|e| e.attribute == attribute)
    }

    /// Entries addressed to exactly this attribute path.
    pub fn for_attribute<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.attribute == attribute)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// `[[attribute, message, errno], ...]` as carried in a wire error's `extra`.
    pub fn to_extra(&self) -> Value {
        Value::Array(
            self.errors
                .iter()
                .map(|e| json!([e.attribute, e.errmsg, e.errno]))
                .collect(),
        )
    }

    /// Structured `VALIDATION` failure as sent back to an RPC client.
    pub fn to_wire(&self) -> Value {
        json!({
            "error": EAGAIN,
            "type": "VALIDATION",
            "reason": self.to_string(),
            "extra": self.to_extra(),
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.errors {
            writeln!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Error> for ValidationErrors {
    fn from(e: Error) -> Self {
        let mut errors = Self::new();
        errors.add_error(e);
        errors
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors during schema resolution. These are service-author mistakes and
/// abort startup rather than being reported to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("schema {name} does not exist")]
    SchemaNotFound { name: String },

    #[error("patch base {name} is not a dict")]
    PatchNonDict { name: String },

    #[error("schema {name} is already registered")]
    AlreadyRegistered { name: String },

    #[error("field {field} not found in schema {schema}")]
    FieldNotFound { schema: String, field: String },

    #[error("unknown property \"{property}\" for attribute {attribute}")]
    UnknownProperty { attribute: String, property: String },

    #[error("invalid value for property \"{property}\" of attribute {attribute}: expected {expected}")]
    InvalidProperty {
        attribute: String,
        property: String,
        expected: String,
    },

    #[error("method {method} accepts {expected} parameter(s) but declares {actual} schema(s)")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid declaration of {name}: {message}")]
    InvalidDeclaration { name: String, message: String },

    #[error("method {method}: {source}")]
    Method {
        method: String,
        #[source]
        source: Box<ResolveError>,
    },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    /// Wrap this error with the name of the method being resolved.
    pub fn in_method(self, method: impl Into<String>) -> Self {
        ResolveError::Method {
            method: method.into(),
            source: Box::new(self),
        }
    }
}

/// Errors while loading declaration documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Declaration errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid declaration at {path}: {message}")]
    InvalidDeclaration { path: String, message: String },

    #[error("circular include: {path}")]
    CircularInclude { path: PathBuf },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }

    pub(crate) fn declaration(path: &str, message: impl Into<String>) -> Self {
        LoadError::InvalidDeclaration {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of a bound method call.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// Arguments did not clean or validate.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The method body itself failed.
    #[error("{0}")]
    Method(E),
}

impl<E> CallError<E> {
    /// The validation failures, if binding failed.
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            CallError::Validation(errors) => Some(errors),
            CallError::Method(_) => None,
        }
    }
}
