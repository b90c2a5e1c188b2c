//! Schema validation
//!
//! A [`Schema`] turns a raw JSON value into a strongly-typed value or a list
//! of field-level issues. [`JsonSchema`] is the stock implementation: serde
//! deserialization followed by the type's own [`Validate`] constraints.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// A single field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchemaIssue {
    /// Dotted path to the offending field (empty for the root value)
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Issue attached to the root value
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validation failure carrying every detected issue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", join_issues(.issues))]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaError {
    pub fn new(issues: Vec<SchemaIssue>) -> Self {
        Self { issues }
    }

    pub fn single(issue: SchemaIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of the non-failing validation form
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(Vec<SchemaIssue>),
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn into_result(self) -> Result<T, SchemaError> {
        match self {
            Validation::Valid(value) => Ok(value),
            Validation::Invalid(issues) => Err(SchemaError::new(issues)),
        }
    }
}

/// Validation capability for a target type
pub trait Schema<T>: Send + Sync {
    /// Validate a raw value, failing with every issue found.
    fn validate(&self, raw: Value) -> Result<T, SchemaError>;

    /// Non-failing form of [`Schema::validate`].
    fn try_validate(&self, raw: Value) -> Validation<T> {
        match self.validate(raw) {
            Ok(value) => Validation::Valid(value),
            Err(err) => Validation::Invalid(err.issues),
        }
    }
}

/// Constraints beyond what the type's shape already enforces.
///
/// The default implementation accepts everything.
pub trait Validate {
    fn validate(&self) -> Vec<SchemaIssue> {
        Vec::new()
    }
}

/// Serde-backed schema: deserialize, then apply [`Validate`]
///
/// # Example
///
/// ```
/// use forge_domain::schema::{JsonSchema, Schema, SchemaIssue, Validate};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Estimate {
///     hours: u32,
/// }
///
/// impl Validate for Estimate {
///     fn validate(&self) -> Vec<SchemaIssue> {
///         if self.hours > 120 {
///             vec![SchemaIssue::new("hours", "must be at most 120")]
///         } else {
///             vec![]
///         }
///     }
/// }
///
/// let schema = JsonSchema::<Estimate>::new();
/// assert_eq!(schema.validate(json!({"hours": 8})).unwrap(), Estimate { hours: 8 });
/// assert!(schema.validate(json!({"hours": 500})).is_err());
/// assert!(schema.validate(json!("eight")).is_err());
/// ```
pub struct JsonSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonSchema<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema<T> for JsonSchema<T>
where
    T: DeserializeOwned + Validate,
{
    fn validate(&self, raw: Value) -> Result<T, SchemaError> {
        let value: T = serde_path_to_error::deserialize(raw).map_err(|e| {
            let path = e.path().to_string();
            let message = e.into_inner().to_string();
            // The root path renders as "."
            let issue = if path == "." {
                SchemaIssue::root(message)
            } else {
                SchemaIssue::new(path, message)
            };
            SchemaError::single(issue)
        })?;

        let issues = Validate::validate(&value);
        if issues.is_empty() {
            Ok(value)
        } else {
            Err(SchemaError::new(issues))
        }
    }
}

// Plain JSON and common scalars carry no extra constraints.
impl Validate for Value {}
impl Validate for String {}
impl Validate for bool {}
impl Validate for i64 {}
impl Validate for u64 {}
impl Validate for f64 {}
