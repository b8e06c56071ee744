//! Error taxonomy for the arrangement domain
//!
//! Four kinds cover every failure the core can produce: bad caller input
//! (`Validation`), unresolved aggregate ids (`NotFound`), rejected entity
//! mutations (`Invariant`), and unexpected collaborator failures
//! (`Operation`). Validators report invalidity as a value; entities raise
//! `Invariant`; handlers wrap anything unexpected into `Operation` with
//! the original cause preserved.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Outcome of a precondition check
///
/// An empty report is valid. Validators push one entry per failed field
/// and never throw for ordinary bad input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Record a failure for one field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Fold another report's failures into this one
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
    }

    /// Convert into a `Result`, erroring when any field failed
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// Errors raised by the arrangement core
#[derive(Debug, Error)]
pub enum DomainError {
    /// Caller-supplied data failed a precondition; safe to retry after
    /// correcting the input
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    /// Referenced aggregate id did not resolve in the repository
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An entity rejected the requested mutation; the same request will
    /// fail again until the caller changes it
    #[error("{0}")]
    Invariant(String),

    /// Unexpected failure from a collaborator, original cause preserved
    #[error("operation failed: {0}")]
    Operation(#[from] anyhow::Error),
}

impl DomainError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a single-field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut report = ValidationReport::new();
        report.push(field, message);
        Self::Validation(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_report_collects_field_errors() {
        let mut report = ValidationReport::new();
        report.push("name", "must not be empty");
        report.push("volume", "must be between 0.0 and 2.0");

        assert!(!report.is_valid());
        assert_eq!(report.errors().len(), 2);
        assert_eq!(report.errors()[0].field, "name");

        let rendered = report.to_string();
        assert!(rendered.contains("name: must not be empty"));
        assert!(rendered.contains("volume"));
    }

    #[test]
    fn test_report_merge() {
        let mut a = ValidationReport::new();
        a.push("name", "must not be empty");

        let mut b = ValidationReport::new();
        b.push("gain", "must be non-negative");

        a.merge(b);
        assert_eq!(a.errors().len(), 2);
    }

    #[test]
    fn test_invariant_displays_bare_message() {
        let err = DomainError::invariant("Cannot add more than 16 input tracks");
        assert_eq!(err.to_string(), "Cannot add more than 16 input tracks");
    }

    #[test]
    fn test_not_found_display() {
        let err = DomainError::not_found("track", "abc");
        assert_eq!(err.to_string(), "track not found: abc");
    }
}
