//! Error types for payload contracts

use thiserror::Error;

/// Result type alias for contract validation
pub type Result<T> = std::result::Result<T, SchemaViolation>;

/// A payload failed its schema contract.
///
/// Carries the first offending field only; validation stops there.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Schema violation on '{field}': {kind}")]
pub struct SchemaViolation {
    pub field: String,
    pub kind: ViolationKind,
}

/// Why a field was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    #[error("required field is missing")]
    Missing,

    #[error("value must not be empty")]
    Empty,

    #[error("expected {expected}")]
    WrongType { expected: &'static str },

    #[error("'{value}' is not an accepted value")]
    OutOfDomain { value: String },
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ViolationKind::Missing)
    }

    pub fn empty(field: impl Into<String>) -> Self {
        Self::new(field, ViolationKind::Empty)
    }

    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::new(field, ViolationKind::WrongType { expected })
    }

    pub fn out_of_domain(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            field,
            ViolationKind::OutOfDomain {
                value: value.into(),
            },
        )
    }
}
