//! Domain error model.

use thiserror::Error;

use crate::validation::FieldErrors;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records, protected references). Infrastructure concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A uniqueness or state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Removal refused because other records still reference the target.
    #[error("protected: {0}")]
    Protected(String),
}

impl DomainError {
    /// Single-field validation failure.
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, msg);
        Self::Validation(errors)
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn protected(msg: impl Into<String>) -> Self {
        Self::Protected(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Field errors carried by a validation failure, if any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for DomainError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}
