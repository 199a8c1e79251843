//! Field-level validation primitives shared by every write path.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::DomainError;

/// Validation messages keyed by input field name.
///
/// Serializes as `{"field": ["message", ...]}`, which is exactly what the HTTP
/// layer puts under `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, msg: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First message in field order; used as the envelope `message`.
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flat_map(|v| v.iter()).map(String::as_str).next()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn finish(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for msg in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {msg}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Outcome of a character-count bound check.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Length {
    Ok,
    TooShort,
    TooLong,
}

/// Check `value` (already trimmed by the caller when required) against
/// inclusive bounds, counting Unicode scalar values rather than bytes.
pub fn check_length(value: &str, min: usize, max: Option<usize>) -> Length {
    let n = value.chars().count();
    if n < min {
        Length::TooShort
    } else if max.is_some_and(|max| n > max) {
        Length::TooLong
    } else {
        Length::Ok
    }
}

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural email check: one `@`, non-empty local part, dotted domain, no
/// whitespace, at most 254 characters.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().count() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}
