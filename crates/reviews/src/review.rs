use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use weeb_core::validation::{check_length, is_valid_email, Length};
use weeb_core::{DomainError, Entity, FieldErrors, ReviewId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub predicted_satisfaction: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> ReviewId {
        self.id
    }
}

/// Contact-form payload.
///
/// Read-only keys (`id`, `predicted_satisfaction`, `created_at`) are not
/// fields here and are dropped if a client sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ReviewSubmission {
    pub fn validate(self) -> Result<NewReview, DomainError> {
        let mut errors = FieldErrors::new();

        let first_name = bounded("first_name", &self.first_name, 50, &mut errors);
        let last_name = bounded("last_name", &self.last_name, 50, &mut errors);

        let email = self.email.trim().to_string();
        if email.is_empty() {
            errors.add("email", "This field is required.");
        } else if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        let phone = self
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if phone.as_deref().is_some_and(|p| p.chars().count() > 20) {
            errors.add("phone", "Ensure this field has no more than 20 characters.");
        }

        let message = self.message.trim().to_string();
        if message.is_empty() {
            errors.add("message", "This field is required.");
        }

        errors.finish()?;

        Ok(NewReview {
            first_name,
            last_name,
            email,
            phone,
            message,
            predicted_satisfaction: None,
        })
    }
}

/// Validated review ready to insert; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub predicted_satisfaction: Option<i64>,
}

impl NewReview {
    pub fn with_prediction(mut self, prediction: Option<i64>) -> Self {
        self.predicted_satisfaction = prediction;
        self
    }

    pub fn into_review(self, id: ReviewId, created_at: DateTime<Utc>) -> Review {
        Review {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            message: self.message,
            predicted_satisfaction: self.predicted_satisfaction,
            created_at,
        }
    }
}

fn bounded(field: &str, value: &str, max: usize, errors: &mut FieldErrors) -> String {
    let value = value.trim();
    match check_length(value, 1, Some(max)) {
        Length::TooShort => errors.add(field, "This field is required."),
        Length::TooLong => errors.add(field, format!("Ensure this field has no more than {max} characters.")),
        Length::Ok => {}
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ReviewSubmission {
        ReviewSubmission {
            first_name: "Marie".to_string(),
            last_name: "Curie".to_string(),
            email: "marie@example.com".to_string(),
            phone: Some(" ".to_string()),
            message: "  Très bonne expérience  ".to_string(),
        }
    }

    #[test]
    fn valid_submission_has_no_prediction_yet() {
        let review = submission().validate().unwrap();
        assert_eq!(review.message, "Très bonne expérience");
        assert_eq!(review.phone, None);
        assert_eq!(review.predicted_satisfaction, None);
    }

    #[test]
    fn client_cannot_set_prediction() {
        let parsed: ReviewSubmission = serde_json::from_str(
            r#"{"first_name":"A","last_name":"B","email":"a@b.io","message":"hi","predicted_satisfaction":5}"#,
        )
        .unwrap();
        assert_eq!(parsed.validate().unwrap().predicted_satisfaction, None);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let err = ReviewSubmission::default().validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        for field in ["first_name", "last_name", "email", "message"] {
            assert!(fields.contains(field), "{field} should be reported");
        }
    }

    #[test]
    fn phone_and_email_shapes() {
        let mut s = submission();
        s.phone = Some("0".repeat(21));
        s.email = "nope".to_string();
        let err = s.validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains("phone"));
        assert!(fields.contains("email"));
    }
}
