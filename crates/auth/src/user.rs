//! User directory records and the validation rules for creating/changing them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use weeb_core::validation::{check_length, is_valid_email, normalize_email, Length};
use weeb_core::{DomainError, Entity, FieldErrors, UserId};

use crate::password::{hash_password, PasswordPolicy};
use crate::{Principal, RoleSet};

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// Account record.
///
/// # Invariants
/// - `email` is stored normalized (trimmed, lowercased) and is unique.
/// - `password_hash` is a PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub groups: BTreeSet<String>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn roles(&self) -> RoleSet {
        RoleSet::from_account(self.is_staff, self.groups.iter().map(String::as_str))
    }

    /// Request-scoped identity derived from this (live) record.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.email.clone(), self.is_active, self.roles())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Everything needed to insert a user; the store assigns `id` and `date_joined`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub groups: BTreeSet<String>,
}

impl NewUser {
    pub fn into_user(self, id: UserId, date_joined: DateTime<Utc>) -> User {
        User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_active: self.is_active,
            is_staff: self.is_staff,
            groups: self.groups,
            date_joined,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Public self-registration payload.
///
/// There is no activation or staff field: self-registered accounts always
/// start inactive and unprivileged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl Registration {
    /// Validate and hash. Uniqueness of the email is the store's job.
    pub fn into_new_user(self, policy: &PasswordPolicy) -> Result<NewUser, DomainError> {
        let mut errors = FieldErrors::new();

        let email = normalize_email(&self.email);
        validate_email(&email, &mut errors);
        let first_name = validate_name("first_name", &self.first_name, &mut errors);
        let last_name = validate_name("last_name", &self.last_name, &mut errors);

        if self.password.is_empty() {
            errors.add("password", "Password is required.");
        } else if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match.");
        } else {
            for problem in policy.check(&self.password, &[email.as_str(), first_name.as_str(), last_name.as_str()]) {
                errors.add("password", problem);
            }
        }

        errors.finish()?;

        Ok(NewUser {
            email,
            first_name,
            last_name,
            password_hash: hash(&self.password)?,
            is_active: false,
            is_staff: false,
            groups: BTreeSet::new(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Administrative create / update
// ─────────────────────────────────────────────────────────────────────────────

/// Staff-side account creation: flags and groups are explicit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl AdminUserInput {
    pub fn into_new_user(self, policy: &PasswordPolicy) -> Result<NewUser, DomainError> {
        let mut errors = FieldErrors::new();

        let email = normalize_email(&self.email);
        validate_email(&email, &mut errors);
        let first_name = validate_name("first_name", &self.first_name, &mut errors);
        let last_name = validate_name("last_name", &self.last_name, &mut errors);
        if self.password.is_empty() {
            errors.add("password", "Password is required.");
        } else {
            for problem in policy.check(&self.password, &[email.as_str(), first_name.as_str(), last_name.as_str()]) {
                errors.add("password", problem);
            }
        }
        let groups = validate_groups(self.groups, &mut errors);

        errors.finish()?;

        Ok(NewUser {
            email,
            first_name,
            last_name,
            password_hash: hash(&self.password)?,
            is_active: self.is_active,
            is_staff: self.is_staff,
            groups,
        })
    }
}

/// Staff-side update. `None` leaves a field unchanged; a full update requires
/// the identity fields to be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub groups: Option<BTreeSet<String>>,
}

impl UserPatch {
    /// Apply onto `user`, validating every supplied field.
    ///
    /// With `partial == false`, `email`, `first_name` and `last_name` must be
    /// supplied.
    pub fn apply(self, user: &mut User, partial: bool, policy: &PasswordPolicy) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();

        if !partial {
            for (field, present) in [
                ("email", self.email.is_some()),
                ("first_name", self.first_name.is_some()),
                ("last_name", self.last_name.is_some()),
            ] {
                if !present {
                    errors.add(field, "This field is required.");
                }
            }
        }

        let email = self.email.map(|e| {
            let e = normalize_email(&e);
            validate_email(&e, &mut errors);
            e
        });
        let first_name = self.first_name.map(|v| validate_name("first_name", &v, &mut errors));
        let last_name = self.last_name.map(|v| validate_name("last_name", &v, &mut errors));
        let groups = self.groups.map(|g| validate_groups(g, &mut errors));

        if let Some(password) = &self.password {
            let email = email.as_deref().unwrap_or(user.email.as_str());
            for problem in policy.check(password, &[email, user.first_name.as_str(), user.last_name.as_str()]) {
                errors.add("password", problem);
            }
        }

        errors.finish()?;

        if let Some(password) = &self.password {
            user.password_hash = hash(password)?;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(first_name) = first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(is_staff) = self.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(groups) = groups {
            user.groups = groups;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field rules
// ─────────────────────────────────────────────────────────────────────────────

fn validate_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.add("email", "Email is required.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Names are trimmed and must be 2–50 characters.
fn validate_name(field: &str, value: &str, errors: &mut FieldErrors) -> String {
    let value = value.trim();
    match check_length(value, 2, Some(50)) {
        Length::TooShort => errors.add(field, format!("{field} must have at least 2 characters.")),
        Length::TooLong => errors.add(field, format!("{field} cannot exceed 50 characters.")),
        Length::Ok => {}
    }
    value.to_string()
}

fn validate_groups(groups: BTreeSet<String>, errors: &mut FieldErrors) -> BTreeSet<String> {
    let groups: BTreeSet<String> = groups.into_iter().map(|g| g.trim().to_string()).collect();
    if groups.iter().any(|g| g.is_empty() || g.chars().count() > 150) {
        errors.add("groups", "Group names must be 1 to 150 characters.");
    }
    groups
}

fn hash(password: &str) -> Result<String, DomainError> {
    // Hashing only fails when the OS refuses randomness; surface it as a
    // field problem rather than panicking.
    hash_password(password).map_err(|e| DomainError::validation("password", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::MODERATORS_GROUP;

    fn registration() -> Registration {
        Registration {
            email: "  Test@Example.COM ".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: "TestPass123!".to_string(),
            password_confirm: "TestPass123!".to_string(),
        }
    }

    #[test]
    fn registration_is_inactive_and_normalized() {
        let new_user = registration().into_new_user(&PasswordPolicy::default()).unwrap();
        assert_eq!(new_user.email, "test@example.com");
        assert!(!new_user.is_active);
        assert!(!new_user.is_staff);
        assert!(new_user.groups.is_empty());
        assert!(verify_password(&new_user.password_hash, "TestPass123!"));
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut reg = registration();
        reg.password_confirm = "DifferentPassword123!".to_string();
        let err = reg.into_new_user(&PasswordPolicy::default()).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains("password_confirm"));
    }

    #[test]
    fn name_bounds() {
        let mut reg = registration();
        reg.first_name = " A ".to_string();
        reg.last_name = "x".repeat(51);
        let err = reg.into_new_user(&PasswordPolicy::default()).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains("first_name"));
        assert!(fields.contains("last_name"));
    }

    #[test]
    fn weak_password_is_reported_on_password_field() {
        let mut reg = registration();
        reg.password = "12345".to_string();
        reg.password_confirm = "12345".to_string();
        let err = reg.into_new_user(&PasswordPolicy::default()).unwrap_err();
        assert!(err.field_errors().unwrap().get("password").len() >= 2);
    }

    #[test]
    fn admin_input_keeps_flags() {
        let input = AdminUserInput {
            email: "mod@example.com".to_string(),
            first_name: "Mod".to_string(),
            last_name: "Erator".to_string(),
            password: "Sup3rSecret!x".to_string(),
            is_active: true,
            is_staff: false,
            groups: [MODERATORS_GROUP.to_string()].into_iter().collect(),
        };
        let new_user = input.into_new_user(&PasswordPolicy::default()).unwrap();
        assert!(new_user.is_active);
        let user = new_user.into_user(UserId::new(1), Utc::now());
        assert!(user.roles().is_moderator());
    }

    fn stored_user() -> User {
        NewUser {
            email: "a@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            password_hash: hash_password("Wonderland42!").unwrap(),
            is_active: false,
            is_staff: false,
            groups: BTreeSet::new(),
        }
        .into_user(UserId::new(7), Utc::now())
    }

    #[test]
    fn partial_patch_toggles_activation_only() {
        let mut user = stored_user();
        let patch = UserPatch {
            is_active: Some(true),
            ..Default::default()
        };
        patch.apply(&mut user, true, &PasswordPolicy::default()).unwrap();
        assert!(user.is_active);
        assert_eq!(user.first_name, "Alice");
    }

    #[test]
    fn full_patch_requires_identity_fields() {
        let mut user = stored_user();
        let err = UserPatch::default()
            .apply(&mut user, false, &PasswordPolicy::default())
            .unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains("email") && fields.contains("first_name") && fields.contains("last_name"));
    }

    #[test]
    fn serialized_user_hides_password_hash() {
        let json = serde_json::to_value(stored_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@example.com");
    }
}
