//! Startup seeding.

use std::collections::BTreeSet;

use thiserror::Error;

use weeb_auth::{hash_password, NewUser, PasswordError, User};
use weeb_core::validation::{is_valid_email, normalize_email};

use crate::store::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("bootstrap email {0:?} is not a valid address")]
    InvalidEmail(String),

    #[error("bootstrap password must not be empty")]
    EmptyPassword,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create an active staff account unless one with `email` already exists.
///
/// Returns the created user, or `None` when the email was already taken.
/// An existing account is left untouched; the password is not reset.
pub async fn ensure_superuser(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<Option<User>, BootstrapError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(BootstrapError::InvalidEmail(email));
    }
    if password.is_empty() {
        return Err(BootstrapError::EmptyPassword);
    }
    if users.find_user_by_email(&email).await?.is_some() {
        tracing::debug!(%email, "bootstrap superuser already present");
        return Ok(None);
    }

    let new_user = NewUser {
        email,
        first_name: "Admin".to_string(),
        last_name: "User".to_string(),
        password_hash: hash_password(password)?,
        is_active: true,
        is_staff: true,
        groups: BTreeSet::new(),
    };
    match users.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, email = %user.email, "bootstrap superuser created");
            Ok(Some(user))
        }
        // Another instance won the race.
        Err(StoreError::Duplicate(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
