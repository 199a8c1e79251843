use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use weeb_core::UserId;

use crate::User;

/// Which half of the token pair a token is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Identity fields copied into a token at issuance.
///
/// This is a frozen snapshot: it is not updated when the account changes and
/// only a new login produces a fresh one. Authorization never reads it; it is
/// for clients that want to render "logged in as" without a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub groups: BTreeSet<String>,
}

impl From<&User> for IdentitySnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_staff: user.is_staff,
            groups: user.groups.clone(),
        }
    }
}

/// JWT claims model (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub token_type: TokenKind,

    /// Unique token id; the blacklist is keyed by it.
    pub jti: Uuid,

    /// Subject / account identifier.
    pub sub: UserId,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiration, seconds since the epoch.
    pub exp: i64,

    pub user: IdentitySnapshot,
}

impl TokenClaims {
    pub fn new(
        token_type: TokenKind,
        user: IdentitySnapshot,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_type,
            jti: Uuid::new_v4(),
            sub: user.id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            user,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("expected a {expected} token, got a {found} token")]
    WrongType { expected: TokenKind, found: TokenKind },
}

/// Leeway for clocks that disagree about "now" by a few seconds.
const CLOCK_SKEW_SECS: i64 = 30;

/// Deterministically validate token claims.
///
/// Note: this validates the *claims* only. Signature verification is done by
/// the codec before this runs.
pub fn validate_claims(
    claims: &TokenClaims,
    expected: TokenKind,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.token_type != expected {
        return Err(TokenValidationError::WrongType {
            expected,
            found: claims.token_type,
        });
    }
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now + CLOCK_SKEW_SECS < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
