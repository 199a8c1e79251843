//! HS256 token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;

use crate::claims::{validate_claims, IdentitySnapshot, TokenClaims, TokenKind, TokenValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is invalid: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Access/refresh pair handed out at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Verifies bearer tokens; the HTTP middleware only needs this half.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, expected: TokenKind, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}

/// Symmetric-key token codec with configured lifetimes.
pub struct Hs256Jwt {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        // Time checks live in `validate_claims` so they can run against an
        // injected clock; the library only checks the signature here.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue a fresh pair carrying `user` as the identity snapshot.
    pub fn issue_pair(&self, user: IdentitySnapshot, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        let refresh = TokenClaims::new(TokenKind::Refresh, user.clone(), now, now + self.refresh_ttl);
        let access = TokenClaims::new(TokenKind::Access, user, now, now + self.access_ttl);
        Ok(TokenPair {
            access: self.sign(&access)?,
            refresh: self.sign(&refresh)?,
        })
    }

    /// New access token for a verified refresh token.
    ///
    /// The snapshot is copied from the refresh token, not re-read from the
    /// account.
    pub fn access_from_refresh(&self, refresh: &TokenClaims, now: DateTime<Utc>) -> Result<String, TokenError> {
        let access = TokenClaims::new(TokenKind::Access, refresh.user.clone(), now, now + self.access_ttl);
        self.sign(&access)
    }

    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, expected: TokenKind, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        validate_claims(&claims, expected, now)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use weeb_core::UserId;

    fn codec() -> Hs256Jwt {
        Hs256Jwt::new(b"test-secret", Duration::minutes(60), Duration::days(7))
    }

    fn snapshot() -> IdentitySnapshot {
        IdentitySnapshot {
            id: UserId::new(11),
            email: "writer@example.com".to_string(),
            first_name: "Wri".to_string(),
            last_name: "Ter".to_string(),
            is_staff: true,
            groups: ["Moderators".to_string()].into_iter().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn pair_roundtrip_keeps_snapshot() {
        let jwt = codec();
        let now = Utc::now();
        let pair = jwt.issue_pair(snapshot(), now).unwrap();

        let access = jwt.validate(&pair.access, TokenKind::Access, now).unwrap();
        assert_eq!(access.sub, UserId::new(11));
        assert_eq!(access.user, snapshot());

        let refresh = jwt.validate(&pair.refresh, TokenKind::Refresh, now).unwrap();
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn refresh_is_not_an_access_token() {
        let jwt = codec();
        let now = Utc::now();
        let pair = jwt.issue_pair(snapshot(), now).unwrap();
        assert!(matches!(
            jwt.validate(&pair.refresh, TokenKind::Access, now),
            Err(TokenError::Claims(TokenValidationError::WrongType { .. }))
        ));
    }

    #[test]
    fn foreign_signature_is_malformed() {
        let now = Utc::now();
        let other = Hs256Jwt::new(b"other-secret", Duration::minutes(60), Duration::days(7));
        let pair = other.issue_pair(snapshot(), now).unwrap();
        assert!(matches!(
            codec().validate(&pair.access, TokenKind::Access, now),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            codec().validate("not.a.jwt", TokenKind::Access, now),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn access_token_expires() {
        let jwt = codec();
        let now = Utc::now();
        let pair = jwt.issue_pair(snapshot(), now).unwrap();
        assert!(matches!(
            jwt.validate(&pair.access, TokenKind::Access, now + Duration::minutes(61)),
            Err(TokenError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn refreshed_access_copies_refresh_snapshot() {
        let jwt = codec();
        let now = Utc::now();
        let pair = jwt.issue_pair(snapshot(), now).unwrap();
        let refresh = jwt.validate(&pair.refresh, TokenKind::Refresh, now).unwrap();

        let later = now + Duration::minutes(90);
        let access = jwt.access_from_refresh(&refresh, later).unwrap();
        let claims = jwt.validate(&access, TokenKind::Access, later).unwrap();
        assert_eq!(claims.user, refresh.user);
    }
}
