//! `weeb-auth` — user directory records, credentials, tokens and the
//! authorization policy.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod roles;
pub mod tokens;
pub mod user;

pub use authorize::{
    active_principal, authorize, require_authenticated, require_staff, Action, AuthzError, Grant,
};
pub use claims::{validate_claims, IdentitySnapshot, TokenClaims, TokenKind, TokenValidationError};
pub use password::{hash_password, verify_password, PasswordError, PasswordPolicy};
pub use principal::{Actor, Principal};
pub use roles::{Role, RoleSet, MODERATORS_GROUP};
pub use tokens::{Hs256Jwt, JwtValidator, TokenError, TokenPair};
pub use user::{AdminUserInput, NewUser, Registration, User, UserPatch};
