use serde::Serialize;
use thiserror::Error;

use weeb_core::UserId;

use crate::{Actor, Principal};

/// What the actor is trying to do to a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Update and delete are decided against the resource's owner.
    pub fn is_object_level(&self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }
}

/// Why a request was allowed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// Reads need no identity.
    Public,
    /// Authenticated and active (create).
    Active,
    /// The actor authored the resource.
    Owner,
    /// The actor carries the staff flag.
    Staff,
    /// The actor belongs to the Moderators group.
    Moderator,
}

/// Authorization failure.
///
/// The variants are deliberately distinct so callers can tell "log in" from
/// "wait for activation" from "not yours".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Authentication credentials were not provided.")]
    AuthenticationRequired,

    #[error("Your account must be activated by an administrator before you can perform this action.")]
    PendingActivation,

    #[error("You can only modify or delete your own articles unless you are a moderator or an administrator.")]
    NotOwner,

    #[error("You do not have permission to perform this action.")]
    StaffRequired,
}

impl AuthzError {
    /// Whether the failure means "who are you?" rather than "not allowed".
    pub fn is_authentication(&self) -> bool {
        matches!(self, AuthzError::AuthenticationRequired)
    }
}

/// Decide whether `actor` may perform `action`.
///
/// `owner` is the resource author for object-level actions and ignored
/// otherwise.
///
/// - No IO
/// - No panics
/// - Update/delete grants are checked owner, staff, moderator; the first
///   match wins
pub fn authorize(actor: &Actor, action: Action, owner: Option<UserId>) -> Result<Grant, AuthzError> {
    if action == Action::Read {
        return Ok(Grant::Public);
    }

    let principal = active_principal(actor)?;

    if !action.is_object_level() {
        return Ok(Grant::Active);
    }

    if owner == Some(principal.user_id) {
        Ok(Grant::Owner)
    } else if principal.roles.is_staff() {
        Ok(Grant::Staff)
    } else if principal.roles.is_moderator() {
        Ok(Grant::Moderator)
    } else {
        Err(AuthzError::NotOwner)
    }
}

/// Authenticated and active; shared prefix of every write decision.
pub fn active_principal(actor: &Actor) -> Result<&Principal, AuthzError> {
    let principal = require_authenticated(actor)?;
    if !principal.is_active {
        return Err(AuthzError::PendingActivation);
    }
    Ok(principal)
}

/// Any authenticated actor, active or not.
pub fn require_authenticated(actor: &Actor) -> Result<&Principal, AuthzError> {
    actor.principal().ok_or(AuthzError::AuthenticationRequired)
}

/// Staff-only administration (user directory, categories, review inbox).
pub fn require_staff(actor: &Actor) -> Result<&Principal, AuthzError> {
    let principal = require_authenticated(actor)?;
    if principal.roles.is_staff() {
        Ok(principal)
    } else {
        Err(AuthzError::StaffRequired)
    }
}
