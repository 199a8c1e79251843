
use serde::{Deserialize, Serialize};

use weeb_core::UserId;

use crate::RoleSet;

/// An authenticated identity, resolved from a bearer token and the live
/// account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub is_active: bool,
    pub roles: RoleSet,
}

impl Principal {
    pub fn new(user_id: UserId, email: impl Into<String>, is_active: bool, roles: RoleSet) -> Self {
        Self {
            user_id,
            email: email.into(),
            is_active,
            roles,
        }
    }
}

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl Actor {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Actor::Anonymous => None,
            Actor::Authenticated(p) => Some(p),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal().map(|p| p.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Authenticated(_))
    }
}

impl From<Principal> for Actor {
    fn from(value: Principal) -> Self {
        Actor::Authenticated(value)
    }
}
