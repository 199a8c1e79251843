use weeb_auth::{Actor, Principal};
use weeb_core::UserId;

/// Who is calling, resolved once per request by the auth middleware.
///
/// Present on every route; anonymous callers get `Actor::Anonymous`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            actor: Actor::Authenticated(principal),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.actor.user_id()
    }
}
