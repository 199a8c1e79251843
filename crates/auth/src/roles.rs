
use serde::{Deserialize, Serialize};

/// Name of the group whose members may edit or delete any article.
pub const MODERATORS_GROUP: &str = "Moderators";

/// Role used by the authorization policy.
///
/// Roles are derived, not stored: `Staff` comes from the account's staff flag
/// and `Moderator` from membership in [`MODERATORS_GROUP`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Moderator => "moderator",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The roles an actor holds for the duration of one request.
///
/// Computed once from the live user record and passed down as plain data.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    staff: bool,
    moderator: bool,
}

impl RoleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive roles from the account's staff flag and group names.
    pub fn from_account<'a>(is_staff: bool, groups: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            staff: is_staff,
            moderator: groups.into_iter().any(|g| g == MODERATORS_GROUP),
        }
    }

    pub fn with(mut self, role: Role) -> Self {
        match role {
            Role::Staff => self.staff = true,
            Role::Moderator => self.moderator = true,
        }
        self
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::Staff => self.staff,
            Role::Moderator => self.moderator,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.staff
    }

    pub fn is_moderator(&self) -> bool {
        self.moderator
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        [Role::Staff, Role::Moderator].into_iter().filter(|r| self.contains(*r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderator_comes_from_group_name() {
        let roles = RoleSet::from_account(false, ["Editors", MODERATORS_GROUP]);
        assert!(roles.is_moderator());
        assert!(!roles.is_staff());
        assert_eq!(roles.iter().collect::<Vec<_>>(), vec![Role::Moderator]);
    }

    #[test]
    fn group_match_is_exact() {
        let roles = RoleSet::from_account(true, ["moderators"]);
        assert!(!roles.is_moderator());
        assert!(roles.is_staff());
    }
}
