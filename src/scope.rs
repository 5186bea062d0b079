//! User and host visibility of a preference value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which users a preference applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum User {
    /// The user running the process.
    Current,
    /// Every user on the machine. Writing requires elevated privilege.
    Any,
}

/// Which hosts a preference applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Host {
    Current,
    Any,
}

/// A user/host pair selecting one of the four preference search domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub user: User,
    pub host: Host,
}

impl Scope {
    pub const CURRENT_USER_CURRENT_HOST: Scope = Scope::new(User::Current, Host::Current);
    pub const CURRENT_USER_ANY_HOST: Scope = Scope::new(User::Current, Host::Any);
    pub const ANY_USER_CURRENT_HOST: Scope = Scope::new(User::Any, Host::Current);
    pub const ANY_USER_ANY_HOST: Scope = Scope::new(User::Any, Host::Any);

    pub const fn new(user: User, host: Host) -> Self {
        Scope { user, host }
    }

    /// Whether writes in this scope need elevated privilege.
    pub fn is_privileged(&self) -> bool {
        self.user == User::Any
    }
}

/// The scope used by the application-level calls.
impl Default for Scope {
    fn default() -> Self {
        Scope::CURRENT_USER_ANY_HOST
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = match self.user {
            User::Current => "current-user",
            User::Any => "any-user",
        };
        let host = match self.host {
            Host::Current => "current-host",
            Host::Any => "any-host",
        };
        write!(f, "{user}/{host}")
    }
}

/// Error returned when a scope string is not one of the four named scopes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scope {0:?}: expected <current-user|any-user>/<current-host|any-host>")]
pub struct ParseScopeError(String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseScopeError(s.to_string());
        let (user, host) = s.trim().split_once('/').ok_or_else(invalid)?;
        let user = match user {
            "current-user" => User::Current,
            "any-user" => User::Any,
            _ => return Err(invalid()),
        };
        let host = match host {
            "current-host" => Host::Current,
            "any-host" => Host::Any,
            _ => return Err(invalid()),
        };
        Ok(Scope::new(user, host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_scopes_parse_and_display() {
        for scope in [
            Scope::CURRENT_USER_CURRENT_HOST,
            Scope::CURRENT_USER_ANY_HOST,
            Scope::ANY_USER_CURRENT_HOST,
            Scope::ANY_USER_ANY_HOST,
        ] {
            assert_eq!(scope.to_string().parse::<Scope>(), Ok(scope));
        }
    }

    #[test]
    fn rejects_unknown_scope() {
        assert!("current-user".parse::<Scope>().is_err());
        assert!("some-user/any-host".parse::<Scope>().is_err());
        assert!("any-user/no-host".parse::<Scope>().is_err());
    }

    #[test]
    fn only_any_user_is_privileged() {
        assert!(!Scope::CURRENT_USER_ANY_HOST.is_privileged());
        assert!(Scope::ANY_USER_CURRENT_HOST.is_privileged());
    }
}
