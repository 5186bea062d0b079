//! Default domain and scope for the command-line tool and bindings.

use serde::{Deserialize, Serialize};

use crate::scope::{ParseScopeError, Scope};

/// Environment variable naming the default preference domain.
pub const DOMAIN_ENV: &str = "CFPREFS_DOMAIN";
/// Environment variable holding the default scope, e.g. `current-user/any-host`.
pub const SCOPE_ENV: &str = "CFPREFS_SCOPE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CFPREFS_SCOPE: {0}")]
    Scope(#[from] ParseScopeError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preference domain, usually an application bundle identifier.
    pub domain: Option<String>,
    pub scope: Scope,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `CFPREFS_DOMAIN` and `CFPREFS_SCOPE`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config {
            domain: lookup(DOMAIN_ENV).filter(|d| !d.is_empty()),
            ..Config::default()
        };
        if let Some(scope) = lookup(SCOPE_ENV) {
            config.scope = scope.parse()?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{Host, User};

    #[test]
    fn defaults_to_app_scope() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.domain, None);
        assert_eq!(config.scope, Scope::CURRENT_USER_ANY_HOST);
    }

    #[test]
    fn parses_json() {
        let config = Config::from_json(
            r#"{"domain": "com.example.app", "scope": {"user": "any", "host": "current"}}"#,
        )
        .unwrap();
        assert_eq!(config.domain.as_deref(), Some("com.example.app"));
        assert_eq!(config.scope, Scope::new(User::Any, Host::Current));
    }

    #[test]
    fn reads_environment() {
        let config = Config::from_lookup(|name| match name {
            DOMAIN_ENV => Some("com.example.env".into()),
            SCOPE_ENV => Some("any-user/any-host".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.domain.as_deref(), Some("com.example.env"));
        assert_eq!(config.scope, Scope::ANY_USER_ANY_HOST);
    }

    #[test]
    fn rejects_bad_scope() {
        let err = Config::from_lookup(|name| (name == SCOPE_ENV).then(|| "everyone".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Scope(_)));
    }
}
