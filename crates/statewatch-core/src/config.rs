#![forbid(unsafe_code)]

//! Registry configuration.
//!
//! The only tunable today is what happens when a watcher refuses a
//! synchronous re-render. Configuration can be built in code or read from
//! the environment:
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `STATEWATCH_RETRY` | `evict`, `next-tick`, `next-tick:<n>` | `next-tick` (1 attempt) |
//!
//! The environment is read only by [`RegistryConfig::from_env`] and its
//! variants. [`StateRegistry::default`](crate::StateRegistry) uses the
//! built-in defaults, so an application that honors `STATEWATCH_RETRY`
//! builds its registry with `StateRegistry::new(RegistryConfig::from_env())`.

use std::env;
use std::fmt;

const ENV_RETRY: &str = "STATEWATCH_RETRY";

/// What the registry does when `request_render` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Remove the watcher immediately.
    Evict,
    /// Hand the render to the frame scheduler, retrying up to `attempts`
    /// times. The mounted check runs when the deferred task fires.
    NextTick { attempts: u8 },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NextTick { attempts: 1 }
    }
}

impl RetryPolicy {
    /// Parse `evict`, `next-tick` or `next-tick:<n>`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "evict" => Some(Self::Evict),
            "next-tick" => Some(Self::default()),
            other => {
                let attempts = other.strip_prefix("next-tick:")?;
                attempts
                    .parse::<u8>()
                    .ok()
                    .map(|attempts| Self::NextTick { attempts })
            }
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evict => write!(f, "evict"),
            Self::NextTick { attempts } => write!(f, "next-tick:{attempts}"),
        }
    }
}

/// Configuration for a [`StateRegistry`](crate::StateRegistry).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Handling of failed synchronous render requests.
    pub retry_policy: RetryPolicy,
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: RegistryConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl RegistryConfig {
    /// Set the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config using a custom environment lookup.
    pub fn from_env_with<F>(mut get: F) -> ConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_RETRY) {
            match RetryPolicy::parse(&value) {
                Some(policy) => config.retry_policy = policy,
                None => errors.push(ConfigError::new(
                    "retry_policy",
                    value,
                    "expected evict|next-tick|next-tick:<n>",
                )),
            }
        }

        if let Err(mut invalid) = config.validate() {
            errors.append(&mut invalid);
            config = Self::default();
        }

        ConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if let RetryPolicy::NextTick { attempts: 0 } = self.retry_policy {
            errors.push(ConfigError::new(
                "retry_policy",
                self.retry_policy.to_string(),
                "next-tick needs at least one attempt; use evict instead",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> ConfigParse {
        RegistryConfig::from_env_with(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
    }

    #[test]
    fn defaults_without_env() {
        let parsed = parse(&[]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.retry_policy, RetryPolicy::NextTick { attempts: 1 });
    }

    #[test]
    fn retry_policy_variants() {
        assert_eq!(RetryPolicy::parse("evict"), Some(RetryPolicy::Evict));
        assert_eq!(
            RetryPolicy::parse(" Next-Tick "),
            Some(RetryPolicy::NextTick { attempts: 1 })
        );
        assert_eq!(
            RetryPolicy::parse("next-tick:3"),
            Some(RetryPolicy::NextTick { attempts: 3 })
        );
        assert_eq!(RetryPolicy::parse("sometimes"), None);
        assert_eq!(RetryPolicy::parse("next-tick:many"), None);
    }

    #[test]
    fn retry_policy_rejects_unlisted_spellings() {
        for value in ["drop", "off", "defer", "next_tick", "next_tick:2"] {
            assert_eq!(RetryPolicy::parse(value), None, "{value}");
        }
    }

    #[test]
    fn env_overrides_policy() {
        let parsed = parse(&[("STATEWATCH_RETRY", "evict")]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.retry_policy, RetryPolicy::Evict);
    }

    #[test]
    fn bad_value_reports_and_keeps_default() {
        let parsed = parse(&[("STATEWATCH_RETRY", "never")]);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, "retry_policy");
        assert_eq!(parsed.config, RegistryConfig::default());
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let config =
            RegistryConfig::default().with_retry_policy(RetryPolicy::NextTick { attempts: 0 });
        assert!(config.validate().is_err());

        let parsed = parse(&[("STATEWATCH_RETRY", "next-tick:0")]);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.config, RegistryConfig::default());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let policy = RetryPolicy::NextTick { attempts: 4 };
        assert_eq!(RetryPolicy::parse(&policy.to_string()), Some(policy));
    }
}
