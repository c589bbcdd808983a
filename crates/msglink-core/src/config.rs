//! Configuration management for msglink
//!
//! Values come from environment variables. Every field has a default, so
//! `Config::default()` is a fully working configuration.

use std::env;

use crate::error::{Error, Result};

/// Default prefix for generated HTTP links.
pub const DEFAULT_T_ME_URL: &str = "https://t.me/";

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix for generated HTTP links. Always ends with `/`.
    pub t_me_url: String,
    /// Additional hosts treated exactly like `t.me`.
    pub extra_t_me_hosts: Vec<String>,
    /// Fixed seed for ordered-message priorities; `None` draws from OS entropy.
    pub history_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            t_me_url: DEFAULT_T_ME_URL.to_string(),
            extra_t_me_hosts: Vec::new(),
            history_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// An invalid `MSGLINK_T_ME_URL` is logged and replaced by the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = env_value("MSGLINK_T_ME_URL") {
            config.t_me_url = normalize_t_me_url(&url);
        }
        if let Some(hosts) = env_value("MSGLINK_EXTRA_T_ME_HOSTS") {
            config.extra_t_me_hosts = parse_csv(&hosts)
                .into_iter()
                .map(|host| host.to_ascii_lowercase())
                .collect();
        }
        config.history_seed = env_u64_opt("MSGLINK_HISTORY_SEED");

        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "ignoring MSGLINK_T_ME_URL");
            config.t_me_url = DEFAULT_T_ME_URL.to_string();
        }
        config
    }

    /// Check that `t_me_url` has the shape `http(s)://host/`.
    pub fn validate(&self) -> Result<()> {
        let rest = self
            .t_me_url
            .strip_prefix("https://")
            .or_else(|| self.t_me_url.strip_prefix("http://"))
            .ok_or_else(|| Error::Config(format!("t_me_url must be http(s): {}", self.t_me_url)))?;
        let Some(host) = rest.strip_suffix('/') else {
            return Err(Error::Config(format!(
                "t_me_url must end with '/': {}",
                self.t_me_url
            )));
        };
        if host.is_empty() || host.contains(['/', '?', '#', '@']) {
            return Err(Error::Config(format!(
                "t_me_url must be a bare host: {}",
                self.t_me_url
            )));
        }
        Ok(())
    }

    /// Host part of `t_me_url`, lowercased, without `www.`.
    #[must_use]
    pub fn t_me_host(&self) -> Option<String> {
        let rest = self
            .t_me_url
            .strip_prefix("https://")
            .or_else(|| self.t_me_url.strip_prefix("http://"))?;
        let host = rest.trim_end_matches('/').to_ascii_lowercase();
        let host = host.strip_prefix("www.").map_or(host.clone(), str::to_string);
        (!host.is_empty()).then_some(host)
    }
}

fn normalize_t_me_url(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

// Helper functions for environment variable parsing

#[cfg(test)]
thread_local! {
    static TEST_ENV_OVERRIDES: std::cell::RefCell<std::collections::HashMap<String, String>> =
        std::cell::RefCell::new(std::collections::HashMap::new());
}

#[cfg(test)]
fn test_env_override_value(key: &str) -> Option<String> {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow().get(key).cloned())
}

/// Read a value from the environment.
#[must_use]
pub fn env_value(key: &str) -> Option<String> {
    #[cfg(test)]
    if let Some(v) = test_env_override_value(key) {
        return Some(v);
    }
    env::var(key).ok()
}

fn env_u64_opt(key: &str) -> Option<u64> {
    env_value(key).and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            trimmed.parse().ok()
        }
    })
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestEnvOverrideGuard {
        previous: Vec<(String, Option<String>)>,
    }

    impl TestEnvOverrideGuard {
        fn set(vars: &[(&str, &str)]) -> Self {
            let mut previous = Vec::new();
            TEST_ENV_OVERRIDES.with(|cell| {
                let mut map = cell.borrow_mut();
                for (key, value) in vars {
                    let old = map.get(*key).cloned();
                    previous.push(((*key).to_string(), old));
                    map.insert((*key).to_string(), (*value).to_string());
                }
            });
            Self { previous }
        }
    }

    impl Drop for TestEnvOverrideGuard {
        fn drop(&mut self) {
            TEST_ENV_OVERRIDES.with(|cell| {
                let mut map = cell.borrow_mut();
                for (key, value) in self.previous.drain(..) {
                    match value {
                        Some(v) => {
                            map.insert(key, v);
                        }
                        None => {
                            map.remove(&key);
                        }
                    }
                }
            });
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.t_me_url, "https://t.me/");
        assert!(config.extra_t_me_hosts.is_empty());
        assert!(config.history_seed.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.t_me_host().as_deref(), Some("t.me"));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let _guard = TestEnvOverrideGuard::set(&[
            ("MSGLINK_T_ME_URL", "https://www.Example.org"),
            ("MSGLINK_EXTRA_T_ME_HOSTS", " tg.dev, ,Links.Example.com "),
            ("MSGLINK_HISTORY_SEED", "42"),
        ]);
        let config = Config::from_env();
        assert_eq!(config.t_me_url, "https://www.Example.org/");
        assert_eq!(config.t_me_host().as_deref(), Some("example.org"));
        assert_eq!(
            config.extra_t_me_hosts,
            vec!["tg.dev".to_string(), "links.example.com".to_string()]
        );
        assert_eq!(config.history_seed, Some(42));
    }

    #[test]
    fn test_invalid_t_me_url_falls_back() {
        let _guard = TestEnvOverrideGuard::set(&[("MSGLINK_T_ME_URL", "ftp://t.me/x")]);
        let config = Config::from_env();
        assert_eq!(config.t_me_url, DEFAULT_T_ME_URL);
    }

    #[test]
    fn test_blank_seed_is_none() {
        let _guard = TestEnvOverrideGuard::set(&[("MSGLINK_HISTORY_SEED", "  ")]);
        assert!(Config::from_env().history_seed.is_none());
    }

    #[test]
    fn test_validate_rejects_paths() {
        let config = Config {
            t_me_url: "https://t.me/path/".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_csv() {
        assert_eq!(parse_csv("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_csv("").is_empty());
    }
}
