//! Internal link classification and generation.
//!
//! [`LinkManager`] owns the host configuration. The free functions use a
//! process-wide manager built from [`Config::from_env`].

mod background;
mod classify;
mod generate;
mod proxy;
mod rights;
pub mod rules;
mod types;

use std::sync::LazyLock;

pub use background::{BackgroundFill, is_local_name};
pub use proxy::normalize_secret;
pub use types::{AdministratorRights, ChatTypes, InternalLink, ProxyType, TargetChat};

use crate::config::Config;
use crate::error::Result;

/// Hosts always recognized as t.me.
const BUILTIN_T_ME_HOSTS: [&str; 3] = ["t.me", "telegram.me", "telegram.dog"];

/// Classifies links into [`InternalLink`] values and renders them back.
#[derive(Debug, Clone)]
pub struct LinkManager {
    t_me_url: String,
    /// Host whose single-label subdomains are usernames.
    t_me_host: String,
    t_me_hosts: Vec<String>,
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl LinkManager {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let t_me_host = config
            .t_me_host()
            .unwrap_or_else(|| BUILTIN_T_ME_HOSTS[0].to_string());
        let mut t_me_hosts: Vec<String> = BUILTIN_T_ME_HOSTS.iter().map(ToString::to_string).collect();
        for host in std::iter::once(&t_me_host).chain(&config.extra_t_me_hosts) {
            let host = host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase();
            if !t_me_hosts.contains(&host) {
                t_me_hosts.push(host);
            }
        }
        Self {
            t_me_url: config.t_me_url.clone(),
            t_me_host,
            t_me_hosts,
        }
    }

    /// Prefix of generated HTTP links, ending with `/`.
    #[must_use]
    pub fn t_me_url(&self) -> &str {
        &self.t_me_url
    }

    /// Canonicalize a `tg:`, `ton:` or HTTP(S) link.
    pub fn check_link(&self, link: &str) -> Result<String> {
        crate::url::check_link(link)
    }
}

static DEFAULT_MANAGER: LazyLock<LinkManager> =
    LazyLock::new(|| LinkManager::new(&Config::from_env()));

/// Canonicalize a link with the process-wide configuration.
pub fn check_link(link: &str) -> Result<String> {
    DEFAULT_MANAGER.check_link(link)
}

/// Classify a link with the process-wide configuration.
#[must_use]
pub fn parse_internal_link(link: &str, is_trusted: bool) -> Option<InternalLink> {
    DEFAULT_MANAGER.parse_internal_link(link, is_trusted)
}

/// Render a link with the process-wide configuration.
pub fn get_internal_link(link: &InternalLink, is_internal: bool) -> Result<String> {
    DEFAULT_MANAGER.get_internal_link(link, is_internal)
}
