//! Link handling for msglink
//!
//! This crate provides:
//! - URL canonicalization (`check_link`, `parse_url`, query decoding)
//! - Classification of `tg:`, `ton:` and t.me links into [`InternalLink`]
//! - Generation of deep and HTTP links from [`InternalLink`] values
//! - Configuration (`Config`, environment parsing) and error types

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod link;
pub mod url;

#[cfg(test)]
mod proptest_generators;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Error, LinkMode, Result};
pub use link::{
    AdministratorRights, BackgroundFill, ChatTypes, InternalLink, LinkManager, ProxyType,
    TargetChat, check_link, get_internal_link, is_local_name, normalize_secret,
    parse_internal_link,
};
pub use url::{
    DeepScheme, HttpUrl, Protocol, UrlQuery, parse_url, split_deep_link_scheme, url_decode,
    url_encode,
};
