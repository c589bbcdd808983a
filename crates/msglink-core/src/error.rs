//! Error types for msglink
//!
//! Classification never fails: "no match" is an absent result. These errors
//! cover link generation, URL checking, configuration, and CLI input.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for msglink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which flavour of link a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// `tg://` deep link.
    Deep,
    /// `https://t.me/` link.
    Http,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deep => f.write_str("Deep"),
            Self::Http => f.write_str("HTTP"),
        }
    }
}

/// Main error type for msglink
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Link Generation Errors
    // ==========================================================================
    #[error("{0} link is unavailable for the link type")]
    Unavailable(LinkMode),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    // ==========================================================================
    // URL Errors
    // ==========================================================================
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL protocol: {0}")]
    UnsupportedScheme(String),

    #[error("Wrong port number specified in the URL: {0}")]
    InvalidPort(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Input Errors
    // ==========================================================================
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the error type name for machine consumption.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "LINK_UNAVAILABLE",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::UnsupportedScheme(_) => "UNSUPPORTED_SCHEME",
            Self::InvalidPort(_) => "INVALID_PORT",
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Json(_) => "INVALID_JSON",
            Self::Io(_) => "OS_ERROR",
        }
    }
}
