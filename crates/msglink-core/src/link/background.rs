//! Background links: `tg://bg?...` and `t.me/bg/<name>`.
//!
//! A background name is either a fill (`rrggbb`, `aaaaaa-bbbbbb`,
//! `a~b~c[~d]`) or a server slug, optionally followed by `?params`.

use super::rules::{is_base64url_characters, to_integer};
use crate::error::{Error, Result};
use crate::url::{UrlQuery, url_encode};

/// Slug parameters in their canonical order.
const SLUG_PARAMS: [&str; 4] = ["mode", "intensity", "bg_color", "rotation"];

fn with_params(name: String, params: &[String]) -> String {
    if params.is_empty() {
        name
    } else {
        format!("{name}?{}", params.join("&"))
    }
}

/// Names that are parsed as fills rather than looked up as slugs.
#[must_use]
pub fn is_local_name(name: &str) -> bool {
    let slug_end = name.find('?').unwrap_or(name.len());
    slug_end <= 13 || !is_base64url_characters(&name[..slug_end])
}

/// Background name from a `tg://bg` query.
pub(crate) fn from_deep_query(query: &UrlQuery) -> Option<String> {
    let mut params = Vec::new();
    let color = query.arg("color");
    if !color.is_empty() {
        return Some(url_encode(&color));
    }
    let gradient = query.arg("gradient");
    if !gradient.is_empty() {
        params.extend(query.encoded_arg("rotation"));
        return Some(with_params(url_encode(&gradient), &params));
    }
    let slug = query.arg("slug");
    if !slug.is_empty() {
        for key in SLUG_PARAMS {
            params.extend(query.encoded_arg(key));
        }
        return Some(with_params(url_encode(&slug), &params));
    }
    None
}

/// Background name from `t.me/bg/<name>`.
pub(crate) fn from_http_path(name: &str, query: &UrlQuery) -> String {
    let mut params = Vec::new();
    if is_local_name(name) {
        params.extend(query.encoded_arg("rotation"));
    } else {
        for key in SLUG_PARAMS {
            params.extend(query.encoded_arg(key));
        }
    }
    with_params(url_encode(name), &params)
}

/// A parsed background name, ready for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundFill {
    Solid(String),
    Gradient { top: String, bottom: String, rotation: i64 },
    Freeform(Vec<String>),
    /// Server slug plus its raw parameter string.
    Slug { slug: String, params: String },
}

fn invalid_background() -> Error {
    Error::invalid_field("background_name", "wrong background name")
}

fn parse_color(s: &str) -> Result<String> {
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(s.to_ascii_lowercase())
    } else {
        Err(invalid_background())
    }
}

fn parse_rotation(params: &str) -> i64 {
    let query = UrlQuery::parse(&format!("?{params}"));
    let rotation = to_integer(&query.arg("rotation"));
    if (0..360).contains(&rotation) && rotation % 45 == 0 {
        rotation
    } else {
        0
    }
}

impl BackgroundFill {
    pub fn parse(name: &str) -> Result<Self> {
        let (slug, params) = name.split_once('?').unwrap_or((name, ""));
        if !is_local_name(name) {
            if slug.is_empty() || !is_base64url_characters(slug) {
                return Err(invalid_background());
            }
            return Ok(Self::Slug {
                slug: slug.to_string(),
                params: params.to_string(),
            });
        }

        if slug.len() == 6 {
            return parse_color(slug).map(Self::Solid);
        }
        let parts: Vec<&str> = if slug.contains('~') {
            slug.split('~').collect()
        } else {
            slug.split('-').collect()
        };
        match parts.as_slice() {
            [top, bottom] => Ok(Self::Gradient {
                top: parse_color(top)?,
                bottom: parse_color(bottom)?,
                rotation: parse_rotation(params),
            }),
            [_, _, _] | [_, _, _, _] if slug.contains('~') => Ok(Self::Freeform(
                parts
                    .iter()
                    .map(|part| parse_color(part))
                    .collect::<Result<_>>()?,
            )),
            _ => Err(invalid_background()),
        }
    }

    /// Canonical name used in `t.me/bg/<name>`.
    #[must_use]
    pub fn http_name(&self) -> String {
        match self {
            Self::Solid(color) => color.clone(),
            Self::Gradient {
                top,
                bottom,
                rotation,
            } => format!("{top}-{bottom}?rotation={rotation}"),
            Self::Freeform(colors) => colors.join("~"),
            Self::Slug { slug, params } if params.is_empty() => slug.clone(),
            Self::Slug { slug, params } => format!("{slug}?{params}"),
        }
    }

    /// Query of the matching `tg://bg` link.
    #[must_use]
    pub fn deep_query(&self) -> String {
        match self {
            Self::Solid(color) => format!("color={color}"),
            Self::Gradient {
                top,
                bottom,
                rotation,
            } => format!("gradient={top}-{bottom}&rotation={rotation}"),
            Self::Freeform(colors) => format!("gradient={}", colors.join("~")),
            Self::Slug { slug, params } if params.is_empty() => format!("slug={slug}"),
            Self::Slug { slug, params } => format!("slug={slug}&{params}"),
        }
    }
}
