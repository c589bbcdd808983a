//! URL tokenizer and canonicalizer.
//!
//! Everything the link classifier consumes comes through here:
//!
//! 1. `parse_url` splits `[scheme://][userinfo@]host[:port][rest]`, checks the
//!    port and host characters, and escapes control bytes in the rest.
//! 2. `check_link` renders the canonical form of a `tg:`/`ton:`/HTTP link.
//! 3. `UrlQuery` splits the rest into decoded path segments and arguments.
//!
//! Percent-decoding is single pass: `%252E` decodes to `%2E`, never to `.`.
//! Escapes without two hex digits after `%` are copied verbatim.

use std::fmt;
use std::net::Ipv6Addr;

use crate::error::{Error, Result};

// ──────────────────────────────────────────────────────────────────────────────
// Percent codec
// ──────────────────────────────────────────────────────────────────────────────

const HEX: &[u8; 16] = b"0123456789ABCDEF";

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Percent-decode `input` into raw bytes.
///
/// With `plus_as_space`, `+` becomes a space (query component rules).
#[must_use]
pub fn url_decode_bytes(input: &str, plus_as_space: bool) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(if plus_as_space && b == b'+' { b' ' } else { b });
        i += 1;
    }
    out
}

/// Percent-decode `input`, replacing invalid UTF-8 lossily.
#[must_use]
pub fn url_decode(input: &str, plus_as_space: bool) -> String {
    String::from_utf8_lossy(&url_decode_bytes(input, plus_as_space)).into_owned()
}

/// Percent-encode every byte outside the unreserved set `A-Za-z0-9-._~`.
#[must_use]
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for &b in input.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(b));
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[usize::from(b >> 4)]));
                out.push(char::from(HEX[usize::from(b & 0x0F)]));
            }
        }
    }
    out
}

// ──────────────────────────────────────────────────────────────────────────────
// HTTP URL
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// A syntactically checked URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl {
    pub protocol: Protocol,
    pub userinfo: String,
    /// Lowercased host; IPv6 hosts keep their brackets.
    pub host: String,
    pub is_ipv6: bool,
    /// Port written in the URL, 0 when absent.
    pub specified_port: u16,
    /// Effective port.
    pub port: u16,
    /// Path, query and fragment. Always starts with `/`.
    pub query: String,
}

impl HttpUrl {
    /// Render the URL in canonical form.
    #[must_use]
    pub fn get_url(&self) -> String {
        let mut result = String::with_capacity(self.host.len() + self.query.len() + 16);
        result.push_str(self.protocol.as_str());
        result.push_str("://");
        if !self.userinfo.is_empty() {
            result.push_str(&self.userinfo);
            result.push('@');
        }
        result.push_str(&self.host);
        if self.specified_port > 0 {
            result.push(':');
            result.push_str(&self.specified_port.to_string());
        }
        result.push_str(&self.query);
        result
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_url())
    }
}

/// Parse `[scheme://][userinfo@]host[:port][rest]`. The scheme defaults to
/// `http` when absent.
pub fn parse_url(url: &str) -> Result<HttpUrl> {
    let scheme_end = url
        .find([':', '/', '?', '#', '@', '[', ']'])
        .unwrap_or(url.len());
    let (protocol, rest) = if url[scheme_end..].starts_with("://") {
        let scheme = url[..scheme_end].to_ascii_lowercase();
        let protocol = match scheme.as_str() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            _ => return Err(Error::UnsupportedScheme(scheme)),
        };
        (protocol, &url[scheme_end + 3..])
    } else {
        (Protocol::Http, url)
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let (userinfo_host, specified_port) = match authority.rfind([':', ']', '@']) {
        Some(pos) if pos > 0 && authority.as_bytes()[pos] == b':' => {
            (&authority[..pos], parse_port(&authority[pos + 1..])?)
        }
        _ => (authority, 0),
    };

    let (userinfo, host) = userinfo_host
        .rfind('@')
        .map_or(("", userinfo_host), |at| {
            (&userinfo_host[..at], &userinfo_host[at + 1..])
        });

    let mut is_ipv6 = false;
    if host.len() >= 2 && host.starts_with('[') && host.ends_with(']') {
        host[1..host.len() - 1]
            .parse::<Ipv6Addr>()
            .map_err(|_| Error::InvalidUrl(format!("wrong IPv6 address: {host}")))?;
        is_ipv6 = true;
    }
    if host.is_empty() {
        return Err(Error::InvalidUrl("URL host is empty".to_string()));
    }
    if host == "." {
        return Err(Error::InvalidUrl("host is invalid".to_string()));
    }

    let host = host.to_ascii_lowercase();
    if !is_ipv6 {
        check_url_part(&host, "host", false)?;
    }
    check_url_part(userinfo, "userinfo", true)?;

    let port = if specified_port == 0 {
        protocol.default_port()
    } else {
        specified_port
    };

    Ok(HttpUrl {
        protocol,
        userinfo: userinfo.to_string(),
        host,
        is_ipv6,
        specified_port,
        port,
        query: escape_tail(tail),
    })
}

fn parse_port(raw: &str) -> Result<u16> {
    let trimmed = raw.trim_start_matches('0');
    let digits = if trimmed.is_empty() && !raw.is_empty() {
        "0"
    } else {
        trimmed
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPort(raw.to_string()));
    }
    match digits.parse::<u32>() {
        Ok(port @ 1..=65535) => u16::try_from(port).map_err(|_| Error::InvalidPort(raw.to_string())),
        _ => Err(Error::InvalidPort(raw.to_string())),
    }
}

fn escape_tail(tail: &str) -> String {
    let tail = tail.trim_end_matches(|c: char| c.is_ascii_whitespace() || c == '\0' || c == '\x0b');
    let mut out = String::with_capacity(tail.len() + 1);
    if !tail.starts_with('/') {
        out.push('/');
    }
    for ch in tail.chars() {
        match u8::try_from(ch) {
            Ok(b) if b <= 0x20 => {
                out.push('%');
                out.push(char::from(HEX[usize::from(b >> 4)]));
                out.push(char::from(HEX[usize::from(b & 0x0F)]));
            }
            _ => out.push(ch),
        }
    }
    out
}

fn check_url_part(part: &str, name: &str, allow_colon: bool) -> Result<()> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        let allowed = c.is_ascii_alphanumeric()
            || b".-_!$,~*'();&+=".contains(&c)
            || (allow_colon && c == b':')
            || c >= 0x80;
        if allowed {
            i += 1;
            continue;
        }
        if c == b'%'
            && i + 2 < bytes.len()
            && hex_value(bytes[i + 1]).is_some()
            && hex_value(bytes[i + 2]).is_some()
        {
            i += 3;
            continue;
        }
        return Err(Error::InvalidUrl(format!("disallowed character in URL {name}")));
    }
    Ok(())
}

// ──────────────────────────────────────────────────────────────────────────────
// Deep-link schemes and canonical form
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepScheme {
    Tg,
    Ton,
}

impl DeepScheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tg => "tg",
            Self::Ton => "ton",
        }
    }
}

pub(crate) fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Strip a case-insensitive `tg:`/`ton:` prefix and an optional `//`.
#[must_use]
pub fn split_deep_link_scheme(link: &str) -> (Option<DeepScheme>, &str) {
    let (scheme, rest) = if starts_with_ignore_case(link, "tg:") {
        (Some(DeepScheme::Tg), &link[3..])
    } else if starts_with_ignore_case(link, "ton:") {
        (Some(DeepScheme::Ton), &link[4..])
    } else {
        return (None, link);
    };
    (scheme, rest.strip_prefix("//").unwrap_or(rest))
}

/// Canonicalize a `tg:`, `ton:` or HTTP(S) link.
///
/// Deep links come back as `tg://host[/rest]` with a `/` dropped before `?`;
/// HTTP links keep their scheme, lowercased host, and explicit port.
pub fn check_link(link: &str) -> Result<String> {
    let (scheme, rest) = split_deep_link_scheme(link);
    let url = parse_url(rest)?;
    if !url.userinfo.is_empty() {
        return Err(Error::InvalidUrl("link must not contain user info".to_string()));
    }

    if let Some(scheme) = scheme {
        if starts_with_ignore_case(rest, "http://")
            || url.protocol == Protocol::Https
            || url.specified_port != 0
            || url.is_ipv6
        {
            return Err(Error::InvalidUrl(format!("wrong {} URL", scheme.as_str())));
        }
        if !url
            .host
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        {
            return Err(Error::InvalidUrl("unallowed characters in URL host".to_string()));
        }
        let query = if url.query.as_bytes().get(1) == Some(&b'?') {
            &url.query[1..]
        } else {
            url.query.as_str()
        };
        return Ok(format!("{}://{}{query}", scheme.as_str(), url.host));
    }

    if !url.host.contains('.') && !url.is_ipv6 {
        return Err(Error::InvalidUrl("wrong HTTP URL".to_string()));
    }
    Ok(url.get_url())
}

// ──────────────────────────────────────────────────────────────────────────────
// Query splitting
// ──────────────────────────────────────────────────────────────────────────────

/// Decoded path segments and arguments of a link.
///
/// Argument lookups are first-value-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlQuery {
    pub path: Vec<String>,
    args: Vec<(String, Vec<u8>)>,
}

impl UrlQuery {
    /// Split `[/]path[?args][#fragment]`.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('/').unwrap_or(query);
        let path_end = query.find(['?', '#']).unwrap_or(query.len());

        let mut path: Vec<String> = url_decode(&query[..path_end], false)
            .split('/')
            .map(str::to_string)
            .collect();
        while path.last().is_some_and(String::is_empty) {
            path.pop();
        }

        let mut args = Vec::new();
        if query[path_end..].starts_with('?') {
            let raw = &query[path_end + 1..];
            let raw = raw.find('#').map_or(raw, |pos| &raw[..pos]);
            for pair in raw.split('&') {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = url_decode(key, true);
                if !key.is_empty() {
                    args.push((key, url_decode_bytes(value, true)));
                }
            }
        }

        Self { path, args }
    }

    fn raw_arg(&self, key: &str) -> Option<&[u8]> {
        self.args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// First value of `key`, or `""` when absent.
    #[must_use]
    pub fn arg(&self, key: &str) -> String {
        self.raw_arg(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }

    /// First value of `key`; `None` when it is not valid UTF-8.
    #[must_use]
    pub fn arg_utf8(&self, key: &str) -> Option<String> {
        self.raw_arg(key).map_or_else(
            || Some(String::new()),
            |v| String::from_utf8(v.to_vec()).ok(),
        )
    }

    #[must_use]
    pub fn has_arg(&self, key: &str) -> bool {
        self.raw_arg(key).is_some()
    }

    /// `key` or `key=<re-encoded value>` when the key is present.
    #[must_use]
    pub fn encoded_arg(&self, key: &str) -> Option<String> {
        let value = self.arg(key);
        if !self.has_arg(key) {
            None
        } else if value.is_empty() {
            Some(key.to_string())
        } else {
            Some(format!("{key}={}", url_encode(&value)))
        }
    }

    /// Arguments in query order, values decoded lossily.
    pub fn args(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.args
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v).into_owned()))
    }
}
