//! Proxy links and MTProto secret normalization.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};

use super::rules::to_integer;
use super::types::{InternalLink, ProxyType};
use crate::url::UrlQuery;

/// Longest fake-TLS domain carried after the `0xee` marker and 16-byte key.
const MAX_SECRET_DOMAIN_LEN: usize = 182;

const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    s.as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            u8::try_from(hi * 16 + lo).ok()
        })
        .collect()
}

fn is_supported_secret(raw: &[u8]) -> bool {
    match raw.len() {
        16 => true,
        17 => raw[0] == 0xdd,
        n if n >= 18 => raw[0] == 0xee && n <= 17 + MAX_SECRET_DOMAIN_LEN,
        _ => false,
    }
}

/// Decode a secret given as hex or base64url and re-encode it canonically.
///
/// Returns `None` when the secret is malformed or of an unsupported kind.
#[must_use]
pub fn normalize_secret(encoded: &str) -> Option<String> {
    let raw = hex_decode(encoded).or_else(|| LENIENT_URL_SAFE.decode(encoded).ok())?;
    if !is_supported_secret(&raw) {
        return None;
    }
    if raw[0] == 0xee && raw.len() >= 18 {
        Some(BASE64_URL_SAFE_NO_PAD.encode(&raw))
    } else {
        Some(raw.iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// Checked proxy port, or `None` when outside 1..=65535.
pub(crate) fn proxy_port(raw: &str) -> Option<u16> {
    u16::try_from(to_integer(raw)).ok().filter(|port| *port > 0)
}

/// Classify `proxy?server=&port=&secret=` or `socks?server=&port=[&user=&pass=]`.
pub(crate) fn proxy_link(query: &UrlQuery, is_socks: bool) -> InternalLink {
    let server = query.arg("server");
    let Some(port) = proxy_port(&query.arg("port")) else {
        return InternalLink::UnsupportedProxy;
    };
    if server.is_empty() {
        return InternalLink::UnsupportedProxy;
    }
    let proxy = if is_socks {
        ProxyType::Socks5 {
            username: query.arg("user"),
            password: query.arg("pass"),
        }
    } else {
        match normalize_secret(&query.arg("secret")) {
            Some(secret) => ProxyType::Mtproto { secret },
            None => return InternalLink::UnsupportedProxy,
        }
    };
    InternalLink::Proxy {
        server,
        port,
        proxy,
    }
}
