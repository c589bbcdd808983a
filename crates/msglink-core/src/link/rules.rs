//! Field predicates shared by classification and generation.

/// Leading-integer parse: optional `-`, then digits up to the first
/// non-digit. Returns 0 when no digits follow.
#[must_use]
pub fn to_integer(s: &str) -> i64 {
    let bytes = s.as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        _ => (false, bytes),
    };
    let mut value: u64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.wrapping_mul(10).wrapping_add(u64::from(b - b'0'));
    }
    #[allow(clippy::cast_possible_wrap)]
    let value = value as i64;
    if negative { value.wrapping_neg() } else { value }
}

#[must_use]
pub fn is_base64url_characters(s: &str) -> bool {
    s.bytes()
        .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
}

/// 1..=32 chars, ASCII letter first, then alnum or `_`, with no trailing
/// or doubled underscore.
#[must_use]
pub fn is_valid_username(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 32 || !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    if !bytes
        .iter()
        .all(|c| c.is_ascii_alphanumeric() || *c == b'_')
    {
        return false;
    }
    bytes[bytes.len() - 1] != b'_' && !s.contains("__")
}

#[must_use]
pub fn is_valid_phone_number(s: &str) -> bool {
    !s.is_empty() && s.len() <= 32 && s.bytes().all(|c| c.is_ascii_digit())
}

#[must_use]
pub fn is_valid_start_parameter(s: &str) -> bool {
    s.len() <= 64 && is_base64url_characters(s)
}

#[must_use]
pub fn is_valid_game_name(s: &str) -> bool {
    s.len() >= 3 && is_valid_username(s)
}

#[must_use]
pub fn is_valid_web_app_name(s: &str) -> bool {
    (3..=64).contains(&s.len()) && s.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'_')
}

/// A phone number is never an invite hash.
#[must_use]
pub fn is_valid_invite_hash(s: &str) -> bool {
    !s.is_empty() && is_base64url_characters(s) && !is_valid_phone_number(s)
}

#[must_use]
pub fn is_valid_folder_slug(s: &str) -> bool {
    !s.is_empty() && is_base64url_characters(s)
}

#[must_use]
pub fn is_valid_video_chat_hash(s: &str) -> bool {
    is_base64url_characters(s)
}

/// Largest bot user id accepted in passport requests, exclusive.
pub const MAX_BOT_USER_ID: i64 = 1 << 40;

/// Subdomains of the t.me host reserved for link paths.
pub(crate) const RESERVED_SUBDOMAINS: &[&str] = &[
    "addemoji",
    "addstickers",
    "addtheme",
    "auth",
    "confirmphone",
    "invoice",
    "joinchat",
    "list",
    "login",
    "proxy",
    "setlanguage",
    "share",
    "socks",
    "web",
];

#[must_use]
pub fn is_valid_subdomain_username(s: &str) -> bool {
    s.len() >= 4 && is_valid_username(s) && !RESERVED_SUBDOMAINS.contains(&s)
}
