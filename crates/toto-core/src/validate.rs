//! Input validation shared by the admin and viewer surfaces.
//!
//! Every check returns [`Error::Validation`] carrying the localized message
//! shown to the user, and runs before anything is written.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::locale;

/// Maximum length of chat and broadcast messages, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;
pub const MIN_PASSWORD_CHARS: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex is valid"));

static VIEWER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^user_\d{1,16}_[0-9a-z]{1,9}$").expect("static regex is valid"));

/// Trim `value` and reject it with `message` when nothing is left.
pub fn required<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(message));
    }
    Ok(trimmed)
}

/// Whether `value` parses as an absolute `http`/`https` URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value)
        .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}

pub fn url(value: &str) -> Result<&str> {
    if is_valid_url(value) {
        Ok(value)
    } else {
        Err(Error::validation(locale::INVALID_URL))
    }
}

/// Accepts an empty string or a valid URL.
pub fn optional_url(value: &str) -> Result<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Ok(trimmed)
    } else {
        url(trimmed)
    }
}

/// XP deltas must be strictly positive.
pub fn xp_amount(amount: i64) -> Result<i64> {
    if amount > 0 {
        Ok(amount)
    } else {
        Err(Error::validation(locale::INVALID_XP_AMOUNT))
    }
}

/// A chat or broadcast body: non-empty after trimming and at most
/// [`MAX_MESSAGE_CHARS`] characters.
pub fn message<'a>(text: &'a str, empty_message: &str) -> Result<&'a str> {
    let text = required(text, empty_message)?;
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::validation(locale::MESSAGE_TOO_LONG));
    }
    Ok(text)
}

pub fn email(value: &str) -> Result<&str> {
    let value = value.trim();
    if EMAIL_RE.is_match(value) {
        Ok(value)
    } else {
        Err(Error::validation(locale::INVALID_EMAIL))
    }
}

pub fn password(value: &str) -> Result<&str> {
    if value.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::validation(locale::PASSWORD_TOO_SHORT));
    }
    Ok(value)
}

/// Viewer ids look like `user_<millis>_<base36 suffix>`.
pub fn viewer_id(value: &str) -> Result<&str> {
    if VIEWER_ID_RE.is_match(value) {
        Ok(value)
    } else {
        Err(Error::validation(locale::INVALID_VIEWER_ID))
    }
}

/// Mint a new anonymous viewer id from a millisecond timestamp and random
/// bits.
pub fn mint_viewer_id(now_millis: i64, random: u128) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = random;
    let mut suffix = String::with_capacity(9);
    for _ in 0..9 {
        #[allow(clippy::cast_possible_truncation)]
        let digit = (n % 36) as usize;
        suffix.push(char::from(ALPHABET[digit]));
        n /= 36;
    }
    format!("user_{}_{suffix}", now_millis.max(0))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  hi ", "x").unwrap(), "hi");
        let err = required("   ", locale::TITLE_REQUIRED).unwrap_err();
        assert_eq!(err.to_string(), locale::TITLE_REQUIRED);
    }

    #[test]
    fn urls_must_be_absolute_http() {
        assert!(is_valid_url("https://example.com/a.jpg"));
        assert!(is_valid_url("http://cdn.example.com/live.m3u8"));
        assert!(!is_valid_url("example.com/a.jpg"));
        assert!(!is_valid_url("ftp://example.com/a"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(optional_url("").is_ok());
        assert!(optional_url("nope").is_err());
    }

    #[test]
    fn xp_amount_must_be_positive() {
        assert_eq!(xp_amount(10).unwrap(), 10);
        assert!(xp_amount(0).is_err());
        assert!(xp_amount(-5).is_err());
    }

    #[test]
    fn message_length_is_counted_in_chars() {
        let bengali = "আ".repeat(MAX_MESSAGE_CHARS);
        assert!(message(&bengali, locale::MESSAGE_REQUIRED).is_ok());
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        let err = message(&long, locale::MESSAGE_REQUIRED).unwrap_err();
        assert_eq!(err.to_string(), locale::MESSAGE_TOO_LONG);
        assert!(message(" ", locale::MESSAGE_REQUIRED).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(email("admin@toto.live").is_ok());
        assert!(email("admin@toto").is_err());
        assert!(email("no at sign").is_err());
    }

    #[test]
    fn minted_ids_validate() {
        let id = mint_viewer_id(1_700_000_000_000, u128::MAX);
        assert!(id.starts_with("user_1700000000000_"));
        assert!(viewer_id(&id).is_ok());
        assert!(viewer_id(&mint_viewer_id(5, 0)).is_ok());
    }

    #[test]
    fn viewer_id_rejects_other_shapes() {
        assert!(viewer_id("user_123_abc").is_ok());
        assert!(viewer_id("admin").is_err());
        assert!(viewer_id("user_123_ABC").is_err());
        assert!(viewer_id("user_123_abc/../x").is_err());
    }
}
