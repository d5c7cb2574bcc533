//! Pure credential validators.
//!
//! No I/O, no state. The policy constants here are the single source of
//! truth for what the form considers submittable.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum password length accepted by [`is_valid_password`].
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// `local@domain.tld` shape: non-empty local part, exactly one `@`, at
/// least one dot in the domain, alphabetic final segment of length >= 2.
/// The character classes exclude whitespace and `@` everywhere.
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).unwrap())
}

/// Whether a string is a well-formed email address.
///
/// Empty strings are invalid.
pub fn is_valid_email(input: &str) -> bool {
    email_regex().is_match(input)
}

/// Whether a string is an acceptable password: at least
/// [`MIN_PASSWORD_LENGTH`] characters and no whitespace anywhere.
///
/// Length counts characters, not bytes, so multi-byte input is not
/// penalized. Empty and whitespace-only strings are invalid.
pub fn is_valid_password(input: &str) -> bool {
    input.chars().count() >= MIN_PASSWORD_LENGTH && !input.chars().any(char::is_whitespace)
}
