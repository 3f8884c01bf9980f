//! Redaction of sensitive values from error and diagnostic messages.
//!
//! Fetch failures are reported through logs and observers, and the messages
//! produced by transports can echo request headers or user context. This
//! module strips:
//!
//! - API keys sent as `Api-Key <key>` or `Api-Key: <key>`
//! - Email addresses
//! - IPv4 addresses

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PATTERNS: Vec<(Regex, &'static str)> = vec![
        // `Authorization: Api-Key <key>` and the legacy `Api-Key: <key>` header
        (Regex::new(r"Api-Key:?\s+[A-Za-z0-9_\-]+").unwrap(), "Api-Key [REDACTED]"),
        // Email addresses (including + for plus addressing)
        (Regex::new(r"[\w.+-]+@[\w.-]+\.\w+").unwrap(), "[EMAIL]"),
        // IPv4 addresses
        (Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap(), "[IP]"),
    ];
}

/// Sanitize a message by replacing sensitive values with placeholders.
///
/// ```
/// use skylab::error::sanitize_message;
///
/// let sanitized = sanitize_message("Api-Key: client-1234567 from 10.1.2.3");
/// assert_eq!(sanitized, "Api-Key [REDACTED] from [IP]");
/// ```
pub fn sanitize_message(message: &str) -> String {
    let mut result = message.to_string();

    for (pattern, replacement) in PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}
