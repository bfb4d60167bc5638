//! External-reference generation.
//!
//! The correlation key ties an outbound STK push to the callback the
//! provider later delivers for it. Keys are short on purpose (providers
//! truncate long references): up to 4 leading alphanumeric characters of
//! the caller reference plus a 4-digit rolling slice of the current
//! timestamp. The suffix window repeats every 10 seconds, so two requests
//! with the same caller prefix inside the same millisecond-mod-10000 tick
//! can collide; the pending registry rejects the second one.

use std::time::{SystemTime, UNIX_EPOCH};

const PREFIX_LEN: usize = 4;

/// Derive the external reference for a caller-supplied reference.
pub fn generate(caller_reference: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    generate_at(caller_reference, millis)
}

pub(crate) fn generate_at(caller_reference: &str, millis: u128) -> String {
    let prefix: String = caller_reference
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(PREFIX_LEN)
        .collect::<String>()
        .to_uppercase();
    format!("{}{:04}", prefix, millis % 10_000)
}
