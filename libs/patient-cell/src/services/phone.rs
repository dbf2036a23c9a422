use std::sync::OnceLock;

use regex::Regex;

use shared_utils::crypto::hmac_sha256_hex;

use crate::models::PatientError;

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{8,15}$").expect("phone pattern compiles"))
}

/// Strip formatting characters and a leading `+`, then require 8-15 digits.
pub fn normalize_phone(raw: &str) -> Result<String, PatientError> {
    let trimmed = raw.trim();
    let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits: String = without_plus
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if phone_pattern().is_match(&digits) {
        Ok(digits)
    } else {
        Err(PatientError::InvalidPhone)
    }
}

/// Lookup key stored in place of the phone number.
pub fn phone_digest(key: &str, normalized_phone: &str) -> String {
    hmac_sha256_hex(key.as_bytes(), normalized_phone.as_bytes())
}
