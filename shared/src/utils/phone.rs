//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// International phone number regex (E.164 format)
static E164_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{6,14}$").unwrap()
});

/// Normalize a phone number by removing common formatting characters
///
/// Spaces, dashes, dots and parentheses are dropped; a leading `00`
/// international prefix is rewritten to `+`.
pub fn normalize_phone_number(phone: &str) -> String {
    let digits: String = phone
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    match digits.strip_prefix("00") {
        Some(rest) if !digits.starts_with('+') => format!("+{}", rest),
        _ => digits,
    }
}

/// Check if a phone number is already canonical (E.164, no formatting)
pub fn is_canonical_phone(phone: &str) -> bool {
    E164_REGEX.is_match(phone)
}

/// Check if a phone number is valid E.164 once formatting is removed
pub fn is_valid_international_phone(phone: &str) -> bool {
    is_canonical_phone(&normalize_phone_number(phone))
}

/// Mask a phone number for logs (e.g., +91****7890)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 7 {
        format!(
            "{}****{}",
            &normalized[0..3],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}
