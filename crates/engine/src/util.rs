//! Internal helpers for input validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! trimming and emptiness checks so every operation rejects blank input the
//! same way.

use chrono::NaiveDate;

use crate::{EngineError, ResultEngine};

/// Trim `value` and reject it when empty.
pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim `value`, mapping blank strings to `None`.
pub(crate) fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Minimal e-mail sanity check: one `@` with text on both sides and a dot in
/// the domain.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = normalize_required(value, "email")?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(EngineError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email)
}

/// Parse a `YYYY-MM-DD` date.
pub(crate) fn parse_date(value: &str, label: &str) -> ResultEngine<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::Validation(format!("{label} must be a date (YYYY-MM-DD)")))
}
