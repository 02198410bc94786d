//! Schema + semantic validation, HTML-stripping sanitization.
//!
//! Ported from `original_source/backend/src/utils/validators.py`: UUID
//! format, `Q\d{3}` question-id format, [1,5] range, HTML-tag-strip.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ResponseSet;
use crate::utils::error::{ApiError, ApiResult};

static QUESTION_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q\d{3}$").unwrap());
static UUID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap());
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub fn validate_question_id(id: &str) -> bool {
    QUESTION_ID_RE.is_match(id)
}

pub fn validate_uuid(id: &str) -> ApiResult<()> {
    if UUID_RE.is_match(id) {
        Ok(())
    } else {
        Err(ApiError::validation_error(format!("'{id}' is not a valid UUID")))
    }
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::validation_error("invalid email format"))
    }
}

/// Strips HTML tags and trims whitespace from free-text input (provider
/// name, profile handle, identifier).
pub fn sanitize_text(input: &str) -> String {
    HTML_TAG_RE.replace_all(input, "").trim().to_string()
}

/// Normalizes a raw response map: uppercases + trims question ids,
/// coerces values to integers, and drops (with a logged warning) entries
/// whose id isn't `Q\d{3}` or whose value falls outside [1,5].
pub fn sanitize_answers(raw: &ResponseSet) -> ResponseSet {
    raw.iter()
        .filter_map(|(id, value)| {
            let normalized_id = id.trim().to_uppercase();
            if !validate_question_id(&normalized_id) {
                tracing::warn!(question_id = %id, "discarding response with unrecognized id");
                return None;
            }
            if !(1..=5).contains(value) {
                tracing::warn!(question_id = %id, value, "discarding out-of-range response");
                return None;
            }
            Some((normalized_id, *value))
        })
        .collect()
}

pub fn validate_password_min_length(password: &str) -> ApiResult<()> {
    if password.len() >= 8 {
        Ok(())
    } else {
        Err(ApiError::validation_error("password must be at least 8 characters"))
    }
}

pub fn clamp_pagination(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 100);
    (page, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_format() {
        assert!(validate_question_id("Q001"));
        assert!(!validate_question_id("q001"));
        assert!(!validate_question_id("Q1"));
    }

    #[test]
    fn uuid_format() {
        assert!(validate_uuid("00000000-0000-0000-0000-000000000001").is_ok());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn strips_html_tags() {
        assert_eq!(sanitize_text("  <b>hi</b>  "), "hi");
    }

    #[test]
    fn sanitize_answers_drops_out_of_range_and_unknown_ids() {
        let mut raw = ResponseSet::new();
        raw.insert("q001".to_string(), 3);
        raw.insert("BADID".to_string(), 2);
        raw.insert("Q002".to_string(), 9);
        let cleaned = sanitize_answers(&raw);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.get("Q001"), Some(&3));
    }

    #[test]
    fn pagination_bounds_are_clamped() {
        assert_eq!(clamp_pagination(0, 500), (1, 100));
        assert_eq!(clamp_pagination(-5, 0), (1, 1));
        assert_eq!(clamp_pagination(3, 50), (3, 50));
    }
}
