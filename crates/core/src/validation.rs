//! Submission validation and query parameter normalization.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ApiError;
use crate::models::{is_valid_urgency, QuoteSubmission};

pub const MAX_NOTES_LEN: usize = 5000;
pub const NOTES_SNIPPET_LEN: usize = 160;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 200;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Validated, normalized submission ready for insertion.
#[derive(Debug)]
pub struct ValidQuote {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub treatment: Option<String>,
    pub whatsapp: Option<String>,
    pub country: Option<String>,
    pub urgency: Option<String>,
    pub notes: Option<String>,
    pub consent: Option<bool>,
}

/// Validate the raw multipart fields of a quote submission.
///
/// Required: name (>= 2 chars), email (well-formed), phone (>= 4 chars).
/// Optional: treatment/whatsapp/country free text, urgency within its closed
/// enumeration, notes up to 5000 chars, consent as the literal strings
/// "true" / "false".
pub fn validate_submission(input: QuoteSubmission) -> Result<ValidQuote, ApiError> {
    let name = input
        .name
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().count() >= 2)
        .ok_or_else(|| ApiError::Validation("name must be at least 2 characters".to_string()))?;

    let email = input
        .email
        .map(|s| s.trim().to_string())
        .filter(|s| email_regex().is_match(s))
        .ok_or_else(|| ApiError::Validation("a valid email address is required".to_string()))?;

    let phone = input
        .phone
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().count() >= 4)
        .ok_or_else(|| ApiError::Validation("phone must be at least 4 characters".to_string()))?;

    let urgency = match input.urgency.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(u) if is_valid_urgency(u) => Some(u.to_string()),
        Some(_) => {
            return Err(ApiError::Validation(
                "urgency must be one of: asap, soon, flexible".to_string(),
            ))
        }
    };

    let notes = match input.notes {
        None => None,
        Some(n) if n.chars().count() <= MAX_NOTES_LEN => Some(n),
        Some(_) => {
            return Err(ApiError::Validation(format!(
                "notes must be at most {} characters",
                MAX_NOTES_LEN
            )))
        }
    };

    let consent = match input.consent.as_deref() {
        None => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(_) => {
            return Err(ApiError::Validation(
                "consent must be \"true\" or \"false\"".to_string(),
            ))
        }
    };

    Ok(ValidQuote {
        name,
        email,
        phone,
        treatment: input.treatment.filter(|s| !s.is_empty()),
        whatsapp: input.whatsapp.filter(|s| !s.is_empty()),
        country: input.country.filter(|s| !s.is_empty()),
        urgency,
        notes,
        consent,
    })
}

/// Clamp a requested page size into [1, 200], defaulting to 20.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

/// Clamp a requested offset to >= 0, defaulting to 0.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Truncate notes to a short snippet for list views.
pub fn notes_snippet(notes: &str) -> String {
    notes.chars().take(NOTES_SNIPPET_LEN).collect()
}

/// Escape LIKE wildcards so a user-supplied search term matches literally.
pub fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> QuoteSubmission {
        QuoteSubmission {
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            phone: Some("123456".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_submission_valid() {
        let valid = validate_submission(minimal()).unwrap();
        assert_eq!(valid.name, "Jane Doe");
        assert_eq!(valid.email, "jane@example.com");
        assert!(valid.consent.is_none());
    }

    #[test]
    fn test_short_name_rejected() {
        let mut input = minimal();
        input.name = Some("J".to_string());
        assert!(validate_submission(input).is_err());
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut input = minimal();
        input.name = None;
        assert!(validate_submission(input).is_err());
    }

    #[test]
    fn test_bad_email_rejected() {
        for bad in ["not-an-email", "a@b", "a b@c.com", "@example.com"] {
            let mut input = minimal();
            input.email = Some(bad.to_string());
            assert!(validate_submission(input).is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn test_short_phone_rejected() {
        let mut input = minimal();
        input.phone = Some("123".to_string());
        assert!(validate_submission(input).is_err());
    }

    #[test]
    fn test_consent_literal_strings_only() {
        let mut input = minimal();
        input.consent = Some("true".to_string());
        assert_eq!(validate_submission(input).unwrap().consent, Some(true));

        let mut input = minimal();
        input.consent = Some("false".to_string());
        assert_eq!(validate_submission(input).unwrap().consent, Some(false));

        let mut input = minimal();
        input.consent = Some("yes".to_string());
        assert!(validate_submission(input).is_err());

        let mut input = minimal();
        input.consent = Some("True".to_string());
        assert!(validate_submission(input).is_err());
    }

    #[test]
    fn test_urgency_enum_enforced_when_supplied() {
        let mut input = minimal();
        input.urgency = Some("asap".to_string());
        assert_eq!(
            validate_submission(input).unwrap().urgency.as_deref(),
            Some("asap")
        );

        let mut input = minimal();
        input.urgency = Some("tomorrow".to_string());
        assert!(validate_submission(input).is_err());

        // Absent and empty both mean "not supplied"
        let mut input = minimal();
        input.urgency = Some("".to_string());
        assert!(validate_submission(input).unwrap().urgency.is_none());
    }

    #[test]
    fn test_notes_length_limit() {
        let mut input = minimal();
        input.notes = Some("x".repeat(MAX_NOTES_LEN));
        assert!(validate_submission(input).is_ok());

        let mut input = minimal();
        input.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
        assert!(validate_submission(input).is_err());
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(clamp_limit(None), 20);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(1000)), 200);
    }

    #[test]
    fn test_offset_clamping() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(-1)), 0);
        assert_eq!(clamp_offset(Some(40)), 40);
    }

    #[test]
    fn test_notes_snippet_truncation() {
        let long = "n".repeat(500);
        assert_eq!(notes_snippet(&long).chars().count(), NOTES_SNIPPET_LEN);
        assert_eq!(notes_snippet("short"), "short");
        // Multi-byte safe
        let emoji = "é".repeat(200);
        assert_eq!(notes_snippet(&emoji).chars().count(), NOTES_SNIPPET_LEN);
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
