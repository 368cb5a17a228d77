use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six legal lifecycle states of a quote request. Transitions are
/// unrestricted within this set; anything outside it is rejected.
pub const STATUS_VALUES: [&str; 6] = [
    "pending",
    "reviewing",
    "quoted",
    "scheduled",
    "closed",
    "cancelled",
];

/// Closed enumeration for the optional urgency classification.
pub const URGENCY_VALUES: [&str; 3] = ["asap", "soon", "flexible"];

pub fn is_valid_status(status: &str) -> bool {
    STATUS_VALUES.contains(&status)
}

pub fn is_valid_urgency(urgency: &str) -> bool {
    URGENCY_VALUES.contains(&urgency)
}

/// A patient-submitted quote request.
///
/// `urgency` decodes as NULL on databases that predate the column; queries
/// select `NULL::TEXT AS urgency` when the capability probe reports it absent.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuoteRequest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub treatment: Option<String>,
    pub whatsapp: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub consent: Option<bool>,
    pub urgency: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file uploaded alongside a quote request. Never mutated after creation;
/// removed only via cascade when the parent request is deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuoteFile {
    pub id: i64,
    pub quote_id: i64,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub stored_name: String,
}

/// Text fields collected from the multipart submission form.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub treatment: Option<String>,
    pub whatsapp: Option<String>,
    pub country: Option<String>,
    pub urgency: Option<String>,
    pub notes: Option<String>,
    pub consent: Option<String>,
}

/// Descriptor for a file already persisted to the upload directory,
/// awaiting linkage to a quote request row.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub stored_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_six_statuses_accepted() {
        for status in STATUS_VALUES {
            assert!(is_valid_status(status), "{} should be legal", status);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(!is_valid_status("archived"));
        assert!(!is_valid_status("PENDING"));
        assert!(!is_valid_status(""));
        assert!(!is_valid_status("pending "));
    }

    #[test]
    fn test_urgency_enumeration() {
        assert!(is_valid_urgency("asap"));
        assert!(is_valid_urgency("soon"));
        assert!(is_valid_urgency("flexible"));
        assert!(!is_valid_urgency("urgent"));
        assert!(!is_valid_urgency("ASAP"));
    }
}
