use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use std::sync::Arc;

use smiletrip_core::{ApiError, QuoteFile};

use crate::AppState;

/// Get MIME content type based on file extension
fn get_content_type(filename: &str) -> &'static str {
    let filename_lower = filename.to_lowercase();

    if filename_lower.ends_with(".pdf") {
        "application/pdf"
    } else if filename_lower.ends_with(".png") {
        "image/png"
    } else if filename_lower.ends_with(".jpg") || filename_lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if filename_lower.ends_with(".gif") {
        "image/gif"
    } else if filename_lower.ends_with(".webp") {
        "image/webp"
    } else if filename_lower.ends_with(".heic") {
        "image/heic"
    } else if filename_lower.ends_with(".mp4") {
        "video/mp4"
    } else if filename_lower.ends_with(".txt") {
        "text/plain"
    } else if filename_lower.ends_with(".doc") {
        "application/msword"
    } else if filename_lower.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if filename_lower.ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    }
}

/// Build an inline Content-Disposition carrying the percent-encoded original
/// filename. Control characters and quotes are stripped first so the header
/// cannot be broken or injected into.
fn inline_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | '"' => '_',
            _ => c,
        })
        .collect();

    let ascii_fallback: String = sanitized
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "-_. ".contains(*c))
        .collect();
    let ascii_fallback = if ascii_fallback.trim().is_empty() {
        "download".to_string()
    } else {
        ascii_fallback.trim().to_string()
    };

    let encoded = urlencoding::encode(&sanitized);
    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback, encoded
    )
}

/// Stream an attachment's bytes back to an authorized admin
/// GET /api/admin/files/:id
///
/// A missing metadata row and a missing on-disk file both answer 404; the
/// caller cannot tell which it was.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let file = sqlx::query_as::<_, QuoteFile>("SELECT * FROM quote_files WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    // Metadata and disk state can diverge; check the file independently
    if !state.storage.exists(&file.stored_name).await {
        tracing::warn!(
            "quote file {} has a metadata row but no bytes on disk ({})",
            file.id,
            file.stored_name
        );
        return Err(ApiError::NotFound);
    }

    let (stream, size) = state
        .storage
        .download_stream(&file.stored_name)
        .await
        .map_err(|e| {
            tracing::error!("failed to open stream for {}: {:?}", file.stored_name, e);
            ApiError::NotFound
        })?;

    let content_type = file
        .content_type
        .clone()
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| get_content_type(&file.original_name).to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, inline_disposition(&file.original_name))
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from_stream(stream))
        .map_err(|_| ApiError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_inference() {
        assert_eq!(get_content_type("scan.PDF"), "application/pdf");
        assert_eq!(get_content_type("xray.jpeg"), "image/jpeg");
        assert_eq!(get_content_type("photo.png"), "image/png");
        assert_eq!(get_content_type("mystery"), "application/octet-stream");
    }

    #[test]
    fn test_inline_disposition_plain_ascii() {
        let value = inline_disposition("xray.png");
        assert!(value.starts_with("inline;"));
        assert!(value.contains("filename=\"xray.png\""));
        assert!(value.contains("filename*=UTF-8''xray.png"));
    }

    #[test]
    fn test_inline_disposition_percent_encodes_unicode() {
        let value = inline_disposition("röntgen bild.png");
        assert!(value.contains("filename*=UTF-8''r%C3%B6ntgen%20bild.png"));
    }

    #[test]
    fn test_inline_disposition_strips_injection() {
        let value = inline_disposition("a\"\r\nSet-Cookie: x.png");
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(!value.contains("a\""));
    }

    #[test]
    fn test_inline_disposition_empty_name_fallback() {
        let value = inline_disposition("\r\n");
        assert!(value.contains("filename=\"download\""));
    }
}
