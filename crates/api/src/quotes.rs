use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use smiletrip_core::schema_caps;
use smiletrip_core::validation::{
    clamp_limit, clamp_offset, escape_like, notes_snippet, validate_submission,
};
use smiletrip_core::{is_valid_status, ApiError, QuoteFile, QuoteRequest, QuoteSubmission, UploadedFile, STATUS_VALUES};

use crate::AppState;

/// Per-file and per-request upload limits
pub const MAX_FILES_PER_REQUEST: usize = 10;
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Room for 10 files at the cap plus the text fields
pub const MAX_SUBMISSION_BODY: usize = 110 * 1024 * 1024;

/// Opaque stored filename: random id plus the lowercased original extension.
/// Nothing else from the client name survives, so stored names can neither
/// collide nor traverse paths.
fn stored_filename(original_name: &str) -> String {
    let ext: String = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            e.to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect()
        })
        .unwrap_or_default();

    if ext.is_empty() {
        nanoid::nanoid!()
    } else {
        format!("{}.{}", nanoid::nanoid!(), ext)
    }
}

/// Submit a new quote request with optional attachments
/// POST /api/quotes/multipart
///
/// Files are written to storage while the multipart stream is consumed, so a
/// validation failure after that point leaves them orphaned on disk. The
/// same applies if the request insert fails, and a failed link insert loses
/// that one file silently. Accepted trade-off: no transaction spans the
/// file writes, the request insert and the link inserts.
pub async fn submit_quote(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut submission = QuoteSubmission::default();
    let mut uploads: Vec<UploadedFile> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart payload".to_string()))?
    {
        let file_name = field.file_name().map(|s| s.to_string());

        if let Some(original_name) = file_name {
            // The 11th file part is rejected before anything is written
            if uploads.len() >= MAX_FILES_PER_REQUEST {
                return Err(ApiError::Validation(format!(
                    "at most {} files are allowed per request",
                    MAX_FILES_PER_REQUEST
                )));
            }

            let content_type = field.content_type().map(|s| s.to_string());

            // Buffer with a hard cap; an over-limit file never reaches disk
            let mut data: Vec<u8> = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(|e| {
                tracing::error!("failed to read upload chunk: {:?}", e);
                ApiError::Validation("malformed multipart payload".to_string())
            })? {
                if data.len() + chunk.len() > MAX_FILE_SIZE {
                    tracing::warn!(
                        "upload rejected: {} exceeds {} byte limit",
                        original_name,
                        MAX_FILE_SIZE
                    );
                    return Err(ApiError::PayloadTooLarge);
                }
                data.extend_from_slice(&chunk);
            }

            let stored_name = stored_filename(&original_name);
            let size_bytes = data.len() as i64;
            state.storage.save(&stored_name, data).await.map_err(|e| {
                tracing::error!("failed to persist upload {}: {:?}", stored_name, e);
                ApiError::Storage(e.to_string())
            })?;

            uploads.push(UploadedFile {
                original_name,
                content_type,
                size_bytes,
                stored_name,
            });
        } else {
            let name = field.name().unwrap_or_default().to_string();
            let value = field
                .text()
                .await
                .map_err(|_| ApiError::Validation("malformed multipart payload".to_string()))?;
            match name.as_str() {
                "name" => submission.name = Some(value),
                "email" => submission.email = Some(value),
                "phone" => submission.phone = Some(value),
                "treatment" => submission.treatment = Some(value),
                "whatsapp" => submission.whatsapp = Some(value),
                "country" => submission.country = Some(value),
                "urgency" => submission.urgency = Some(value),
                "notes" => submission.notes = Some(value),
                "consent" => submission.consent = Some(value),
                _ => {}
            }
        }
    }

    // Already-written files stay on disk if validation fails here
    let valid = validate_submission(submission)?;

    // Column set depends on whether this database has the urgency column
    let has_urgency = schema_caps::quotes_has_urgency(&state.pool).await;

    let id: i64 = if has_urgency {
        sqlx::query_scalar(
            r#"
            INSERT INTO quote_requests (name, email, phone, treatment, whatsapp, country, notes, consent, urgency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&valid.name)
        .bind(&valid.email)
        .bind(&valid.phone)
        .bind(&valid.treatment)
        .bind(&valid.whatsapp)
        .bind(&valid.country)
        .bind(&valid.notes)
        .bind(valid.consent)
        .bind(&valid.urgency)
        .fetch_one(&state.pool)
        .await?
    } else {
        sqlx::query_scalar(
            r#"
            INSERT INTO quote_requests (name, email, phone, treatment, whatsapp, country, notes, consent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&valid.name)
        .bind(&valid.email)
        .bind(&valid.phone)
        .bind(&valid.treatment)
        .bind(&valid.whatsapp)
        .bind(&valid.country)
        .bind(&valid.notes)
        .bind(valid.consent)
        .fetch_one(&state.pool)
        .await?
    };

    // Individual link inserts; a failure unlinks that one file but the
    // request itself still succeeds
    for file in &uploads {
        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO quote_files (quote_id, original_name, content_type, size_bytes, stored_name)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&file.original_name)
        .bind(&file.content_type)
        .bind(file.size_bytes)
        .bind(&file.stored_name)
        .execute(&state.pool)
        .await
        {
            tracing::error!(
                "failed to link uploaded file {} to quote {}: {:?}",
                file.stored_name,
                id,
                e
            );
        }
    }

    tracing::info!("quote request {} created with {} files", id, uploads.len());

    Ok(Json(json!({ "id": id })))
}

#[derive(Deserialize)]
pub struct QuoteFilters {
    pub status: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct QuoteSummaryRow {
    id: i64,
    name: String,
    email: String,
    phone: String,
    treatment: Option<String>,
    country: Option<String>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// List quote requests with optional status filter and text search
/// GET /api/admin/quotes
pub async fn list_quotes(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<QuoteFilters>,
) -> Result<Json<Value>, ApiError> {
    let limit = clamp_limit(filters.limit);
    let offset = clamp_offset(filters.offset);

    // An illegal status filter is ignored, not rejected
    let status = filters.status.filter(|s| is_valid_status(s));
    let search = filters
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let mut query = String::from(
        "SELECT id, name, email, phone, treatment, country, status, notes, created_at, updated_at \
         FROM quote_requests WHERE 1=1",
    );

    let mut param_count = 1;
    if status.is_some() {
        query.push_str(&format!(" AND status = ${}", param_count));
        param_count += 1;
    }
    if search.is_some() {
        query.push_str(&format!(
            " AND (name ILIKE ${p} OR email ILIKE ${p} OR notes ILIKE ${p})",
            p = param_count
        ));
        param_count += 1;
    }
    query.push_str(" ORDER BY created_at DESC");
    query.push_str(&format!(" LIMIT ${} OFFSET ${}", param_count, param_count + 1));

    let mut db_query = sqlx::query_as::<_, QuoteSummaryRow>(&query);
    if let Some(status) = status {
        db_query = db_query.bind(status);
    }
    if let Some(search) = search {
        db_query = db_query.bind(search);
    }

    let rows = db_query
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!("failed to list quote requests: {:?}", e);
            ApiError::from(e)
        })?;

    let results: Vec<Value> = rows
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "name": r.name,
                "email": r.email,
                "phone": r.phone,
                "treatment": r.treatment,
                "country": r.country,
                "status": r.status,
                "notes": r.notes.as_deref().map(notes_snippet),
                "created_at": r.created_at,
                "updated_at": r.updated_at,
            })
        })
        .collect();

    Ok(Json(json!(results)))
}

/// Get a single quote request with its attachment descriptors
/// GET /api/admin/quotes/:id
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let has_urgency = schema_caps::quotes_has_urgency(&state.pool).await;
    let urgency_col = if has_urgency {
        "urgency"
    } else {
        "NULL::TEXT AS urgency"
    };

    let query = format!(
        "SELECT id, name, email, phone, treatment, whatsapp, country, notes, consent, {}, \
         status, created_at, updated_at FROM quote_requests WHERE id = $1",
        urgency_col
    );

    let quote = sqlx::query_as::<_, QuoteRequest>(&query)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    let files = sqlx::query_as::<_, QuoteFile>(
        "SELECT * FROM quote_files WHERE quote_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    // Storage path withheld from the response
    let files: Vec<Value> = files
        .iter()
        .map(|f| {
            json!({
                "id": f.id,
                "original_name": f.original_name,
                "content_type": f.content_type,
                "size_bytes": f.size_bytes,
            })
        })
        .collect();

    Ok(Json(json!({ "quote": quote, "files": files })))
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Transition a quote request to a new status
/// PATCH /api/admin/quotes/:id/status
///
/// Any of the six legal values is reachable from any other; there is no
/// enforced transition graph.
pub async fn update_quote_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<StatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    if !is_valid_status(&input.status) {
        return Err(ApiError::Validation(format!(
            "status must be one of: {}",
            STATUS_VALUES.join(", ")
        )));
    }

    let updated: Option<(String, DateTime<Utc>)> = sqlx::query_as(
        "UPDATE quote_requests SET status = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING status, updated_at",
    )
    .bind(&input.status)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    let (status, updated_at) = updated.ok_or(ApiError::NotFound)?;

    Ok(Json(json!({
        "id": id,
        "status": status,
        "updated_at": updated_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_filename_keeps_lowercase_extension() {
        let name = stored_filename("Scan.PDF");
        assert!(name.ends_with(".pdf"));
        assert!(!name.contains("Scan"));
    }

    #[test]
    fn test_stored_filename_without_extension() {
        let name = stored_filename("README");
        assert!(!name.contains('.'));
        assert!(!name.is_empty());
    }

    #[test]
    fn test_stored_filename_strips_hostile_extension_chars() {
        let name = stored_filename("x-ray.p/n..g");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
    }

    #[test]
    fn test_stored_filenames_are_unique() {
        assert_ne!(stored_filename("a.png"), stored_filename("a.png"));
    }

    #[test]
    fn test_body_limit_covers_max_files() {
        assert!(MAX_SUBMISSION_BODY >= MAX_FILES_PER_REQUEST * MAX_FILE_SIZE);
    }
}
