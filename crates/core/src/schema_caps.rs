//! Runtime schema capability probing.
//!
//! The optional `urgency` column only exists on databases provisioned by the
//! current release; older deployments run without it. The probe asks the
//! catalog once per process and the answer is cached for the process
//! lifetime — a live schema migration requires a restart to be observed.

use sqlx::PgPool;
use tokio::sync::OnceCell;

static QUOTES_HAS_URGENCY: OnceCell<bool> = OnceCell::const_new();

/// Whether `quote_requests.urgency` exists. Probed once, cached forever.
/// Falls back to `false` if the catalog query itself fails.
pub async fn quotes_has_urgency(pool: &PgPool) -> bool {
    *QUOTES_HAS_URGENCY
        .get_or_init(|| async {
            let probe: Result<bool, sqlx::Error> = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM information_schema.columns
                    WHERE table_name = 'quote_requests' AND column_name = 'urgency'
                )
                "#,
            )
            .fetch_one(pool)
            .await;

            match probe {
                Ok(present) => {
                    tracing::info!("schema probe: quote_requests.urgency present = {}", present);
                    present
                }
                Err(e) => {
                    tracing::warn!("schema probe for urgency column failed, assuming absent: {:?}", e);
                    false
                }
            }
        })
        .await
}
