//! SmileTrip Auth
//!
//! Single-admin authorization boundary: one email/password pair configured
//! at process start, exchanged for a signed 7-day token carrying a fixed
//! admin role claim. Two guard middlewares consume the token: a strict one
//! (Authorization header only) and a lenient one that additionally accepts
//! a `token` query parameter so downloads work from plain hyperlinks.

pub mod middleware;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

const TOKEN_TTL_DAYS: i64 = 7;

/// Admin identity and signing material, loaded from the environment once at
/// startup. An unset admin pair simply means every login attempt fails —
/// indistinguishable from wrong credentials by design.
#[derive(Clone)]
pub struct AuthConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub jwt_secret: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using an insecure development secret");
            "smiletrip-dev-secret".to_string()
        });
        Self {
            admin_email: std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
            jwt_secret,
        }
    }

    /// Case-insensitive email match, exact password match. Returns false for
    /// any mismatch including an unconfigured admin pair; callers must not
    /// distinguish the cases.
    pub fn credentials_match(&self, email: &str, password: &str) -> bool {
        match (&self.admin_email, &self.admin_password) {
            (Some(admin_email), Some(admin_password)) => {
                email.trim().to_lowercase() == admin_email.to_lowercase()
                    && password == admin_password
            }
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

/// Issue a signed admin token expiring 7 days from now.
pub fn issue_admin_token(secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: "admin".to_string(),
        role: ADMIN_ROLE.to_string(),
        exp: (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token's signature, expiry and role claim. Any failure collapses
/// to `Err(())` — the cause is never surfaced to callers.
pub fn verify_admin_token(token: &str, secret: &str) -> Result<Claims, ()> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ())?;

    if data.claims.role != ADMIN_ROLE {
        return Err(());
    }
    Ok(data.claims)
}
