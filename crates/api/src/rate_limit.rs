//! Per-IP rate limiting for the public intake endpoint.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::AppState;

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// 20 submissions per hour per client IP.
pub fn submission_limiter() -> IpRateLimiter {
    RateLimiter::keyed(Quota::per_hour(nonzero!(20u32)))
}

/// Middleware guarding the quote submission route. Requests without a
/// resolvable client address pass through unthrottled.
pub async fn rate_limit_submissions(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    if let Some(ip) = client_ip {
        if state.submit_limiter.check_key(&ip).is_err() {
            tracing::warn!("submission rate limit exceeded for {}", ip);
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}
