//! SmileTrip Core
//!
//! Domain types and rules shared by the API:
//! - Quote request / quote file models and the status lifecycle
//! - Submission validation
//! - The public error taxonomy
//! - Runtime schema capability probing (optional urgency column)

pub mod error;
pub mod models;
pub mod schema_caps;
pub mod validation;

pub use error::ApiError;
pub use models::*;
