//! Typed client for the Moorline REST API.
//!
//! # Architecture
//!
//! - One method per backend operation, all returning explicit serde structs
//! - The API is source of truth - NO local persistence, direct calls only
//! - In-memory caching via `moka` for read responses (30 second TTL), with
//!   explicit invalidation of dependent keys after successful mutations
//! - Responses are validated at this boundary: a malformed body fails fast
//!   as [`ApiError::Parse`] instead of propagating missing fields into
//!   rendering
//!
//! # Example
//!
//! ```rust,ignore
//! use moorline_web::api::ApiClient;
//!
//! let api = ApiClient::new(&config.api_base_url);
//!
//! let me = api.current_user(token).await?;
//! let billing = api.billing_status(token, org_id).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur when calling the Moorline API.
///
/// Cloneable so that identical concurrent reads coalesced onto one fetch
/// can all observe the same failure. The non-clonable source errors are
/// shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    /// The backend rejected the bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409). Distinguished so the duplicate-organization flow can
    /// offer a confirm-and-force retry instead of a terminal error.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success status, with the backend's `detail` message
    /// when one was provided.
    #[error("API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// JSON body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(Arc<serde_json::Error>),
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(Arc::new(error))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(Arc::new(error))
    }
}

impl ApiError {
    /// Message suitable for a user-facing toast: the backend's `detail`
    /// text when present, a generic fallback otherwise.
    #[must_use]
    pub fn toast_message(&self) -> String {
        match self {
            Self::Conflict(message) | Self::Status { message, .. } if !message.is_empty() => {
                message.clone()
            }
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("/api/orgs/7".to_string());
        assert_eq!(err.to_string(), "Not found: /api/orgs/7");

        let err = ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (HTTP 500): boom");
    }

    #[test]
    fn test_toast_message_uses_backend_detail() {
        let err = ApiError::Status {
            status: 400,
            message: "Invalid plan".to_string(),
        };
        assert_eq!(err.toast_message(), "Invalid plan");

        let err = ApiError::Conflict("Organization already exists".to_string());
        assert_eq!(err.toast_message(), "Organization already exists");
    }

    #[test]
    fn test_toast_message_generic_fallback() {
        let err = ApiError::from(serde_json::from_str::<i32>("[").unwrap_err());
        assert_eq!(
            err.toast_message(),
            "Something went wrong. Please try again."
        );
    }
}
