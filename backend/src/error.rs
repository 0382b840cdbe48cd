//! Gate error taxonomy and HTTP response mapping.
//!
//! Every protected route funnels its rejections through [`GateError`] so
//! that status codes and response bodies stay uniform across the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::models::Tier;
use crate::rate_limit::RateLimitError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// No usable session token on the request.
    #[error("Authentication required")]
    Unauthenticated,

    /// Credentials rejected by the identity backend. The message is kept
    /// generic on purpose so it leaks nothing about which part failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Valid session but no profile row was ever provisioned.
    #[error("Account profile is missing. Please contact support.")]
    ProfileMissing,

    #[error("Account pending approval. Please contact support.")]
    NotApproved,

    /// Tier too low for the requested resource.
    #[error("Upgrade required")]
    Forbidden { required: Tier, current: Tier },

    #[error("Admin access required")]
    AdminRequired,

    #[error("{0}")]
    NotFound(String),

    /// Too many requests from one client key inside the current window.
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: u64,
    },

    /// Per-user usage quota exhausted for the window.
    #[error("Daily quota exceeded")]
    QuotaExceeded { used: u64, limit: u64 },

    /// Unexpected failure. The detail is logged, never sent to the client.
    #[error("Internal server error")]
    Internal(String),

    /// A backing service (identity, PAA) could not be reached.
    #[error("External service unavailable. Please try again later.")]
    Dependency(String),
}

impl GateError {
    fn status(&self) -> StatusCode {
        match self {
            GateError::Validation(_) => StatusCode::BAD_REQUEST,
            GateError::Unauthenticated | GateError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            GateError::ProfileMissing
            | GateError::NotApproved
            | GateError::Forbidden { .. }
            | GateError::AdminRequired => StatusCode::FORBIDDEN,
            GateError::NotFound(_) => StatusCode::NOT_FOUND,
            GateError::RateLimited { .. } | GateError::QuotaExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GateError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            GateError::Validation(_) => "validation",
            GateError::Unauthenticated => "unauthenticated",
            GateError::InvalidCredentials => "invalid_credentials",
            GateError::ProfileMissing => "profile_missing",
            GateError::NotApproved => "not_approved",
            GateError::Forbidden { .. } => "forbidden",
            GateError::AdminRequired => "admin_required",
            GateError::NotFound(_) => "not_found",
            GateError::RateLimited { .. } => "rate_limited",
            GateError::QuotaExceeded { .. } => "quota_exceeded",
            GateError::Internal(_) => "internal_error",
            GateError::Dependency(_) => "dependency_unavailable",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match &self {
            GateError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
            }
            GateError::Dependency(detail) => {
                tracing::warn!("Dependency failure: {}", detail);
            }
            _ => {}
        }

        let mut error = json!({
            "type": self.error_type(),
            "message": self.to_string(),
        });

        match &self {
            GateError::Forbidden { required, current } => {
                error["required_tier"] = json!(required);
                error["current_tier"] = json!(current);
            }
            GateError::RateLimited {
                retry_after_secs, ..
            } => {
                error["retry_after_secs"] = json!(retry_after_secs);
            }
            GateError::QuotaExceeded { used, limit } => {
                error["quota"] = json!({
                    "used": used,
                    "limit": limit,
                    "remaining": 0,
                });
            }
            _ => {}
        }

        (self.status(), Json(json!({ "error": error }))).into_response()
    }
}

impl From<AuthError> for GateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingHeader | AuthError::InvalidFormat | AuthError::InvalidToken => {
                GateError::Unauthenticated
            }
            AuthError::InvalidCredentials => GateError::InvalidCredentials,
            AuthError::Rejected(message) => GateError::Validation(message),
            AuthError::Backend(detail) => GateError::Dependency(detail),
        }
    }
}

impl From<StoreError> for GateError {
    fn from(err: StoreError) -> Self {
        GateError::Internal(err.to_string())
    }
}

impl From<RateLimitError> for GateError {
    fn from(err: RateLimitError) -> Self {
        // Fail closed: an unreachable limit store must not open the gate.
        GateError::Dependency(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_parts(err: GateError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_codes() {
        assert_eq!(
            GateError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GateError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GateError::NotApproved.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GateError::NotFound("File not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GateError::QuotaExceeded { used: 30, limit: 30 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GateError::Dependency("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let (status, body) = response_parts(GateError::Validation("Email is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "validation");
        assert_eq!(body["error"]["message"], "Email is required");
    }

    #[tokio::test]
    async fn test_forbidden_carries_tiers() {
        let (status, body) = response_parts(GateError::Forbidden {
            required: Tier::Builder,
            current: Tier::Free,
        })
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["type"], "forbidden");
        assert_eq!(body["error"]["required_tier"], "builder");
        assert_eq!(body["error"]["current_tier"], "free");
    }

    #[tokio::test]
    async fn test_quota_exceeded_carries_numbers() {
        let (status, body) = response_parts(GateError::QuotaExceeded { used: 30, limit: 30 }).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["quota"]["used"], 30);
        assert_eq!(body["error"]["quota"]["limit"], 30);
        assert_eq!(body["error"]["quota"]["remaining"], 0);
    }

    #[tokio::test]
    async fn test_internal_detail_not_exposed() {
        let (_, body) = response_parts(GateError::Internal("sqlite locked at row 7".into())).await;
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_auth_error_mapping() {
        assert!(matches!(
            GateError::from(AuthError::MissingHeader),
            GateError::Unauthenticated
        ));
        assert!(matches!(
            GateError::from(AuthError::InvalidCredentials),
            GateError::InvalidCredentials
        ));
        assert!(matches!(
            GateError::from(AuthError::Rejected("weak password".into())),
            GateError::Validation(_)
        ));
        assert!(matches!(
            GateError::from(AuthError::Backend("timeout".into())),
            GateError::Dependency(_)
        ));
    }
}
