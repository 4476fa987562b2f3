//! Error responses.

use atelier_error::{
    AtelierError, AtelierErrorKind, RateLimitErrorKind, RequestError, RequestErrorKind,
};
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    /// Machine-readable discriminator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Credits left, for quota rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
}

/// An [`AtelierError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AtelierError);

impl From<AtelierError> for ApiError {
    fn from(err: AtelierError) -> Self {
        Self(err)
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            AtelierErrorKind::Quota(_) => StatusCode::PAYMENT_REQUIRED,
            AtelierErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            AtelierErrorKind::RateLimit(e) => match e.kind {
                RateLimitErrorKind::LimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                RateLimitErrorKind::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AtelierErrorKind::Request(e) => match e.kind() {
                RequestErrorKind::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_REQUEST,
            },
            AtelierErrorKind::Provider(_) | AtelierErrorKind::Generation(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body for the wrapped error. Internal failures get a generic message.
    pub fn body(&self) -> ErrorBody {
        let (error, kind, remaining) = match self.0.kind() {
            AtelierErrorKind::Quota(q) => (
                q.detail.clone(),
                Some(q.kind.as_str().to_string()),
                Some(q.remaining),
            ),
            AtelierErrorKind::NotFound(e) => (
                format!("no generation found for task {}", e.task_id),
                Some("not-found".to_string()),
                None,
            ),
            AtelierErrorKind::RateLimit(e) => {
                (e.kind.to_string(), Some("rate-limited".to_string()), None)
            }
            AtelierErrorKind::Request(e) => {
                let kind = match e.kind() {
                    RequestErrorKind::Unauthenticated(_) => "unauthenticated",
                    _ => "invalid-request",
                };
                (e.kind().to_string(), Some(kind.to_string()), None)
            }
            AtelierErrorKind::Generation(e) => {
                (e.kind.to_string(), Some("generation".to_string()), None)
            }
            AtelierErrorKind::Provider(_) => (
                "generation provider unavailable".to_string(),
                Some("provider".to_string()),
                None,
            ),
            _ => ("internal server error".to_string(), None, None),
        };
        ErrorBody {
            error,
            kind,
            remaining,
        }
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self.0.kind() {
            AtelierErrorKind::RateLimit(e) => match e.kind {
                RateLimitErrorKind::LimitExceeded { retry_after_ms } => {
                    Some(retry_after_ms.div_ceil(1000).max(1))
                }
                RateLimitErrorKind::Config(_) => None,
            },
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let retry_after = self.retry_after_secs();
        let mut response = (status, Json(self.body())).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
