//! HTTP error mapping for the search API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use onco_rag::RagError;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

/// A structured API error body.
///
/// Validation errors carry the offending field. Infrastructure errors carry
/// only a generated reference id; the full detail goes to the logs so no
/// connection internals leak to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Wrapper turning [`RagError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            RagError::InvalidParameter { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody { error: "validation", field: Some(field), message, reference: None },
            ),
            e @ RagError::StoreUnavailable { .. } => {
                opaque(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e)
            }
            e @ RagError::Timeout { .. } => opaque(StatusCode::GATEWAY_TIMEOUT, "timeout", e),
            e => opaque(StatusCode::INTERNAL_SERVER_ERROR, "internal", e),
        };
        (status, Json(body)).into_response()
    }
}

fn opaque(status: StatusCode, tag: &'static str, e: RagError) -> (StatusCode, ErrorBody) {
    let reference = Uuid::new_v4().to_string();
    error!(%reference, error = %e, "request failed");
    (
        status,
        ErrorBody {
            error: tag,
            field: None,
            message: format!("request failed; reference {reference}"),
            reference: Some(reference),
        },
    )
}
