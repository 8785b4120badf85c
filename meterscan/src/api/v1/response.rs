//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint answers with an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },                   // present on success
//!   "meta": { "processingMs": 412 },   // optional timing metadata
//!   "error": { "code": "invalid_request", "message": "..." }  // present on error
//! }
//! ```
//!
//! A reading that could not be extracted is still a successful response;
//! the `extraction` field inside `data` says why the reading is empty. Decode,
//! engine and timeout failures are absorbed by the pipeline, so the only
//! client-facing errors are bad requests, oversized uploads and internal
//! faults.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::MeterError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or malformed form fields. HTTP 400.
    InvalidRequest,
    /// The upload exceeds the configured size limit. HTTP 413.
    PayloadTooLarge,
    /// Unexpected server-side failure; details are logged, never returned.
    /// HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::PayloadTooLarge => write!(f, "payload_too_large"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to show to end users.
    pub message: String,
}

/// Request-level metadata attached to successful responses.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Wall-clock time spent handling the request, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: None,
            error: None,
            status: StatusCode::OK,
        }
    }

    pub fn success_with_meta(data: T, meta: ResponseMeta) -> Self {
        Self {
            data: Some(data),
            meta: Some(meta),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            meta: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<MeterError> for ApiError {
    /// Internal details never reach the client: internal errors get a generic
    /// message and the real error is logged.
    fn from(err: MeterError) -> Self {
        let (code, message) = match err {
            MeterError::Validation(msg) => (ErrorCode::InvalidRequest, msg),
            MeterError::UploadTooLarge(msg) => {
                (ErrorCode::PayloadTooLarge, format!("Upload too large: {msg}"))
            }
            internal @ (MeterError::Decode(_)
            | MeterError::Processing(_)
            | MeterError::Ocr(_)
            | MeterError::OcrUnavailable(_)
            | MeterError::Timeout(_)
            | MeterError::Classifier(_)
            | MeterError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to API response");
                (
                    ErrorCode::InternalError,
                    "An internal error occurred".to_string(),
                )
            }
        };
        ApiError { code, message }
    }
}

impl<T: Serialize> From<MeterError> for ApiResponse<T> {
    fn from(err: MeterError) -> Self {
        let ApiError { code, message } = err.into();
        ApiResponse::error(code, message)
    }
}
