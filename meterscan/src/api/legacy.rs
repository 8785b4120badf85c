//! Unversioned routes for clients written before `/api/v1`.
//!
//! These answer with flat snake_case bodies, not the v1 envelope:
//!
//! ```json
//! { "status": "VALID", "meter_reading": "04521", "user_reading": "4520", "image_valid": true }
//! ```
//!
//! Request errors keep the v1 status codes but answer
//! `{"status": "ERROR", "detail": "..."}`.

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::v1::dto::VALIDATION_STATUS;
use super::v1::handlers::health::SERVICE_NAME;
use super::v1::handlers::meter::{check_upload, read_upload};
use super::v1::response::ApiError;
use super::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct LegacyStatus {
    pub status: String,
    pub service: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegacyValidateResponse {
    pub status: String,
    pub meter_reading: String,
    pub user_reading: String,
    pub image_valid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegacyError {
    pub status: String,
    pub detail: String,
}

/// `GET /`
pub async fn service_status() -> Json<LegacyStatus> {
    Json(LegacyStatus {
        status: "OK".to_string(),
        service: SERVICE_NAME.to_string(),
        message: "Service is running successfully".to_string(),
    })
}

/// `POST /validate-meter`
pub async fn validate_meter(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            let ApiError { code, message } = e.into();
            let body = LegacyError {
                status: "ERROR".to_string(),
                detail: message,
            };
            return (code.status(), Json(body)).into_response();
        }
    };

    let (extraction, image_valid) = check_upload(&state, upload.image).await;

    Json(LegacyValidateResponse {
        status: VALIDATION_STATUS.to_string(),
        meter_reading: extraction.candidate.reading,
        user_reading: upload.user_reading,
        image_valid,
    })
    .into_response()
}
