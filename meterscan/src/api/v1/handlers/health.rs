use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

pub const SERVICE_NAME: &str = "Meter Reading Validation Service";

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub service: String,
    pub version: String,
    pub ocr: OcrStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrStatus {
    pub status: String,
    pub languages: String,
    pub contour_decoding: String,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let ocr = OcrStatus {
        status: if state.ocr_available {
            "available".to_string()
        } else {
            "unavailable".to_string()
        },
        languages: state.config.ocr.languages.clone(),
        contour_decoding: state.config.pipeline.contour_decoding.to_string(),
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr,
    })
}
