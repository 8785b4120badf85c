use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::reading;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Meterscan API",
        version = "1.0.0",
        description = "Extracts utility meter readings from photos and checks them against user-submitted values.",
    ),
    paths(
        handlers::health::health_check,
        handlers::meter::validate_meter,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Meter validation
        dto::ValidateMeterForm,
        dto::ValidateMeterResponse,
        reading::StrategyKind,
        reading::ExtractionStatus,
        reading::StrategyAttempt,
        reading::AttemptOutcome,
        reading::RejectReason,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::OcrStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "meter", description = "Meter photo validation"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
