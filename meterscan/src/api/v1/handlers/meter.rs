//! Meter photo validation handler.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;

use crate::api::v1::dto::{ValidateMeterForm, ValidateMeterResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ResponseMeta};
use crate::api::AppState;
use crate::classifier::classify_with_policy;
use crate::error::{MeterError, Result};
use crate::reading::Extraction;

/// The two form fields every validate-meter route needs.
pub(crate) struct MeterUpload {
    pub image: Arc<[u8]>,
    pub user_reading: String,
}

fn read_error(field: &str, e: MultipartError) -> MeterError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return MeterError::UploadTooLarge(e.to_string());
    }
    MeterError::Validation(format!("Failed to read {field}: {e}"))
}

/// Drain the multipart stream into an `image` and a `user_reading`.
///
/// `userReading` is accepted as an alias; unknown fields are skipped.
pub(crate) async fn read_upload(multipart: &mut Multipart) -> Result<MeterUpload> {
    let mut image: Option<Arc<[u8]>> = None;
    let mut user_reading: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(read_error("form", e)),
        };
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => match field.bytes().await {
                Ok(bytes) => image = Some(Arc::from(bytes.as_ref())),
                Err(e) => return Err(read_error("image", e)),
            },
            "user_reading" | "userReading" => match field.text().await {
                Ok(text) => user_reading = Some(text),
                Err(e) => return Err(read_error("user_reading", e)),
            },
            _ => {}
        }
    }

    let Some(image) = image else {
        return Err(MeterError::Validation(
            "Missing required field: image".to_string(),
        ));
    };
    let Some(user_reading) = user_reading else {
        return Err(MeterError::Validation(
            "Missing required field: user_reading".to_string(),
        ));
    };

    tracing::debug!(bytes = image.len(), "Received meter photo");
    Ok(MeterUpload {
        image,
        user_reading,
    })
}

/// Extraction and the authenticity check over one shared upload buffer.
pub(crate) async fn check_upload(state: &AppState, image: Arc<[u8]>) -> (Extraction, bool) {
    let policy = state.config.classifier.failure_policy;
    let (extraction, image_valid) = tokio::join!(
        state.pipeline.extract(image.clone()),
        classify_with_policy(state.classifier.as_ref(), image, policy),
    );

    tracing::info!(
        extraction = ?extraction.status(),
        reading = %extraction.reading(),
        image_valid,
        "Meter validation finished"
    );

    (extraction, image_valid)
}

/// `POST /api/v1/validate-meter`
///
/// Accepts a multipart form with an `image` and the `user_reading` the user
/// typed in. Extracts the reading from the photo, runs the authenticity
/// check, and returns both alongside the user's value. An empty
/// `meterReading` is not an error: `extraction` says whether the photo was
/// undecodable or simply unreadable.
#[utoipa::path(
    post,
    path = "/api/v1/validate-meter",
    tag = "meter",
    operation_id = "meter.validate",
    request_body(content_type = "multipart/form-data", content = ValidateMeterForm, description = "Meter photo and the user's reading"),
    responses(
        (status = 200, description = "Extraction finished", body = ValidateMeterResponse),
        (status = 400, description = "Missing or unreadable form fields", body = ApiError),
        (status = 413, description = "Upload exceeds MAX_UPLOAD_BYTES", body = ApiError),
    )
)]
pub async fn validate_meter(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<ValidateMeterResponse> {
    let started = Instant::now();

    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into(),
    };

    let (extraction, image_valid) = check_upload(&state, upload.image).await;

    let meta = ResponseMeta {
        processing_ms: Some(started.elapsed().as_millis() as u64),
    };

    ApiResponse::success_with_meta(
        ValidateMeterResponse::new(extraction, upload.user_reading, image_valid),
        meta,
    )
}
