//! Image authenticity checks.
//!
//! The service asks a classifier whether an upload looks like a genuine
//! meter photograph. Classifier failures are resolved by the configured
//! [`ClassifierFailurePolicy`] instead of failing the request.

use std::sync::Arc;

use async_trait::async_trait;
use image::{GenericImageView, ImageReader};
use tracing::{debug, warn};

use crate::config::{ClassifierConfig, ClassifierFailurePolicy};
use crate::error::{MeterError, Result};

#[async_trait]
pub trait AuthenticityClassifier: Send + Sync {
    /// `Ok(true)` when the bytes look like a real meter photo.
    ///
    /// The upload is shared with the reading pipeline, so implementations
    /// receive the same buffer rather than a copy.
    async fn classify(&self, image: Arc<[u8]>) -> Result<bool>;
}

const ASPECT_RANGE: (f64, f64) = (0.2, 5.0);

/// Cheap structural checks standing in for a trained model.
///
/// An image passes when it decodes, both sides reach `min_dimension`, the
/// aspect ratio lies in `[0.2, 5]`, and its grayscale standard deviation
/// reaches `min_contrast`. Undecodable bytes are an error, not a `false`.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    min_dimension: u32,
    min_contrast: f32,
}

impl HeuristicClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            min_dimension: config.min_dimension,
            min_contrast: config.min_contrast,
        }
    }

    fn inspect(&self, bytes: &[u8]) -> Result<bool> {
        let img = ImageReader::new(std::io::Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| MeterError::Classifier(format!("Failed to read image: {e}")))?
            .decode()
            .map_err(|e| MeterError::Classifier(format!("Failed to decode image: {e}")))?;

        let (width, height) = img.dimensions();
        if width < self.min_dimension || height < self.min_dimension {
            debug!(width, height, "Image below classifier minimum size");
            return Ok(false);
        }

        let aspect = width as f64 / height as f64;
        if aspect < ASPECT_RANGE.0 || aspect > ASPECT_RANGE.1 {
            debug!(aspect, "Image aspect ratio out of range");
            return Ok(false);
        }

        let contrast = grayscale_stddev(&img.to_luma8());
        if contrast < self.min_contrast as f64 {
            debug!(contrast, "Image too flat to be a photograph");
            return Ok(false);
        }

        Ok(true)
    }
}

fn grayscale_stddev(gray: &image::GrayImage) -> f64 {
    let n = (gray.width() as f64) * (gray.height() as f64);
    if n == 0.0 {
        return 0.0;
    }

    let (sum, sum_sq) = gray.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

#[async_trait]
impl AuthenticityClassifier for HeuristicClassifier {
    async fn classify(&self, image: Arc<[u8]>) -> Result<bool> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.inspect(&image))
            .await
            .map_err(|e| MeterError::Internal(format!("Classifier task panicked: {e}")))?
    }
}

/// Run the classifier and apply the failure policy to any error.
pub async fn classify_with_policy(
    classifier: &dyn AuthenticityClassifier,
    image: Arc<[u8]>,
    policy: ClassifierFailurePolicy,
) -> bool {
    match classifier.classify(image).await {
        Ok(verdict) => verdict,
        Err(e) => {
            let verdict = policy.verdict_on_failure();
            warn!(error = %e, ?policy, verdict, "Authenticity classifier failed");
            verdict
        }
    }
}
