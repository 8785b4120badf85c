use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use image::GrayImage;
use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{MeterError, Result};

use super::preprocessing::encode_png;

/// Character set every recognition pass is constrained to.
pub const DIGIT_WHITELIST: &str = "0123456789";

/// Tesseract page segmentation modes used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// Mode 6: a single uniform block of text.
    SingleBlock,
    /// Mode 10: a single character.
    SingleChar,
}

impl PageSegMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleChar => "10",
        }
    }
}

impl fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psm {}", self.as_str())
    }
}

/// Anything that can turn a grayscale matrix into raw text.
///
/// Implementations must restrict output to [`DIGIT_WHITELIST`] where the
/// engine supports it.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String>;

    fn is_available(&self) -> bool {
        true
    }
}

enum OcrBackend {
    Local { tesseract: Arc<Mutex<LepTess>> },
    Unavailable { reason: String },
}

pub struct OcrProvider {
    backend: OcrBackend,
}

fn create_tesseract(config: &OcrConfig) -> std::result::Result<LepTess, String> {
    LepTess::new(config.tessdata_path.as_deref(), &config.languages).map_err(|e| e.to_string())
}

impl OcrProvider {
    /// Initialize Tesseract from the injected configuration.
    ///
    /// A missing engine or language pack is not fatal: the provider degrades
    /// to an unavailable backend whose every call fails, which the pipeline
    /// records as a failed strategy.
    pub fn new(config: &OcrConfig) -> Self {
        let backend = match create_tesseract(config) {
            Ok(lt) => {
                info!(
                    languages = %config.languages,
                    tessdata = config.tessdata_path.as_deref().unwrap_or("<default>"),
                    "Tesseract OCR initialized"
                );
                OcrBackend::Local {
                    tesseract: Arc::new(Mutex::new(lt)),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Self { backend }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
        }
    }
}

#[async_trait]
impl TextRecognizer for OcrProvider {
    async fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> Result<String> {
        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let png = encode_png(image)?;
                let tesseract = Arc::clone(tesseract);

                let text = tokio::task::spawn_blocking(move || {
                    let mut lt = tesseract.blocking_lock();
                    lt.set_variable(Variable::TesseditPagesegMode, mode.as_str())
                        .map_err(|e| MeterError::Ocr(format!("Failed to set {mode}: {e:?}")))?;
                    lt.set_variable(Variable::TesseditCharWhitelist, DIGIT_WHITELIST)
                        .map_err(|e| MeterError::Ocr(format!("Failed to set whitelist: {e:?}")))?;
                    lt.set_image_from_mem(&png)
                        .map_err(|e| MeterError::Ocr(format!("Failed to set image: {e}")))?;
                    lt.get_utf8_text()
                        .map_err(|e| MeterError::Ocr(format!("Failed to extract text: {e}")))
                })
                .await
                .map_err(|e| MeterError::Ocr(format!("OCR task panicked: {e}")))??;

                Ok(text.trim().to_string())
            }
            OcrBackend::Unavailable { reason } => Err(MeterError::OcrUnavailable(reason.clone())),
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }
}

impl Clone for OcrProvider {
    fn clone(&self) -> Self {
        match &self.backend {
            OcrBackend::Local { tesseract } => Self {
                backend: OcrBackend::Local {
                    tesseract: Arc::clone(tesseract),
                },
            },
            OcrBackend::Unavailable { reason } => Self {
                backend: OcrBackend::Unavailable {
                    reason: reason.clone(),
                },
            },
        }
    }
}
