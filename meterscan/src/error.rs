use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MeterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        let err = MeterError::Timeout(Duration::from_millis(50));
        assert_eq!(err.to_string(), "Operation timed out after 50ms");
    }

    #[test]
    fn test_timeout_message_in_seconds() {
        let err = MeterError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Operation timed out after 30s");
    }
}
