//! OCR (Optical Character Recognition) Module
//!
//! Image decoding, preprocessing variants, and the text recognition engine
//! used by the meter reading pipeline.
//!
//! # Architecture
//!
//! - `TextRecognizer` trait defines the recognition interface
//! - `OcrProvider` implements it with a local Tesseract engine via leptess,
//!   degrading to an unavailable backend when the engine cannot start
//! - `Preprocessor` derives grayscale, CLAHE-enhanced, binarized and
//!   morphologically filtered variants from a decoded photo
//!
//! # Configuration
//!
//! Engine behavior is controlled via `OcrConfig` (see `config.rs`):
//! - `tessdata_path`: explicit data directory handed to the engine at construction
//! - `languages`: Tesseract language codes
//! - `min/max_image_dimension`: size limits applied at decode time

mod preprocessing;
mod provider;

pub use preprocessing::{
    binarize, clahe, close_then_open, decode_image, encode_png, to_grayscale,
    PreprocessedVariant, Preprocessor,
};
pub use provider::{OcrProvider, PageSegMode, TextRecognizer, DIGIT_WHITELIST};
