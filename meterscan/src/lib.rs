//! Meter reading extraction from photographs.
//!
//! The [`reading::ReadingPipeline`] turns an uploaded photo into a digit
//! string by trying Tesseract OCR on two preprocessed variants and falling
//! back to contour-based digit detection. [`api`] exposes it over HTTP.

pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ocr;
pub mod reading;
