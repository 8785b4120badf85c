//! v1 API Data Transfer Objects.
//!
//! Wire types for the v1 REST API, kept separate from the reading pipeline's
//! own types so the pipeline can change without breaking clients.

pub mod meter;

pub use meter::*;
