pub(crate) mod health;
pub mod meter;

pub use health::health_check;
pub use meter::validate_meter;
