use super::types::{RejectReason, ValidationVerdict};

pub const MIN_READING_DIGITS: usize = 4;
pub const MAX_READING_DIGITS: usize = 7;

/// Decide whether a digit string looks like a real meter reading.
///
/// Readings are 4 to 7 ASCII digits and not a single repeated digit, which
/// is what OCR typically hallucinates from dial borders and glare.
pub fn validate_reading(reading: &str) -> ValidationVerdict {
    if reading.is_empty() {
        return ValidationVerdict::Rejected(RejectReason::Empty);
    }
    if !reading.chars().all(|c| c.is_ascii_digit()) {
        return ValidationVerdict::Rejected(RejectReason::NonNumeric);
    }

    // All ASCII from here on, so byte length equals digit count.
    let len = reading.len();
    if len < MIN_READING_DIGITS {
        return ValidationVerdict::Rejected(RejectReason::TooShort);
    }
    if len > MAX_READING_DIGITS {
        return ValidationVerdict::Rejected(RejectReason::TooLong);
    }

    let first = reading.as_bytes()[0];
    if reading.bytes().all(|b| b == first) {
        return ValidationVerdict::Rejected(RejectReason::UniformDigits);
    }

    ValidationVerdict::Accepted
}

pub fn is_plausible_reading(reading: &str) -> bool {
    validate_reading(reading).is_accepted()
}
