//! Shared threshold validation helpers.
//!
//! Range checks used when building a [`MonitorConfig`](crate::MonitorConfig).

use crate::error::CoreError;

/// Validate that a value falls within `[0.0, 1.0]`.
///
/// Returns a `CoreError::Validation` naming the field if out of range.
pub fn validate_unit_range(value: f64, name: &str) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a value is finite and strictly positive.
pub fn validate_positive(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_values() {
        assert!(validate_unit_range(0.0, "test").is_ok());
        assert!(validate_unit_range(0.5, "test").is_ok());
        assert!(validate_unit_range(1.0, "test").is_ok());
    }

    #[test]
    fn rejects_below_zero() {
        assert!(validate_unit_range(-0.01, "test").is_err());
    }

    #[test]
    fn rejects_above_one() {
        assert!(validate_unit_range(1.01, "test").is_err());
    }

    #[test]
    fn rejects_nan_fraction() {
        assert!(validate_unit_range(f64::NAN, "test").is_err());
    }

    #[test]
    fn positive_rejects_zero_negative_and_non_finite() {
        assert!(validate_positive(20.0, "up").is_ok());
        assert!(validate_positive(0.0, "up").is_err());
        assert!(validate_positive(-1.0, "up").is_err());
        assert!(validate_positive(f64::INFINITY, "up").is_err());
    }

    #[test]
    fn error_names_the_field() {
        let err = validate_positive(0.0, "advertised_download").unwrap_err();
        assert!(err.to_string().contains("advertised_download"));
    }
}
