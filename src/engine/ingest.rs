use crate::errors::ValidationError;

use super::{RawPulse, ValidatedPulse};

/// Parses and validates one raw measurement value.
///
/// Accepts numeric-looking strings with surrounding whitespace. The same
/// input always maps to the same rejection kind.
pub fn validate_value(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotANumber {
            raw: trimmed.to_string(),
        })?;
    if value.is_nan() {
        return Err(ValidationError::NotANumber {
            raw: trimmed.to_string(),
        });
    }
    if value.is_infinite() {
        return Err(ValidationError::NonFinite { value });
    }
    // a pulse of zero or negative duration is physically meaningless
    if value <= 0.0 {
        return Err(ValidationError::NonPositive { value });
    }
    Ok(value)
}

pub fn validate(pulse: &RawPulse) -> Result<ValidatedPulse, ValidationError> {
    let value_ms = validate_value(&pulse.data)?;
    Ok(ValidatedPulse {
        value_ms,
        timestamp_ms: pulse.timestamp_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_numeric_strings() {
        assert_eq!(validate_value("0.5"), Ok(0.5));
        assert_eq!(validate_value("  42.125  "), Ok(42.125));
        assert_eq!(validate_value("1e3"), Ok(1000.0));
    }

    #[test]
    fn test_rejects_non_numbers() {
        assert_eq!(
            validate_value("abc"),
            Err(ValidationError::NotANumber {
                raw: "abc".to_string()
            })
        );
        assert_eq!(
            validate_value(""),
            Err(ValidationError::NotANumber {
                raw: String::new()
            })
        );
        // a parsed NaN is still not a number
        assert_eq!(
            validate_value("NaN"),
            Err(ValidationError::NotANumber {
                raw: "NaN".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(
            validate_value("inf"),
            Err(ValidationError::NonFinite {
                value: f64::INFINITY
            })
        );
        assert_eq!(
            validate_value("-inf"),
            Err(ValidationError::NonFinite {
                value: f64::NEG_INFINITY
            })
        );
    }

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(
            validate_value("0"),
            Err(ValidationError::NonPositive { value: 0.0 })
        );
        assert_eq!(
            validate_value("-12.5"),
            Err(ValidationError::NonPositive { value: -12.5 })
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        // re-ingesting the same invalid value always yields the same kind
        for raw in ["abc", "inf", "-3", "0"] {
            let first = validate_value(raw);
            let second = validate_value(raw);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_validate_carries_timestamp() {
        let pulse = RawPulse {
            data: "12.5".to_string(),
            from: "192.168.1.20:8888".to_string(),
            timestamp_ms: 1_700_000_000_000,
        };
        let validated = validate(&pulse).unwrap();
        assert_eq!(validated.value_ms, 12.5);
        assert_eq!(validated.timestamp_ms, pulse.timestamp_ms);
    }
}
