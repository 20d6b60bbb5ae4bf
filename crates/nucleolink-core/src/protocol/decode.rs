//! Reply decoding
//!
//! The firmware's reply format is loosely structured: `KEY=value` with an
//! optional unit suffix (`T=+12.34_C`, `P=101325Pa`), a raw hex register dump
//! with a trailing `H` marker, or a bare number. One prefix-driven decoder
//! covers all of the telemetry commands rather than a format per command.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A numeric value decoded from a reply line
///
/// The variant is chosen solely by the presence of a fractional separator in
/// the numeric substring, never by the command that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Whole-number reply, including hex register dumps
    Integer(i64),
    /// Reply whose numeric text carries a `.`
    Float(f64),
}

impl Value {
    /// Widen to `f64` regardless of variant
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Integer(i) => i as f64,
            Value::Float(f) => f,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}

/// The key a `key=value` reply prefix must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedKey {
    /// `T` — temperature
    Temperature,
    /// `P` — pressure
    Pressure,
    /// `A` — acceleration
    Acceleration,
    /// `K` — calibration constant
    Constant,
}

impl ExpectedKey {
    /// The single-letter wire form of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedKey::Temperature => "T",
            ExpectedKey::Pressure => "P",
            ExpectedKey::Acceleration => "A",
            ExpectedKey::Constant => "K",
        }
    }
}

impl fmt::Display for ExpectedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while decoding a reply line
///
/// All of these are locally recoverable; a malformed reply must fail loudly
/// rather than silently become a wrong numeric value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Nothing arrived before the deadline
    #[error("empty response")]
    EmptyResponse,

    /// The reply's `key=` prefix did not match the expected key
    #[error("unexpected key '{actual}' (expected '{expected}') in reply '{raw}'")]
    UnexpectedKey {
        /// Key the command called for
        expected: String,
        /// Key the firmware actually sent
        actual: String,
        /// Full raw reply line, for context
        raw: String,
    },

    /// The value part starts with no digit, sign, or point
    #[error("no numeric content in reply '{raw}'")]
    NoNumericContent {
        /// Full raw reply line, for context
        raw: String,
    },

    /// The numeric substring would not parse (e.g. a bare sign, bad hex)
    #[error("malformed numeric text '{text}'")]
    MalformedNumeric {
        /// The offending substring
        text: String,
    },
}

/// Decode a trimmed reply line into a typed value
///
/// Rules, in order:
/// 1. Empty input is [`DecodeError::EmptyResponse`].
/// 2. If the line contains `=`, split on the first occurrence; a set
///    `expected` key must match the head exactly. With no `=`, the whole
///    line is the value and no key check happens.
/// 3. A trailing `H` marks a base-16 register dump, decoded as an integer.
///    This applies uniformly to every key.
/// 4. Otherwise the value is the greedy `[0-9+-.]` prefix of the tail,
///    which tolerates unit suffixes like `_C` or `Pa`.
/// 5. A `.` in that prefix makes it a float, otherwise an integer.
pub fn decode(line: &str, expected: Option<ExpectedKey>) -> Result<Value, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::EmptyResponse);
    }

    let tail = match line.split_once('=') {
        Some((head, tail)) => {
            let head = head.trim();
            if let Some(key) = expected {
                if head != key.as_str() {
                    return Err(DecodeError::UnexpectedKey {
                        expected: key.as_str().to_string(),
                        actual: head.to_string(),
                        raw: line.to_string(),
                    });
                }
            }
            tail.trim()
        }
        None => line,
    };

    if let Some(hex) = tail.strip_suffix('H') {
        return i64::from_str_radix(hex, 16)
            .map(Value::Integer)
            .map_err(|_| DecodeError::MalformedNumeric {
                text: tail.to_string(),
            });
    }

    let numeric: String = tail
        .chars()
        .take_while(|&c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        .collect();
    if numeric.is_empty() {
        return Err(DecodeError::NoNumericContent {
            raw: line.to_string(),
        });
    }

    let value = if numeric.contains('.') {
        numeric.parse::<f64>().map(Value::Float).ok()
    } else {
        numeric.parse::<i64>().map(Value::Integer).ok()
    };
    value.ok_or(DecodeError::MalformedNumeric { text: numeric })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_float_with_unit_suffix() {
        assert_eq!(
            decode("T=+12.34_C", Some(ExpectedKey::Temperature)).unwrap(),
            Value::Float(12.34)
        );
    }

    #[test]
    fn test_negative_sign_honored() {
        assert_eq!(
            decode("T=-3.00X", Some(ExpectedKey::Temperature)).unwrap(),
            Value::Float(-3.00)
        );
    }

    #[test]
    fn test_integer_with_unit_suffix() {
        assert_eq!(
            decode("P=101325Pa", Some(ExpectedKey::Pressure)).unwrap(),
            Value::Integer(101325)
        );
    }

    #[test]
    fn test_hex_register_dump() {
        assert_eq!(
            decode("A=1F4H", Some(ExpectedKey::Acceleration)).unwrap(),
            Value::Integer(500)
        );
    }

    #[test]
    fn test_hex_applies_to_any_key() {
        assert_eq!(
            decode("T=FFH", Some(ExpectedKey::Temperature)).unwrap(),
            Value::Integer(255)
        );
    }

    #[test]
    fn test_constant_reply() {
        assert_eq!(
            decode("K=12.34000", Some(ExpectedKey::Constant)).unwrap(),
            Value::Float(12.34)
        );
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(
            decode("", Some(ExpectedKey::Temperature)).unwrap_err(),
            DecodeError::EmptyResponse
        );
        assert_eq!(decode("", None).unwrap_err(), DecodeError::EmptyResponse);
    }

    #[test]
    fn test_unexpected_key_reports_context() {
        let err = decode("T=12.3", Some(ExpectedKey::Pressure)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedKey {
                expected: "P".to_string(),
                actual: "T".to_string(),
                raw: "T=12.3".to_string(),
            }
        );
    }

    #[test]
    fn test_bare_number_fallback() {
        assert_eq!(decode("534225", None).unwrap(), Value::Integer(534225));
    }

    #[test]
    fn test_bare_number_ignores_key_check() {
        // Without '=' the whole line is the value, even when a key is set
        assert_eq!(
            decode("534225", Some(ExpectedKey::Pressure)).unwrap(),
            Value::Integer(534225)
        );
    }

    #[test]
    fn test_no_numeric_content() {
        assert_eq!(
            decode("T=abc", Some(ExpectedKey::Temperature)).unwrap_err(),
            DecodeError::NoNumericContent {
                raw: "T=abc".to_string(),
            }
        );
    }

    #[test]
    fn test_sign_only_is_malformed() {
        assert_eq!(
            decode("T=-xyz", Some(ExpectedKey::Temperature)).unwrap_err(),
            DecodeError::MalformedNumeric {
                text: "-".to_string(),
            }
        );
    }

    #[test]
    fn test_bad_hex_is_malformed() {
        assert_eq!(
            decode("A=1G4H", Some(ExpectedKey::Acceleration)).unwrap_err(),
            DecodeError::MalformedNumeric {
                text: "1G4H".to_string(),
            }
        );
    }

    #[test]
    fn test_garbled_tail_tolerated() {
        // Scan stops at the first character outside the numeric set
        assert_eq!(
            decode("A=125.7000garbage", Some(ExpectedKey::Acceleration)).unwrap(),
            Value::Float(125.7)
        );
    }

    #[test]
    fn test_whitespace_around_key_and_value() {
        assert_eq!(
            decode(" P = 101325Pa ", Some(ExpectedKey::Pressure)).unwrap(),
            Value::Integer(101325)
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Integer(500).to_string(), "500");
        assert_eq!(Value::Float(12.34).to_string(), "12.34");
    }

    #[test]
    fn test_value_widening() {
        assert_eq!(Value::Integer(500).as_f64(), 500.0);
        assert_eq!(Value::Float(12.34).as_f64(), 12.34);
    }
}
