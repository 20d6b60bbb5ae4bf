//! Protocol commands
//!
//! Maps each logical operation onto the ASCII verb the firmware understands
//! and the reply key it answers with.

use serde::{Deserialize, Serialize};

use super::decode::ExpectedKey;
use super::LINE_TERMINATOR;

/// A single firmware command
///
/// Immutable value object, constructed per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Read temperature (`GET_T`)
    ReadTemperature,

    /// Read pressure (`GET_P`)
    ReadPressure,

    /// Read acceleration (`GET_A`)
    ReadAcceleration,

    /// Read the calibration constant K (`GET_K`)
    ReadConstant,

    /// Write the calibration constant K (`SET_K=<int>`)
    ///
    /// The argument is the constant scaled by 100 and truncated to an
    /// integer, so 12.34 travels as `SET_K=1234`.
    WriteConstant(i32),

    /// Ask the firmware for its command list (`HELP`)
    Help,
}

impl Command {
    /// The ASCII verb sent on the wire, without the line terminator
    pub fn wire_text(&self) -> String {
        match self {
            Command::ReadTemperature => "GET_T".to_string(),
            Command::ReadPressure => "GET_P".to_string(),
            Command::ReadAcceleration => "GET_A".to_string(),
            Command::ReadConstant => "GET_K".to_string(),
            Command::WriteConstant(k_centi) => format!("SET_K={}", k_centi),
            Command::Help => "HELP".to_string(),
        }
    }

    /// The key the reply's `key=value` prefix must carry, if the reply is
    /// decoded at all
    ///
    /// `SET_K` answers with a raw ack string and `HELP` with free text, so
    /// neither gets a key check.
    pub fn expected_key(&self) -> Option<ExpectedKey> {
        match self {
            Command::ReadTemperature => Some(ExpectedKey::Temperature),
            Command::ReadPressure => Some(ExpectedKey::Pressure),
            Command::ReadAcceleration => Some(ExpectedKey::Acceleration),
            Command::ReadConstant => Some(ExpectedKey::Constant),
            Command::WriteConstant(_) | Command::Help => None,
        }
    }

    /// Per-command timeout override in milliseconds, if the command needs
    /// more than the configured exchange timeout
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            Command::Help => Some(2000), // free-text reply, give the firmware longer
            _ => None,
        }
    }

    /// Full wire encoding: verb plus the `\r\n` terminator
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.wire_text().into_bytes();
        bytes.extend_from_slice(LINE_TERMINATOR);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_text() {
        assert_eq!(Command::ReadTemperature.wire_text(), "GET_T");
        assert_eq!(Command::ReadPressure.wire_text(), "GET_P");
        assert_eq!(Command::ReadAcceleration.wire_text(), "GET_A");
        assert_eq!(Command::ReadConstant.wire_text(), "GET_K");
        assert_eq!(Command::Help.wire_text(), "HELP");
    }

    #[test]
    fn test_set_k_wire_encoding() {
        // 12.34 scaled by 100 travels as exactly these bytes
        assert_eq!(Command::WriteConstant(1234).to_bytes(), b"SET_K=1234\r\n");
    }

    #[test]
    fn test_set_k_negative_constant() {
        assert_eq!(Command::WriteConstant(-250).wire_text(), "SET_K=-250");
    }

    #[test]
    fn test_expected_keys() {
        assert_eq!(
            Command::ReadTemperature.expected_key(),
            Some(ExpectedKey::Temperature)
        );
        assert_eq!(
            Command::ReadPressure.expected_key(),
            Some(ExpectedKey::Pressure)
        );
        assert_eq!(Command::WriteConstant(100).expected_key(), None);
        assert_eq!(Command::Help.expected_key(), None);
    }

    #[test]
    fn test_help_timeout_override() {
        assert_eq!(Command::Help.timeout_ms(), Some(2000));
        assert_eq!(Command::ReadTemperature.timeout_ms(), None);
        assert_eq!(Command::WriteConstant(1234).timeout_ms(), None);
    }

    #[test]
    fn test_terminator_on_every_command() {
        assert_eq!(Command::Help.to_bytes(), b"HELP\r\n");
        assert_eq!(Command::ReadTemperature.to_bytes(), b"GET_T\r\n");
    }
}
