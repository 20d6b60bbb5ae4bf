//! # nucleolink Core Library
//!
//! Client for the ASCII command/response protocol spoken by the STM32 Nucleo
//! sensor firmware over its UART link.
//!
//! This library provides:
//! - Serial transport management (port discovery, open/configure/close)
//! - Line framing over the raw byte stream with timeout-bounded reads
//! - Tolerant decoding of the firmware's loosely structured replies
//! - A typed command façade for the telemetry and calibration operations
//!
//! ## Example
//!
//! ```rust,ignore
//! use nucleolink_core::protocol::{Connection, ConnectionConfig};
//!
//! let config = ConnectionConfig {
//!     port_name: "/dev/ttyACM0".to_string(),
//!     ..Default::default()
//! };
//! let mut conn = Connection::new(config);
//! conn.connect()?;
//!
//! let temperature = conn.read_temperature()?;
//! println!("T: {}", temperature);
//! ```

#![warn(missing_docs)]

pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        Command, Connection, ConnectionConfig, ConnectionState, DecodeError, ExpectedKey,
        ProtocolError, Value,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
