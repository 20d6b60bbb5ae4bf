//! Serial Protocol Communication
//!
//! Implements the request/response protocol spoken by the Nucleo telemetry
//! firmware: ASCII commands terminated by `\r\n`, single-line ASCII replies
//! terminated by `\r` or `\n`.
//!
//! Exactly one request is in flight at a time; the input buffer is purged
//! before every write so a stale, unread reply can never be taken for the
//! answer to the next command.

pub mod channel;
pub mod commands;
mod connection;
pub mod decode;
mod error;
pub mod serial;

pub use channel::{Channel, SerialChannel};
pub use commands::Command;
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use decode::{decode, DecodeError, ExpectedKey, Value};
pub use error::ProtocolError;
pub use serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo};

/// Default baud rate for the Nucleo UART link
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default timeout for a single exchange in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Poll interval while waiting for reply bytes, in milliseconds
pub const POLL_INTERVAL_MS: u64 = 10;

/// Line terminator appended to every outgoing command
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Upper bound on an accumulated reply line; firmware replies are short
pub const MAX_LINE_LEN: usize = 256;
