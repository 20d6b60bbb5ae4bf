//! Connection management
//!
//! Owns the serial link and drives the request/response exchange: purge
//! stale input, write one command, read back one `\r`/`\n`-delimited line
//! under a deadline. Strictly sequential; the handle is never shared and
//! exactly one exchange is in flight at a time.

use serde::{Deserialize, Serialize};
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::channel::{Channel, SerialChannel};
use super::serial::{clear_buffers, configure_port, open_port};
use super::{
    Command, ProtocolError, Value, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, LINE_TERMINATOR,
    MAX_LINE_LEN, POLL_INTERVAL_MS,
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connected and ready
    Connected,
    /// Connection error
    Error,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Exchange timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Framing state for a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Waiting for the next reply byte
    AwaitingByte,
    /// A terminator byte ended the frame
    FrameComplete,
}

/// Exclusive handle on the firmware link
///
/// Opened once at startup, closed on shutdown or unrecoverable transport
/// failure. Never shared, never copied.
pub struct Connection {
    /// Underlying byte channel, present while connected
    channel: Option<Box<dyn Channel>>,
    /// Current connection state
    state: ConnectionState,
    /// Connection configuration
    config: ConnectionConfig,
}

impl Connection {
    /// Create a new connection (not yet connected)
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            channel: None,
            state: ConnectionState::Disconnected,
            config,
        }
    }

    /// Create a connection over an already established channel
    ///
    /// Used by tests and by callers that manage the transport themselves.
    pub fn from_channel(config: ConnectionConfig, channel: Box<dyn Channel>) -> Self {
        Self {
            channel: Some(channel),
            state: ConnectionState::Connected,
            config,
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the active configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open and configure the serial port
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.state == ConnectionState::Connected {
            return Err(ProtocolError::AlreadyConnected);
        }

        let mut port = match open_port(&self.config.port_name, Some(self.config.baud_rate)) {
            Ok(port) => port,
            Err(e) => {
                self.state = ConnectionState::Error;
                return Err(e);
            }
        };
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;

        self.channel = Some(Box::new(SerialChannel::new(port)));
        self.state = ConnectionState::Connected;

        info!(
            port = %self.config.port_name,
            baud = self.config.baud_rate,
            "serial link open"
        );
        Ok(())
    }

    /// Drop the channel; safe to call repeatedly
    ///
    /// Closing the port also unblocks any in-progress read with a transport
    /// error, which is the only way to abort an exchange early.
    pub fn disconnect(&mut self) {
        self.channel = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Run one command/response exchange with the default timeout
    ///
    /// A deadline expiring before a terminator is not an error at this
    /// layer: the accumulated text (possibly empty) is returned and the
    /// caller decides what an empty line means.
    pub fn exchange(&mut self, command_text: &str) -> Result<String, ProtocolError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        self.exchange_with_timeout(command_text, timeout)
    }

    /// Run one exchange with a per-call timeout override
    pub fn exchange_with_timeout(
        &mut self,
        command_text: &str,
        timeout: Duration,
    ) -> Result<String, ProtocolError> {
        let mut request = Vec::with_capacity(command_text.len() + LINE_TERMINATOR.len());
        request.extend_from_slice(command_text.as_bytes());
        request.extend_from_slice(LINE_TERMINATOR);
        self.exchange_frame(&request, timeout)
    }

    /// Purge stale input, transmit one request, read back one frame
    fn exchange_frame(
        &mut self,
        request: &[u8],
        timeout: Duration,
    ) -> Result<String, ProtocolError> {
        let channel = self.channel.as_mut().ok_or(ProtocolError::NotConnected)?;

        // A stale, unread reply must never be taken for the answer to this
        // command.
        channel.clear_input_buffer()?;

        channel.write_all(request)?;
        channel.flush()?;

        trace!(
            request = %String::from_utf8_lossy(request).trim_end(),
            timeout_ms = timeout.as_millis() as u64,
            "request sent"
        );

        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(POLL_INTERVAL_MS);
        let mut accumulated: Vec<u8> = Vec::new();
        let mut state = FrameState::AwaitingByte;

        while state == FrameState::AwaitingByte {
            if Instant::now() >= deadline {
                debug!(
                    collected = accumulated.len(),
                    "deadline elapsed before terminator"
                );
                break;
            }

            let available = channel.bytes_to_read()?;
            if available == 0 {
                thread::sleep(poll);
                continue;
            }

            let mut byte = [0u8; 1];
            match channel.read(&mut byte) {
                Ok(0) => {
                    self.state = ConnectionState::Error;
                    return Err(ProtocolError::SerialError(
                        "connection closed mid-read".to_string(),
                    ));
                }
                Ok(_) => {
                    if byte[0] == b'\r' || byte[0] == b'\n' {
                        state = FrameState::FrameComplete;
                    } else if accumulated.len() < MAX_LINE_LEN {
                        accumulated.push(byte[0]);
                    } else {
                        // Firmware lines are short; a runaway frame ends here.
                        state = FrameState::FrameComplete;
                    }
                }
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    self.state = ConnectionState::Error;
                    return Err(ProtocolError::SerialError(e.to_string()));
                }
            }
        }

        // Tolerant decode: drop non-ASCII bytes instead of failing the frame
        accumulated.retain(u8::is_ascii);
        let line = String::from_utf8_lossy(&accumulated).trim().to_string();

        trace!(reply = %line, "frame complete");
        Ok(line)
    }

    /// Passively drain and return the firmware's unsolicited boot chatter
    ///
    /// The firmware prints a banner for a bounded window after power-up or
    /// reset. Nothing read here is correlated with any command, and the
    /// input buffer is purged when the window closes.
    pub fn sniff_boot(&mut self, window: Duration) -> Result<String, ProtocolError> {
        let channel = self.channel.as_mut().ok_or(ProtocolError::NotConnected)?;

        let deadline = Instant::now() + window;
        let poll = Duration::from_millis(POLL_INTERVAL_MS);
        let mut collected: Vec<u8> = Vec::new();
        let mut buf = [0u8; 128];

        while Instant::now() < deadline {
            let available = channel.bytes_to_read()?;
            if available == 0 {
                thread::sleep(poll);
                continue;
            }

            let to_read = (available as usize).min(buf.len());
            match channel.read(&mut buf[..to_read]) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(ProtocolError::SerialError(e.to_string())),
            }
        }

        channel.clear_input_buffer()?;

        collected.retain(u8::is_ascii);
        let text = String::from_utf8_lossy(&collected).into_owned();
        debug!(bytes = text.len(), "boot window closed");
        Ok(text)
    }

    // --- Command façade ---------------------------------------------------

    /// Read the board temperature (`GET_T`)
    pub fn read_temperature(&mut self) -> Result<Value, ProtocolError> {
        self.query(Command::ReadTemperature)
    }

    /// Read the barometric pressure (`GET_P`)
    pub fn read_pressure(&mut self) -> Result<Value, ProtocolError> {
        self.query(Command::ReadPressure)
    }

    /// Read the acceleration / raw register value (`GET_A`)
    pub fn read_acceleration(&mut self) -> Result<Value, ProtocolError> {
        self.query(Command::ReadAcceleration)
    }

    /// Read the calibration constant K (`GET_K`)
    pub fn read_constant(&mut self) -> Result<Value, ProtocolError> {
        self.query(Command::ReadConstant)
    }

    /// Write the calibration constant K, scaled by 100 (`SET_K=<int>`)
    ///
    /// Returns the raw acknowledgement text unparsed, typically `SET_K=OK`.
    /// The protocol defines no structured ack format beyond `ERR=CMD`, which
    /// is surfaced as plain text for the caller to pattern-match.
    pub fn set_constant(&mut self, k_centi: i32) -> Result<String, ProtocolError> {
        self.run(Command::WriteConstant(k_centi))
    }

    /// Ask the firmware for its command list (`HELP`), returned as raw text
    pub fn help(&mut self) -> Result<String, ProtocolError> {
        self.run(Command::Help)
    }

    /// Exchange one command, decoding the reply against its expected key
    fn query(&mut self, command: Command) -> Result<Value, ProtocolError> {
        let line = self.run(command)?;
        let value = super::decode(&line, command.expected_key())?;
        Ok(value)
    }

    /// Exchange one command, returning the raw reply line
    fn run(&mut self, command: Command) -> Result<String, ProtocolError> {
        let timeout =
            Duration::from_millis(command.timeout_ms().unwrap_or(self.config.timeout_ms));
        self.exchange_frame(&command.to_bytes(), timeout)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_connection_starts_disconnected() {
        let conn = Connection::new(ConnectionConfig::default());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_exchange_requires_connection() {
        let mut conn = Connection::new(ConnectionConfig::default());
        let err = conn.exchange("GET_T").unwrap_err();
        assert!(matches!(err, ProtocolError::NotConnected));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.disconnect();
        conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
