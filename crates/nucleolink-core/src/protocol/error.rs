//! Protocol errors

use thiserror::Error;

use super::decode::DecodeError;

/// Errors that can occur during protocol communication
///
/// A frame timeout is not represented here: `exchange` returns whatever was
/// accumulated (possibly an empty line) and leaves interpretation to the
/// caller. Feeding an empty line to the decoder yields
/// [`DecodeError::EmptyResponse`].
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Device open failure, write failure, or the link dropping mid-read
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// An operation was attempted before `connect`
    #[error("Not connected to device")]
    NotConnected,

    /// `connect` was called on an already connected handle
    #[error("Already connected")]
    AlreadyConnected,

    /// A reply arrived but could not be decoded into a value
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
