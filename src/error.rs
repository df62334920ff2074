//! Error types shared by both protocol runtimes

use std::fmt;
use std::io;

use crate::http2::error_code;
use crate::ws::close_code;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the frame codecs, state machines, and drivers
#[derive(Debug)]
pub enum Error {
    /// I/O error from the underlying transport
    Io(io::Error),
    /// Transport closed before the protocol finished
    ConnectionClosed,
    /// The 24-octet HTTP/2 client preface did not match
    BadPreface,
    /// HTTP/2 connection-level error, carries the RFC 7540 error code
    Connection { code: u32, reason: &'static str },
    /// HTTP/2 stream-level error, closes the stream only
    Stream {
        stream_id: u32,
        code: u32,
        reason: &'static str,
    },
    /// WebSocket protocol violation
    Protocol(&'static str),
    /// Invalid UTF-8 in a text message or close reason
    InvalidUtf8,
    /// Frame exceeds the configured maximum
    FrameTooLarge,
    /// Reassembled message exceeds the configured maximum
    MessageTooLarge,
    /// Malformed HTTP in the upgrade request
    InvalidHttp(&'static str),
    /// WebSocket upgrade handshake failed
    HandshakeFailed(&'static str),
}

impl Error {
    /// RFC 6455 close code a WebSocket peer should observe for this error
    pub fn close_code(&self) -> u16 {
        match self {
            Error::Protocol(_) => close_code::PROTOCOL_ERROR,
            Error::InvalidUtf8 => close_code::INVALID_PAYLOAD,
            Error::FrameTooLarge | Error::MessageTooLarge => close_code::TOO_BIG,
            Error::ConnectionClosed | Error::Io(_) => close_code::ABNORMAL,
            _ => close_code::INTERNAL,
        }
    }

    /// RFC 7540 error code an HTTP/2 peer should observe in GOAWAY
    pub fn h2_code(&self) -> u32 {
        match self {
            Error::Connection { code, .. } => *code,
            Error::Stream { code, .. } => *code,
            Error::Io(_) | Error::ConnectionClosed => error_code::INTERNAL_ERROR,
            _ => error_code::PROTOCOL_ERROR,
        }
    }

    pub(crate) fn connection(code: u32, reason: &'static str) -> Self {
        Error::Connection { code, reason }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::BadPreface => write!(f, "invalid HTTP/2 connection preface"),
            Error::Connection { code, reason } => {
                write!(f, "connection error (code {:#x}): {}", code, reason)
            }
            Error::Stream {
                stream_id,
                code,
                reason,
            } => write!(
                f,
                "stream {} error (code {:#x}): {}",
                stream_id, code, reason
            ),
            Error::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 in text payload"),
            Error::FrameTooLarge => write!(f, "frame too large"),
            Error::MessageTooLarge => write!(f, "message too large"),
            Error::InvalidHttp(msg) => write!(f, "invalid HTTP: {}", msg),
            Error::HandshakeFailed(msg) => write!(f, "handshake failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            _ => Error::Io(e),
        }
    }
}
