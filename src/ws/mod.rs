//! WebSocket server runtime (RFC 6455)
//!
//! Layered the same way as the HTTP/2 side:
//!
//! - [`frame`] - sans-I/O frame codec, including masking.
//! - [`handshake`] - the HTTP/1.1 upgrade that produces a connection.
//! - [`connection`] - the connection state machine: fragmentation
//!   reassembly, control-frame handling, close-code policy, and handler
//!   dispatch. Produces bytes to write and a terminate command; never
//!   touches the transport.
//! - [`server`] - the async driver executing the machine's output,
//!   including the idle timer and graceful shutdown.

pub mod connection;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod server;

pub use connection::{
    AcceptOptions, CloseEvent, CloseSource, Negotiation, Next, Outbound, WsConnection, WsHandler,
};
pub use frame::{FrameParser, OpCode, WsFrame};
pub use handshake::UpgradeRequest;

/// RFC 6455 §7.4.1 close status codes
pub mod close_code {
    /// Normal closure
    pub const NORMAL: u16 = 1000;
    /// Endpoint going away (server shutdown)
    pub const GOING_AWAY: u16 = 1001;
    /// Protocol error
    pub const PROTOCOL_ERROR: u16 = 1002;
    /// Unsupported data type
    pub const UNSUPPORTED: u16 = 1003;
    /// No status code present (never sent on the wire)
    pub const NO_STATUS: u16 = 1005;
    /// Abnormal closure (never sent on the wire by a conforming peer)
    pub const ABNORMAL: u16 = 1006;
    /// Invalid frame payload data
    pub const INVALID_PAYLOAD: u16 = 1007;
    /// Policy violation
    pub const POLICY: u16 = 1008;
    /// Message too big
    pub const TOO_BIG: u16 = 1009;
    /// Missing mandatory extension
    pub const EXTENSION: u16 = 1010;
    /// Internal server error
    pub const INTERNAL: u16 = 1011;
}

/// Close code to send in reply to a remote close (RFC 6455 §7.4.1)
///
/// Reserved or unassignable codes - including an absent code, which is
/// dispatched to the handler as 1005 - are answered with a protocol
/// error; everything else is acknowledged with a normal closure.
pub fn reply_close_code(received: u16) -> u16 {
    match received {
        0..=999 | 1004..=1006 | 1012..=2999 => close_code::PROTOCOL_ERROR,
        _ => close_code::NORMAL,
    }
}
