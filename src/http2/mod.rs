//! HTTP/2 server runtime (RFC 7540 + RFC 7541)
//!
//! Layered bottom-up:
//!
//! - [`frame`] - sans-I/O frame codec: bytes to typed frames and back.
//! - [`hpack`] - header compression with static + dynamic tables.
//! - [`connection`] - the connection state machine: owns the read buffer,
//!   the HPACK tables, the stream map, and the settings; consumes bytes
//!   and produces frames to emit plus events for the application.
//! - [`server`] - the async driver that owns the transport and executes
//!   the state machine's output.
//!
//! The state machine never blocks and never calls the transport. The
//! driver reads, feeds bytes in, writes whatever output was queued, and
//! closes the transport when the machine says so.

pub mod connection;
pub mod frame;
pub mod hpack;
pub mod server;

pub use connection::{Connection, Event, ResponseHead};
pub use frame::{Frame, FrameHeader};
pub use hpack::HeaderField;

/// The 24-octet client connection preface (RFC 7540 §3.5)
pub const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// HTTP/2 error codes (RFC 7540 §7)
pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;
}
