//! # Wirebound: dual-protocol server runtime
//!
//! A server-side runtime implementing two wire protocols over a shared
//! byte-transport shape:
//!
//! - **HTTP/2** (RFC 7540) with HPACK header compression (RFC 7541):
//!   connection preface, frame codec, per-stream lifecycle, and
//!   GOAWAY-based connection error reporting.
//! - **WebSocket** (RFC 6455) layered on an HTTP/1.1 upgrade: frame codec,
//!   fragmentation reassembly, control-frame rules, and close-code policy.
//!
//! Both protocols follow the same design: a byte-oriented transport feeds a
//! frame parser which drives a state machine that dispatches typed events
//! to an application handler and queues frames to emit. The state machines
//! in [`http2::Connection`] and [`ws::WsConnection`] are sans-I/O: they
//! consume bytes and produce bytes plus commands, and the async drivers in
//! [`http2::server`] and [`ws::server`] execute those commands against the
//! transport.
//!
//! ## Example
//!
//! ```ignore
//! use wirebound::{Config, http2};
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8443").await?;
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let tls = acceptor.accept(stream).await?;
//!     tokio::spawn(http2::server::serve(tls, Config::default(), |req| async move {
//!         http2::server::Response::text("hello over h2")
//!     }));
//! }
//! ```

pub mod error;
pub mod http2;
pub mod transport;
pub mod ws;

pub use error::{Error, Result};
pub use transport::Transport;

use std::time::Duration;

/// Default receive buffer size (64KB)
pub const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Largest WebSocket payload that fits the 2-byte header form
pub const SMALL_PAYLOAD_LIMIT: usize = 125;

/// Largest WebSocket payload that fits the 4-byte header form
pub const MEDIUM_PAYLOAD_LIMIT: usize = 65535;

/// Configuration shared by the HTTP/2 and WebSocket runtimes
///
/// # Example
///
/// ```
/// use wirebound::Config;
/// use std::time::Duration;
///
/// let config = Config::builder()
///     .max_frame_size(1024 * 1024)
///     .max_message_size(16 * 1024 * 1024)
///     .idle_timeout(Some(Duration::from_secs(60)))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum WebSocket frame payload accepted (default: 16MB)
    pub max_frame_size: usize,
    /// Maximum reassembled WebSocket message size (default: 64MB)
    pub max_message_size: usize,
    /// Maximum decoded HTTP/2 header list size (default: 16KB)
    pub max_header_list_size: usize,
    /// HPACK dynamic table capacity advertised to the peer (default: 4096)
    pub header_table_size: usize,
    /// Idle timeout for WebSocket connections (default: none)
    ///
    /// A handler may override this per connection from `negotiate`.
    pub idle_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            max_header_list_size: 16 * 1024,
            header_table_size: 4096,
            idle_timeout: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`]
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder with default values
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the maximum WebSocket frame payload size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the maximum reassembled WebSocket message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the maximum decoded HTTP/2 header list size
    pub fn max_header_list_size(mut self, size: usize) -> Self {
        self.config.max_header_list_size = size;
        self
    }

    /// Set the HPACK dynamic table capacity
    pub fn header_table_size(mut self, size: usize) -> Self {
        self.config.header_table_size = size;
        self
    }

    /// Set the WebSocket idle timeout, `None` to disable
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::http2::connection::{Connection, Event};
    pub use crate::ws::connection::{Next, WsConnection, WsHandler};
    pub use crate::{Config, Transport};
}
