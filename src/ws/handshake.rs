//! HTTP/1.1 WebSocket upgrade handshake (RFC 6455 §4)
//!
//! Parses the client's GET upgrade request, computes the
//! `Sec-WebSocket-Accept` key, and writes the 101 response. A successful
//! upgrade hands any leftover bytes straight to the connection state
//! machine; clients are allowed to pipeline frames behind the request.

use base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::transport::{self, ReadOutcome, Transport};

/// Fixed GUID appended to the client key (RFC 6455 §1.3)
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Upper bound on the upgrade request head
const MAX_REQUEST_SIZE: usize = 8192;

/// A parsed WebSocket upgrade request
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    /// Request path
    pub path: String,
    /// Host header
    pub host: Option<String>,
    /// Sec-WebSocket-Key header
    pub key: String,
    /// Requested subprotocols, verbatim
    pub protocol: Option<String>,
    /// Origin header
    pub origin: Option<String>,
}

/// Parse an upgrade request from `buf`
///
/// Returns the request and the number of consumed bytes, or `None` while
/// the head is still incomplete.
pub fn parse_request(buf: &[u8]) -> Result<Option<(UpgradeRequest, usize)>> {
    if buf.len() > MAX_REQUEST_SIZE {
        return Err(Error::InvalidHttp("request head too large"));
    }

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);

    let len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(_) => return Err(Error::InvalidHttp("malformed request head")),
    };

    if req.method != Some("GET") {
        return Err(Error::HandshakeFailed("method must be GET"));
    }

    let mut key = None;
    let mut version = None;
    let mut host = None;
    let mut protocol = None;
    let mut origin = None;
    let mut upgrade = false;
    let mut connection_upgrade = false;

    for header in req.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|_| Error::InvalidHttp("header value is not valid UTF-8"))?;
        match header.name.to_ascii_lowercase().as_str() {
            "sec-websocket-key" => key = Some(value),
            "sec-websocket-version" => version = Some(value),
            "sec-websocket-protocol" => protocol = Some(value),
            "host" => host = Some(value),
            "origin" => origin = Some(value),
            "upgrade" => upgrade = value.to_ascii_lowercase().contains("websocket"),
            "connection" => connection_upgrade = value.to_ascii_lowercase().contains("upgrade"),
            _ => {}
        }
    }

    if !upgrade {
        return Err(Error::HandshakeFailed("missing Upgrade: websocket"));
    }
    if !connection_upgrade {
        return Err(Error::HandshakeFailed("missing Connection: Upgrade"));
    }
    let key = key.ok_or(Error::HandshakeFailed("missing Sec-WebSocket-Key"))?;
    match version {
        Some("13") => {}
        _ => return Err(Error::HandshakeFailed("unsupported WebSocket version")),
    }

    Ok(Some((
        UpgradeRequest {
            path: req.path.unwrap_or("/").to_string(),
            host: host.map(String::from),
            key: key.to_string(),
            protocol: protocol.map(String::from),
            origin: origin.map(String::from),
        },
        len,
    )))
}

/// Compute `Sec-WebSocket-Accept`: Base64(SHA-1(key + GUID))
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Build the 101 Switching Protocols response
pub fn build_accept_response(accept: &str, protocol: Option<&str>) -> Bytes {
    let mut buf = BytesMut::with_capacity(192);
    buf.put_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
    buf.put_slice(b"Upgrade: websocket\r\n");
    buf.put_slice(b"Connection: Upgrade\r\n");
    buf.put_slice(b"Sec-WebSocket-Accept: ");
    buf.put_slice(accept.as_bytes());
    buf.put_slice(b"\r\n");
    if let Some(protocol) = protocol {
        buf.put_slice(b"Sec-WebSocket-Protocol: ");
        buf.put_slice(protocol.as_bytes());
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// Build the response sent when the handler refuses the upgrade
pub fn build_refusal() -> Bytes {
    Bytes::from_static(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\n\r\n")
}

/// Read a complete upgrade request from the transport
///
/// Returns the parsed request and any bytes the client pipelined behind
/// the request head.
pub async fn read_request<T: Transport>(io: &mut T) -> Result<(UpgradeRequest, BytesMut)> {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        if let Some((request, consumed)) = parse_request(&buf)? {
            let _ = buf.split_to(consumed);
            return Ok((request, buf));
        }
        match transport::read_some(io, &mut buf).await? {
            ReadOutcome::Data(_) => {}
            ReadOutcome::Closed => return Err(Error::ConnectionClosed),
        }
    }
}
