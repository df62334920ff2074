//! HTTP/2 frame codec (RFC 7540 §4, §6)
//!
//! Pure functions from a byte buffer to a typed frame value and back.
//! No I/O. The wire layout is a 9-octet header (24-bit big-endian
//! length, 8-bit type, 8-bit flags, 32-bit stream id with the high bit
//! reserved) followed by `length` octets of payload.
//!
//! [`parse`] reports exactly how many buffered bytes it needs before it
//! can make progress, so the caller can feed it one byte at a time or a
//! megabyte at a time and observe the same frame sequence.

use bytes::{BufMut, Bytes, BytesMut};

use super::error_code;
use crate::error::{Error, Result};

/// Size of the fixed frame header
pub const HEADER_LEN: usize = 9;

/// Frame type octets (RFC 7540 §6)
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

/// Frame flag bits
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// SETTINGS parameter identifiers (RFC 7540 §6.5.2)
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// The fixed 9-octet frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length (24 bits on the wire)
    pub length: u32,
    /// Frame type octet
    pub kind: u8,
    /// Flag bits
    pub flags: u8,
    /// Stream identifier (31 bits, reserved high bit cleared)
    pub stream_id: u32,
}

impl FrameHeader {
    /// Parse a frame header from the front of `buf`
    ///
    /// Returns `None` until 9 bytes are available.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let length = ((buf[0] as u32) << 16) | ((buf[1] as u32) << 8) | buf[2] as u32;
        let stream_id = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & 0x7FFF_FFFF;
        Some(Self {
            length,
            kind: buf[3],
            flags: buf[4],
            stream_id,
        })
    }

    /// Encode the header into `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.length >> 16) as u8);
        buf.put_u8((self.length >> 8) as u8);
        buf.put_u8(self.length as u8);
        buf.put_u8(self.kind);
        buf.put_u8(self.flags);
        buf.put_u32(self.stream_id & 0x7FFF_FFFF);
    }
}

/// Stream dependency and weight carried by PRIORITY fields
///
/// Parsed so the bytes can be skipped; the runtime ignores priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub exclusive: bool,
    pub dependency: u32,
    pub weight: u8,
}

impl Priority {
    fn parse(buf: &[u8]) -> Self {
        let raw = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        Self {
            exclusive: raw & 0x8000_0000 != 0,
            dependency: raw & 0x7FFF_FFFF,
            weight: buf[4],
        }
    }
}

/// A decoded HTTP/2 frame
///
/// Unknown frame types are preserved as opaque payloads so the state
/// machine can discard them without tearing the connection down.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Data {
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
    },
    Headers {
        stream_id: u32,
        fragment: Bytes,
        end_stream: bool,
        end_headers: bool,
        priority: Option<Priority>,
    },
    Continuation {
        stream_id: u32,
        fragment: Bytes,
        end_headers: bool,
    },
    Priority {
        stream_id: u32,
        priority: Priority,
    },
    RstStream {
        stream_id: u32,
        error_code: u32,
    },
    Settings {
        ack: bool,
        params: Vec<(u16, u32)>,
    },
    Ping {
        ack: bool,
        payload: [u8; 8],
    },
    Goaway {
        last_stream_id: u32,
        error_code: u32,
        debug: Bytes,
    },
    WindowUpdate {
        stream_id: u32,
        increment: u32,
    },
    Unknown {
        kind: u8,
        stream_id: u32,
        payload: Bytes,
    },
}

/// Result of a [`parse`] call
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// A complete frame; `consumed` bytes should be advanced past
    Frame { frame: Frame, consumed: usize },
    /// Not enough buffered bytes; at least `n` total are required
    Need(usize),
}

/// Parse one frame from the front of `buf`
///
/// Returns `Need(9)` until a header is buffered, then `Need(9 + length)`
/// until the payload is buffered. Frames longer than `max_frame_size`
/// are a connection error.
pub fn parse(buf: &[u8], max_frame_size: u32) -> Result<Parsed> {
    let head = match FrameHeader::parse(buf) {
        Some(head) => head,
        None => return Ok(Parsed::Need(HEADER_LEN)),
    };

    if head.length > max_frame_size {
        return Err(Error::connection(
            error_code::FRAME_SIZE_ERROR,
            "frame exceeds SETTINGS_MAX_FRAME_SIZE",
        ));
    }

    let total = HEADER_LEN + head.length as usize;
    if buf.len() < total {
        return Ok(Parsed::Need(total));
    }

    let payload = &buf[HEADER_LEN..total];
    let frame = decode_payload(&head, payload)?;
    Ok(Parsed::Frame {
        frame,
        consumed: total,
    })
}

fn decode_payload(head: &FrameHeader, payload: &[u8]) -> Result<Frame> {
    match head.kind {
        frame_type::DATA => {
            let data = strip_padding(head, payload)?;
            Ok(Frame::Data {
                stream_id: head.stream_id,
                data: Bytes::copy_from_slice(data),
                end_stream: head.flags & flags::END_STREAM != 0,
            })
        }
        frame_type::HEADERS => {
            let body = strip_padding(head, payload)?;
            let (priority, fragment) = if head.flags & flags::PRIORITY != 0 {
                if body.len() < 5 {
                    return Err(Error::connection(
                        error_code::FRAME_SIZE_ERROR,
                        "HEADERS priority fields truncated",
                    ));
                }
                (Some(Priority::parse(body)), &body[5..])
            } else {
                (None, body)
            };
            Ok(Frame::Headers {
                stream_id: head.stream_id,
                fragment: Bytes::copy_from_slice(fragment),
                end_stream: head.flags & flags::END_STREAM != 0,
                end_headers: head.flags & flags::END_HEADERS != 0,
                priority,
            })
        }
        frame_type::CONTINUATION => Ok(Frame::Continuation {
            stream_id: head.stream_id,
            fragment: Bytes::copy_from_slice(payload),
            end_headers: head.flags & flags::END_HEADERS != 0,
        }),
        frame_type::PRIORITY => {
            if payload.len() != 5 {
                return Err(Error::connection(
                    error_code::FRAME_SIZE_ERROR,
                    "PRIORITY payload must be 5 octets",
                ));
            }
            Ok(Frame::Priority {
                stream_id: head.stream_id,
                priority: Priority::parse(payload),
            })
        }
        frame_type::RST_STREAM => {
            if payload.len() != 4 {
                return Err(Error::connection(
                    error_code::FRAME_SIZE_ERROR,
                    "RST_STREAM payload must be 4 octets",
                ));
            }
            Ok(Frame::RstStream {
                stream_id: head.stream_id,
                error_code: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
            })
        }
        frame_type::SETTINGS => {
            if head.stream_id != 0 {
                return Err(Error::connection(
                    error_code::PROTOCOL_ERROR,
                    "SETTINGS on a non-zero stream",
                ));
            }
            let ack = head.flags & flags::ACK != 0;
            if ack {
                if !payload.is_empty() {
                    return Err(Error::connection(
                        error_code::FRAME_SIZE_ERROR,
                        "SETTINGS ACK with payload",
                    ));
                }
                return Ok(Frame::Settings {
                    ack: true,
                    params: Vec::new(),
                });
            }
            if payload.len() % 6 != 0 {
                return Err(Error::connection(
                    error_code::FRAME_SIZE_ERROR,
                    "SETTINGS payload not a multiple of 6",
                ));
            }
            let params = payload
                .chunks_exact(6)
                .map(|entry| {
                    (
                        u16::from_be_bytes([entry[0], entry[1]]),
                        u32::from_be_bytes([entry[2], entry[3], entry[4], entry[5]]),
                    )
                })
                .collect();
            Ok(Frame::Settings { ack: false, params })
        }
        frame_type::PING => {
            if head.stream_id != 0 {
                return Err(Error::connection(
                    error_code::PROTOCOL_ERROR,
                    "PING on a non-zero stream",
                ));
            }
            if payload.len() != 8 {
                return Err(Error::connection(
                    error_code::FRAME_SIZE_ERROR,
                    "PING payload must be 8 octets",
                ));
            }
            let mut data = [0u8; 8];
            data.copy_from_slice(payload);
            Ok(Frame::Ping {
                ack: head.flags & flags::ACK != 0,
                payload: data,
            })
        }
        frame_type::GOAWAY => {
            if payload.len() < 8 {
                return Err(Error::connection(
                    error_code::FRAME_SIZE_ERROR,
                    "GOAWAY payload shorter than 8 octets",
                ));
            }
            Ok(Frame::Goaway {
                last_stream_id: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                    & 0x7FFF_FFFF,
                error_code: u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]),
                debug: Bytes::copy_from_slice(&payload[8..]),
            })
        }
        frame_type::WINDOW_UPDATE => {
            if payload.len() != 4 {
                return Err(Error::connection(
                    error_code::FRAME_SIZE_ERROR,
                    "WINDOW_UPDATE payload must be 4 octets",
                ));
            }
            Ok(Frame::WindowUpdate {
                stream_id: head.stream_id,
                increment: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                    & 0x7FFF_FFFF,
            })
        }
        kind => Ok(Frame::Unknown {
            kind,
            stream_id: head.stream_id,
            payload: Bytes::copy_from_slice(payload),
        }),
    }
}

/// Drop trailing padding and the pad-length octet when PADDED is set
fn strip_padding<'a>(head: &FrameHeader, payload: &'a [u8]) -> Result<&'a [u8]> {
    if head.flags & flags::PADDED == 0 {
        return Ok(payload);
    }
    if payload.is_empty() {
        return Err(Error::connection(
            error_code::FRAME_SIZE_ERROR,
            "padded frame with no payload",
        ));
    }
    let pad_len = payload[0] as usize;
    let body = &payload[1..];
    if pad_len >= body.len() + 1 {
        return Err(Error::connection(
            error_code::PROTOCOL_ERROR,
            "padding exceeds frame payload",
        ));
    }
    Ok(&body[..body.len() - pad_len])
}

impl Frame {
    /// Serialize the frame into `buf`
    ///
    /// The server emits SETTINGS, SETTINGS-ACK, PING-ACK, HEADERS, DATA,
    /// and GOAWAY; the remaining arms exist for completeness and tests.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Frame::Data {
                stream_id,
                data,
                end_stream,
            } => {
                let head = FrameHeader {
                    length: data.len() as u32,
                    kind: frame_type::DATA,
                    flags: if *end_stream { flags::END_STREAM } else { 0 },
                    stream_id: *stream_id,
                };
                head.encode(buf);
                buf.put_slice(data);
            }
            Frame::Headers {
                stream_id,
                fragment,
                end_stream,
                end_headers,
                ..
            } => {
                let mut flag_bits = 0;
                if *end_stream {
                    flag_bits |= flags::END_STREAM;
                }
                if *end_headers {
                    flag_bits |= flags::END_HEADERS;
                }
                let head = FrameHeader {
                    length: fragment.len() as u32,
                    kind: frame_type::HEADERS,
                    flags: flag_bits,
                    stream_id: *stream_id,
                };
                head.encode(buf);
                buf.put_slice(fragment);
            }
            Frame::Continuation {
                stream_id,
                fragment,
                end_headers,
            } => {
                let head = FrameHeader {
                    length: fragment.len() as u32,
                    kind: frame_type::CONTINUATION,
                    flags: if *end_headers { flags::END_HEADERS } else { 0 },
                    stream_id: *stream_id,
                };
                head.encode(buf);
                buf.put_slice(fragment);
            }
            Frame::Priority {
                stream_id,
                priority,
            } => {
                let head = FrameHeader {
                    length: 5,
                    kind: frame_type::PRIORITY,
                    flags: 0,
                    stream_id: *stream_id,
                };
                head.encode(buf);
                encode_priority(priority, buf);
            }
            Frame::RstStream {
                stream_id,
                error_code,
            } => {
                let head = FrameHeader {
                    length: 4,
                    kind: frame_type::RST_STREAM,
                    flags: 0,
                    stream_id: *stream_id,
                };
                head.encode(buf);
                buf.put_u32(*error_code);
            }
            Frame::Settings { ack, params } => {
                let head = FrameHeader {
                    length: (params.len() * 6) as u32,
                    kind: frame_type::SETTINGS,
                    flags: if *ack { flags::ACK } else { 0 },
                    stream_id: 0,
                };
                head.encode(buf);
                for (id, value) in params {
                    buf.put_u16(*id);
                    buf.put_u32(*value);
                }
            }
            Frame::Ping { ack, payload } => {
                let head = FrameHeader {
                    length: 8,
                    kind: frame_type::PING,
                    flags: if *ack { flags::ACK } else { 0 },
                    stream_id: 0,
                };
                head.encode(buf);
                buf.put_slice(payload);
            }
            Frame::Goaway {
                last_stream_id,
                error_code,
                debug,
            } => {
                let head = FrameHeader {
                    length: (8 + debug.len()) as u32,
                    kind: frame_type::GOAWAY,
                    flags: 0,
                    stream_id: 0,
                };
                head.encode(buf);
                buf.put_u32(*last_stream_id & 0x7FFF_FFFF);
                buf.put_u32(*error_code);
                buf.put_slice(debug);
            }
            Frame::WindowUpdate {
                stream_id,
                increment,
            } => {
                let head = FrameHeader {
                    length: 4,
                    kind: frame_type::WINDOW_UPDATE,
                    flags: 0,
                    stream_id: *stream_id,
                };
                head.encode(buf);
                buf.put_u32(*increment & 0x7FFF_FFFF);
            }
            Frame::Unknown {
                kind,
                stream_id,
                payload,
            } => {
                let head = FrameHeader {
                    length: payload.len() as u32,
                    kind: *kind,
                    flags: 0,
                    stream_id: *stream_id,
                };
                head.encode(buf);
                buf.put_slice(payload);
            }
        }
    }

    /// An empty non-ACK SETTINGS frame
    pub fn settings_empty() -> Self {
        Frame::Settings {
            ack: false,
            params: Vec::new(),
        }
    }

    /// A SETTINGS acknowledgement
    pub fn settings_ack() -> Self {
        Frame::Settings {
            ack: true,
            params: Vec::new(),
        }
    }

    /// A PING acknowledgement echoing `payload`
    pub fn ping_ack(payload: [u8; 8]) -> Self {
        Frame::Ping { ack: true, payload }
    }

    /// A GOAWAY with no debug data
    pub fn goaway(last_stream_id: u32, error_code: u32) -> Self {
        Frame::Goaway {
            last_stream_id,
            error_code,
            debug: Bytes::new(),
        }
    }
}

fn encode_priority(priority: &Priority, buf: &mut BytesMut) {
    let mut raw = priority.dependency & 0x7FFF_FFFF;
    if priority.exclusive {
        raw |= 0x8000_0000;
    }
    buf.put_u32(raw);
    buf.put_u8(priority.weight);
}
