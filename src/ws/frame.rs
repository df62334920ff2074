//! WebSocket frame codec (RFC 6455 §5)
//!
//! Wire format: first octet `{fin:1, rsv:3, opcode:4}`, second
//! `{mask:1, len7:7}`, an extended 16- or 64-bit length when len7 is
//! 126/127, a 4-byte masking key when the mask bit is set, then the
//! payload. The parser leaves the buffer untouched until a complete
//! frame is available, so any partition of the byte stream parses to
//! the same frame sequence.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::mask::apply_mask;
use crate::error::{Error, Result};
use crate::{MEDIUM_PAYLOAD_LIMIT, SMALL_PAYLOAD_LIMIT};

/// Frame opcode nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl OpCode {
    /// Parse the opcode nibble
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xA => Some(OpCode::Pong),
            _ => None,
        }
    }

    /// Ping, Pong, and Close are control frames
    pub fn is_control(&self) -> bool {
        (*self as u8) >= 0x8
    }
}

/// A parsed WebSocket frame, payload already unmasked
#[derive(Debug, Clone, PartialEq)]
pub enum WsFrame {
    Text { fin: bool, data: Bytes },
    Binary { fin: bool, data: Bytes },
    Continuation { fin: bool, data: Bytes },
    Ping(Bytes),
    Pong(Bytes),
    Close { code: Option<u16>, reason: String },
}

/// Sans-I/O frame parser
///
/// Configured once per connection with the frame size limit and the
/// masking expectation for this endpoint's role (a server requires
/// masked frames from the client and never masks its own).
#[derive(Debug)]
pub struct FrameParser {
    max_frame_size: usize,
    expect_masked: bool,
}

impl FrameParser {
    /// Create a parser; servers pass `expect_masked = true`
    pub fn new(max_frame_size: usize, expect_masked: bool) -> Self {
        Self {
            max_frame_size,
            expect_masked,
        }
    }

    /// Parse one frame from the front of `buf`
    ///
    /// Returns `Ok(None)` until a complete frame is buffered. Errors are
    /// tagged with the close code the peer should observe via
    /// [`Error::close_code`].
    pub fn parse(&self, buf: &mut BytesMut) -> Result<Option<WsFrame>> {
        if buf.len() < 2 {
            return Ok(None);
        }
        let b0 = buf[0];
        let b1 = buf[1];

        if b0 & 0x70 != 0 {
            return Err(Error::Protocol("reserved bits must be zero"));
        }
        let fin = b0 & 0x80 != 0;
        let opcode = OpCode::from_u8(b0 & 0x0F).ok_or(Error::Protocol("unknown opcode"))?;
        if opcode.is_control() && !fin {
            return Err(Error::Protocol("fragmented control frame"));
        }

        let masked = b1 & 0x80 != 0;
        if self.expect_masked && !masked {
            return Err(Error::Protocol("client frames must be masked"));
        }
        if !self.expect_masked && masked {
            return Err(Error::Protocol("server frames must not be masked"));
        }

        let len7 = (b1 & 0x7F) as usize;
        if opcode.is_control() && len7 > SMALL_PAYLOAD_LIMIT {
            return Err(Error::Protocol("control frame payload exceeds 125 bytes"));
        }

        let (payload_len, ext_len) = match len7 {
            126 => {
                if buf.len() < 4 {
                    return Ok(None);
                }
                let len = u16::from_be_bytes([buf[2], buf[3]]) as u64;
                if len <= SMALL_PAYLOAD_LIMIT as u64 {
                    return Err(Error::Protocol("payload length not minimally encoded"));
                }
                (len, 2)
            }
            127 => {
                if buf.len() < 10 {
                    return Ok(None);
                }
                let len = u64::from_be_bytes([
                    buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
                ]);
                if len <= MEDIUM_PAYLOAD_LIMIT as u64 {
                    return Err(Error::Protocol("payload length not minimally encoded"));
                }
                if len >> 63 != 0 {
                    return Err(Error::Protocol("payload length high bit set"));
                }
                (len, 8)
            }
            n => (n as u64, 0),
        };

        if payload_len > self.max_frame_size as u64 {
            return Err(Error::FrameTooLarge);
        }

        let header_len = 2 + ext_len + if masked { 4 } else { 0 };
        let total = header_len + payload_len as usize;
        if buf.len() < total {
            return Ok(None);
        }

        let mask = if masked {
            Some([
                buf[2 + ext_len],
                buf[3 + ext_len],
                buf[4 + ext_len],
                buf[5 + ext_len],
            ])
        } else {
            None
        };

        buf.advance(header_len);
        let mut payload = buf.split_to(payload_len as usize);
        if let Some(mask) = mask {
            apply_mask(&mut payload, mask);
        }

        let frame = match opcode {
            OpCode::Continuation => WsFrame::Continuation {
                fin,
                data: payload.freeze(),
            },
            OpCode::Text => WsFrame::Text {
                fin,
                data: payload.freeze(),
            },
            OpCode::Binary => WsFrame::Binary {
                fin,
                data: payload.freeze(),
            },
            OpCode::Ping => WsFrame::Ping(payload.freeze()),
            OpCode::Pong => WsFrame::Pong(payload.freeze()),
            OpCode::Close => parse_close(&payload)?,
        };
        Ok(Some(frame))
    }
}

/// Decode a close payload into code and reason
fn parse_close(payload: &[u8]) -> Result<WsFrame> {
    match payload.len() {
        0 => Ok(WsFrame::Close {
            code: None,
            reason: String::new(),
        }),
        1 => Err(Error::Protocol("close frame with one-byte payload")),
        _ => {
            let code = u16::from_be_bytes([payload[0], payload[1]]);
            let reason = std::str::from_utf8(&payload[2..])
                .map_err(|_| Error::InvalidUtf8)?
                .to_string();
            Ok(WsFrame::Close {
                code: Some(code),
                reason,
            })
        }
    }
}

/// Encode a frame into `buf`
///
/// A mask of `None` is the server form; tests build client frames by
/// passing a key.
pub fn encode_frame(buf: &mut BytesMut, opcode: OpCode, payload: &[u8], fin: bool, mask: Option<[u8; 4]>) {
    let mut b0 = opcode as u8;
    if fin {
        b0 |= 0x80;
    }
    buf.put_u8(b0);

    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    if payload.len() <= SMALL_PAYLOAD_LIMIT {
        buf.put_u8(mask_bit | payload.len() as u8);
    } else if payload.len() <= MEDIUM_PAYLOAD_LIMIT {
        buf.put_u8(mask_bit | 126);
        buf.put_u16(payload.len() as u16);
    } else {
        buf.put_u8(mask_bit | 127);
        buf.put_u64(payload.len() as u64);
    }

    match mask {
        Some(mask) => {
            buf.put_slice(&mask);
            let start = buf.len();
            buf.put_slice(payload);
            apply_mask(&mut buf[start..], mask);
        }
        None => buf.put_slice(payload),
    }
}

/// Encode a close frame carrying `code` and `reason`
pub fn encode_close(buf: &mut BytesMut, code: u16, reason: &str, mask: Option<[u8; 4]>) {
    let mut payload = BytesMut::with_capacity(2 + reason.len());
    payload.put_u16(code);
    payload.put_slice(reason.as_bytes());
    encode_frame(buf, OpCode::Close, &payload, true, mask);
}
