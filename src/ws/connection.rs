//! WebSocket connection state machine (RFC 6455 §5.4–§7)
//!
//! Sans-I/O. [`WsConnection::receive`] feeds transport bytes through the
//! frame parser and dispatches typed callbacks on the application
//! handler; reply frames (pong, close) and handler-sent messages queue
//! in an output buffer the driver drains with [`WsConnection::take_output`].
//! The machine signals "terminate the transport" through
//! [`WsConnection::is_done`] instead of touching the socket itself.
//!
//! Exactly one Close frame is ever emitted per connection: every close
//! path goes through the same state guard.

use bytes::{Bytes, BytesMut};

use super::frame::{encode_close, encode_frame, FrameParser, OpCode, WsFrame};
use super::handshake::UpgradeRequest;
use super::{close_code, reply_close_code};
use crate::error::Error;
use crate::Config;

/// Who initiated a close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseSource {
    /// The peer sent a Close frame
    Remote,
    /// This endpoint is closing (shutdown, error, policy)
    Local,
}

/// Close notification delivered to [`WsHandler::on_close`]
///
/// When the peer omitted a status code the dispatched code is 1005.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseEvent {
    pub source: CloseSource,
    pub code: u16,
}

/// Handler verdict returned from data and info callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Keep the connection open
    Continue,
    /// Close gracefully with code 1000
    Close,
    /// Fail the connection; the peer observes close 1011
    Error(&'static str),
}

/// Options returned by an accepting [`WsHandler::negotiate`]
#[derive(Debug, Clone, Default)]
pub struct AcceptOptions {
    /// Idle timeout for this connection; overrides [`Config::idle_timeout`]
    pub timeout: Option<std::time::Duration>,
    /// Subprotocol to echo in the 101 response
    pub protocol: Option<String>,
}

/// Outcome of upgrade negotiation
#[derive(Debug)]
pub enum Negotiation {
    Accept(AcceptOptions),
    Refuse,
}

/// Queue of frames the handler wants sent
///
/// Frames land in the same buffer as protocol replies, so the single
/// writer preserves production order. Control payloads must stay within
/// 125 bytes or the peer will fail the connection.
#[derive(Debug, Default)]
pub struct Outbound {
    buf: BytesMut,
}

impl Outbound {
    /// Queue a text message
    pub fn send_text(&mut self, text: &str) {
        encode_frame(&mut self.buf, OpCode::Text, text.as_bytes(), true, None);
    }

    /// Queue a binary message
    pub fn send_binary(&mut self, data: &[u8]) {
        encode_frame(&mut self.buf, OpCode::Binary, data, true, None);
    }

    /// Queue a ping
    pub fn send_ping(&mut self, data: &[u8]) {
        encode_frame(&mut self.buf, OpCode::Ping, data, true, None);
    }
}

/// The application-side capability set
///
/// Each callback owns the handler state (`&mut self`) and returns a
/// [`Next`] verdict where the protocol allows the application to react;
/// pure notifications (`on_close`, `on_error`, `on_timeout`) return
/// nothing because the connection outcome is already decided.
pub trait WsHandler: Send {
    /// Application message type delivered through [`WsConnection::info`]
    type Info: Send;

    /// Decide whether to accept the upgrade
    fn negotiate(&mut self, _req: &UpgradeRequest) -> Negotiation {
        Negotiation::Accept(AcceptOptions::default())
    }

    /// The upgrade completed and the connection is open
    fn on_connect(&mut self, _out: &mut Outbound) -> Next {
        Next::Continue
    }

    /// A complete text message arrived (UTF-8 already validated)
    fn on_text(&mut self, _data: &str, _out: &mut Outbound) -> Next {
        Next::Continue
    }

    /// A complete binary message arrived
    fn on_binary(&mut self, _data: Bytes, _out: &mut Outbound) -> Next {
        Next::Continue
    }

    /// A ping arrived; the pong reply is already queued
    fn on_ping(&mut self, _data: &[u8], _out: &mut Outbound) -> Next {
        Next::Continue
    }

    /// A pong arrived
    fn on_pong(&mut self, _data: &[u8], _out: &mut Outbound) -> Next {
        Next::Continue
    }

    /// The connection is closing
    fn on_close(&mut self, _event: &CloseEvent) {}

    /// The connection failed
    fn on_error(&mut self, _err: &Error) {}

    /// The idle timer fired; close 1002 follows
    fn on_timeout(&mut self) {}

    /// An application message arrived via the connection mailbox
    fn on_info(&mut self, _info: Self::Info, _out: &mut Outbound) -> Next {
        Next::Continue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Text,
    Binary,
}

/// In-progress fragmented message; exists iff the last data frame had
/// fin=false
#[derive(Debug)]
struct Fragment {
    kind: FragmentKind,
    data: BytesMut,
}

/// The WebSocket connection state machine
pub struct WsConnection<H: WsHandler> {
    handler: H,
    parser: FrameParser,
    state: State,
    fragment: Option<Fragment>,
    out: Outbound,
    done: bool,
    max_message_size: usize,
}

impl<H: WsHandler> WsConnection<H> {
    /// Create a server-side connection over an upgraded transport
    pub fn new(handler: H, config: &Config) -> Self {
        Self {
            handler,
            parser: FrameParser::new(config.max_frame_size, true),
            state: State::Open,
            fragment: None,
            out: Outbound::default(),
            done: false,
            max_message_size: config.max_message_size,
        }
    }

    /// Access the handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutably access the handler
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Dispatch `on_connect` after the 101 response was written
    pub fn connect(&mut self) {
        let next = self.handler.on_connect(&mut self.out);
        self.apply(next);
    }

    /// Feed transport bytes through the parser and dispatch frames
    pub fn receive(&mut self, buf: &mut BytesMut) {
        while !self.done {
            match self.parser.parse(buf) {
                Ok(Some(frame)) => self.handle_frame(frame),
                Ok(None) => break,
                Err(err) => {
                    self.fail(err);
                    break;
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: WsFrame) {
        match frame {
            WsFrame::Text { fin, data } => self.handle_data(FragmentKind::Text, fin, data),
            WsFrame::Binary { fin, data } => self.handle_data(FragmentKind::Binary, fin, data),
            WsFrame::Continuation { fin, data } => self.handle_continuation(fin, data),
            WsFrame::Ping(data) => {
                // The pong goes out ahead of anything the handler queues.
                encode_frame(&mut self.out.buf, OpCode::Pong, &data, true, None);
                let next = self.handler.on_ping(&data, &mut self.out);
                self.apply(next);
            }
            WsFrame::Pong(data) => {
                let next = self.handler.on_pong(&data, &mut self.out);
                self.apply(next);
            }
            WsFrame::Close { code, .. } => {
                let received = code.unwrap_or(close_code::NO_STATUS);
                self.handler.on_close(&CloseEvent {
                    source: CloseSource::Remote,
                    code: received,
                });
                self.send_close(reply_close_code(received));
                self.done = true;
            }
        }
    }

    fn handle_data(&mut self, kind: FragmentKind, fin: bool, data: Bytes) {
        if self.fragment.is_some() {
            self.fail(Error::Protocol("data frame inside a fragmented message"));
            return;
        }
        if fin {
            self.deliver(kind, data);
        } else {
            if data.len() > self.max_message_size {
                self.fail(Error::MessageTooLarge);
                return;
            }
            self.fragment = Some(Fragment {
                kind,
                data: BytesMut::from(&data[..]),
            });
        }
    }

    fn handle_continuation(&mut self, fin: bool, data: Bytes) {
        let mut fragment = match self.fragment.take() {
            Some(fragment) => fragment,
            None => {
                self.fail(Error::Protocol("continuation without a fragmented message"));
                return;
            }
        };
        if fragment.data.len() + data.len() > self.max_message_size {
            self.fail(Error::MessageTooLarge);
            return;
        }
        fragment.data.extend_from_slice(&data);
        if fin {
            let data = fragment.data.freeze();
            self.deliver(fragment.kind, data);
        } else {
            self.fragment = Some(fragment);
        }
    }

    /// Hand a complete message to the handler
    fn deliver(&mut self, kind: FragmentKind, data: Bytes) {
        let next = match kind {
            FragmentKind::Text => match std::str::from_utf8(&data) {
                Ok(text) => self.handler.on_text(text, &mut self.out),
                Err(_) => {
                    self.fail(Error::InvalidUtf8);
                    return;
                }
            },
            FragmentKind::Binary => self.handler.on_binary(data, &mut self.out),
        };
        self.apply(next);
    }

    fn apply(&mut self, next: Next) {
        match next {
            Next::Continue => {}
            Next::Close => {
                self.send_close(close_code::NORMAL);
                self.done = true;
            }
            Next::Error(_) => {
                self.send_close(close_code::INTERNAL);
                self.done = true;
            }
        }
    }

    /// Protocol failure: notify the handler, close with the tagged code
    fn fail(&mut self, err: Error) {
        self.handler.on_error(&err);
        self.send_close(err.close_code());
        self.done = true;
    }

    /// The transport closed underneath us
    ///
    /// The close 1006 is best-effort; it is usually dropped because the
    /// peer is already gone.
    pub fn transport_closed(&mut self) {
        self.handler.on_error(&Error::ConnectionClosed);
        self.send_close(close_code::ABNORMAL);
        self.done = true;
    }

    /// Graceful server shutdown
    pub fn shutdown(&mut self) {
        self.handler.on_close(&CloseEvent {
            source: CloseSource::Local,
            code: close_code::GOING_AWAY,
        });
        self.send_close(close_code::GOING_AWAY);
        self.done = true;
    }

    /// The idle timer fired
    pub fn idle_timeout(&mut self) {
        self.handler.on_timeout();
        self.send_close(close_code::PROTOCOL_ERROR);
        self.done = true;
    }

    /// Deliver an application message to the handler
    pub fn info(&mut self, info: H::Info) {
        if self.done {
            return;
        }
        let next = self.handler.on_info(info, &mut self.out);
        self.apply(next);
    }

    /// Queue a text message if the connection is still open
    pub fn send_text(&mut self, text: &str) {
        if self.state == State::Open {
            self.out.send_text(text);
        }
    }

    /// Queue a binary message if the connection is still open
    pub fn send_binary(&mut self, data: &[u8]) {
        if self.state == State::Open {
            self.out.send_binary(data);
        }
    }

    /// Queue a ping if the connection is still open
    pub fn send_ping(&mut self, data: &[u8]) {
        if self.state == State::Open {
            self.out.send_ping(data);
        }
    }

    /// The state guard every close path shares
    fn send_close(&mut self, code: u16) {
        if self.state == State::Open {
            encode_close(&mut self.out.buf, code, "", None);
            self.state = State::Closing;
        }
    }

    /// Drain the bytes the machine wants written to the transport
    pub fn take_output(&mut self) -> Bytes {
        self.out.buf.split().freeze()
    }

    /// True once the transport should be closed after flushing output
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// True while no Close frame has been emitted
    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }
}
