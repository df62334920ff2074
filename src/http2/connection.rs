//! HTTP/2 connection state machine (RFC 7540 §5, §6)
//!
//! Sans-I/O. [`Connection::receive`] consumes whatever bytes the
//! transport produced and returns the application-visible events; frames
//! the server must emit accumulate in an output buffer the driver drains
//! with [`Connection::take_output`]. When a connection error occurs the
//! machine queues a best-effort GOAWAY and raises [`Connection::should_close`];
//! it never touches the transport itself.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use http::StatusCode;

use super::frame::{self, settings_id, Frame, Parsed};
use super::hpack;
use super::{error_code, PREFACE};
use crate::Config;

/// Upper bound on an accumulated HEADERS + CONTINUATION block
const MAX_HEADER_BLOCK: usize = 256 * 1024;

/// Baseline response header appended by the runtime
const BASELINE_CACHE_CONTROL: &str = "max-age=0, private, must-revalidate";

/// Per-stream lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    HalfClosedRemote,
    HalfClosedLocal,
}

#[derive(Debug)]
struct Stream {
    state: StreamState,
}

/// Connection settings (RFC 7540 §6.5.2), defaults per §11.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: None,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    fn apply(&mut self, params: &[(u16, u32)]) {
        for &(id, value) in params {
            match id {
                settings_id::HEADER_TABLE_SIZE => self.header_table_size = value,
                settings_id::ENABLE_PUSH => self.enable_push = value != 0,
                settings_id::MAX_CONCURRENT_STREAMS => {
                    self.max_concurrent_streams = Some(value)
                }
                settings_id::INITIAL_WINDOW_SIZE => self.initial_window_size = value,
                settings_id::MAX_FRAME_SIZE => self.max_frame_size = value,
                settings_id::MAX_HEADER_LIST_SIZE => self.max_header_list_size = Some(value),
                _ => {} // unknown parameters are ignored (RFC 7540 §6.5.2)
            }
        }
    }
}

/// Application-visible connection events
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A request head arrived on a fresh stream
    Request {
        stream_id: u32,
        headers: Vec<hpack::HeaderField>,
        /// The request carried END_STREAM; the body is empty
        end_stream: bool,
    },
    /// A body chunk arrived for an open stream
    Data {
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
    },
    /// The peer reset a single stream
    Reset { stream_id: u32, error_code: u32 },
    /// The peer announced connection shutdown
    GoawayReceived {
        last_stream_id: u32,
        error_code: u32,
    },
}

/// Response head handed to [`Connection::send_response_head`]
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// A head with the given status and no extra headers
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }
}

/// In-flight HEADERS block awaiting CONTINUATION frames
#[derive(Debug)]
struct PendingHeaders {
    stream_id: u32,
    end_stream: bool,
    fragment: BytesMut,
}

/// The HTTP/2 connection state machine
#[derive(Debug)]
pub struct Connection {
    read_buf: BytesMut,
    out: BytesMut,
    preface_remaining: usize,
    decoder: hpack::Decoder,
    encoder: hpack::Encoder,
    streams: HashMap<u32, Stream>,
    pending_headers: Option<PendingHeaders>,
    /// Largest client stream id accepted so far, reported in GOAWAY
    last_stream_id: u32,
    local: Settings,
    remote: Settings,
    settings_in_flight: bool,
    goaway_sent: bool,
    goaway_received: bool,
    shutdown: bool,
}

impl Connection {
    /// Create the server side of a fresh connection
    ///
    /// Queues the server's initial empty SETTINGS immediately; the driver
    /// may write it before or after the client preface arrives.
    pub fn new(config: &Config) -> Self {
        let mut out = BytesMut::with_capacity(256);
        Frame::settings_empty().encode(&mut out);

        let local = Settings::default();
        Self {
            read_buf: BytesMut::with_capacity(crate::RECV_BUFFER_SIZE),
            out,
            preface_remaining: PREFACE.len(),
            decoder: hpack::Decoder::with_limits(
                config.header_table_size,
                config.max_header_list_size,
            ),
            encoder: hpack::Encoder::new(),
            streams: HashMap::new(),
            pending_headers: None,
            last_stream_id: 0,
            local,
            remote: Settings::default(),
            settings_in_flight: true,
            goaway_sent: false,
            goaway_received: false,
            shutdown: false,
        }
    }

    /// Feed transport bytes in and collect the resulting events
    pub fn receive(&mut self, data: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        if self.shutdown {
            return events;
        }
        self.read_buf.extend_from_slice(data);

        if !self.consume_preface() {
            return events;
        }

        loop {
            match frame::parse(&self.read_buf, self.local.max_frame_size) {
                Ok(Parsed::Need(_)) => break,
                Ok(Parsed::Frame { frame, consumed }) => {
                    let _ = self.read_buf.split_to(consumed);
                    if let Err(code) = self.handle_frame(frame, &mut events) {
                        self.connection_error(code);
                        break;
                    }
                    if self.shutdown {
                        break;
                    }
                }
                Err(err) => {
                    self.connection_error(err.h2_code());
                    break;
                }
            }
        }

        events
    }

    /// Match the 24-octet client preface; any deviation is fatal and the
    /// transport is closed without a GOAWAY
    fn consume_preface(&mut self) -> bool {
        while self.preface_remaining > 0 {
            if self.read_buf.is_empty() {
                return false;
            }
            let offset = PREFACE.len() - self.preface_remaining;
            let n = self.read_buf.len().min(self.preface_remaining);
            if self.read_buf[..n] != PREFACE[offset..offset + n] {
                self.shutdown = true;
                self.read_buf.clear();
                return false;
            }
            let _ = self.read_buf.split_to(n);
            self.preface_remaining -= n;
        }
        true
    }

    fn handle_frame(&mut self, frame: Frame, events: &mut Vec<Event>) -> Result<(), u32> {
        // A header block must be contiguous: between HEADERS without
        // END_HEADERS and the final CONTINUATION nothing else may appear.
        if self.pending_headers.is_some() && !matches!(frame, Frame::Continuation { .. }) {
            return Err(error_code::PROTOCOL_ERROR);
        }

        match frame {
            Frame::Settings { ack, params } => {
                if ack {
                    self.settings_in_flight = false;
                } else {
                    self.remote.apply(&params);
                    self.encoder
                        .set_table_capacity(self.remote.header_table_size as usize);
                    Frame::settings_ack().encode(&mut self.out);
                }
                Ok(())
            }
            Frame::Ping { ack, payload } => {
                if !ack {
                    Frame::ping_ack(payload).encode(&mut self.out);
                }
                Ok(())
            }
            Frame::Headers {
                stream_id,
                fragment,
                end_stream,
                end_headers,
                ..
            } => {
                if stream_id == 0 || stream_id % 2 == 0 || stream_id <= self.last_stream_id {
                    return Err(error_code::PROTOCOL_ERROR);
                }
                if end_headers {
                    self.open_stream(stream_id, &fragment, end_stream, events)
                } else {
                    if fragment.len() > MAX_HEADER_BLOCK {
                        return Err(error_code::PROTOCOL_ERROR);
                    }
                    self.pending_headers = Some(PendingHeaders {
                        stream_id,
                        end_stream,
                        fragment: BytesMut::from(&fragment[..]),
                    });
                    Ok(())
                }
            }
            Frame::Continuation {
                stream_id,
                fragment,
                end_headers,
            } => {
                let mut pending = match self.pending_headers.take() {
                    Some(pending) if pending.stream_id == stream_id => pending,
                    _ => return Err(error_code::PROTOCOL_ERROR),
                };
                if pending.fragment.len() + fragment.len() > MAX_HEADER_BLOCK {
                    return Err(error_code::PROTOCOL_ERROR);
                }
                pending.fragment.extend_from_slice(&fragment);
                if end_headers {
                    let block = pending.fragment.freeze();
                    self.open_stream(stream_id, &block, pending.end_stream, events)
                } else {
                    self.pending_headers = Some(pending);
                    Ok(())
                }
            }
            Frame::Data {
                stream_id,
                data,
                end_stream,
            } => {
                if stream_id == 0 {
                    return Err(error_code::PROTOCOL_ERROR);
                }
                // Data for even or unknown streams is dropped; the
                // connection stays up.
                let known = match self.streams.get_mut(&stream_id) {
                    Some(stream) if stream.state != StreamState::HalfClosedRemote => {
                        if end_stream {
                            stream.state = StreamState::HalfClosedRemote;
                        }
                        true
                    }
                    _ => false,
                };
                if known {
                    events.push(Event::Data {
                        stream_id,
                        data,
                        end_stream,
                    });
                }
                Ok(())
            }
            Frame::RstStream {
                stream_id,
                error_code,
            } => {
                if self.streams.remove(&stream_id).is_some() {
                    events.push(Event::Reset {
                        stream_id,
                        error_code,
                    });
                }
                Ok(())
            }
            Frame::Goaway {
                last_stream_id,
                error_code: peer_error,
                ..
            } => {
                self.goaway_received = true;
                Frame::goaway(self.last_stream_id, error_code::NO_ERROR).encode(&mut self.out);
                self.goaway_sent = true;
                self.shutdown = true;
                events.push(Event::GoawayReceived {
                    last_stream_id,
                    error_code: peer_error,
                });
                Ok(())
            }
            // Priorities are parsed and discarded; window accounting is
            // out of scope; unknown frame types are ignored by design.
            Frame::Priority { .. } | Frame::WindowUpdate { .. } | Frame::Unknown { .. } => Ok(()),
        }
    }

    fn open_stream(
        &mut self,
        stream_id: u32,
        fragment: &[u8],
        end_stream: bool,
        events: &mut Vec<Event>,
    ) -> Result<(), u32> {
        let headers = match self.decoder.decode(fragment) {
            Ok(headers) => headers,
            Err(_) => return Err(error_code::COMPRESSION_ERROR),
        };

        self.last_stream_id = stream_id;
        let state = if end_stream {
            StreamState::HalfClosedRemote
        } else {
            StreamState::Open
        };
        self.streams.insert(stream_id, Stream { state });

        events.push(Event::Request {
            stream_id,
            headers,
            end_stream,
        });
        Ok(())
    }

    /// Queue a GOAWAY (once) and request transport close
    fn connection_error(&mut self, code: u32) {
        if !self.goaway_sent {
            Frame::goaway(self.last_stream_id, code).encode(&mut self.out);
            self.goaway_sent = true;
        }
        self.shutdown = true;
    }

    // -----------------------------------------------------------------
    // Response emission
    // -----------------------------------------------------------------

    /// Send a response head on `stream_id`
    ///
    /// Set `end_stream` when no body will follow. The runtime prepends
    /// `:status` and a baseline `cache-control` header.
    pub fn send_response_head(&mut self, stream_id: u32, head: &ResponseHead, end_stream: bool) {
        let mut fields = Vec::with_capacity(head.headers.len() + 2);
        fields.push(hpack::HeaderField::new(":status", head.status.as_str()));
        fields.push(hpack::HeaderField::new(
            "cache-control",
            BASELINE_CACHE_CONTROL,
        ));
        for (name, value) in &head.headers {
            fields.push(hpack::HeaderField::new(name.clone(), value.clone()));
        }

        let mut block = BytesMut::new();
        self.encoder.encode(&fields, &mut block);
        let block = block.freeze();

        let max = self.remote.max_frame_size as usize;
        if block.len() <= max {
            Frame::Headers {
                stream_id,
                fragment: block,
                end_stream,
                end_headers: true,
                priority: None,
            }
            .encode(&mut self.out);
        } else {
            // Oversized header block: HEADERS then CONTINUATIONs
            let mut rest = block;
            let first = rest.split_to(max);
            Frame::Headers {
                stream_id,
                fragment: first,
                end_stream,
                end_headers: false,
                priority: None,
            }
            .encode(&mut self.out);
            while !rest.is_empty() {
                let take = rest.len().min(max);
                let chunk = rest.split_to(take);
                Frame::Continuation {
                    stream_id,
                    fragment: chunk,
                    end_headers: rest.is_empty(),
                }
                .encode(&mut self.out);
            }
        }

        if end_stream {
            self.finish_sending(stream_id);
        }
    }

    /// Send one response body chunk, split to the peer's max frame size
    pub fn send_data(&mut self, stream_id: u32, chunk: &[u8], end_stream: bool) {
        let max = self.remote.max_frame_size as usize;
        let mut rest = chunk;
        loop {
            let take = rest.len().min(max);
            let (piece, tail) = rest.split_at(take);
            rest = tail;
            let last = rest.is_empty();
            Frame::Data {
                stream_id,
                data: Bytes::copy_from_slice(piece),
                end_stream: end_stream && last,
            }
            .encode(&mut self.out);
            if last {
                break;
            }
        }
        if end_stream {
            self.finish_sending(stream_id);
        }
    }

    /// Send a complete response in one call
    ///
    /// With no body the head carries END_STREAM; a body is emitted as a
    /// single DATA frame with END_STREAM.
    pub fn send_response(&mut self, stream_id: u32, head: &ResponseHead, body: Option<&[u8]>) {
        match body {
            None => self.send_response_head(stream_id, head, true),
            Some(body) => {
                self.send_response_head(stream_id, head, false);
                self.send_data(stream_id, body, true);
            }
        }
    }

    fn finish_sending(&mut self, stream_id: u32) {
        match self.streams.get_mut(&stream_id) {
            Some(stream) if stream.state == StreamState::HalfClosedRemote => {
                self.streams.remove(&stream_id);
            }
            Some(stream) => stream.state = StreamState::HalfClosedLocal,
            None => {}
        }
    }

    // -----------------------------------------------------------------
    // Driver interface
    // -----------------------------------------------------------------

    /// Drain the bytes the machine wants written to the transport
    pub fn take_output(&mut self) -> Bytes {
        self.out.split().freeze()
    }

    /// True once the transport should be closed after flushing output
    pub fn should_close(&self) -> bool {
        self.shutdown
    }

    /// True while our SETTINGS has not been acknowledged
    pub fn settings_in_flight(&self) -> bool {
        self.settings_in_flight
    }

    /// True once the peer announced shutdown; no new streams are accepted
    pub fn goaway_received(&self) -> bool {
        self.goaway_received
    }

    /// Largest client stream id accepted so far
    pub fn last_stream_id(&self) -> u32 {
        self.last_stream_id
    }

    /// Number of live streams
    pub fn active_streams(&self) -> usize {
        self.streams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    fn connect() -> Connection {
        let mut conn = Connection::new(&Config::default());
        let _ = conn.take_output(); // drop the initial SETTINGS
        assert!(conn.receive(PREFACE).is_empty());
        conn
    }

    fn headers_frame(stream_id: u32, block: &[u8], flags_bits: u8) -> Vec<u8> {
        let mut wire = Vec::new();
        wire.put_u8(0);
        wire.put_u8(0);
        wire.put_u8(block.len() as u8);
        wire.put_u8(0x1);
        wire.put_u8(flags_bits);
        wire.put_u32(stream_id);
        wire.extend_from_slice(block);
        wire
    }

    #[test]
    fn initial_settings_is_queued_at_construction() {
        let mut conn = Connection::new(&Config::default());
        assert_eq!(
            conn.take_output().as_ref(),
            &[0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn preface_mismatch_closes_without_goaway() {
        let mut conn = Connection::new(&Config::default());
        let _ = conn.take_output();
        conn.receive(b"GET / HTTP/1.1\r\n\r\n");
        assert!(conn.should_close());
        assert!(conn.take_output().is_empty());
    }

    #[test]
    fn preface_accepted_byte_by_byte() {
        let mut conn = Connection::new(&Config::default());
        let _ = conn.take_output();
        for &byte in PREFACE {
            assert!(conn.receive(&[byte]).is_empty());
            assert!(!conn.should_close());
        }
    }

    #[test]
    fn settings_is_acknowledged() {
        let mut conn = connect();
        conn.receive(&[0, 0, 0, 4, 0, 0, 0, 0, 0]);
        assert_eq!(
            conn.take_output().as_ref(),
            &[0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn settings_ack_clears_in_flight_marker() {
        let mut conn = connect();
        assert!(conn.settings_in_flight());
        conn.receive(&[0, 0, 0, 4, 1, 0, 0, 0, 0]);
        assert!(!conn.settings_in_flight());
    }

    #[test]
    fn request_stream_lifecycle() {
        let mut conn = connect();
        // END_HEADERS, no END_STREAM: indexed :method GET etc.
        let events = conn.receive(&headers_frame(1, &[0x82, 0x86, 0x84], 0x4));
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Request {
                stream_id,
                headers,
                end_stream,
            } => {
                assert_eq!(*stream_id, 1);
                assert!(!end_stream);
                assert_eq!(headers[0], hpack::HeaderField::new(":method", "GET"));
            }
            other => panic!("expected request, got {:?}", other),
        }
        assert_eq!(conn.active_streams(), 1);

        // Body chunk with END_STREAM
        let mut data = vec![0, 0, 5, 0, 1, 0, 0, 0, 1];
        data.extend_from_slice(b"hello");
        let events = conn.receive(&data);
        assert_eq!(
            events,
            vec![Event::Data {
                stream_id: 1,
                data: Bytes::from_static(b"hello"),
                end_stream: true,
            }]
        );

        // Respond; stream is fully closed and forgotten.
        conn.send_response(1, &ResponseHead::new(StatusCode::OK), Some(b"ok".as_ref()));
        assert_eq!(conn.active_streams(), 0);
    }

    #[test]
    fn data_for_unknown_or_even_streams_is_dropped() {
        let mut conn = connect();
        let mut data = vec![0, 0, 3, 0, 0, 0, 0, 0, 2];
        data.extend_from_slice(b"abc");
        assert!(conn.receive(&data).is_empty());
        assert!(!conn.should_close());

        let mut data = vec![0, 0, 3, 0, 0, 0, 0, 0, 7];
        data.extend_from_slice(b"abc");
        assert!(conn.receive(&data).is_empty());
        assert!(!conn.should_close());
    }

    #[test]
    fn data_on_stream_zero_is_fatal() {
        let mut conn = connect();
        let mut data = vec![0, 0, 1, 0, 0, 0, 0, 0, 0];
        data.push(0xAA);
        conn.receive(&data);
        assert!(conn.should_close());
        let out = conn.take_output();
        assert_eq!(out[3], 0x7); // GOAWAY
        assert_eq!(&out[13..17], &[0, 0, 0, 1]); // PROTOCOL_ERROR
    }

    #[test]
    fn headers_after_goaway_do_not_open_streams() {
        let mut conn = connect();
        let mut goaway = vec![0, 0, 8, 7, 0, 0, 0, 0, 0];
        goaway.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        let events = conn.receive(&goaway);
        assert_eq!(
            events,
            vec![Event::GoawayReceived {
                last_stream_id: 0,
                error_code: 0,
            }]
        );
        assert!(conn.should_close());

        // The connection is shutting down; a late HEADERS opens nothing.
        let events = conn.receive(&headers_frame(1, &[0x82, 0x86, 0x84], 0x4));
        assert!(events.is_empty());
        assert_eq!(conn.active_streams(), 0);
    }

    #[test]
    fn rst_stream_drops_stream_state() {
        let mut conn = connect();
        conn.receive(&headers_frame(1, &[0x82], 0x4));
        assert_eq!(conn.active_streams(), 1);

        let mut rst = vec![0, 0, 4, 3, 0, 0, 0, 0, 1];
        rst.extend_from_slice(&[0, 0, 0, 8]); // CANCEL
        let events = conn.receive(&rst);
        assert_eq!(
            events,
            vec![Event::Reset {
                stream_id: 1,
                error_code: error_code::CANCEL,
            }]
        );
        assert_eq!(conn.active_streams(), 0);
    }

    #[test]
    fn continuation_reassembles_header_block() {
        let mut conn = connect();
        // HEADERS without END_HEADERS carrying half the block
        let events = conn.receive(&headers_frame(1, &[0x82, 0x86], 0x0));
        assert!(events.is_empty());

        // CONTINUATION with END_HEADERS carrying the rest
        let mut cont = vec![0, 0, 1, 9, 4, 0, 0, 0, 1];
        cont.push(0x84);
        let events = conn.receive(&cont);
        match &events[..] {
            [Event::Request { headers, .. }] => assert_eq!(headers.len(), 3),
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn interleaved_frame_during_header_block_is_fatal() {
        let mut conn = connect();
        conn.receive(&headers_frame(1, &[0x82], 0x0));
        let mut ping = vec![0, 0, 8, 6, 0, 0, 0, 0, 0];
        ping.extend_from_slice(&[0; 8]);
        conn.receive(&ping);
        assert!(conn.should_close());
    }

    #[test]
    fn unknown_frames_are_ignored() {
        let mut conn = connect();
        let mut wire = vec![0, 0, 2, 0xEE, 0, 0, 0, 0, 1];
        wire.extend_from_slice(&[0xDE, 0xAD]);
        assert!(conn.receive(&wire).is_empty());
        assert!(!conn.should_close());
        assert!(conn.take_output().is_empty());
    }

    #[test]
    fn response_head_carries_baseline_headers() {
        let mut conn = connect();
        conn.receive(&headers_frame(1, &[0x82, 0x86, 0x84], 0x5));
        conn.send_response_head(1, &ResponseHead::new(StatusCode::OK), true);
        let out = conn.take_output();
        assert_eq!(out[3], 0x1); // HEADERS
        assert_eq!(out[4], 0x5); // END_STREAM | END_HEADERS

        // The block decodes to :status plus the runtime cache-control.
        let mut decoder = hpack::Decoder::new();
        let fields = decoder.decode(&out[9..]).unwrap();
        assert_eq!(fields[0], hpack::HeaderField::new(":status", "200"));
        assert_eq!(
            fields[1],
            hpack::HeaderField::new("cache-control", BASELINE_CACHE_CONTROL)
        );
    }

    #[test]
    fn chunked_body_ends_with_empty_terminal_data_frame() {
        let mut conn = connect();
        conn.receive(&headers_frame(1, &[0x82, 0x86, 0x84], 0x5));
        conn.send_response_head(1, &ResponseHead::new(StatusCode::OK), false);
        let _ = conn.take_output();

        conn.send_data(1, b"part one", false);
        conn.send_data(1, b"part two", false);
        conn.send_data(1, &[], true);

        let out = conn.take_output();
        // Last frame on the wire: empty DATA with END_STREAM.
        let tail = &out[out.len() - 9..];
        assert_eq!(&tail[..5], &[0, 0, 0, 0x0, 0x1]);
    }

    #[test]
    fn large_chunk_is_split_to_max_frame_size() {
        let mut conn = connect();
        conn.receive(&headers_frame(1, &[0x82, 0x86, 0x84], 0x5));
        conn.send_response_head(1, &ResponseHead::new(StatusCode::OK), false);
        let _ = conn.take_output();

        let body = vec![0x42u8; 16_384 + 10];
        conn.send_data(1, &body, true);
        let out = conn.take_output();

        // First DATA frame is exactly max_frame_size long, no END_STREAM.
        assert_eq!(&out[..3], &[0x00, 0x40, 0x00]);
        assert_eq!(out[4], 0x0);
        // Second DATA frame carries the remainder with END_STREAM.
        let second = &out[9 + 16_384..];
        assert_eq!(&second[..5], &[0, 0, 10, 0x0, 0x1]);
    }
}
