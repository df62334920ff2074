//! Async driver for HTTP/2 connections
//!
//! Owns the transport and the [`Connection`] state machine. The loop
//! reads bytes, feeds them to the machine, writes whatever output was
//! queued, and fans requests out to per-stream tasks. Stream tasks never
//! touch the transport: their response pieces come back over an mpsc
//! channel and are serialized through this single writer, so frames for
//! a stream are written in production order and control replies
//! (SETTINGS-ACK, PING-ACK) are never reordered behind slow handlers.

use std::collections::HashMap;
use std::future::Future;

use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::connection::{Connection, Event, ResponseHead};
use super::hpack::HeaderField;
use crate::transport::{self, ReadOutcome, Transport};
use crate::{Config, Result};

/// A decoded request head plus its body stream
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub scheme: Option<String>,
    pub authority: Option<String>,
    /// Regular (non-pseudo) headers in wire order
    pub headers: Vec<(String, String)>,
    /// Body chunks as DATA frames arrive; empty for END_STREAM requests
    pub body: Body,
}

/// Streamed request body
#[derive(Debug)]
pub struct Body {
    chunks: mpsc::Receiver<Bytes>,
}

impl Body {
    fn empty() -> Self {
        let (_, chunks) = mpsc::channel(1);
        Self { chunks }
    }

    /// Await the next body chunk; `None` once the body is complete
    pub async fn chunk(&mut self) -> Option<Bytes> {
        self.chunks.recv().await
    }

    /// Collect the remaining body into one buffer
    pub async fn collect(&mut self) -> Bytes {
        let mut all = BytesMut::new();
        while let Some(chunk) = self.chunk().await {
            all.extend_from_slice(&chunk);
        }
        all.freeze()
    }
}

/// Response produced by the application handler
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

/// Response body forms, mapped to the frame emission rules
#[derive(Debug)]
pub enum ResponseBody {
    /// HEADERS with END_HEADERS | END_STREAM, nothing else
    Empty,
    /// HEADERS then one DATA frame with END_STREAM
    Full(Bytes),
    /// HEADERS, a DATA frame per chunk, then an empty terminal DATA
    Streaming(mpsc::Receiver<Bytes>),
}

impl Response {
    /// An empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    /// A 200 response with a text body
    pub fn text(body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            status: StatusCode::OK,
            headers: vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: ResponseBody::Full(Bytes::from(body)),
        }
    }

    /// Append a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }
}

/// Response pieces flowing from stream tasks back to the writer
enum Command {
    Head {
        stream_id: u32,
        head: ResponseHead,
        end_stream: bool,
    },
    Chunk {
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
    },
}

/// Serve one HTTP/2 connection until it closes
///
/// The handler is invoked once per request stream; handlers for distinct
/// streams run concurrently on separate tasks.
pub async fn serve<T, F, Fut>(mut io: T, config: Config, handler: F) -> Result<()>
where
    T: Transport,
    F: Fn(Request) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let mut conn = Connection::new(&config);
    // Initial empty SETTINGS goes out before any client byte is required.
    transport::write_all(&mut io, &conn.take_output()).await?;
    debug!("http2 connection accepted, initial settings sent");

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(32);
    let mut bodies: HashMap<u32, mpsc::Sender<Bytes>> = HashMap::new();
    let mut read_buf = BytesMut::with_capacity(crate::RECV_BUFFER_SIZE);

    loop {
        tokio::select! {
            outcome = transport::read_some(&mut io, &mut read_buf) => {
                match outcome? {
                    ReadOutcome::Closed => {
                        debug!("peer hung up");
                        break;
                    }
                    ReadOutcome::Data(n) => trace!(bytes = n, "transport read"),
                }
                let chunk = read_buf.split().freeze();
                let events = conn.receive(&chunk);
                transport::write_all(&mut io, &conn.take_output()).await?;
                for event in events {
                    dispatch(event, &handler, &cmd_tx, &mut bodies).await;
                }
                if conn.should_close() {
                    debug!(last_stream_id = conn.last_stream_id(), "connection closing");
                    transport::write_all(&mut io, &conn.take_output()).await?;
                    transport::close(&mut io).await.ok();
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                // The loop owns a sender, so recv() cannot yield None.
                if let Some(cmd) = cmd {
                    match cmd {
                        Command::Head { stream_id, head, end_stream } => {
                            trace!(stream_id, end_stream, "response head");
                            conn.send_response_head(stream_id, &head, end_stream);
                        }
                        Command::Chunk { stream_id, data, end_stream } => {
                            trace!(stream_id, bytes = data.len(), end_stream, "response data");
                            conn.send_data(stream_id, &data, end_stream);
                        }
                    }
                    transport::write_all(&mut io, &conn.take_output()).await?;
                }
            }
        }
    }

    // Dropping the body senders cancels in-flight stream tasks at their
    // next suspension point.
    Ok(())
}

async fn dispatch<F, Fut>(
    event: Event,
    handler: &F,
    cmd_tx: &mpsc::Sender<Command>,
    bodies: &mut HashMap<u32, mpsc::Sender<Bytes>>,
) where
    F: Fn(Request) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    match event {
        Event::Request {
            stream_id,
            headers,
            end_stream,
        } => {
            debug!(stream_id, "request");
            let body = if end_stream {
                Body::empty()
            } else {
                let (tx, rx) = mpsc::channel(8);
                bodies.insert(stream_id, tx);
                Body { chunks: rx }
            };
            let request = build_request(headers, body);
            let handler = handler.clone();
            let cmd_tx = cmd_tx.clone();
            tokio::spawn(run_stream(stream_id, request, handler, cmd_tx));
        }
        Event::Data {
            stream_id,
            data,
            end_stream,
        } => {
            if let Some(tx) = bodies.get(&stream_id) {
                // Channel backpressure is the only throttle here.
                let _ = tx.send(data).await;
            }
            if end_stream {
                bodies.remove(&stream_id);
            }
        }
        Event::Reset { stream_id, .. } => {
            debug!(stream_id, "stream reset by peer");
            bodies.remove(&stream_id);
        }
        Event::GoawayReceived {
            last_stream_id,
            error_code,
        } => {
            debug!(last_stream_id, error_code, "goaway from peer");
        }
    }
}

fn build_request(headers: Vec<HeaderField>, body: Body) -> Request {
    let mut method = Method::GET;
    let mut path = String::from("/");
    let mut scheme = None;
    let mut authority = None;
    let mut regular = Vec::new();

    for field in headers {
        match field.name.as_str() {
            ":method" => {
                if let Ok(parsed) = field.value.parse() {
                    method = parsed;
                }
            }
            ":path" => path = field.value,
            ":scheme" => scheme = Some(field.value),
            ":authority" => authority = Some(field.value),
            name if name.starts_with(':') => {}
            _ => regular.push((field.name, field.value)),
        }
    }

    Request {
        method,
        path,
        scheme,
        authority,
        headers: regular,
        body,
    }
}

async fn run_stream<Fut>(
    stream_id: u32,
    request: Request,
    handler: impl FnOnce(Request) -> Fut,
    cmd_tx: mpsc::Sender<Command>,
) where
    Fut: Future<Output = Response> + Send + 'static,
{
    // A panicking handler becomes a plain 500 rather than a stalled stream.
    let response = match tokio::spawn(handler(request)).await {
        Ok(response) => response,
        Err(join_err) => {
            debug!(stream_id, error = %join_err, "handler failed");
            Response::new(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    let head = ResponseHead {
        status: response.status,
        headers: response.headers,
    };

    let result: std::result::Result<(), mpsc::error::SendError<Command>> = async {
        match response.body {
            ResponseBody::Empty => {
                cmd_tx
                    .send(Command::Head {
                        stream_id,
                        head,
                        end_stream: true,
                    })
                    .await
            }
            ResponseBody::Full(data) => {
                cmd_tx
                    .send(Command::Head {
                        stream_id,
                        head,
                        end_stream: false,
                    })
                    .await?;
                cmd_tx
                    .send(Command::Chunk {
                        stream_id,
                        data,
                        end_stream: true,
                    })
                    .await
            }
            ResponseBody::Streaming(mut chunks) => {
                cmd_tx
                    .send(Command::Head {
                        stream_id,
                        head,
                        end_stream: false,
                    })
                    .await?;
                while let Some(data) = chunks.recv().await {
                    cmd_tx
                        .send(Command::Chunk {
                            stream_id,
                            data,
                            end_stream: false,
                        })
                        .await?;
                }
                cmd_tx
                    .send(Command::Chunk {
                        stream_id,
                        data: Bytes::new(),
                        end_stream: true,
                    })
                    .await
            }
        }
    }
    .await;

    if result.is_err() {
        // Connection task is gone; nothing left to deliver to.
        trace!(stream_id, "writer closed before response completed");
    }
}
