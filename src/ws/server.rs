//! Async driver for WebSocket connections
//!
//! Performs the HTTP/1.1 upgrade (gated by the handler's `negotiate`),
//! then runs the read loop: feed bytes to the state machine, write
//! whatever it queued, and close the transport when it says so. The
//! optional mailbox delivers application messages to `on_info`; the idle
//! timer re-arms whenever the peer sends anything.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::connection::{Negotiation, WsConnection, WsHandler};
use super::handshake;
use crate::transport::{self, ReadOutcome, Transport};
use crate::{Config, Result};

/// Serve one WebSocket connection from upgrade to close
pub async fn serve<T, H>(io: T, config: Config, handler: H) -> Result<()>
where
    T: Transport,
    H: WsHandler,
{
    run(io, config, handler, None).await
}

/// Serve one WebSocket connection with an application mailbox
///
/// Messages sent to the mailbox are dispatched to the handler's
/// `on_info` between reads.
pub async fn serve_with_mailbox<T, H>(
    io: T,
    config: Config,
    handler: H,
    mailbox: mpsc::Receiver<H::Info>,
) -> Result<()>
where
    T: Transport,
    H: WsHandler,
{
    run(io, config, handler, Some(mailbox)).await
}

async fn run<T, H>(
    mut io: T,
    config: Config,
    mut handler: H,
    mut mailbox: Option<mpsc::Receiver<H::Info>>,
) -> Result<()>
where
    T: Transport,
    H: WsHandler,
{
    let (request, leftover) = handshake::read_request(&mut io).await?;

    let options = match handler.negotiate(&request) {
        Negotiation::Accept(options) => options,
        Negotiation::Refuse => {
            debug!(path = %request.path, "upgrade refused");
            transport::write_all(&mut io, &handshake::build_refusal()).await?;
            transport::close(&mut io).await.ok();
            return Ok(());
        }
    };

    let accept = handshake::accept_key(&request.key);
    let response = handshake::build_accept_response(&accept, options.protocol.as_deref());
    transport::write_all(&mut io, &response).await?;
    debug!(path = %request.path, "websocket upgraded");

    let idle = options.timeout.or(config.idle_timeout);
    let mut conn = WsConnection::new(handler, &config);
    conn.connect();

    let mut read_buf = leftover;
    if !read_buf.is_empty() {
        conn.receive(&mut read_buf);
    }
    transport::write_all(&mut io, &conn.take_output()).await?;

    while !conn.is_done() {
        tokio::select! {
            outcome = transport::read_some(&mut io, &mut read_buf) => {
                match outcome? {
                    ReadOutcome::Closed => {
                        debug!("transport closed by peer");
                        conn.transport_closed();
                        // Best effort; the peer is usually gone already.
                        let _ = transport::write_all(&mut io, &conn.take_output()).await;
                        return Ok(());
                    }
                    ReadOutcome::Data(n) => {
                        trace!(bytes = n, "transport read");
                        conn.receive(&mut read_buf);
                        transport::write_all(&mut io, &conn.take_output()).await?;
                    }
                }
            }
            Some(info) = recv_info(&mut mailbox) => {
                conn.info(info);
                transport::write_all(&mut io, &conn.take_output()).await?;
            }
            _ = tokio::time::sleep(idle.unwrap_or(Duration::ZERO)), if idle.is_some() => {
                debug!("idle timeout");
                conn.idle_timeout();
                transport::write_all(&mut io, &conn.take_output()).await?;
            }
        }
    }

    transport::write_all(&mut io, &conn.take_output()).await?;
    transport::close(&mut io).await.ok();
    debug!("websocket connection finished");
    Ok(())
}

async fn recv_info<I>(mailbox: &mut Option<mpsc::Receiver<I>>) -> Option<I> {
    match mailbox {
        Some(mailbox) => mailbox.recv().await,
        None => std::future::pending().await,
    }
}
