//! Thin adapter over the byte transport driving both runtimes
//!
//! The state machines never touch a socket. The drivers talk to the
//! transport exclusively through the three operations here: read whatever
//! bytes are available, write a fully serialized buffer, and close. The
//! transport may be TLS, plain TCP, or an in-memory pipe; the runtimes
//! cannot tell the difference.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The byte transports the runtimes can drive
///
/// Blanket-implemented for anything that reads and writes bytes
/// asynchronously, e.g. `TcpStream`, a TLS stream, or `tokio::io::duplex`.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Outcome of a single read from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were appended to the buffer
    Data(usize),
    /// The peer closed the stream
    Closed,
}

/// Read whatever bytes are currently available into `buf`
pub async fn read_some<T: Transport>(io: &mut T, buf: &mut BytesMut) -> io::Result<ReadOutcome> {
    let n = io.read_buf(buf).await?;
    if n == 0 {
        Ok(ReadOutcome::Closed)
    } else {
        Ok(ReadOutcome::Data(n))
    }
}

/// Write the whole buffer to the transport
pub async fn write_all<T: Transport>(io: &mut T, bytes: &[u8]) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    io.write_all(bytes).await?;
    io.flush().await
}

/// Close the write side of the transport
pub async fn close<T: Transport>(io: &mut T) -> io::Result<()> {
    io.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_reports_close_on_eof() {
        let (mut a, b) = tokio::io::duplex(64);
        drop(b);
        let mut buf = BytesMut::new();
        assert_eq!(read_some(&mut a, &mut buf).await.unwrap(), ReadOutcome::Closed);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_all(&mut a, b"ping").await.unwrap();
        let mut buf = BytesMut::new();
        match read_some(&mut b, &mut buf).await.unwrap() {
            ReadOutcome::Data(4) => assert_eq!(&buf[..], b"ping"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
