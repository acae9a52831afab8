//! Per-player byte channel carrying fixed-width records.
//!
//! Both the server workers and the client drive their sockets through
//! [`Connection`]. It is generic over any async stream so the same code runs
//! on TCP sockets in production and on in-memory duplex pipes in tests.

use crate::{decode, encode, Record, RECORD_SIZE};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ChannelError {
    /// Peer closed the stream on a record boundary.
    #[error("connection closed by peer")]
    Closed,
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed record: {0}")]
    Malformed(#[from] bincode::Error),
}

/// Bidirectional record channel owned by exactly one player worker (or client).
pub struct Connection<S> {
    stream: S,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Writes one record and flushes it.
    pub async fn send(&mut self, record: &Record) -> Result<(), ChannelError> {
        let bytes = encode(record)?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads exactly one record.
    ///
    /// A stream that ends before the first byte yields [`ChannelError::Closed`];
    /// one that ends in the middle of a record is a transport error.
    pub async fn recv(&mut self) -> Result<Record, ChannelError> {
        let mut buffer = [0u8; RECORD_SIZE];
        let mut filled = 0;

        while filled < RECORD_SIZE {
            let read = self.stream.read(&mut buffer[filled..]).await?;
            if read == 0 {
                if filled == 0 {
                    return Err(ChannelError::Closed);
                }
                return Err(ChannelError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("short record: {} of {} bytes", filled, RECORD_SIZE),
                )));
            }
            filled += read;
        }

        Ok(decode(&buffer)?)
    }

    /// Shuts down the write half so the peer observes end of stream.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
