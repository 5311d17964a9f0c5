//! RESP protocol async encoder

use crate::{encoder::encode_to_vec, RespValue};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// RESP protocol async encoder
pub struct AsyncRespEncoder<W: AsyncWrite + Unpin> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> AsyncRespEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encode RESP value and write
    pub async fn encode(&mut self, value: &RespValue) -> io::Result<()> {
        let buffer = encode_to_vec(value);
        self.writer.write_all(&buffer).await?;
        self.writer.flush().await
    }

    /// Write pre-encoded bytes verbatim (snapshot payloads, raw headers).
    pub async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Consume the encoder, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_encode() {
        let mut buffer = Vec::new();
        {
            let mut encoder = AsyncRespEncoder::new(&mut buffer);
            encoder.encode(&RespValue::simple("PONG")).await.unwrap();
        }
        assert_eq!(buffer, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_write_raw_is_verbatim() {
        let mut buffer = Vec::new();
        {
            let mut encoder = AsyncRespEncoder::new(&mut buffer);
            encoder.write_raw(b"$3\r\nabc").await.unwrap();
        }
        assert_eq!(buffer, b"$3\r\nabc");
    }
}
