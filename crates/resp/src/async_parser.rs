//! RESP protocol async parser

use crate::{RespError, RespValue};
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Default maximum frame size: 512MB (prevents memory overflow attacks)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// RESP protocol async parser
///
/// Wraps a buffered reader and yields one [`RespValue`] per call. The same
/// parser instance must stay bound to a connection for its whole life: RESP
/// frames may span reads and the buffer carries the remainder.
pub struct AsyncRespParser<R: AsyncRead + Unpin> {
    reader: BufReader<R>,
    max_bytes: usize,
    bytes_read: usize,
}

impl<R: AsyncRead + Unpin> AsyncRespParser<R> {
    /// Create a new async parser (using default max frame size)
    pub fn new(reader: R) -> Self {
        Self::with_max_bytes(reader, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new async parser (specify max frame size)
    pub fn with_max_bytes(reader: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_bytes,
            bytes_read: 0,
        }
    }

    /// Check and update the number of bytes read for the current frame
    fn check_frame_size(&mut self, additional: usize) -> Result<(), RespError> {
        self.bytes_read = self.bytes_read.saturating_add(additional);
        if self.bytes_read > self.max_bytes {
            Err(RespError::FrameTooLarge(self.bytes_read, self.max_bytes))
        } else {
            Ok(())
        }
    }

    /// Parse next RESP value
    pub async fn parse(&mut self) -> Result<RespValue, RespError> {
        self.bytes_read = 0;
        self.parse_value().await
    }

    async fn parse_value(&mut self) -> Result<RespValue, RespError> {
        let line = self.read_line().await?;
        if line.is_empty() {
            return Err(RespError::InvalidFormat("Empty line".to_string()));
        }

        match line.as_bytes()[0] {
            b'*' => self.parse_array(&line).await,
            b'$' => self.parse_bulk(&line).await,
            b':' => parse_int(&line),
            b'+' => parse_simple(&line),
            b'-' => Ok(RespValue::Error(Bytes::from(line[1..].to_string()))),
            other => Err(RespError::InvalidType(other)),
        }
    }

    /// Parse the snapshot payload sent after `+FULLRESYNC`: a bulk-shaped
    /// frame `$<n>\r\n<payload>` with **no** trailing CRLF. Only valid at the
    /// one point in the replication handshake where the primary transfers the
    /// initial dump; everywhere else bulk strings are CRLF-terminated.
    pub async fn parse_snapshot(&mut self) -> Result<Bytes, RespError> {
        self.bytes_read = 0;
        let line = self.read_line().await?;
        let Some(len_str) = line.strip_prefix('$') else {
            return Err(RespError::InvalidFormat(format!(
                "Expected snapshot bulk header, got {:?}",
                line
            )));
        };
        let len = len_str
            .parse::<usize>()
            .map_err(|_| RespError::InvalidFormat(format!("Invalid snapshot length: {}", len_str)))?;
        self.check_frame_size(len)?;

        let mut payload = vec![0u8; len];
        AsyncReadExt::read_exact(&mut self.reader, &mut payload).await?;
        Ok(Bytes::from(payload))
    }

    async fn read_line(&mut self) -> Result<String, RespError> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(RespError::UnexpectedEof);
        }
        self.check_frame_size(bytes_read)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Parse bulk string: $5\r\nhello\r\n
    async fn parse_bulk(&mut self, line: &str) -> Result<RespValue, RespError> {
        let len_str = &line[1..];
        let len = len_str.parse::<i64>().map_err(|_| {
            RespError::InvalidFormat(format!("Invalid bulk string length: {}", len_str))
        })?;

        if len == -1 {
            return Ok(RespValue::Null);
        }
        if len < 0 {
            return Err(RespError::InvalidFormat(format!(
                "Invalid bulk string length: {}",
                len
            )));
        }

        let len = len as usize;
        self.check_frame_size(len + 2)?;

        let mut buffer = vec![0u8; len];
        AsyncReadExt::read_exact(&mut self.reader, &mut buffer).await?;

        let mut crlf = [0u8; 2];
        AsyncReadExt::read_exact(&mut self.reader, &mut crlf).await?;
        if crlf != [b'\r', b'\n'] {
            return Err(RespError::InvalidFormat(
                "Expected \\r\\n after bulk string".to_string(),
            ));
        }

        Ok(RespValue::BulkString(Some(Bytes::from(buffer))))
    }

    /// Parse array: *2\r\n$3\r\nGET\r\n$3\r\nkey\r\n
    async fn parse_array(&mut self, line: &str) -> Result<RespValue, RespError> {
        let count_str = &line[1..];
        let count = count_str.parse::<i64>().map_err(|_| {
            RespError::InvalidFormat(format!("Invalid array length: {}", count_str))
        })?;

        if count == -1 {
            return Ok(RespValue::Null);
        }
        if count < 0 {
            return Err(RespError::InvalidFormat(format!(
                "Invalid array length: {}",
                count
            )));
        }

        let count = count as usize;
        if count > 1024 * 1024 {
            return Err(RespError::InvalidFormat(format!(
                "Array too large: {} elements",
                count
            )));
        }

        let mut array = Vec::with_capacity(count);
        for _ in 0..count {
            let parse_fut = Box::pin(async { self.parse_value().await });
            array.push(parse_fut.await?);
        }
        Ok(RespValue::Array(array))
    }
}

/// Parse simple string: +OK\r\n
fn parse_simple(line: &str) -> Result<RespValue, RespError> {
    let value = &line[1..];
    if value.contains('\r') || value.contains('\n') {
        return Err(RespError::InvalidFormat(
            "Simple string cannot contain CR or LF".to_string(),
        ));
    }
    Ok(RespValue::SimpleString(Bytes::from(value.to_string())))
}

/// Parse integer: :123\r\n
fn parse_int(line: &str) -> Result<RespValue, RespError> {
    let num_str = &line[1..];
    let num = num_str
        .parse::<i128>()
        .map_err(|_| RespError::InvalidFormat(format!("Invalid integer: {}", num_str)))?;
    if num > i64::MAX as i128 || num < i64::MIN as i128 {
        return Err(RespError::IntegerOverflow);
    }
    Ok(RespValue::Integer(num as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_parse_simple_string() {
        let reader = Builder::new().read(b"+OK\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert_eq!(
            parser.parse().await.unwrap(),
            RespValue::SimpleString(Bytes::from("OK"))
        );
    }

    #[tokio::test]
    async fn test_parse_error_frame() {
        let reader = Builder::new().read(b"-ERR boom\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert_eq!(
            parser.parse().await.unwrap(),
            RespValue::Error(Bytes::from("ERR boom"))
        );
    }

    #[tokio::test]
    async fn test_parse_integer() {
        let reader = Builder::new().read(b":-7\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert_eq!(parser.parse().await.unwrap(), RespValue::Integer(-7));
    }

    #[tokio::test]
    async fn test_parse_bulk_string() {
        let reader = Builder::new().read(b"$5\r\nhello\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert_eq!(
            parser.parse().await.unwrap(),
            RespValue::BulkString(Some(Bytes::from(b"hello" as &[u8])))
        );
    }

    #[tokio::test]
    async fn test_parse_null_bulk() {
        let reader = Builder::new().read(b"$-1\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert_eq!(parser.parse().await.unwrap(), RespValue::Null);
    }

    #[tokio::test]
    async fn test_parse_array() {
        let reader = Builder::new().read(b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        let argv = parser.parse().await.unwrap().to_command().unwrap();
        assert_eq!(argv, vec![Bytes::from("GET"), Bytes::from("key")]);
    }

    #[tokio::test]
    async fn test_parse_pipelined_frames() {
        let reader = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n")
            .build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert!(parser.parse().await.is_ok());
        assert!(parser.parse().await.is_ok());
        assert!(parser.parse().await.unwrap_err().is_eof());
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let reader = Builder::new().read(b"$9999999999\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert!(matches!(
            parser.parse().await,
            Err(RespError::FrameTooLarge(_, _))
        ));
    }

    #[tokio::test]
    async fn test_parse_snapshot_without_trailing_crlf() {
        // Snapshot transfer: payload is *not* CRLF-terminated, and the next
        // frame begins immediately after the payload bytes.
        let reader = Builder::new()
            .read(b"$5\r\nABCDE*1\r\n$4\r\nPING\r\n")
            .build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        let payload = parser.parse_snapshot().await.unwrap();
        assert_eq!(&payload[..], b"ABCDE");
        let next = parser.parse().await.unwrap().to_command().unwrap();
        assert_eq!(next, vec![Bytes::from("PING")]);
    }

    #[tokio::test]
    async fn test_invalid_leading_byte() {
        let reader = Builder::new().read(b"?what\r\n").build();
        let mut parser = AsyncRespParser::with_max_bytes(reader, 1024);
        assert!(matches!(
            parser.parse().await,
            Err(RespError::InvalidType(b'?'))
        ));
    }
}
