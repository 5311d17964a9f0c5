//! RESP (REdis Serialization Protocol) support library
//!
//! Implements RESP frame parsing, encoding, and type-safe command parsing
//! for the cache server's wire surface.

mod async_encoder;
mod async_parser;
pub mod command;
mod encoder;

pub use async_encoder::AsyncRespEncoder;
pub use async_parser::{AsyncRespParser, DEFAULT_MAX_FRAME_SIZE};
pub use command::{
    Command, CommandError, CommandErrorKind, CommandResult, CommandType, RangeId, ReplConfSub,
    StreamIdArg, XReadId,
};
pub use encoder::{encode_to_vec, encoded_len, RespEncoder};

use bytes::Bytes;
use std::io;

/// RESP data type
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(Bytes),
    /// Error: -ERR message\r\n
    Error(Bytes),
    /// Integer: :123\r\n
    Integer(i64),
    /// Bulk string: $5\r\nhello\r\n
    BulkString(Option<Bytes>),
    /// Array: *2\r\n$3\r\nGET\r\n$3\r\nkey\r\n
    Array(Vec<RespValue>),
    /// Null: $-1\r\n
    Null,
}

impl RespValue {
    /// Simple string reply from static or owned text.
    pub fn simple(s: impl Into<Bytes>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Bulk string reply.
    pub fn bulk(s: impl Into<Bytes>) -> Self {
        RespValue::BulkString(Some(s.into()))
    }

    /// Error reply; the message carries its own prefix (`ERR …`, `WRONGTYPE …`).
    pub fn error(msg: impl Into<String>) -> Self {
        RespValue::Error(Bytes::from(msg.into()))
    }

    /// Convert an array frame into a command argument vector.
    ///
    /// Returns `None` for frames that are not arrays of bulk/simple strings.
    pub fn to_command(&self) -> Option<Vec<Bytes>> {
        match self {
            RespValue::Array(items) => {
                let mut argv = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        RespValue::BulkString(Some(bytes)) => argv.push(bytes.clone()),
                        RespValue::SimpleString(s) => argv.push(s.clone()),
                        _ => return None,
                    }
                }
                Some(argv)
            }
            _ => None,
        }
    }

    /// Build the canonical wire form of a command: an array of bulk strings.
    pub fn from_command(argv: &[Bytes]) -> Self {
        RespValue::Array(
            argv.iter()
                .map(|arg| RespValue::BulkString(Some(arg.clone())))
                .collect(),
        )
    }
}

/// RESP parsing error
#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Integer overflow")]
    IntegerOverflow,
    #[error("Frame too large: {0} bytes (max: {1} bytes)")]
    FrameTooLarge(usize, usize),
    #[error("Invalid RESP type: {0}")]
    InvalidType(u8),
}

impl RespError {
    /// True when the peer closed the connection cleanly between frames.
    pub fn is_eof(&self) -> bool {
        match self {
            RespError::UnexpectedEof => true,
            RespError::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
