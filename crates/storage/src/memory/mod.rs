//! Memory storage implementation
//!
//! Provides the unified value representation for the keyspace:
//! - String: raw byte string, optional TTL
//! - List: VecDeque for O(1) head operations
//! - Set: HashSet membership
//! - Stream: append-only entry log with monotonic IDs

pub mod store;
pub mod stream;

use bytes::Bytes;
use std::collections::{HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use stream::StreamData;

/// List data structure (VecDeque for O(1) head/tail operations)
pub type ListData = VecDeque<Bytes>;

/// Set data structure (HashSet for O(1) operations)
pub type SetData = HashSet<Bytes>;

/// Value type for the keyspace; a key holds exactly one of these
#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    List(ListData),
    Set(SetData),
    Stream(StreamData),
}

impl Value {
    /// Get the type name of the value, as reported by TYPE
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Stream(_) => "stream",
        }
    }
}

/// Keyspace operation error
///
/// `Display` renders the full wire error text, prefix included, so the
/// dispatcher replies with `RespValue::error(err.to_string())`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR value is not an integer or out of range")]
    NotInteger,
    #[error("ERR The ID specified in XADD must be greater than 0-0")]
    StreamIdZero,
    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    StreamIdTooSmall,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Wall-clock milliseconds since the epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
