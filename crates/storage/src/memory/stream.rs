//! Stream storage
//!
//! Append-only per-key entry log. Entry IDs are `<ms>-<seq>` pairs ordered
//! lexicographically and strictly increasing within a stream.

use super::{StoreError, StoreResult};
use bytes::Bytes;
use std::fmt;

/// Stream entry ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// ID specification submitted to an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpec {
    /// `*` - assign both halves from the clock and the stream top
    Auto,
    /// `<ms>-*` - assign the sequence half
    AutoSeq(u64),
    /// Fully explicit ID; validated against the stream top
    Exact(StreamId),
}

/// One stream record: ID plus field/value pairs in submission order
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: Vec<(Bytes, Bytes)>,
}

/// The entry log of one stream key
#[derive(Debug, Clone, Default)]
pub struct StreamData {
    entries: Vec<StreamEntry>,
}

impl StreamData {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// ID of the top (most recent) entry
    pub fn last_id(&self) -> Option<StreamId> {
        self.entries.last().map(|entry| entry.id)
    }

    /// Append an entry, resolving `*`/`<ms>-*` forms against the clock and
    /// the current top. The resolved ID must be strictly greater than both
    /// `0-0` and the top entry's ID.
    pub fn append(
        &mut self,
        spec: IdSpec,
        fields: Vec<(Bytes, Bytes)>,
        now_ms: u64,
    ) -> StoreResult<StreamId> {
        let id = self.resolve(spec, now_ms);
        if id == StreamId::ZERO {
            return Err(StoreError::StreamIdZero);
        }
        if let Some(last) = self.last_id() {
            if id <= last {
                return Err(StoreError::StreamIdTooSmall);
            }
        }
        self.entries.push(StreamEntry { id, fields });
        Ok(id)
    }

    fn resolve(&self, spec: IdSpec, now_ms: u64) -> StreamId {
        match spec {
            IdSpec::Exact(id) => id,
            IdSpec::AutoSeq(ms) => match self.last_id() {
                Some(last) if last.ms == ms => StreamId::new(ms, last.seq + 1),
                _ if ms == 0 => StreamId::new(0, 1),
                _ => StreamId::new(ms, 0),
            },
            // A clock that is behind the stream top must not break
            // monotonicity; fall back to bumping the top's sequence.
            IdSpec::Auto => match self.last_id() {
                Some(last) if last.ms >= now_ms => StreamId::new(last.ms, last.seq + 1),
                _ => StreamId::new(now_ms, 0),
            },
        }
    }

    /// Entries whose IDs lie inclusively in `[start, end]`
    pub fn range(&self, start: StreamId, end: StreamId) -> Vec<StreamEntry> {
        self.entries
            .iter()
            .filter(|entry| start <= entry.id && entry.id <= end)
            .cloned()
            .collect()
    }

    /// Entries with IDs strictly greater than `after`
    pub fn entries_after(&self, after: StreamId) -> Vec<StreamEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.id > after)
            .cloned()
            .collect()
    }
}
