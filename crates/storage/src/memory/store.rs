//! Unified memory store implementation
//!
//! A single coarse `RwLock` guards the whole keyspace: the key -> value map
//! and the TTL table move together, so no observer sees a partially mutated
//! compound value and read-modify-write commands are atomic.

use super::stream::{IdSpec, StreamData, StreamEntry, StreamId};
use super::{now_ms, ListData, SetData, StoreError, StoreResult, Value};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cancellable expiry record for one key
///
/// The timer that fires for a handle only removes the key if the table still
/// holds that exact handle, so an expirer that loses a race with a later SET
/// never deletes the replacement value.
#[derive(Debug)]
pub struct ExpiryHandle {
    deadline_ms: u64,
    cancelled: AtomicBool,
}

impl ExpiryHandle {
    fn new(deadline_ms: u64) -> Self {
        Self {
            deadline_ms,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct StoreInner {
    data: HashMap<Bytes, Value>,
    expiry: HashMap<Bytes, Arc<ExpiryHandle>>,
}

impl StoreInner {
    /// Whether `key` has a lapsed, uncancelled TTL. Such keys are dead for
    /// every observer even before the expiry timer has swept them.
    fn is_expired(&self, key: &[u8], now: u64) -> bool {
        self.expiry
            .get(key)
            .is_some_and(|h| !h.is_cancelled() && h.deadline_ms() <= now)
    }

    fn live(&self, key: &[u8], now: u64) -> Option<&Value> {
        if self.is_expired(key, now) {
            None
        } else {
            self.data.get(key)
        }
    }

    /// Drop a dead key before a write re-creates it.
    fn purge_if_expired(&mut self, key: &[u8], now: u64) {
        if self.is_expired(key, now) {
            if let Some(handle) = self.expiry.remove(key) {
                handle.cancel();
            }
            self.data.remove(key);
        }
    }

    fn cancel_expiry(&mut self, key: &[u8]) {
        if let Some(handle) = self.expiry.remove(key) {
            handle.cancel();
        }
    }
}

/// Cloneable handle to the shared keyspace
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== String operations ==========

    /// SET: store a string, replacing any previous value and TTL.
    ///
    /// Returns the new expiry handle when a TTL was requested; the caller
    /// schedules the timer that will call [`MemoryStore::expire_key`].
    pub fn set(
        &self,
        key: Bytes,
        value: Bytes,
        expire_ms: Option<u64>,
    ) -> Option<Arc<ExpiryHandle>> {
        let now = now_ms();
        let mut inner = self.inner.write();
        inner.cancel_expiry(&key);
        inner.data.insert(key.clone(), Value::String(value));
        expire_ms.map(|ms| {
            let handle = Arc::new(ExpiryHandle::new(now.saturating_add(ms)));
            inner.expiry.insert(key, handle.clone());
            handle
        })
    }

    /// Install a record loaded from a dump. Records whose absolute expiry has
    /// already passed are dropped; future expiries return a handle to arm.
    pub fn install_record(
        &self,
        key: Bytes,
        value: Bytes,
        expires_at_ms: Option<u64>,
    ) -> Option<Arc<ExpiryHandle>> {
        let now = now_ms();
        if expires_at_ms.is_some_and(|at| at <= now) {
            debug!(key = %String::from_utf8_lossy(&key), "skipping expired dump record");
            return None;
        }
        let mut inner = self.inner.write();
        inner.cancel_expiry(&key);
        inner.data.insert(key.clone(), Value::String(value));
        expires_at_ms.map(|at| {
            let handle = Arc::new(ExpiryHandle::new(at));
            inner.expiry.insert(key, handle.clone());
            handle
        })
    }

    /// GET: string value, or None if absent/expired
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// DEL: remove a key of any type; true if it existed
    pub fn del(&self, key: &[u8]) -> bool {
        let now = now_ms();
        let mut inner = self.inner.write();
        inner.purge_if_expired(key, now);
        inner.cancel_expiry(key);
        inner.data.remove(key).is_some()
    }

    /// INCR: parse-as-integer increment; absent keys start from 0
    pub fn incr(&self, key: Bytes) -> StoreResult<i64> {
        let now = now_ms();
        let mut inner = self.inner.write();
        inner.purge_if_expired(&key, now);
        let value = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::String(Bytes::from("0")));
        let Value::String(s) = value else {
            return Err(StoreError::WrongType);
        };
        let current = std::str::from_utf8(s)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or(StoreError::NotInteger)?;
        let next = current.checked_add(1).ok_or(StoreError::NotInteger)?;
        *s = Bytes::from(next.to_string());
        Ok(next)
    }

    // ========== Generic key operations ==========

    /// TYPE: name of the hosting container, or "none"
    pub fn key_type(&self, key: &[u8]) -> &'static str {
        let inner = self.inner.read();
        inner
            .live(key, now_ms())
            .map(Value::type_name)
            .unwrap_or("none")
    }

    /// KEYS: all live keys, order unspecified
    pub fn keys(&self) -> Vec<Bytes> {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .data
            .keys()
            .filter(|key| !inner.is_expired(key, now))
            .cloned()
            .collect()
    }

    /// EXISTS: how many of the named keys exist (repeats counted)
    pub fn exists(&self, keys: &[Bytes]) -> usize {
        let now = now_ms();
        let inner = self.inner.read();
        keys.iter()
            .filter(|key| inner.live(key, now).is_some())
            .count()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = now_ms();
        let inner = self.inner.read();
        inner
            .data
            .keys()
            .filter(|key| !inner.is_expired(key, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== List operations ==========

    /// LPUSH: prepend values in argument order (the last argument ends up
    /// at the head). Returns the new length.
    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> StoreResult<usize> {
        let now = now_ms();
        let mut inner = self.inner.write();
        inner.purge_if_expired(&key, now);
        let value = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::List(ListData::new()));
        let Value::List(list) = value else {
            return Err(StoreError::WrongType);
        };
        for value in values {
            list.push_front(value);
        }
        Ok(list.len())
    }

    /// LRANGE: inclusive range with negative tail-relative indices
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        let inner = self.inner.read();
        let list = match inner.live(key, now_ms()) {
            None => return Ok(Vec::new()),
            Some(Value::List(list)) => list,
            Some(_) => return Err(StoreError::WrongType),
        };

        let len = list.len() as i64;
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        start = start.max(0);
        stop = stop.min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    /// LLEN: list length, 0 for a missing key
    pub fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    // ========== Set operations ==========

    /// SADD: add members; returns how many were newly inserted
    pub fn sadd(&self, key: Bytes, members: Vec<Bytes>) -> StoreResult<usize> {
        let now = now_ms();
        let mut inner = self.inner.write();
        inner.purge_if_expired(&key, now);
        let value = inner
            .data
            .entry(key)
            .or_insert_with(|| Value::Set(SetData::new()));
        let Value::Set(set) = value else {
            return Err(StoreError::WrongType);
        };
        let mut added = 0;
        for member in members {
            if set.insert(member) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// SMEMBERS: all members, order unspecified
    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// SCARD: set cardinality, 0 for a missing key
    pub fn scard(&self, key: &[u8]) -> StoreResult<usize> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len()),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    // ========== Stream operations ==========

    /// XADD: append an entry, creating the stream on first write
    pub fn xadd(
        &self,
        key: Bytes,
        spec: IdSpec,
        fields: Vec<(Bytes, Bytes)>,
    ) -> StoreResult<StreamId> {
        let now = now_ms();
        let mut inner = self.inner.write();
        inner.purge_if_expired(&key, now);
        let value = inner
            .data
            .entry(key.clone())
            .or_insert_with(|| Value::Stream(StreamData::default()));
        let Value::Stream(stream) = value else {
            return Err(StoreError::WrongType);
        };
        let result = stream.append(spec, fields, now);
        // a rejected first append must not leave an empty stream behind
        let drop_empty = result.is_err() && stream.is_empty();
        if drop_empty {
            inner.data.remove(&key[..]);
        }
        result
    }

    /// XRANGE: entries inclusively between two IDs; empty for a missing key
    pub fn xrange(
        &self,
        key: &[u8],
        start: StreamId,
        end: StreamId,
    ) -> StoreResult<Vec<StreamEntry>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(Vec::new()),
            Some(Value::Stream(stream)) => Ok(stream.range(start, end)),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// Entries strictly after `after`; empty for a missing key
    pub fn entries_after(&self, key: &[u8], after: StreamId) -> StoreResult<Vec<StreamEntry>> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            None => Ok(Vec::new()),
            Some(Value::Stream(stream)) => Ok(stream.entries_after(after)),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    /// ID of a stream's top entry, if the key hosts a non-empty stream
    pub fn last_stream_id(&self, key: &[u8]) -> Option<StreamId> {
        let inner = self.inner.read();
        match inner.live(key, now_ms()) {
            Some(Value::Stream(stream)) => stream.last_id(),
            _ => None,
        }
    }

    // ========== TTL ==========

    /// Timer callback: remove `key` if `handle` is still its live expiry
    /// record. A handle that was cancelled or superseded is ignored.
    pub fn expire_key(&self, key: &[u8], handle: &Arc<ExpiryHandle>) {
        if handle.is_cancelled() {
            return;
        }
        let mut inner = self.inner.write();
        let still_current = inner
            .expiry
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if still_current {
            inner.expiry.remove(key);
            inner.data.remove(key);
            debug!(key = %String::from_utf8_lossy(key), "expired key");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_set_get_round_trip() {
        let store = MemoryStore::new();
        assert!(store.set(b("foo"), b("bar"), None).is_none());
        assert_eq!(store.get(b"foo").unwrap(), Some(b("bar")));
        assert_eq!(store.get(b"missing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_any_type() {
        let store = MemoryStore::new();
        store.lpush(b("k"), vec![b("x")]).unwrap();
        store.set(b("k"), b("v"), None);
        assert_eq!(store.key_type(b"k"), "string");
        assert_eq!(store.get(b"k").unwrap(), Some(b("v")));
    }

    #[test]
    fn test_get_wrong_type() {
        let store = MemoryStore::new();
        store.lpush(b("list"), vec![b("a")]).unwrap();
        assert_eq!(store.get(b"list"), Err(StoreError::WrongType));
    }

    #[test]
    fn test_del_removes_and_reports() {
        let store = MemoryStore::new();
        store.set(b("k"), b("v"), None);
        assert!(store.del(b"k"));
        assert!(!store.del(b"k"));
        store.sadd(b("s"), vec![b("m")]).unwrap();
        assert!(store.del(b"s"));
    }

    #[test]
    fn test_incr_paths() {
        let store = MemoryStore::new();
        assert_eq!(store.incr(b("n")).unwrap(), 1);
        assert_eq!(store.incr(b("n")).unwrap(), 2);
        store.set(b("n"), b("10"), None);
        assert_eq!(store.incr(b("n")).unwrap(), 11);
        store.set(b("s"), b("abc"), None);
        assert_eq!(store.incr(b("s")), Err(StoreError::NotInteger));
        store.set(b("max"), b(&i64::MAX.to_string()), None);
        assert_eq!(store.incr(b("max")), Err(StoreError::NotInteger));
    }

    #[test]
    fn test_type_reporting() {
        let store = MemoryStore::new();
        store.set(b("str"), b("v"), None);
        store.lpush(b("lst"), vec![b("a")]).unwrap();
        store.sadd(b("set"), vec![b("m")]).unwrap();
        store
            .xadd(b("stm"), IdSpec::Exact(StreamId::new(1, 1)), vec![])
            .unwrap();
        assert_eq!(store.key_type(b"str"), "string");
        assert_eq!(store.key_type(b"lst"), "list");
        assert_eq!(store.key_type(b"set"), "set");
        assert_eq!(store.key_type(b"stm"), "stream");
        assert_eq!(store.key_type(b"nope"), "none");
    }

    #[test]
    fn test_lpush_prepends_in_argument_order() {
        let store = MemoryStore::new();
        assert_eq!(store.lpush(b("l"), vec![b("a"), b("b"), b("c")]).unwrap(), 3);
        assert_eq!(
            store.lrange(b"l", 0, -1).unwrap(),
            vec![b("c"), b("b"), b("a")]
        );
    }

    #[test]
    fn test_lrange_clamping_and_negatives() {
        let store = MemoryStore::new();
        store.lpush(b("l"), vec![b("c"), b("b"), b("a")]).unwrap();
        // head -> tail is now a, b, c
        assert_eq!(store.lrange(b"l", 0, 0).unwrap(), vec![b("a")]);
        assert_eq!(store.lrange(b"l", -2, -1).unwrap(), vec![b("b"), b("c")]);
        assert_eq!(store.lrange(b"l", 0, 99).unwrap().len(), 3);
        assert_eq!(store.lrange(b"l", -99, 0).unwrap(), vec![b("a")]);
        assert!(store.lrange(b"l", 2, 1).unwrap().is_empty());
        assert!(store.lrange(b"missing", 0, -1).unwrap().is_empty());
    }

    #[test]
    fn test_type_exclusivity_between_lists_and_sets() {
        let store = MemoryStore::new();
        store.sadd(b("k"), vec![b("m")]).unwrap();
        assert_eq!(store.lpush(b("k"), vec![b("v")]), Err(StoreError::WrongType));
        store.lpush(b("l"), vec![b("v")]).unwrap();
        assert_eq!(store.sadd(b("l"), vec![b("m")]), Err(StoreError::WrongType));
        assert_eq!(
            store.xadd(b("l"), IdSpec::Auto, vec![]),
            Err(StoreError::WrongType)
        );
    }

    #[test]
    fn test_sadd_counts_new_members_only() {
        let store = MemoryStore::new();
        assert_eq!(store.sadd(b("s"), vec![b("a"), b("b")]).unwrap(), 2);
        assert_eq!(store.sadd(b("s"), vec![b("b"), b("c")]).unwrap(), 1);
        assert_eq!(store.scard(b"s").unwrap(), 3);
        let mut members = store.smembers(b"s").unwrap();
        members.sort();
        assert_eq!(members, vec![b("a"), b("b"), b("c")]);
    }

    #[test]
    fn test_exists_counts_occurrences() {
        let store = MemoryStore::new();
        store.set(b("a"), b("1"), None);
        assert_eq!(store.exists(&[b("a"), b("a"), b("nope")]), 2);
    }

    #[test]
    fn test_lapsed_ttl_hides_key_from_reads() {
        let store = MemoryStore::new();
        store.set(b("k"), b("v"), Some(1));
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(store.key_type(b"k"), "none");
        assert!(store.keys().is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_overwrite_cancels_previous_ttl() {
        let store = MemoryStore::new();
        let handle = store.set(b("k"), b("v1"), Some(1)).unwrap();
        store.set(b("k"), b("v2"), None);
        assert!(handle.is_cancelled());
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(store.get(b"k").unwrap(), Some(b("v2")));
    }

    #[test]
    fn test_expire_key_ignores_superseded_handle() {
        let store = MemoryStore::new();
        let old = store.set(b("k"), b("v1"), Some(1)).unwrap();
        // the expirer loses the race with a second SET
        store.set(b("k"), b("v2"), Some(60_000));
        store.expire_key(b"k", &old);
        assert_eq!(store.get(b"k").unwrap(), Some(b("v2")));
    }

    #[test]
    fn test_expire_key_removes_current_handle() {
        let store = MemoryStore::new();
        let handle = store.set(b("k"), b("v"), Some(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.expire_key(b"k", &handle);
        assert_eq!(store.get(b"k").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_del_cancels_ttl() {
        let store = MemoryStore::new();
        let handle = store.set(b("k"), b("v"), Some(60_000)).unwrap();
        assert!(store.del(b"k"));
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_install_record_skips_expired() {
        let store = MemoryStore::new();
        assert!(store
            .install_record(b("dead"), b("v"), Some(now_ms().saturating_sub(1000)))
            .is_none());
        assert_eq!(store.get(b"dead").unwrap(), None);

        let handle = store
            .install_record(b("live"), b("v"), Some(now_ms() + 60_000))
            .unwrap();
        assert!(!handle.is_cancelled());
        assert_eq!(store.get(b"live").unwrap(), Some(b("v")));
    }

    #[test]
    fn test_rejected_first_xadd_leaves_no_key() {
        let store = MemoryStore::new();
        assert_eq!(
            store.xadd(b("s"), IdSpec::Exact(StreamId::ZERO), vec![]),
            Err(StoreError::StreamIdZero)
        );
        assert_eq!(store.key_type(b"s"), "none");
    }

    #[test]
    fn test_write_resurrects_expired_key_with_new_type() {
        let store = MemoryStore::new();
        store.set(b("k"), b("v"), Some(1));
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(store.lpush(b("k"), vec![b("a")]).unwrap(), 1);
        assert_eq!(store.key_type(b"k"), "list");
    }
}
