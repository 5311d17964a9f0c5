//! Cache node: process-wide shared state and the command dispatcher
//!
//! One `CacheNode` is shared by every connection task. It owns the keyspace,
//! the replica registry, the acknowledgement rendezvous channel, and the
//! stream wakeup used by blocked XREAD callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

use rdb::Dump;
use resp::{
    encode_to_vec, Command, CommandResult, RangeId, ReplConfSub, RespValue, StreamIdArg, XReadId,
};
use storage::{now_ms, ExpiryHandle, IdSpec, MemoryStore, StreamEntry, StreamId};

use crate::config::Config;

/// Fixed replication ID advertised by INFO and FULLRESYNC
pub const REPLICATION_ID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

/// Replication role of this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Replica,
}

impl Role {
    /// Role name as reported by INFO
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "master",
            Role::Replica => "slave",
        }
    }
}

/// Outcome of dispatching one command
#[derive(Debug)]
pub enum Dispatch {
    /// Encode and send this frame
    Reply(RespValue),
    /// Send nothing (REPLCONF ACK)
    NoReply,
    /// Send these raw bytes (FULLRESYNC header + snapshot bulk without
    /// trailing CRLF), then register the connection as a replica
    FullResync(Vec<u8>),
}

impl From<CommandResult> for Dispatch {
    fn from(result: CommandResult) -> Self {
        Dispatch::Reply(result.into())
    }
}

/// Process-wide server state shared across connection tasks
pub struct CacheNode {
    config: Config,
    role: Role,
    store: MemoryStore,
    /// Write queues of registered replica connections
    replicas: Mutex<Vec<UnboundedSender<Vec<u8>>>>,
    /// Ack rendezvous: REPLCONF ACK handlers send, WAIT drains
    ack_tx: UnboundedSender<()>,
    ack_rx: tokio::sync::Mutex<UnboundedReceiver<()>>,
    /// Primary: bytes of propagated writes. Replica: bytes consumed from
    /// the master link.
    repl_offset: AtomicU64,
    /// Serializes apply+propagate of writes so replicas observe them in
    /// commit order. Write commands never suspend while holding it.
    write_order: tokio::sync::Mutex<()>,
    /// Coarse wakeup for blocked XREAD callers; XADD notifies everyone
    stream_notify: Notify,
}

impl CacheNode {
    pub fn new(config: Config) -> Self {
        let role = if config.replica_of.is_some() {
            Role::Replica
        } else {
            Role::Primary
        };
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        Self {
            config,
            role,
            store: MemoryStore::new(),
            replicas: Mutex::new(Vec::new()),
            ack_tx,
            ack_rx: tokio::sync::Mutex::new(ack_rx),
            repl_offset: AtomicU64::new(0),
            write_order: tokio::sync::Mutex::new(()),
            stream_notify: Notify::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn repl_offset(&self) -> u64 {
        self.repl_offset.load(Ordering::Acquire)
    }

    /// Replica side: account for bytes consumed from the master link
    pub fn add_repl_offset(&self, bytes: u64) {
        self.repl_offset.fetch_add(bytes, Ordering::AcqRel);
    }

    /// Register a replica connection's write queue (after FULLRESYNC)
    pub fn register_replica(&self, sender: UnboundedSender<Vec<u8>>) {
        self.replicas.lock().push(sender);
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.lock().len()
    }

    /// Import database 0 of a parsed dump; returns the record count
    pub fn load_dump(&self, dump: &Dump) -> usize {
        let Some(db) = dump.database(0) else { return 0 };
        for record in &db.records {
            if let Some(handle) = self.store.install_record(
                record.key.clone(),
                record.value.clone(),
                record.expires_at_ms,
            ) {
                self.arm_expiry(record.key.clone(), handle);
            }
        }
        db.records.len()
    }

    /// Parse and evaluate one command. `in_exec` marks evaluation from a
    /// transaction body, where blocking commands must not suspend.
    pub async fn execute(&self, argv: &[Bytes], in_exec: bool) -> Dispatch {
        let command = match Command::parse(argv) {
            Ok(command) => command,
            Err(err) => return Dispatch::Reply(RespValue::error(err.to_string())),
        };
        debug!(command = command.name(), "dispatch");

        if !command.is_write() {
            return self.evaluate(command, in_exec).await;
        }

        let _ordering = self.write_order.lock().await;
        let dispatch = self.evaluate(command, in_exec).await;
        if self.role == Role::Primary {
            if let Dispatch::Reply(reply) = &dispatch {
                if !matches!(reply, RespValue::Error(_)) {
                    self.propagate(argv);
                }
            }
        }
        dispatch
    }

    async fn evaluate(&self, command: Command, in_exec: bool) -> Dispatch {
        match command {
            // Connection / server meta
            Command::Ping => {
                CommandResult::SimpleString(Bytes::from("Ping-a-Ding-Dong")).into()
            }
            Command::Echo { message } => CommandResult::Value(Some(message)).into(),
            Command::Info { section: _ } => {
                CommandResult::Value(Some(Bytes::from(self.info_text()))).into()
            }
            Command::Config { parameter } => match parameter {
                Some(name) => {
                    let name_text = String::from_utf8_lossy(&name).to_string();
                    match self.config.lookup_flag(&name_text) {
                        Some(value) => CommandResult::Array(vec![
                            Some(name),
                            Some(Bytes::from(value)),
                        ])
                        .into(),
                        None => CommandResult::Ok.into(),
                    }
                }
                None => CommandResult::Ok.into(),
            },
            Command::Keys { pattern: _ } => {
                let keys = self.store.keys().into_iter().map(Some).collect();
                CommandResult::Array(keys).into()
            }

            // Strings
            Command::Get { key } => match self.store.get(&key) {
                Ok(value) => CommandResult::Value(value).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },
            Command::Set {
                key,
                value,
                expire_ms,
            } => {
                if let Some(handle) = self.store.set(key.clone(), value, expire_ms) {
                    self.arm_expiry(key, handle);
                }
                CommandResult::Ok.into()
            }
            Command::Del { key } => {
                CommandResult::Integer(if self.store.del(&key) { 1 } else { 0 }).into()
            }
            Command::Incr { key } => match self.store.incr(key) {
                Ok(n) => CommandResult::Integer(n).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },
            Command::Type { key } => {
                CommandResult::SimpleString(Bytes::from(self.store.key_type(&key))).into()
            }
            Command::Exists { keys } => {
                CommandResult::Integer(self.store.exists(&keys) as i64).into()
            }

            // Lists
            Command::LPush { key, values } => match self.store.lpush(key, values) {
                Ok(len) => CommandResult::Integer(len as i64).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },
            Command::LRange { key, start, stop } => match self.store.lrange(&key, start, stop) {
                Ok(values) => CommandResult::Array(values.into_iter().map(Some).collect()).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },
            Command::LLen { key } => match self.store.llen(&key) {
                Ok(len) => CommandResult::Integer(len as i64).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },

            // Sets
            Command::SAdd { key, members } => match self.store.sadd(key, members) {
                Ok(added) => CommandResult::Integer(added as i64).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },
            Command::SMembers { key } => match self.store.smembers(&key) {
                Ok(members) => {
                    CommandResult::Array(members.into_iter().map(Some).collect()).into()
                }
                Err(err) => CommandResult::error(err.to_string()).into(),
            },
            Command::SCard { key } => match self.store.scard(&key) {
                Ok(len) => CommandResult::Integer(len as i64).into(),
                Err(err) => CommandResult::error(err.to_string()).into(),
            },

            // Streams
            Command::XAdd { key, id, fields } => {
                match self.store.xadd(key, id_spec(id), fields) {
                    Ok(id) => {
                        self.stream_notify.notify_waiters();
                        CommandResult::Value(Some(Bytes::from(id.to_string()))).into()
                    }
                    Err(err) => CommandResult::error(err.to_string()).into(),
                }
            }
            Command::XRange { key, start, end } => {
                match self.store.xrange(&key, range_id(start), range_id(end)) {
                    Ok(entries) => Dispatch::Reply(RespValue::Array(
                        entries.iter().map(entry_frame).collect(),
                    )),
                    Err(err) => CommandResult::error(err.to_string()).into(),
                }
            }
            Command::XRead {
                block_ms,
                keys,
                ids,
            } => Dispatch::Reply(self.xread(block_ms, keys, ids, in_exec).await),

            // Transactions: queueing state lives in the session; anything
            // that reaches this point is outside a MULTI block.
            Command::Multi => CommandResult::Ok.into(),
            Command::Exec => CommandResult::error("ERR EXEC without MULTI").into(),
            Command::Discard => CommandResult::error("ERR DISCARD without MULTI").into(),

            // Replication
            Command::ReplConf { sub } => match sub {
                ReplConfSub::GetAck => {
                    let offset = self.repl_offset().to_string();
                    Dispatch::Reply(RespValue::from_command(&[
                        Bytes::from("REPLCONF"),
                        Bytes::from("ACK"),
                        Bytes::from(offset),
                    ]))
                }
                ReplConfSub::Ack(_) => {
                    let _ = self.ack_tx.send(());
                    Dispatch::NoReply
                }
                ReplConfSub::ListeningPort(port) => {
                    debug!(port, "replica announced listening port");
                    CommandResult::Ok.into()
                }
                ReplConfSub::Capa(_) | ReplConfSub::Other(_) => CommandResult::Ok.into(),
            },
            Command::Psync { .. } => {
                // every PSYNC is answered with a full resynchronization
                let mut raw = format!(
                    "+FULLRESYNC {} {}\r\n${}\r\n",
                    REPLICATION_ID,
                    self.repl_offset(),
                    rdb::EMPTY_DUMP.len()
                )
                .into_bytes();
                raw.extend_from_slice(rdb::EMPTY_DUMP);
                info!("serving full resync");
                Dispatch::FullResync(raw)
            }
            Command::Wait {
                num_replicas,
                timeout_ms,
            } => {
                let acks = self.wait_for_acks(num_replicas, timeout_ms, in_exec).await;
                CommandResult::Integer(acks).into()
            }
        }
    }

    /// WAIT: broadcast GETACK and count acknowledgements on the rendezvous
    /// channel until the target count or the deadline. An empty keyspace
    /// short-circuits to the replica count without issuing probes, as does a
    /// call from inside EXEC.
    async fn wait_for_acks(&self, num_replicas: usize, timeout_ms: u64, in_exec: bool) -> i64 {
        let replica_count = self.replica_count() as i64;
        if self.store.is_empty() || in_exec {
            return replica_count;
        }

        let mut ack_rx = self.ack_rx.lock().await;
        while ack_rx.try_recv().is_ok() {}

        let getack = RespValue::from_command(&[
            Bytes::from("REPLCONF"),
            Bytes::from("GETACK"),
            Bytes::from("*"),
        ]);
        self.send_to_replicas(encode_to_vec(&getack));

        let deadline = (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms));
        let mut acks = 0i64;
        while (acks as usize) < num_replicas {
            let received = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, ack_rx.recv()).await {
                        Ok(received) => received,
                        Err(_) => break,
                    }
                }
                None => ack_rx.recv().await,
            };
            match received {
                Some(()) => acks += 1,
                None => break,
            }
        }
        acks
    }

    /// XREAD: gather entries strictly after each key's threshold. With BLOCK
    /// and no matches, park on the stream wakeup and search again, up to the
    /// deadline (`0` blocks indefinitely).
    async fn xread(
        &self,
        block_ms: Option<u64>,
        keys: Vec<Bytes>,
        ids: Vec<XReadId>,
        in_exec: bool,
    ) -> RespValue {
        let thresholds: Vec<StreamId> = keys
            .iter()
            .zip(&ids)
            .map(|(key, id)| match id {
                XReadId::Latest => self.store.last_stream_id(key).unwrap_or(StreamId::ZERO),
                XReadId::After { ms, seq } => StreamId::new(*ms, *seq),
            })
            .collect();

        let block_ms = if in_exec { None } else { block_ms };
        let deadline =
            block_ms.and_then(|ms| (ms > 0).then(|| Instant::now() + Duration::from_millis(ms)));

        loop {
            let notified = self.stream_notify.notified();

            let mut groups = Vec::with_capacity(keys.len());
            let mut total = 0;
            for (key, threshold) in keys.iter().zip(&thresholds) {
                match self.store.entries_after(key, *threshold) {
                    Ok(entries) => {
                        total += entries.len();
                        groups.push((key.clone(), entries));
                    }
                    Err(err) => return RespValue::error(err.to_string()),
                }
            }

            if total > 0 || block_ms.is_none() {
                return RespValue::Array(
                    groups
                        .into_iter()
                        .map(|(key, entries)| {
                            RespValue::Array(vec![
                                RespValue::BulkString(Some(key)),
                                RespValue::Array(entries.iter().map(entry_frame).collect()),
                            ])
                        })
                        .collect(),
                );
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return RespValue::Null;
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Queue the wire-encoded command to every registered replica and grow
    /// the replication offset. Disconnected replicas are dropped here.
    fn propagate(&self, argv: &[Bytes]) {
        let buffer = encode_to_vec(&RespValue::from_command(argv));
        self.repl_offset
            .fetch_add(buffer.len() as u64, Ordering::AcqRel);
        let mut replicas = self.replicas.lock();
        replicas.retain(|sender| sender.send(buffer.clone()).is_ok());
    }

    fn send_to_replicas(&self, buffer: Vec<u8>) {
        let mut replicas = self.replicas.lock();
        replicas.retain(|sender| sender.send(buffer.clone()).is_ok());
    }

    /// Arm the expiry timer for a freshly installed TTL handle.
    pub fn arm_expiry(&self, key: Bytes, handle: Arc<ExpiryHandle>) {
        let store = self.store.clone();
        tokio::spawn(async move {
            let delay = handle.deadline_ms().saturating_sub(now_ms());
            tokio::time::sleep(Duration::from_millis(delay)).await;
            store.expire_key(&key, &handle);
        });
    }

    fn info_text(&self) -> String {
        format!(
            "# Server\r\nrole:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n\r\n",
            self.role.as_str(),
            REPLICATION_ID,
            self.repl_offset()
        )
    }
}

fn id_spec(arg: StreamIdArg) -> IdSpec {
    match arg {
        StreamIdArg::Auto => IdSpec::Auto,
        StreamIdArg::AutoSeq { ms } => IdSpec::AutoSeq(ms),
        StreamIdArg::Explicit { ms, seq } => IdSpec::Exact(StreamId::new(ms, seq)),
    }
}

fn range_id(bound: RangeId) -> StreamId {
    StreamId::new(bound.ms, bound.seq)
}

/// Encode one stream entry as `[id, [field, value, ...]]`
fn entry_frame(entry: &StreamEntry) -> RespValue {
    let mut pairs = Vec::with_capacity(entry.fields.len() * 2);
    for (field, value) in &entry.fields {
        pairs.push(RespValue::BulkString(Some(field.clone())));
        pairs.push(RespValue::BulkString(Some(value.clone())));
    }
    RespValue::Array(vec![
        RespValue::BulkString(Some(Bytes::from(entry.id.to_string()))),
        RespValue::Array(pairs),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Arc<CacheNode> {
        Arc::new(CacheNode::new(Config::default()))
    }

    fn argv(parts: &[&str]) -> Vec<Bytes> {
        parts
            .iter()
            .map(|p| Bytes::from(p.to_string()))
            .collect()
    }

    async fn reply(node: &Arc<CacheNode>, parts: &[&str]) -> RespValue {
        match node.execute(&argv(parts), false).await {
            Dispatch::Reply(value) => value,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_get_del() {
        let node = node();
        assert_eq!(
            reply(&node, &["SET", "foo", "bar"]).await,
            RespValue::simple("OK")
        );
        assert_eq!(reply(&node, &["GET", "foo"]).await, RespValue::bulk("bar"));
        assert_eq!(reply(&node, &["GET", "nope"]).await, RespValue::Null);
        assert_eq!(reply(&node, &["DEL", "foo"]).await, RespValue::Integer(1));
        assert_eq!(reply(&node, &["DEL", "foo"]).await, RespValue::Integer(0));
    }

    #[tokio::test]
    async fn test_incr_error_text() {
        let node = node();
        reply(&node, &["SET", "s", "abc"]).await;
        assert_eq!(
            reply(&node, &["INCR", "s"]).await,
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let node = node();
        assert_eq!(
            reply(&node, &["FLURB"]).await,
            RespValue::error("ERR unknown command")
        );
    }

    #[tokio::test]
    async fn test_getack_reports_offset_and_ack_is_silent() {
        let node = node();
        let dispatch = node
            .execute(&argv(&["REPLCONF", "GETACK", "*"]), false)
            .await;
        match dispatch {
            Dispatch::Reply(frame) => {
                let parts = frame.to_command().unwrap();
                assert_eq!(parts[0], Bytes::from("REPLCONF"));
                assert_eq!(parts[1], Bytes::from("ACK"));
                assert_eq!(parts[2], Bytes::from("0"));
            }
            other => panic!("expected reply, got {:?}", other),
        }

        assert!(matches!(
            node.execute(&argv(&["REPLCONF", "ACK", "17"]), false).await,
            Dispatch::NoReply
        ));
    }

    #[tokio::test]
    async fn test_psync_serves_full_resync() {
        let node = node();
        match node.execute(&argv(&["PSYNC", "?", "-1"]), false).await {
            Dispatch::FullResync(raw) => {
                let text = String::from_utf8_lossy(&raw[..raw.len().min(60)]).to_string();
                assert!(text.starts_with(&format!("+FULLRESYNC {} 0\r\n", REPLICATION_ID)));
                assert!(raw.ends_with(&rdb::EMPTY_DUMP[rdb::EMPTY_DUMP.len() - 8..]));
            }
            other => panic!("expected full resync, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_propagation_grows_offset_and_reaches_replicas() {
        let node = node();
        let (tx, mut rx) = mpsc::unbounded_channel();
        node.register_replica(tx);

        reply(&node, &["SET", "k", "v"]).await;
        let expected = encode_to_vec(&RespValue::from_command(&argv(&["SET", "k", "v"])));
        assert_eq!(rx.try_recv().unwrap(), expected);
        assert_eq!(node.repl_offset(), expected.len() as u64);

        // failed writes are not propagated
        reply(&node, &["SET", "s", "abc"]).await;
        let _ = rx.try_recv();
        let offset_before = node.repl_offset();
        assert_eq!(
            reply(&node, &["INCR", "s"]).await,
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(node.repl_offset(), offset_before);
    }

    #[tokio::test]
    async fn test_reads_are_not_propagated() {
        let node = node();
        let (tx, mut rx) = mpsc::unbounded_channel();
        node.register_replica(tx);
        reply(&node, &["GET", "x"]).await;
        reply(&node, &["KEYS", "*"]).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(node.repl_offset(), 0);
    }

    #[tokio::test]
    async fn test_wait_empty_keyspace_short_circuits() {
        let node = node();
        let (tx, _rx) = mpsc::unbounded_channel();
        node.register_replica(tx);
        assert_eq!(
            reply(&node, &["WAIT", "3", "10"]).await,
            RespValue::Integer(1)
        );
    }

    #[tokio::test]
    async fn test_wait_counts_acks_until_timeout() {
        let node = node();
        reply(&node, &["SET", "k", "v"]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        node.register_replica(tx);

        let waiter = {
            let node = node.clone();
            tokio::spawn(async move { reply(&node, &["WAIT", "1", "2000"]).await })
        };

        // replica behavior: answer the GETACK probe with one ACK
        let probe = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(probe.windows(6).any(|w| w == b"GETACK"));
        let _ = node.execute(&argv(&["REPLCONF", "ACK", "31"]), false).await;

        assert_eq!(waiter.await.unwrap(), RespValue::Integer(1));
    }

    #[tokio::test]
    async fn test_xread_nonblocking_shape() {
        let node = node();
        reply(&node, &["XADD", "s", "1-1", "f", "v"]).await;
        let frame = reply(&node, &["XREAD", "STREAMS", "s", "0-0"]).await;
        let expected = RespValue::Array(vec![RespValue::Array(vec![
            RespValue::bulk("s"),
            RespValue::Array(vec![RespValue::Array(vec![
                RespValue::bulk("1-1"),
                RespValue::Array(vec![RespValue::bulk("f"), RespValue::bulk("v")]),
            ])]),
        ])]);
        assert_eq!(frame, expected);
    }

    #[tokio::test]
    async fn test_xread_block_times_out_to_null() {
        let node = node();
        reply(&node, &["XADD", "s", "1-1", "f", "v"]).await;
        let frame = reply(&node, &["XREAD", "BLOCK", "30", "STREAMS", "s", "$"]).await;
        assert_eq!(frame, RespValue::Null);
    }

    #[tokio::test]
    async fn test_xread_block_wakes_on_xadd() {
        let node = node();
        reply(&node, &["XADD", "s", "1-1", "f", "v"]).await;

        let reader = {
            let node = node.clone();
            tokio::spawn(
                async move { reply(&node, &["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]).await },
            )
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        reply(&node, &["XADD", "s", "2-1", "g", "w"]).await;

        let frame = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .unwrap()
            .unwrap();
        match frame {
            RespValue::Array(groups) => {
                assert_eq!(groups.len(), 1);
                let RespValue::Array(group) = &groups[0] else {
                    panic!("bad group shape")
                };
                assert_eq!(group[0], RespValue::bulk("s"));
                let RespValue::Array(entries) = &group[1] else {
                    panic!("bad entries shape")
                };
                assert_eq!(entries.len(), 1);
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_info_lines() {
        let node = node();
        let frame = reply(&node, &["INFO"]).await;
        let RespValue::BulkString(Some(text)) = frame else {
            panic!("INFO must be a bulk string")
        };
        let text = String::from_utf8_lossy(&text).to_string();
        assert!(text.contains("# Server"));
        assert!(text.contains("role:master"));
        assert!(text.contains(&format!("master_replid:{}", REPLICATION_ID)));
        assert!(text.contains("master_repl_offset:0"));
    }

    #[tokio::test]
    async fn test_config_get_round_trip() {
        let mut config = Config::default();
        config
            .flags
            .insert("maxmemory".to_string(), "100mb".to_string());
        let node = Arc::new(CacheNode::new(config));
        assert_eq!(
            reply(&node, &["CONFIG", "GET", "maxmemory"]).await,
            RespValue::Array(vec![RespValue::bulk("maxmemory"), RespValue::bulk("100mb")])
        );
        assert_eq!(
            reply(&node, &["CONFIG", "GET", "unset"]).await,
            RespValue::simple("OK")
        );
    }
}
