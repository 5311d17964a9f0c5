//! RESP protocol server
//!
//! Accepts client connections and drives one session per connection. Each
//! session owns its transaction state; replies leave through a per-connection
//! writer task so that a connection promoted to a replica by PSYNC can have
//! propagated writes queued from any dispatch site.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use tokio::io::{split, AsyncWriteExt, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use resp::{encode_to_vec, AsyncRespParser, CommandResult, RespValue};

use crate::node::{CacheNode, Dispatch};

/// RESP protocol server
pub struct RedisServer {
    node: Arc<CacheNode>,
    addr: SocketAddr,
}

impl RedisServer {
    pub fn new(node: Arc<CacheNode>, addr: SocketAddr) -> Self {
        Self { node, addr }
    }

    /// Bind the configured address and serve forever.
    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind on {}", self.addr))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        info!("cache server listening on {}", self.addr);
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("new client connection from {}", peer);
                    let node = self.node.clone();
                    tokio::spawn(async move {
                        handle_client(stream, node).await;
                        debug!("client {} disconnected", peer);
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Per-connection session state
struct Session {
    node: Arc<CacheNode>,
    reply_tx: UnboundedSender<Vec<u8>>,
    txn_started: bool,
    txn_queue: Vec<Vec<Bytes>>,
}

impl Session {
    fn new(node: Arc<CacheNode>, reply_tx: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            node,
            reply_tx,
            txn_started: false,
            txn_queue: Vec::new(),
        }
    }

    /// Handle one decoded command array. Returns false once the connection's
    /// write side is gone and the session should end.
    async fn handle(&mut self, argv: Vec<Bytes>) -> bool {
        let verb = String::from_utf8_lossy(&argv[0]).to_uppercase();

        // queue everything but EXEC/DISCARD while a transaction is open
        if self.txn_started && verb != "EXEC" && verb != "DISCARD" {
            if verb == "MULTI" {
                return self.reply(RespValue::error("ERR MULTI calls can not be nested"));
            }
            self.txn_queue.push(argv);
            return self.reply(CommandResult::Queued.into());
        }

        match verb.as_str() {
            "MULTI" => {
                self.txn_started = true;
                self.reply(CommandResult::Ok.into())
            }
            "EXEC" => {
                if !self.txn_started {
                    return self.reply(RespValue::error("ERR EXEC without MULTI"));
                }
                let queued = std::mem::take(&mut self.txn_queue);
                self.txn_started = false;
                let mut replies = Vec::with_capacity(queued.len());
                for argv in &queued {
                    match self.node.execute(argv, true).await {
                        Dispatch::Reply(value) => replies.push(value),
                        _ => replies.push(RespValue::Null),
                    }
                }
                self.reply(RespValue::Array(replies))
            }
            "DISCARD" => {
                if !self.txn_started {
                    return self.reply(RespValue::error("ERR DISCARD without MULTI"));
                }
                self.txn_queue.clear();
                self.txn_started = false;
                self.reply(CommandResult::Ok.into())
            }
            _ => match self.node.execute(&argv, false).await {
                Dispatch::Reply(value) => self.reply(value),
                Dispatch::NoReply => true,
                Dispatch::FullResync(raw) => {
                    // snapshot bytes first, then registration: propagated
                    // writes enqueue behind the snapshot on the same channel
                    let sent = self.reply_tx.send(raw).is_ok();
                    self.node.register_replica(self.reply_tx.clone());
                    info!("connection registered as replica");
                    sent
                }
            },
        }
    }

    fn reply(&self, value: RespValue) -> bool {
        self.reply_tx.send(encode_to_vec(&value)).is_ok()
    }
}

/// Drive one client connection until EOF or a protocol error.
async fn handle_client(stream: TcpStream, node: Arc<CacheNode>) {
    let (reader, writer) = split(stream);
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    tokio::spawn(write_replies(writer, reply_rx));

    let mut parser = AsyncRespParser::new(reader);
    let mut session = Session::new(node, reply_tx);

    loop {
        let frame = match parser.parse().await {
            Ok(frame) => frame,
            Err(e) if e.is_eof() => break,
            Err(e) => {
                // protocol error: drop the connection without replying
                warn!("protocol error, closing connection: {}", e);
                break;
            }
        };

        let Some(argv) = frame.to_command() else {
            debug!("ignoring non-command frame");
            continue;
        };
        if argv.is_empty() {
            continue;
        }

        if !session.handle(argv).await {
            break;
        }
    }
}

/// Writer task: drains the reply queue into the socket. Ends when every
/// sender (session and replica registry) is gone or the peer stops reading.
async fn write_replies(mut writer: WriteHalf<TcpStream>, mut replies: UnboundedReceiver<Vec<u8>>) {
    while let Some(buffer) = replies.recv().await {
        if writer.write_all(&buffer).await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}
