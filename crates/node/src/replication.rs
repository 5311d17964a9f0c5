//! Replica side of the replication topology
//!
//! A replica dials its primary once at startup, walks the handshake, loads
//! the transferred snapshot, and then drives the same connection through the
//! dispatcher for the rest of the process lifetime. Replies are suppressed
//! on this link; only `REPLCONF GETACK` is answered, with the offset taken
//! *before* the GETACK's own bytes are counted.

use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use tokio::io::{split, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use rdb::Dump;
use resp::{encoded_len, AsyncRespEncoder, AsyncRespParser, RespValue};

use crate::node::{CacheNode, Dispatch};

/// The long-lived connection from a replica to its primary
pub struct ReplicaLink {
    node: Arc<CacheNode>,
    parser: AsyncRespParser<ReadHalf<TcpStream>>,
    encoder: AsyncRespEncoder<WriteHalf<TcpStream>>,
}

impl ReplicaLink {
    /// Dial the primary, run the four-step handshake, and load the snapshot
    /// it transfers. Any failure here is fatal to the replica process.
    pub async fn establish(node: Arc<CacheNode>) -> anyhow::Result<Self> {
        let target = node
            .config()
            .replica_of
            .clone()
            .context("not configured as a replica")?;
        let addr = target.addr();
        let stream = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("failed to dial primary at {}", addr))?;
        info!("connected to primary at {}", addr);

        let (reader, writer) = split(stream);
        let mut parser = AsyncRespParser::new(reader);
        let mut encoder = AsyncRespEncoder::new(writer);

        let port = node.config().port.to_string();
        let handshake: [&[&str]; 4] = [
            &["PING"],
            &["REPLCONF", "listening-port", &port],
            &["REPLCONF", "capa", "psync2"],
            &["PSYNC", "?", "-1"],
        ];
        for step in handshake {
            send_command(&mut encoder, step).await?;
            let reply = parser
                .parse()
                .await
                .with_context(|| format!("no handshake reply to {:?}", step[0]))?;
            debug!("handshake {} -> {:?}", step[0], reply);
        }

        let snapshot = parser
            .parse_snapshot()
            .await
            .context("failed to read snapshot payload")?;
        let dump = Dump::parse_bytes(&snapshot).context("invalid snapshot payload from primary")?;
        let loaded = node.load_dump(&dump);
        info!("full resync complete, loaded {} keys", loaded);

        Ok(Self {
            node,
            parser,
            encoder,
        })
    }

    /// Pump the propagated command stream until the primary goes away.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            let frame = match self.parser.parse().await {
                Ok(frame) => frame,
                Err(e) if e.is_eof() => {
                    warn!("primary closed the replication link");
                    return Ok(());
                }
                Err(e) => return Err(e).context("replication link protocol error"),
            };

            let Some(argv) = frame.to_command() else {
                debug!("ignoring non-command frame on replication link");
                continue;
            };
            if argv.is_empty() {
                continue;
            }

            let wire_len = encoded_len(&RespValue::from_command(&argv)) as u64;
            let is_getack = argv[0].eq_ignore_ascii_case(b"REPLCONF")
                && argv
                    .get(1)
                    .is_some_and(|sub| sub.eq_ignore_ascii_case(b"GETACK"));

            // evaluate through the normal dispatcher; replies are swallowed
            // except for the GETACK echo
            let dispatch = self.node.execute(&argv, false).await;
            if is_getack {
                if let Dispatch::Reply(reply) = dispatch {
                    self.encoder.encode(&reply).await?;
                }
            }

            // the offset advances after dispatch, so the ACK above covered
            // only the bytes before this command
            self.node.add_repl_offset(wire_len);
        }
    }
}

async fn send_command(
    encoder: &mut AsyncRespEncoder<WriteHalf<TcpStream>>,
    parts: &[&str],
) -> std::io::Result<()> {
    let argv: Vec<Bytes> = parts
        .iter()
        .map(|part| Bytes::from(part.to_string()))
        .collect();
    encoder.encode(&RespValue::from_command(&argv)).await
}
