//! Shared helpers for integration tests: an in-process server and a minimal
//! RESP test client speaking over a real socket.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use redmirror::{CacheNode, Config, RedisServer};
use resp::{AsyncRespEncoder, AsyncRespParser, RespError, RespValue};

/// Bind an ephemeral port and serve a fresh node on it.
pub async fn start_node(config: Config) -> (Arc<CacheNode>, SocketAddr) {
    let node = Arc::new(CacheNode::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = RedisServer::new(node.clone(), addr);
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    (node, addr)
}

pub struct TestClient {
    parser: AsyncRespParser<OwnedReadHalf>,
    encoder: AsyncRespEncoder<OwnedWriteHalf>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, writer) = stream.into_split();
        Self {
            parser: AsyncRespParser::new(reader),
            encoder: AsyncRespEncoder::new(writer),
        }
    }

    /// Send one command and read one reply frame.
    pub async fn cmd(&mut self, parts: &[&str]) -> RespValue {
        let argv: Vec<Bytes> = parts
            .iter()
            .map(|part| Bytes::from(part.to_string()))
            .collect();
        self.encoder
            .encode(&RespValue::from_command(&argv))
            .await
            .expect("send command");
        self.parser.parse().await.expect("read reply")
    }

    /// Send raw bytes down the socket (protocol error scenarios).
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.encoder.write_raw(bytes).await.expect("send raw");
    }

    /// Read one frame, surfacing errors (EOF on a closed connection).
    pub async fn read_frame(&mut self) -> Result<RespValue, RespError> {
        self.parser.parse().await
    }
}
