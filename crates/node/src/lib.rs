//! redmirror - an in-memory cache server speaking the RESP protocol
//!
//! A standalone primary serves clients and propagates writes to connected
//! replicas; a replica applies the propagated stream from its primary and
//! answers acknowledgement probes.

pub mod config;
pub mod node;
pub mod replication;
pub mod server;

pub use config::Config;
pub use node::{CacheNode, Dispatch, Role};
pub use replication::ReplicaLink;
pub use server::RedisServer;
