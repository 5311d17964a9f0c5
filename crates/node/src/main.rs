//! redmirror - in-memory cache server with primary/replica replication

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use redmirror::{CacheNode, Config, RedisServer, ReplicaLink, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_cli(std::env::args())?;

    let level = match config.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let node = Arc::new(CacheNode::new(config.clone()));
    info!("starting redmirror as {} on port {}", node.role().as_str(), config.port);

    if let Some(path) = config.snapshot_path() {
        match rdb::Dump::parse_file(&path) {
            Ok(dump) => {
                let loaded = node.load_dump(&dump);
                info!("loaded {} keys from snapshot {:?}", loaded, path);
            }
            Err(e) => warn!("skipping snapshot {:?}: {}", path, e),
        }
    }

    if node.role() == Role::Replica {
        // a replica that cannot reach its primary must not come up
        let link = ReplicaLink::establish(node.clone()).await?;
        tokio::spawn(async move {
            if let Err(e) = link.run().await {
                error!("replication link failed: {}", e);
            }
        });
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    RedisServer::new(node, addr).start().await
}
