//! CLI for inspecting cluster topology and shard routing

use clap::{Parser, Subcommand};
use shardmap::cluster::{ClusterState, ClusterStateHandle, FileStore, TopologyCodec};
use shardmap::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardmap")]
#[command(about = "Cluster topology and shard routing inspector")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./shardmap.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Topology document (overrides config)
    #[arg(long, global = true)]
    topology: Option<PathBuf>,

    /// Live node list (overrides config)
    #[arg(long, global = true)]
    live_nodes: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the shard owning a hash
    Resolve {
        /// Collection name
        collection: String,

        /// Routing hash (signed 32-bit)
        #[arg(allow_hyphen_values = true)]
        hash: i32,
    },

    /// List a collection's slices and replicas
    Slices {
        /// Collection name
        collection: String,
    },

    /// List collections
    Collections,

    /// Show a collection's routing table
    Ranges {
        /// Collection name
        collection: String,
    },

    /// List live nodes
    Live,

    /// Print the topology document (normalized, pretty)
    Encode,

    /// Poll the topology files and publish new snapshots
    Watch {
        /// Poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Invalid config aborts before anything runs against the wrong topology
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::try_load()?,
    };
    if let Some(path) = cli.topology {
        config.topology_path = path;
    }
    if let Some(path) = cli.live_nodes {
        config.live_nodes_path = path;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = FileStore::from_config(&config);

    match cli.command {
        Commands::Resolve { collection, hash } => {
            let state = ClusterState::load_from(&store)?;
            let shard = state.resolve_shard(hash, &collection)?;
            println!("{}", shard);
        }

        Commands::Slices { collection } => {
            let state = ClusterState::load_from(&store)?;
            let slices = state
                .get_slices(&collection)
                .ok_or_else(|| shardmap::Error::UnknownCollection(collection.clone()))?;
            for (name, slice) in slices.iter() {
                println!("{}", name);
                for (replica_id, endpoint) in slice.replicas() {
                    let live = match endpoint.node_name() {
                        Some(node) if state.is_live(node) => "live",
                        Some(_) => "down",
                        None => "unknown",
                    };
                    println!("  {} [{}] {}", replica_id, live, endpoint);
                }
            }
        }

        Commands::Collections => {
            let state = ClusterState::load_from(&store)?;
            for collection in state.get_collections() {
                let slices = state.get_slices(&collection).map_or(0, |s| s.len());
                println!("{} ({} slices)", collection, slices);
            }
        }

        Commands::Ranges { collection } => {
            let state = ClusterState::load_from(&store)?;
            let table = state.get_routing_table(&collection)?;
            println!("Routing table for {}:", collection);
            for (shard, range) in table.entries() {
                println!("  {:<24} {}", shard, range);
            }
        }

        Commands::Live => {
            let state = ClusterState::load_from(&store)?;
            let mut nodes: Vec<&String> = state.get_live_nodes().iter().collect();
            nodes.sort();
            for node in nodes {
                println!("{}", node);
            }
        }

        Commands::Encode => {
            let state = ClusterState::load_from(&store)?;
            let bytes = TopologyCodec::encode_pretty(&state)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }

        Commands::Watch { interval_ms } => {
            if let Some(ms) = interval_ms {
                config.refresh_interval_ms = ms;
            }
            config.validate()?;
            watch(&config, &store).await?;
        }
    }

    Ok(())
}

async fn watch(config: &Config, store: &FileStore) -> anyhow::Result<()> {
    tracing::info!("Watching topology: {}", store.topology_path().display());
    tracing::info!("  Live nodes: {}", store.live_nodes_path().display());
    tracing::info!("  Interval: {:?}", config.refresh_interval());

    let handle = ClusterStateHandle::default();
    let mut last_summary = String::new();
    let mut ticker = tokio::time::interval(config.refresh_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Failed refreshes keep the previous snapshot and are logged by the handle
                if let Ok(state) = handle.refresh(store) {
                    let summary = state.to_string();
                    if summary != last_summary {
                        tracing::info!(
                            "Published snapshot: {} collections, {} live nodes",
                            state.get_collections().len(),
                            state.get_live_nodes().len()
                        );
                        tracing::debug!("{}", summary);
                        last_summary = summary;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watch");
                break;
            }
        }
    }

    Ok(())
}
