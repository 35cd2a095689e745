//! # shardmap
//!
//! Cluster topology snapshots and shard routing for a partitioned search
//! cluster:
//! - Collections split into named slices, each served by a set of replicas
//! - Live node tracking (consumed from the coordination service)
//! - Deterministic hash → shard routing over the full `i32` hash space
//! - Per-collection routing tables built at most once per snapshot
//!
//! ## Data flow
//!
//! ```text
//! coordination store ──bytes──▶ TopologyCodec ──▶ ClusterState ──▶ resolve_shard(hash, collection)
//!                                                     │
//!                                                     └── RoutingTable (lazy, cached)
//! ```
//!
//! ## Usage
//!
//! ```
//! use shardmap::ClusterState;
//! use std::collections::HashSet;
//!
//! let doc = br#"{"docs": {"shard1": {"r1": {"node_name": "n1"}},
//!                         "shard2": {"r2": {"node_name": "n2"}}}}"#;
//! let live: HashSet<String> = ["n1".to_string()].into_iter().collect();
//! let state = ClusterState::load(Some(&doc[..]), live).unwrap();
//!
//! assert_eq!(state.resolve_shard(i32::MIN, "docs").unwrap(), "shard1");
//! assert_eq!(state.resolve_shard(i32::MAX, "docs").unwrap(), "shard2");
//! assert!(state.is_live("n1"));
//! ```
//!
//! ### Inspect a topology from the command line
//! ```bash
//! shardmap --topology ./clusterstate.json --live-nodes ./live_nodes resolve docs -- -1234
//! shardmap ranges docs
//! shardmap watch
//! ```

pub mod cluster;
pub mod common;

// Re-export commonly used types
pub use cluster::{ClusterState, ClusterStateHandle, ShardEndpoint, Slice, TopologyCodec};
pub use common::{Config, Error, HashPartitioner, HashRange, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
