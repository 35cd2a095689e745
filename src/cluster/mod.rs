//! Cluster topology and shard routing
//!
//! - Topology model (collections → slices → replica endpoints)
//! - Snapshot state with memoized per-collection routing tables
//! - Topology document codec and coordination store boundary

pub mod codec;
pub mod endpoint;
pub mod observer;
pub mod routing;
pub mod slice;
pub mod state;
pub mod store;

pub use codec::TopologyCodec;
pub use endpoint::ShardEndpoint;
pub use observer::{NoopObserver, TopologyObserver, TracingObserver};
pub use routing::{RoutingCache, RoutingTable};
pub use slice::{ReplicaMap, Slice};
pub use state::{ClusterState, ClusterStateHandle, CollectionMap, SliceMap};
pub use store::{CoordinationStore, FileStore, MemStore};
