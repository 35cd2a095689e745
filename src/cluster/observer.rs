//! Observability sink for topology events
//!
//! Components report through an injected observer instead of a global
//! logger, so embedders can route events wherever they want and tests can
//! count them.

/// Receives notable topology events. All methods default to no-ops.
///
/// Callbacks run after the event is published and outside internal locks,
/// so an observer may query the state that reported it.
pub trait TopologyObserver: Send + Sync {
    /// First slice registered for a collection
    fn collection_created(&self, _collection: &str) {}

    fn routing_table_built(&self, _collection: &str, _shards: usize) {}

    /// A merge added `slice` after the collection's routing table was built;
    /// routing keeps using the table built earlier.
    fn stale_routing_table(&self, _collection: &str, _slice: &str) {}

    /// No range matched `hash`. Always a defect.
    fn invariant_violation(&self, _collection: &str, _hash: i32) {}
}

/// Default observer, forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TopologyObserver for TracingObserver {
    fn collection_created(&self, collection: &str) {
        tracing::info!("New collection: {}", collection);
    }

    fn routing_table_built(&self, collection: &str, shards: usize) {
        tracing::debug!("Routing table built for {} ({} shards)", collection, shards);
    }

    fn stale_routing_table(&self, collection: &str, slice: &str) {
        tracing::warn!(
            "Slice {} added to {} after its routing table was built; routing unchanged until next snapshot",
            slice,
            collection
        );
    }

    fn invariant_violation(&self, collection: &str, hash: i32) {
        tracing::error!(
            "Hash partition does not cover hash {} in collection {}",
            hash,
            collection
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TopologyObserver for NoopObserver {}
