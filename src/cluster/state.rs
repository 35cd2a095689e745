//! Cluster state snapshot
//!
//! A [`ClusterState`] is a point-in-time view of the cluster: the live node
//! set and, per collection, the slices and their replicas. It is meant to be
//! built once (from the coordination store's topology document) and then
//! shared read-only by request handlers. A fresh topology produces a fresh
//! `ClusterState`, published through [`ClusterStateHandle`].
//!
//! [`ClusterState::add_or_merge_slice`] is the one exception: it updates a
//! live snapshot in place. Callers needing a truly immutable snapshot must
//! not use it and should rebuild from a new decode instead.

use crate::cluster::codec::TopologyCodec;
use crate::cluster::observer::{TopologyObserver, TracingObserver};
use crate::cluster::routing::{RoutingCache, RoutingTable};
use crate::cluster::slice::Slice;
use crate::cluster::store::CoordinationStore;
use crate::common::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// Slice name → slice, for one collection
pub type SliceMap = BTreeMap<String, Arc<Slice>>;

/// Collection name → slices
pub type CollectionMap = BTreeMap<String, Arc<SliceMap>>;

pub struct ClusterState {
    live_nodes: HashSet<String>,
    /// Replaced wholesale on merge; readers keep whatever `Arc` they cloned
    collections: RwLock<Arc<CollectionMap>>,
    routing: RoutingCache,
    observer: Arc<dyn TopologyObserver>,
}

impl ClusterState {
    /// Empty state: no live nodes, no collections
    pub fn new() -> Self {
        Self::with_collections(HashSet::new(), CollectionMap::new())
    }

    pub fn with_collections(live_nodes: HashSet<String>, collections: CollectionMap) -> Self {
        Self {
            live_nodes,
            collections: RwLock::new(Arc::new(collections)),
            routing: RoutingCache::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TopologyObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn observer(&self) -> Arc<dyn TopologyObserver> {
        self.observer.clone()
    }

    /// Decode a topology document. `None` or empty bytes give an empty topology.
    pub fn load(bytes: Option<&[u8]>, live_nodes: HashSet<String>) -> Result<Self> {
        TopologyCodec::decode_state(bytes, live_nodes)
    }

    /// Fetch the latest topology and live nodes from the coordination store
    pub fn load_from<S: CoordinationStore + ?Sized>(store: &S) -> Result<Self> {
        let bytes = store.latest_topology_bytes()?;
        let live_nodes = store.live_node_ids()?;
        let state = Self::load(bytes.as_deref(), live_nodes)?;
        tracing::debug!("Loaded cluster state: {}", state);
        Ok(state)
    }

    // === Read accessors ===

    pub fn get_slice(&self, collection: &str, slice: &str) -> Option<Arc<Slice>> {
        let collections = self.read_collections();
        collections.get(collection)?.get(slice).cloned()
    }

    /// Read-only snapshot of a collection's slices, `None` if unknown
    pub fn get_slices(&self, collection: &str) -> Option<Arc<SliceMap>> {
        self.read_collections().get(collection).cloned()
    }

    pub fn get_collections(&self) -> BTreeSet<String> {
        self.read_collections().keys().cloned().collect()
    }

    /// Read-only snapshot of every collection
    pub fn get_collection_states(&self) -> Arc<CollectionMap> {
        self.read_collections().clone()
    }

    pub fn get_live_nodes(&self) -> &HashSet<String> {
        &self.live_nodes
    }

    pub fn is_live(&self, node: &str) -> bool {
        self.live_nodes.contains(node)
    }

    // === Mutation ===

    /// Insert `slice` into `collection`, creating the collection if needed.
    /// An existing slice of the same name is replaced by
    /// `existing.merge_with(&slice)`.
    ///
    /// This mutates a nominally immutable snapshot. The collection maps are
    /// rebuilt copy-on-write and swapped in under the write lock, so
    /// concurrent readers see either the old or the new collection, never a
    /// partial one. A routing table already built for the collection is kept
    /// as is.
    pub fn add_or_merge_slice(&self, collection: &str, slice: Slice) {
        let name = slice.name().to_string();
        let (created, new_slice) = {
            let mut guard = self
                .collections
                .write()
                .unwrap_or_else(PoisonError::into_inner);

            let mut collections = CollectionMap::clone(&guard);
            let created = !collections.contains_key(collection);
            let mut slices = collections
                .get(collection)
                .map(|s| SliceMap::clone(s))
                .unwrap_or_default();

            let (merged, new_slice) = match slices.get(&name) {
                Some(existing) => (existing.merge_with(&slice), false),
                None => (slice, true),
            };
            slices.insert(name.clone(), Arc::new(merged));
            collections.insert(collection.to_string(), Arc::new(slices));
            *guard = Arc::new(collections);

            (created, new_slice)
        };

        if created {
            self.observer.collection_created(collection);
        }
        if new_slice && self.routing.is_built(collection) {
            self.observer.stale_routing_table(collection, &name);
        }
    }

    // === Routing ===

    /// Routing table for `collection`, built on first use and cached for the
    /// lifetime of this snapshot.
    pub fn get_routing_table(&self, collection: &str) -> Result<Arc<RoutingTable>> {
        if let Some(table) = self.routing.get(collection) {
            return Ok(table);
        }

        let slices = self
            .get_slices(collection)
            .filter(|slices| !slices.is_empty())
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        let mut built = false;
        let table = self.routing.get_or_build(collection, || {
            built = true;
            Ok(RoutingTable::build(collection, slices.keys().cloned()))
        })?;

        // Reported after publication so observers may route from the callback
        if built {
            self.observer.routing_table_built(collection, table.len());
        }
        Ok(table)
    }

    /// Name of the shard owning `hash` in `collection`
    pub fn resolve_shard(&self, hash: i32, collection: &str) -> Result<String> {
        let table = self.get_routing_table(collection)?;
        match table.lookup(hash) {
            Ok(shard) => Ok(shard.to_string()),
            Err(e) => {
                self.observer.invariant_violation(collection, hash);
                Err(e)
            }
        }
    }

    fn read_collections(&self) -> Arc<CollectionMap> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ClusterState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut live: Vec<&str> = self.live_nodes.iter().map(String::as_str).collect();
        live.sort_unstable();
        write!(f, "live nodes:{:?} collections:{{", live)?;

        let collections = self.read_collections();
        for (i, (name, slices)) in collections.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let names: Vec<&str> = slices.keys().map(String::as_str).collect();
            write!(f, "{}: {:?}", name, names)?;
        }
        write!(f, "}}")
    }
}

impl std::fmt::Debug for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterState")
            .field("live_nodes", &self.live_nodes)
            .field("collections", &self.read_collections())
            .field("routing_tables", &self.routing.built_count())
            .finish()
    }
}

/// Shared slot holding the current snapshot.
///
/// Request handlers call [`current`](Self::current) once per request and
/// route against that snapshot; a refresh swaps in a new snapshot with a
/// single store and never touches the old one.
pub struct ClusterStateHandle {
    current: RwLock<Arc<ClusterState>>,
}

impl ClusterStateHandle {
    pub fn new(state: ClusterState) -> Self {
        Self {
            current: RwLock::new(Arc::new(state)),
        }
    }

    pub fn current(&self) -> Arc<ClusterState> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish `state`, returning the snapshot it replaced
    pub fn replace(&self, state: ClusterState) -> Arc<ClusterState> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(state))
    }

    /// Reload from `store`. On failure the current snapshot stays published.
    pub fn refresh<S: CoordinationStore + ?Sized>(&self, store: &S) -> Result<Arc<ClusterState>> {
        let observer = self.current().observer();
        let state = match ClusterState::load_from(store) {
            Ok(state) => state.with_observer(observer),
            Err(e) => {
                tracing::warn!("Topology refresh failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };

        let state = Arc::new(state);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = state.clone();
        Ok(state)
    }
}

impl Default for ClusterStateHandle {
    fn default() -> Self {
        Self::new(ClusterState::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::endpoint::ShardEndpoint;
    use crate::cluster::observer::testing::RecordingObserver;
    use crate::cluster::slice::ReplicaMap;
    use crate::cluster::store::MemStore;
    use std::sync::{mpsc, Mutex, Weak};
    use std::thread;
    use std::time::Duration;

    /// Routes through the state it observes as soon as a table is built
    #[derive(Default)]
    struct RoutingObserver {
        state: Mutex<Weak<ClusterState>>,
        shards_seen: Mutex<Vec<usize>>,
    }

    impl TopologyObserver for RoutingObserver {
        fn routing_table_built(&self, collection: &str, _shards: usize) {
            let state = self.state.lock().unwrap().upgrade();
            if let Some(state) = state {
                let table = state.get_routing_table(collection).unwrap();
                self.shards_seen.lock().unwrap().push(table.len());
            }
        }
    }

    fn slice(name: &str, replicas: &[&str]) -> Slice {
        let replicas: ReplicaMap = replicas
            .iter()
            .map(|id| {
                let ep: ShardEndpoint = [("node_name", format!("{}-node", id))]
                    .into_iter()
                    .collect();
                (id.to_string(), ep)
            })
            .collect();
        Slice::new(name, replicas).unwrap()
    }

    fn docs_state() -> ClusterState {
        let state = ClusterState::new();
        state.add_or_merge_slice("docs", slice("shard3", &["r5"]));
        state.add_or_merge_slice("docs", slice("shard1", &["r1", "r2"]));
        state.add_or_merge_slice("docs", slice("shard2", &["r3"]));
        state
    }

    #[test]
    fn test_empty_state() {
        let state = ClusterState::new();
        assert!(state.get_collections().is_empty());
        assert!(state.get_live_nodes().is_empty());
        assert!(state.get_slices("docs").is_none());
        assert!(state.get_slice("docs", "shard1").is_none());
        assert!(matches!(
            state.resolve_shard(0, "docs"),
            Err(Error::UnknownCollection(c)) if c == "docs"
        ));
    }

    #[test]
    fn test_add_and_lookup() {
        let state = docs_state();
        assert_eq!(
            state.get_collections().into_iter().collect::<Vec<_>>(),
            vec!["docs"]
        );
        assert_eq!(state.get_slices("docs").unwrap().len(), 3);
        let s = state.get_slice("docs", "shard1").unwrap();
        assert_eq!(s.replica_ids().collect::<Vec<_>>(), vec!["r1", "r2"]);
        assert!(state.get_slice("docs", "shard9").is_none());
    }

    #[test]
    fn test_merge_into_existing_slice() {
        let state = docs_state();
        state.add_or_merge_slice("docs", slice("shard1", &["r9"]));

        let s = state.get_slice("docs", "shard1").unwrap();
        assert_eq!(s.replica_ids().collect::<Vec<_>>(), vec!["r1", "r2", "r9"]);
        assert_eq!(state.get_slices("docs").unwrap().len(), 3);
    }

    #[test]
    fn test_merge_identical_slice_is_idempotent() {
        let state = docs_state();
        let before = state.get_slice("docs", "shard1").unwrap();
        state.add_or_merge_slice("docs", (*before).clone());
        assert_eq!(*state.get_slice("docs", "shard1").unwrap(), *before);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let state = docs_state();
        let before = state.get_slices("docs").unwrap();
        state.add_or_merge_slice("docs", slice("shard4", &["r7"]));

        assert_eq!(before.len(), 3);
        assert_eq!(state.get_slices("docs").unwrap().len(), 4);
    }

    #[test]
    fn test_resolve_sorted_order() {
        let state = docs_state();
        let table = state.get_routing_table("docs").unwrap();
        assert_eq!(table.shard_ids(), &["shard1", "shard2", "shard3"]);

        assert_eq!(state.resolve_shard(i32::MIN, "docs").unwrap(), "shard1");
        assert_eq!(state.resolve_shard(i32::MIN + 10, "docs").unwrap(), "shard1");
        assert_eq!(state.resolve_shard(0, "docs").unwrap(), "shard2");
        assert_eq!(state.resolve_shard(i32::MAX - 10, "docs").unwrap(), "shard3");
        assert_eq!(state.resolve_shard(i32::MAX, "docs").unwrap(), "shard3");
    }

    #[test]
    fn test_routing_table_cached() {
        let state = docs_state();
        let a = state.get_routing_table("docs").unwrap();
        let b = state.get_routing_table("docs").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_observer_events() {
        let observer = Arc::new(RecordingObserver::default());
        let state = ClusterState::new().with_observer(observer.clone());

        state.add_or_merge_slice("docs", slice("shard1", &["r1"]));
        state.add_or_merge_slice("docs", slice("shard1", &["r2"]));
        state.resolve_shard(5, "docs").unwrap();
        state.resolve_shard(6, "docs").unwrap();
        state.add_or_merge_slice("docs", slice("shard2", &["r3"]));

        assert_eq!(
            observer.events(),
            vec!["created:docs", "built:docs:1", "stale:docs:shard2"]
        );

        // Table built before the merge keeps routing everything to shard1
        assert_eq!(state.resolve_shard(i32::MAX, "docs").unwrap(), "shard1");
    }

    #[test]
    fn test_display() {
        let live: HashSet<String> = ["n2".to_string(), "n1".to_string()].into_iter().collect();
        let state = ClusterState::with_collections(live, CollectionMap::new());
        state.add_or_merge_slice("docs", slice("shard1", &["r1"]));
        assert_eq!(
            state.to_string(),
            r#"live nodes:["n1", "n2"] collections:{docs: ["shard1"]}"#
        );
    }

    #[test]
    fn test_handle_refresh_keeps_previous_on_failure() {
        let store = MemStore::new();
        store.set_topology(br#"{"docs":{"shard1":{"r1":{"node_name":"n1"}}}}"#.to_vec());
        store.set_live_nodes(["n1"]);

        let handle = ClusterStateHandle::default();
        handle.refresh(&store).unwrap();
        let first = handle.current();
        assert!(first.is_live("n1"));
        assert_eq!(first.resolve_shard(1, "docs").unwrap(), "shard1");

        store.set_topology(b"{not json".to_vec());
        assert!(matches!(
            handle.refresh(&store),
            Err(Error::MalformedTopology(_))
        ));
        assert!(Arc::ptr_eq(&first, &handle.current()));
    }

    #[test]
    fn test_handle_replace() {
        let handle = ClusterStateHandle::new(docs_state());
        let old = handle.replace(ClusterState::new());
        assert_eq!(old.get_collections().len(), 1);
        assert!(handle.current().get_collections().is_empty());
    }

    #[test]
    fn test_observer_can_route_from_build_callback() {
        let observer = Arc::new(RoutingObserver::default());
        let state = Arc::new(docs_state().with_observer(observer.clone()));
        *observer.state.lock().unwrap() = Arc::downgrade(&state);

        let (tx, rx) = mpsc::channel();
        let router = state.clone();
        thread::spawn(move || {
            tx.send(router.resolve_shard(0, "docs").ok()).unwrap();
        });

        let shard = rx.recv_timeout(Duration::from_secs(5));
        assert_eq!(shard, Ok(Some("shard2".to_string())));
        assert_eq!(*observer.shards_seen.lock().unwrap(), vec![3]);
    }
}
