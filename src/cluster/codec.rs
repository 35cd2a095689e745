//! Topology document encoding
//!
//! The coordination store keeps the topology as a JSON document:
//!
//! ```text
//! {
//!   "<collection>": {
//!     "<slice>": {
//!       "<replica id>": { "<prop>": "<value>", ... }
//!     }
//!   }
//! }
//! ```
//!
//! Live nodes and routing tables are not part of the document.

use crate::cluster::slice::{ReplicaMap, Slice};
use crate::cluster::state::{ClusterState, CollectionMap, SliceMap};
use crate::common::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Wire shape: collection → slice → replica → properties
type Document = BTreeMap<String, BTreeMap<String, ReplicaMap>>;

pub struct TopologyCodec;

impl TopologyCodec {
    /// Parse a topology document.
    ///
    /// Absent or zero-length input is the "no topology yet" document. Any
    /// structural problem fails the whole decode.
    pub fn decode(bytes: Option<&[u8]>) -> Result<CollectionMap> {
        let bytes = match bytes {
            Some(b) if !b.is_empty() => b,
            _ => return Ok(CollectionMap::new()),
        };

        let document: Document = serde_json::from_slice(bytes)?;

        let mut collections = CollectionMap::new();
        for (collection, slices) in document {
            let mut slice_map = SliceMap::new();
            for (name, replicas) in slices {
                let slice = Slice::new(name.clone(), replicas).map_err(|e| {
                    Error::MalformedTopology(format!("collection {}: {}", collection, e))
                })?;
                slice_map.insert(name, Arc::new(slice));
            }
            collections.insert(collection, Arc::new(slice_map));
        }

        Ok(collections)
    }

    pub fn decode_state(bytes: Option<&[u8]>, live_nodes: HashSet<String>) -> Result<ClusterState> {
        let collections = Self::decode(bytes)?;
        Ok(ClusterState::with_collections(live_nodes, collections))
    }

    /// Compact JSON, keys sorted
    pub fn encode(state: &ClusterState) -> Result<Vec<u8>> {
        let collections = state.get_collection_states();
        serde_json::to_vec(&Self::document(&collections))
            .map_err(|e| Error::Internal(format!("Serialize error: {}", e)))
    }

    pub fn encode_pretty(state: &ClusterState) -> Result<Vec<u8>> {
        let collections = state.get_collection_states();
        serde_json::to_vec_pretty(&Self::document(&collections))
            .map_err(|e| Error::Internal(format!("Serialize error: {}", e)))
    }

    fn document(collections: &CollectionMap) -> BTreeMap<&str, BTreeMap<&str, &ReplicaMap>> {
        collections
            .iter()
            .map(|(collection, slices)| {
                let slices: BTreeMap<&str, &ReplicaMap> = slices
                    .iter()
                    .map(|(name, slice)| (name.as_str(), slice.replicas()))
                    .collect();
                (collection.as_str(), slices)
            })
            .collect()
    }
}
