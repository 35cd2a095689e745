//! Slices: one partition of a collection and its replica set

use crate::cluster::endpoint::ShardEndpoint;
use crate::cluster::state::ClusterState;
use crate::common::{Error, Result};
use std::collections::BTreeMap;

/// Replica id → endpoint properties
pub type ReplicaMap = BTreeMap<String, ShardEndpoint>;

/// Immutable slice. Updates go through [`Slice::merge_with`], which builds a
/// new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    name: String,
    replicas: ReplicaMap,
}

impl Slice {
    pub fn new(name: impl Into<String>, replicas: ReplicaMap) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidSlice("slice name must not be empty".into()));
        }
        Ok(Self { name, replicas })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replicas(&self) -> &ReplicaMap {
        &self.replicas
    }

    pub fn replica(&self, replica_id: &str) -> Option<&ShardEndpoint> {
        self.replicas.get(replica_id)
    }

    pub fn replica_ids(&self) -> impl Iterator<Item = &str> {
        self.replicas.keys().map(String::as_str)
    }

    /// Overlay `other`'s replicas on top of ours. `other` wins on id collision.
    pub fn merge_with(&self, other: &Slice) -> Slice {
        debug_assert_eq!(self.name, other.name, "merging slices with different names");

        let mut replicas = self.replicas.clone();
        replicas.extend(
            other
                .replicas
                .iter()
                .map(|(id, ep)| (id.clone(), ep.clone())),
        );

        Slice {
            name: self.name.clone(),
            replicas,
        }
    }

    /// Replicas hosted on nodes the snapshot considers live
    pub fn live_replicas<'a>(
        &'a self,
        state: &'a ClusterState,
    ) -> impl Iterator<Item = (&'a str, &'a ShardEndpoint)> + 'a {
        self.replicas
            .iter()
            .filter(|(_, ep)| ep.node_name().is_some_and(|node| state.is_live(node)))
            .map(|(id, ep)| (id.as_str(), ep))
    }

    /// Current leader replica, if one is flagged
    pub fn leader(&self) -> Option<(&str, &ShardEndpoint)> {
        self.replicas
            .iter()
            .find(|(_, ep)| ep.is_leader())
            .map(|(id, ep)| (id.as_str(), ep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::endpoint::{LEADER_PROP, NODE_NAME_PROP};
    use std::collections::HashSet;

    fn endpoint(node: &str) -> ShardEndpoint {
        [(NODE_NAME_PROP, node)].into_iter().collect()
    }

    fn slice(name: &str, replicas: &[(&str, &str)]) -> Slice {
        let replicas = replicas
            .iter()
            .map(|(id, node)| (id.to_string(), endpoint(node)))
            .collect();
        Slice::new(name, replicas).unwrap()
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            Slice::new("", ReplicaMap::new()),
            Err(Error::InvalidSlice(_))
        ));
    }

    #[test]
    fn test_merge_union() {
        let a = slice("shard1", &[("r1", "node-a")]);
        let b = slice("shard1", &[("r2", "node-b")]);

        let merged = a.merge_with(&b);
        assert_eq!(merged.name(), "shard1");
        assert_eq!(merged.replica_ids().collect::<Vec<_>>(), vec!["r1", "r2"]);

        // Inputs untouched
        assert_eq!(a.replicas().len(), 1);
        assert_eq!(b.replicas().len(), 1);
    }

    #[test]
    fn test_merge_collision_later_wins() {
        let a = slice("shard1", &[("r1", "node-a")]);
        let b = slice("shard1", &[("r1", "node-b")]);

        let merged = a.merge_with(&b);
        assert_eq!(merged.replicas().len(), 1);
        assert_eq!(merged.replica("r1").unwrap().node_name(), Some("node-b"));
    }

    #[test]
    fn test_merge_identical_is_noop() {
        let a = slice("shard1", &[("r1", "node-a"), ("r2", "node-b")]);
        assert_eq!(a.merge_with(&a.clone()), a);
    }

    #[test]
    fn test_live_replicas_and_leader() {
        let mut replicas = ReplicaMap::new();
        replicas.insert("r1".into(), endpoint("node-a"));
        replicas.insert(
            "r2".into(),
            [(NODE_NAME_PROP, "node-b"), (LEADER_PROP, "true")]
                .into_iter()
                .collect(),
        );
        replicas.insert("r3".into(), ShardEndpoint::default());
        let s = Slice::new("shard1", replicas).unwrap();

        let live: HashSet<String> = ["node-b".to_string()].into_iter().collect();
        let state = ClusterState::with_collections(live, Default::default());

        let ids: Vec<&str> = s.live_replicas(&state).map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["r2"]);
        assert_eq!(s.leader().map(|(id, _)| id), Some("r2"));
    }
}
