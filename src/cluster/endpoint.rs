//! Replica endpoint properties

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BASE_URL_PROP: &str = "base_url";
pub const NODE_NAME_PROP: &str = "node_name";
pub const ROLES_PROP: &str = "roles";
pub const LEADER_PROP: &str = "leader";

/// Immutable property bag describing one physical replica
/// (address, owning node, role, leader flag, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardEndpoint {
    props: BTreeMap<String, String>,
}

impl ShardEndpoint {
    pub fn new(props: BTreeMap<String, String>) -> Self {
        Self { props }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.props
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.get(BASE_URL_PROP)
    }

    /// Cluster node hosting this replica; matched against the live node set
    pub fn node_name(&self) -> Option<&str> {
        self.get(NODE_NAME_PROP)
    }

    pub fn role(&self) -> Option<&str> {
        self.get(ROLES_PROP)
    }

    pub fn is_leader(&self) -> bool {
        self.get(LEADER_PROP) == Some("true")
    }
}

impl<K, V> FromIterator<(K, V)> for ShardEndpoint
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for ShardEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.props)
    }
}
