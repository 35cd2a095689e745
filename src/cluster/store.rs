//! Coordination store boundary
//!
//! The coordination service (consensus store, watches, sessions) lives
//! outside this crate. It only has to hand over the raw topology document and
//! the current live node ids; retries and timeouts are its business.

use crate::common::{Error, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Source of topology snapshots
pub trait CoordinationStore: Send + Sync {
    /// Latest topology document; `None` when nothing has been published yet
    fn latest_topology_bytes(&self) -> Result<Option<Vec<u8>>>;

    fn live_node_ids(&self) -> Result<HashSet<String>>;
}

/// In-memory store, for tests and embedding
#[derive(Debug, Default)]
pub struct MemStore {
    topology: Mutex<Option<Vec<u8>>>,
    live_nodes: Mutex<HashSet<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_topology(&self, bytes: Vec<u8>) {
        *self.topology.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
    }

    pub fn clear_topology(&self) {
        *self.topology.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn set_live_nodes<I, S>(&self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.live_nodes.lock().unwrap_or_else(PoisonError::into_inner) =
            nodes.into_iter().map(Into::into).collect();
    }
}

impl CoordinationStore for MemStore {
    fn latest_topology_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .topology
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn live_node_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .live_nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Store backed by two local files: the topology document (JSON) and a
/// newline-separated live node list. A missing file means "nothing published".
#[derive(Debug, Clone)]
pub struct FileStore {
    topology_path: PathBuf,
    live_nodes_path: PathBuf,
}

impl FileStore {
    pub fn new(topology_path: impl Into<PathBuf>, live_nodes_path: impl Into<PathBuf>) -> Self {
        Self {
            topology_path: topology_path.into(),
            live_nodes_path: live_nodes_path.into(),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(&config.topology_path, &config.live_nodes_path)
    }

    pub fn topology_path(&self) -> &Path {
        &self.topology_path
    }

    pub fn live_nodes_path(&self) -> &Path {
        &self.live_nodes_path
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

/// One node id per line; blank lines and `#` comments are skipped
fn parse_live_nodes(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

impl CoordinationStore for FileStore {
    fn latest_topology_bytes(&self) -> Result<Option<Vec<u8>>> {
        read_optional(&self.topology_path)
    }

    fn live_node_ids(&self) -> Result<HashSet<String>> {
        match read_optional(&self.live_nodes_path)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|_| {
                    Error::Store(format!(
                        "live node list {} is not valid UTF-8",
                        self.live_nodes_path.display()
                    ))
                })?;
                Ok(parse_live_nodes(&text))
            }
            None => Ok(HashSet::new()),
        }
    }
}
