//! Common utilities and types shared across shardmap

pub mod config;
pub mod error;
pub mod hash;

pub use config::Config;
pub use error::{Error, Result};
pub use hash::{HashPartitioner, HashRange, HASH_SPACE_END, HASH_SPACE_MIN, HASH_SPACE_SIZE};
