//! Persisted cache of resolved decode parameters.
//!
//! Filled opportunistically by the resolver whenever a candidate
//! decode succeeds, read by the replacement engine so re-encoding a
//! texture skips the search entirely. The cache is a memo, not truth:
//! losing it only costs another search. Keys are base texture
//! identities, so growth is bounded by the asset set and no eviction
//! is needed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TexError};

/// Everything needed to re-encode a texture byte-compatibly. Field
/// names match the on-disk cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeParams {
    pub width: u32,
    pub height: u32,
    pub block_w: u8,
    pub block_h: u8,
    /// Byte length of the original payload; replacement payloads are
    /// padded or truncated to exactly this.
    pub original_size: u64,
}

/// Process-wide resolved-parameter cache. Concurrent readers, writes
/// serialized through the lock; resolver workers store new records
/// from multiple threads at once.
#[derive(Debug, Default)]
pub struct ParamCache {
    records: RwLock<HashMap<String, DecodeParams>>,
}

impl ParamCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &str) -> Option<DecodeParams> {
        self.records.read().expect("cache lock poisoned").get(identity).copied()
    }

    /// Last write wins.
    pub fn put(&self, identity: &str, params: DecodeParams) {
        self.records
            .write()
            .expect("cache lock poisoned")
            .insert(identity.to_string(), params);
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the cache from disk. A missing primary file falls back to
    /// `legacy` (the pre-rename cache file name) when one is given; a
    /// missing or corrupt file is an empty cache, never an error.
    pub fn load(path: &Path, legacy: Option<&Path>) -> Self {
        let records = read_records(path)
            .or_else(|| legacy.and_then(read_records))
            .unwrap_or_default();
        if !records.is_empty() {
            tracing::debug!("Loaded {} cached parameter records", records.len());
        }
        Self {
            records: RwLock::new(records),
        }
    }

    /// Write the cache to disk as a flat identity -> record map.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let records = self.records.read().expect("cache lock poisoned");
        let json = serde_json::to_string_pretty(&*records)
            .map_err(|e| TexError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;
        std::fs::write(path, json).map_err(|e| TexError::io(path, e))
    }
}

fn read_records(path: &Path) -> Option<HashMap<String, DecodeParams>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(records) => Some(records),
        Err(e) => {
            tracing::warn!("Ignoring corrupt cache file {}: {e}", path.display());
            None
        }
    }
}
