//! Persisted texture-name to dimensions mapping.
//!
//! The mapping file is a flat JSON object of identity -> {width,
//! height}, harvested from the desktop build of the same asset set.
//! It is the fast path of dimension resolution: a hit pins the
//! dimensions so only the block size has to be searched.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::astc::identity_candidates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
pub struct DimensionMapping {
    entries: HashMap<String, Dimensions>,
}

impl DimensionMapping {
    pub fn new(entries: HashMap<String, Dimensions>) -> Self {
        Self { entries }
    }

    /// Load a mapping file. A missing or unreadable file yields an
    /// empty mapping - resolution then falls through to brute force.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, Dimensions>>(&text) {
                Ok(entries) => {
                    tracing::debug!("Loaded {} mapping entries from {}", entries.len(), path.display());
                    Self { entries }
                }
                Err(e) => {
                    tracing::warn!("Ignoring corrupt mapping file {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up dimensions for a texture name: exact match first, then
    /// the name with each known channel-role suffix stripped.
    pub fn find(&self, name: &str) -> Option<(String, Dimensions)> {
        for candidate in identity_candidates(name) {
            if let Some(dims) = self.entries.get(candidate) {
                return Some((candidate.to_string(), *dims));
            }
        }
        None
    }
}
