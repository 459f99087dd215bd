//! Dimension and block-size resolution for headerless payloads.
//!
//! A raw mobile payload carries no metadata at all, so the only way to
//! recover its shape is to guess and check: wrap the bytes with a
//! candidate header, ask the codec to decode, and see whether anything
//! plausible comes out. The mapping file narrows the guess to a block
//! size; failing that, a small table of configurations common in the
//! asset set is tried against the payload's byte length.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::astc::{
    self, BRUTE_FORCE_CONFIGS, COMMON_BLOCK_SIZES, MIN_DECODE_OUTPUT, SIZE_TOLERANCE,
};
use crate::cache::{DecodeParams, ParamCache};
use crate::codec::Codec;
use crate::error::{Result, TexError};
use crate::mapping::DimensionMapping;

/// Cooperative cancellation flag, shared between a UI/driver thread
/// and resolver workers. Checked between candidate attempts only - an
/// in-flight codec invocation is never interrupted except by its own
/// timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Resolver<'a> {
    mapping: &'a DimensionMapping,
    cache: &'a ParamCache,
    codec: &'a dyn Codec,
    cancel: CancelToken,
}

impl<'a> Resolver<'a> {
    pub fn new(mapping: &'a DimensionMapping, cache: &'a ParamCache, codec: &'a dyn Codec) -> Self {
        Self {
            mapping,
            cache,
            codec,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Recover decode parameters for a headerless payload. On success
    /// the resolved record (including the payload's original byte
    /// length) is stored in the cache under the texture's name, so the
    /// next encode for the same texture skips the search.
    pub fn resolve(&self, blob_path: &Path) -> Result<DecodeParams> {
        self.resolve_to(blob_path, None)
    }

    /// Like [`resolve`](Self::resolve), but additionally leaves the
    /// winning candidate's decoded PNG at `out_png`.
    pub fn resolve_to(&self, blob_path: &Path, out_png: Option<&Path>) -> Result<DecodeParams> {
        let name = texture_name(blob_path);
        let raw = std::fs::read(blob_path).map_err(|e| TexError::io(blob_path, e))?;

        if let Some(params) = self.mapping_path(&name, &raw, out_png)? {
            self.cache.put(&name, params);
            return Ok(params);
        }
        if let Some(params) = self.brute_force_path(&name, &raw, out_png)? {
            self.cache.put(&name, params);
            return Ok(params);
        }

        Err(TexError::ResolutionNotFound { identity: name })
    }

    /// Mapping path: a dimension hit pins width and height; iterate
    /// the common block sizes until one decodes.
    fn mapping_path(&self, name: &str, raw: &[u8], out_png: Option<&Path>) -> Result<Option<DecodeParams>> {
        let Some((identity, dims)) = self.mapping.find(name) else {
            return Ok(None);
        };
        tracing::debug!("Mapping hit for '{name}' via '{identity}': {}x{}", dims.width, dims.height);

        for &(block_w, block_h) in COMMON_BLOCK_SIZES {
            if self.cancel.is_cancelled() {
                tracing::info!("Resolution of '{name}' cancelled");
                return Ok(None);
            }
            let params = DecodeParams {
                width: dims.width,
                height: dims.height,
                block_w,
                block_h,
                original_size: raw.len() as u64,
            };
            if self.try_candidate(raw, params, out_png)? {
                return Ok(Some(params));
            }
        }
        Ok(None)
    }

    /// Brute-force path: fixed configuration table, filtered by how
    /// close each candidate's expected compressed size comes to the
    /// payload's actual length.
    fn brute_force_path(&self, name: &str, raw: &[u8], out_png: Option<&Path>) -> Result<Option<DecodeParams>> {
        let actual = raw.len() as u64;

        for config in BRUTE_FORCE_CONFIGS {
            if self.cancel.is_cancelled() {
                tracing::info!("Resolution of '{name}' cancelled");
                return Ok(None);
            }
            let expected = astc::expected_size(config.width, config.height, config.block_w, config.block_h);
            if expected.abs_diff(actual) > SIZE_TOLERANCE {
                continue;
            }
            tracing::debug!("Trying brute-force candidate {} for '{name}'", config.label);
            let params = DecodeParams {
                width: config.width,
                height: config.height,
                block_w: config.block_w,
                block_h: config.block_h,
                original_size: actual,
            };
            if self.try_candidate(raw, params, out_png)? {
                return Ok(Some(params));
            }
        }
        Ok(None)
    }

    /// Validate one candidate by round-tripping through the codec.
    /// Accepts only if the decode exits cleanly, produces an output
    /// file, and that file is big enough to be a real image. A codec
    /// failure or timeout is a soft miss, never an abort.
    fn try_candidate(&self, raw: &[u8], params: DecodeParams, out_png: Option<&Path>) -> Result<bool> {
        let scratch = tempfile::tempdir().map_err(|e| TexError::io("tempdir", e))?;
        let wrapped_path = scratch.path().join("candidate.astc");
        let decoded_path = scratch.path().join("candidate.png");

        let wrapped = astc::wrap(raw, params.width, params.height, params.block_w, params.block_h);
        std::fs::write(&wrapped_path, wrapped).map_err(|e| TexError::io(&wrapped_path, e))?;

        match self.codec.decode_astc(&wrapped_path, &decoded_path) {
            Ok(()) => {}
            Err(e) => {
                tracing::trace!("Candidate {}x{} @{}x{} rejected: {e}", params.width, params.height, params.block_w, params.block_h);
                return Ok(false);
            }
        }

        let size = match std::fs::metadata(&decoded_path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(false),
        };
        if size <= MIN_DECODE_OUTPUT {
            // The codec accepted the framing but produced garbage;
            // scratch dir cleanup removes the output.
            return Ok(false);
        }

        if let Some(out) = out_png {
            std::fs::copy(&decoded_path, out).map_err(|e| TexError::io(out, e))?;
        }
        Ok(true)
    }
}

/// Texture name as used for mapping and cache keys: the file stem.
pub fn texture_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Best-effort PNG output path for a decoded blob, mirroring the
/// blob's file name.
pub fn default_png_output(blob_path: &Path) -> PathBuf {
    blob_path.with_extension("png")
}
