//! Texture replacement engine.
//!
//! Takes an original payload from the rebuild-output tree and an
//! arbitrary source image, and produces a conformant replacement in
//! the staging-input tree: the payload itself, plus a copy of the
//! sibling descriptor whose recorded size is patched to the new
//! payload's exact byte length. The package rebuilder consumes the
//! staging tree as-is, so every byte of bookkeeping has to line up.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use crate::astc;
use crate::cache::{DecodeParams, ParamCache};
use crate::codec::{Codec, Quality};
use crate::dds::{self, DdsInfo};
use crate::error::{Result, TexError};
use crate::mapping::DimensionMapping;
use crate::resolve::texture_name;

/// Opaque staging folder names for one platform: where payloads go
/// and where their corresponding descriptors go. The names mirror the
/// hashed folder identifiers inside the asset packages and are the
/// same in the rebuild-output tree and the staging-input tree.
#[derive(Debug, Clone, Copy)]
pub struct StagingLayout {
    pub payload_dir: &'static str,
    pub descriptor_dir: &'static str,
}

pub const DESKTOP_STAGING: StagingLayout = StagingLayout {
    payload_dir: "beac1969cb7b8861",
    descriptor_dir: "4a4c32c49300b8a0",
};

pub const MOBILE_STAGING: StagingLayout = StagingLayout {
    payload_dir: "489b7b69cb19e0e9",
    descriptor_dir: "e2ef0854d0cd69b8",
};

/// Default block footprint used on the mobile path when the cache has
/// no record and only the mapping's dimensions are known.
pub const DEFAULT_MOBILE_BLOCK: (u8, u8) = (8, 8);

/// One replacement job.
#[derive(Debug, Clone)]
pub struct ReplaceRequest {
    /// Original texture payload inside the rebuild-output tree.
    pub original: PathBuf,
    /// Replacement source image (PNG/JPG, or a DDS on the desktop path).
    pub replacement: PathBuf,
    /// Root of the rebuild-output tree (holds the descriptor folders).
    pub rebuild_dir: PathBuf,
    /// Root of the staging-input tree fed back to the rebuilder.
    pub staging_dir: PathBuf,
}

/// What a successful replacement produced. The message is surfaced to
/// the user verbatim by the CLI.
#[derive(Debug)]
pub struct ReplaceOutcome {
    pub payload_len: u64,
    pub message: String,
}

pub struct ReplacementEngine<'a> {
    mapping: &'a DimensionMapping,
    cache: &'a ParamCache,
    codec: &'a dyn Codec,
}

impl<'a> ReplacementEngine<'a> {
    pub fn new(mapping: &'a DimensionMapping, cache: &'a ParamCache, codec: &'a dyn Codec) -> Self {
        Self { mapping, cache, codec }
    }

    /// Desktop (headered) path: resize the replacement to the
    /// original's dimensions, convert to DDS, stage, patch descriptor.
    pub fn replace_desktop(&self, req: &ReplaceRequest) -> Result<ReplaceOutcome> {
        let orig_info = DdsInfo::parse_file(&req.original)?.ok_or_else(|| {
            TexError::FormatParse(format!(
                "{} is not a parseable DDS container",
                req.original.display()
            ))
        })?;
        let (target_w, target_h) = (orig_info.width, orig_info.height);

        let scratch = tempfile::tempdir().map_err(|e| TexError::io("tempdir", e))?;

        // A DDS replacement that already matches the target dimensions
        // is used as-is; anything else goes through resize + encode.
        let payload_path = if is_matching_dds(&req.replacement, target_w, target_h) {
            req.replacement.clone()
        } else {
            let resized_png = scratch.path().join("resized.png");
            resample_to_png(&req.replacement, target_w, target_h, &resized_png)?;

            let out_dds = scratch.path().join("converted.dds");
            self.codec.encode_dds(&resized_png, &out_dds)?;
            if !out_dds.is_file() {
                return Err(TexError::ToolInvocation(
                    "DDS conversion produced no output file".to_string(),
                ));
            }
            out_dds
        };

        let payload_len = fs::metadata(&payload_path)
            .map_err(|e| TexError::io(&payload_path, e))?
            .len();

        let file_name = payload_file_name(&req.original)?;
        stage_payload(&payload_path, &req.staging_dir, DESKTOP_STAGING, &file_name)?;
        stage_descriptor(
            &req.rebuild_dir,
            &req.staging_dir,
            DESKTOP_STAGING,
            &file_name,
            payload_len as u32,
        )?;

        tracing::info!(
            "Replaced desktop texture {} ({}x{}, {} bytes)",
            file_name,
            target_w,
            target_h,
            payload_len
        );
        Ok(ReplaceOutcome {
            payload_len,
            message: format!("Desktop texture replaced. Size updated to {payload_len} bytes."),
        })
    }

    /// Mobile (headerless) path: encode at resolved parameters, strip
    /// the synthetic header, force the exact original byte length,
    /// stage, patch descriptor.
    pub fn replace_mobile(&self, req: &ReplaceRequest) -> Result<ReplaceOutcome> {
        let name = texture_name(&req.original);
        let params = self.mobile_params(&name, &req.original)?;
        let target_size = params.original_size as usize;

        let scratch = tempfile::tempdir().map_err(|e| TexError::io("tempdir", e))?;
        let encoded_path = scratch.path().join("encoded.astc");
        self.codec.encode_astc(
            &req.replacement,
            &encoded_path,
            (params.block_w, params.block_h),
            Quality::Medium,
        )?;

        let encoded = fs::read(&encoded_path).map_err(|e| TexError::io(&encoded_path, e))?;
        // The codec writes a standard .astc header; the container
        // stores only the raw block payload.
        let raw = match astc::strip_wrapper(&encoded) {
            Some(payload) => payload.to_vec(),
            None => encoded,
        };

        // Container slots have fixed capacity: the final payload must
        // match the original length exactly.
        let padded = astc::pad_to_size(raw, target_size);
        let staged_payload = scratch.path().join("payload.bin");
        fs::write(&staged_payload, &padded).map_err(|e| TexError::io(&staged_payload, e))?;

        let file_name = payload_file_name(&req.original)?;
        stage_payload(&staged_payload, &req.staging_dir, MOBILE_STAGING, &file_name)?;
        stage_descriptor(
            &req.rebuild_dir,
            &req.staging_dir,
            MOBILE_STAGING,
            &file_name,
            padded.len() as u32,
        )?;

        tracing::info!(
            "Replaced mobile texture {} ({}x{} @{}x{}, {} bytes)",
            file_name,
            params.width,
            params.height,
            params.block_w,
            params.block_h,
            padded.len()
        );
        Ok(ReplaceOutcome {
            payload_len: padded.len() as u64,
            message: format!(
                "Mobile texture replaced. Size updated to {} bytes.",
                padded.len()
            ),
        })
    }

    /// Decode parameters for the mobile path: cache hit first, then a
    /// mapping hit at the default block size with the original payload
    /// length as target, else the texture is unresolvable.
    fn mobile_params(&self, name: &str, original: &Path) -> Result<DecodeParams> {
        if let Some(params) = self.cache.get(name) {
            return Ok(params);
        }
        if let Some((_, dims)) = self.mapping.find(name) {
            let original_size = fs::metadata(original)
                .map_err(|_| TexError::SizeReconciliation {
                    identity: name.to_string(),
                })?
                .len();
            return Ok(DecodeParams {
                width: dims.width,
                height: dims.height,
                block_w: DEFAULT_MOBILE_BLOCK.0,
                block_h: DEFAULT_MOBILE_BLOCK.1,
                original_size,
            });
        }
        Err(TexError::ResolutionNotFound {
            identity: name.to_string(),
        })
    }
}

fn is_matching_dds(path: &Path, width: u32, height: u32) -> bool {
    if path.extension().map(|e| e.eq_ignore_ascii_case("dds")) != Some(true) {
        return false;
    }
    match DdsInfo::parse_file(path) {
        Ok(Some(info)) => info.width == width && info.height == height,
        _ => false,
    }
}

/// Resample a source image to exactly the target dimensions (no
/// aspect-ratio preservation) and write it as PNG.
fn resample_to_png(src: &Path, width: u32, height: u32, out_png: &Path) -> Result<()> {
    let img = image::open(src).map_err(|e| {
        TexError::FormatParse(format!("cannot read replacement image {}: {e}", src.display()))
    })?;
    let img = if img.width() != width || img.height() != height {
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };
    img.save(out_png).map_err(|e| {
        TexError::FormatParse(format!("cannot write resized image {}: {e}", out_png.display()))
    })
}

fn payload_file_name(original: &Path) -> Result<String> {
    original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TexError::FormatParse(format!("{} has no file name", original.display())))
}

fn stage_payload(
    payload: &Path,
    staging_dir: &Path,
    layout: StagingLayout,
    file_name: &str,
) -> Result<()> {
    let dir = staging_dir.join(layout.payload_dir);
    fs::create_dir_all(&dir).map_err(|e| TexError::io(&dir, e))?;
    let dest = dir.join(file_name);
    fs::copy(payload, &dest).map_err(|e| TexError::io(&dest, e))?;
    Ok(())
}

/// Copy the matching descriptor out of the rebuild-output tree into
/// the staging tree, then patch its recorded payload size.
fn stage_descriptor(
    rebuild_dir: &Path,
    staging_dir: &Path,
    layout: StagingLayout,
    file_name: &str,
    new_size: u32,
) -> Result<()> {
    let source = rebuild_dir.join(layout.descriptor_dir).join(file_name);
    if !source.is_file() {
        return Err(TexError::DescriptorPatch(format!(
            "descriptor {} not found in rebuild output",
            source.display()
        )));
    }

    let dir = staging_dir.join(layout.descriptor_dir);
    fs::create_dir_all(&dir).map_err(|e| TexError::io(&dir, e))?;
    let dest = dir.join(file_name);
    fs::copy(&source, &dest).map_err(|e| TexError::io(&dest, e))?;

    dds::patch_descriptor_size(&dest, new_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fake codec for engine tests: encodes are synthesized in-process.
    struct FakeCodec {
        /// Raw payload length the astc encode should produce
        /// (pre-padding), so tests can exercise pad and truncate.
        astc_raw_len: usize,
        dds_calls: Mutex<u32>,
    }

    impl FakeCodec {
        fn new(astc_raw_len: usize) -> Self {
            Self {
                astc_raw_len,
                dds_calls: Mutex::new(0),
            }
        }
    }

    impl Codec for FakeCodec {
        fn decode_astc(&self, _: &Path, _: &Path) -> Result<()> {
            unimplemented!("not used by engine tests")
        }

        fn encode_astc(&self, _: &Path, out: &Path, block: (u8, u8), _: Quality) -> Result<()> {
            let raw = vec![0x7Fu8; self.astc_raw_len];
            let wrapped = astc::wrap(&raw, 64, 64, block.0, block.1);
            std::fs::write(out, wrapped).unwrap();
            Ok(())
        }

        fn encode_dds(&self, _: &Path, out_dds: &Path) -> Result<()> {
            *self.dds_calls.lock().unwrap() += 1;
            let mut buf = vec![0u8; 4096];
            buf[0..4].copy_from_slice(dds::DDS_MAGIC);
            std::fs::write(out_dds, buf).unwrap();
            Ok(())
        }

        fn decode_dds(&self, _: &Path, _: &Path) -> Result<()> {
            unimplemented!("not used by engine tests")
        }
    }

    fn make_dds_file(path: &Path, width: u32, height: u32, trailing: usize) {
        let mut buf = vec![0u8; dds::DDS_HEADER_LEN + trailing];
        buf[0..4].copy_from_slice(dds::DDS_MAGIC);
        buf[12..16].copy_from_slice(&height.to_le_bytes());
        buf[16..20].copy_from_slice(&width.to_le_bytes());
        buf[84..88].copy_from_slice(b"DXT5");
        std::fs::write(path, buf).unwrap();
    }

    struct Trees {
        _root: tempfile::TempDir,
        rebuild: PathBuf,
        staging: PathBuf,
    }

    fn make_trees(layout: StagingLayout, descriptor_name: &str, descriptor_len: usize) -> Trees {
        let root = tempfile::tempdir().unwrap();
        let rebuild = root.path().join("output-both");
        let staging = root.path().join("input");
        let desc_dir = rebuild.join(layout.descriptor_dir);
        std::fs::create_dir_all(&desc_dir).unwrap();
        std::fs::write(desc_dir.join(descriptor_name), vec![0u8; descriptor_len]).unwrap();
        Trees {
            _root: root,
            rebuild,
            staging,
        }
    }

    #[test]
    fn mobile_path_pads_payload_to_original_size() {
        let trees = make_trees(MOBILE_STAGING, "rock_d", 300);
        let original = trees.rebuild.join("rock_d");
        std::fs::write(&original, vec![1u8; 4096]).unwrap();
        let replacement = trees.rebuild.join("new.png");
        std::fs::write(&replacement, b"png bytes").unwrap();

        let mapping = DimensionMapping::default();
        let cache = ParamCache::new();
        cache.put(
            "rock_d",
            DecodeParams {
                width: 128,
                height: 128,
                block_w: 8,
                block_h: 8,
                original_size: 4096,
            },
        );
        let codec = FakeCodec::new(4000); // encoder comes up short

        let engine = ReplacementEngine::new(&mapping, &cache, &codec);
        let outcome = engine
            .replace_mobile(&ReplaceRequest {
                original: original.clone(),
                replacement,
                rebuild_dir: trees.rebuild.clone(),
                staging_dir: trees.staging.clone(),
            })
            .unwrap();

        assert_eq!(outcome.payload_len, 4096);

        let staged = trees.staging.join(MOBILE_STAGING.payload_dir).join("rock_d");
        let bytes = std::fs::read(staged).unwrap();
        assert_eq!(bytes.len(), 4096);
        assert_eq!(bytes[3999], 0x7F);
        assert_eq!(&bytes[4000..], vec![0u8; 96].as_slice());

        let desc = trees
            .staging
            .join(MOBILE_STAGING.descriptor_dir)
            .join("rock_d");
        let desc_bytes = std::fs::read(desc).unwrap();
        assert_eq!(&desc_bytes[244..248], &4096u32.to_le_bytes());
    }

    #[test]
    fn mobile_path_truncates_oversized_payload() {
        let trees = make_trees(MOBILE_STAGING, "rock_d", 300);
        let original = trees.rebuild.join("rock_d");
        std::fs::write(&original, vec![1u8; 1024]).unwrap();
        let replacement = trees.rebuild.join("new.png");
        std::fs::write(&replacement, b"png bytes").unwrap();

        let mapping = DimensionMapping::default();
        let cache = ParamCache::new();
        cache.put(
            "rock_d",
            DecodeParams {
                width: 64,
                height: 64,
                block_w: 8,
                block_h: 8,
                original_size: 1024,
            },
        );
        let codec = FakeCodec::new(2000);

        let engine = ReplacementEngine::new(&mapping, &cache, &codec);
        let outcome = engine
            .replace_mobile(&ReplaceRequest {
                original,
                replacement: replacement.clone(),
                rebuild_dir: trees.rebuild.clone(),
                staging_dir: trees.staging.clone(),
            })
            .unwrap();
        assert_eq!(outcome.payload_len, 1024);
    }

    #[test]
    fn mobile_path_without_cache_or_mapping_is_resolution_not_found() {
        let trees = make_trees(MOBILE_STAGING, "mystery", 300);
        let original = trees.rebuild.join("mystery");
        std::fs::write(&original, vec![1u8; 1024]).unwrap();

        let mapping = DimensionMapping::default();
        let cache = ParamCache::new();
        let codec = FakeCodec::new(1024);

        let err = ReplacementEngine::new(&mapping, &cache, &codec)
            .replace_mobile(&ReplaceRequest {
                original,
                replacement: trees.rebuild.join("new.png"),
                rebuild_dir: trees.rebuild.clone(),
                staging_dir: trees.staging.clone(),
            })
            .unwrap_err();
        assert!(matches!(err, TexError::ResolutionNotFound { .. }));
    }

    #[test]
    fn short_descriptor_fails_and_stays_unmodified_in_rebuild_tree() {
        let trees = make_trees(MOBILE_STAGING, "rock_d", 247);
        let original = trees.rebuild.join("rock_d");
        std::fs::write(&original, vec![1u8; 1024]).unwrap();
        let replacement = trees.rebuild.join("new.png");
        std::fs::write(&replacement, b"png bytes").unwrap();

        let mapping = DimensionMapping::default();
        let cache = ParamCache::new();
        cache.put(
            "rock_d",
            DecodeParams {
                width: 64,
                height: 64,
                block_w: 8,
                block_h: 8,
                original_size: 1024,
            },
        );
        let codec = FakeCodec::new(1024);

        let err = ReplacementEngine::new(&mapping, &cache, &codec)
            .replace_mobile(&ReplaceRequest {
                original,
                replacement,
                rebuild_dir: trees.rebuild.clone(),
                staging_dir: trees.staging.clone(),
            })
            .unwrap_err();
        assert!(matches!(err, TexError::DescriptorPatch(_)));

        // The source descriptor in the rebuild tree is untouched.
        let src = trees
            .rebuild
            .join(MOBILE_STAGING.descriptor_dir)
            .join("rock_d");
        assert_eq!(std::fs::read(src).unwrap(), vec![0u8; 247]);
    }

    #[test]
    fn desktop_path_uses_matching_dds_without_reencoding() {
        let trees = make_trees(DESKTOP_STAGING, "wall.dds", 300);
        let original = trees.rebuild.join("wall.dds");
        make_dds_file(&original, 256, 256, 1000);
        let replacement = trees.rebuild.join("repl.dds");
        make_dds_file(&replacement, 256, 256, 500);

        let mapping = DimensionMapping::default();
        let cache = ParamCache::new();
        let codec = FakeCodec::new(0);

        let outcome = ReplacementEngine::new(&mapping, &cache, &codec)
            .replace_desktop(&ReplaceRequest {
                original,
                replacement: replacement.clone(),
                rebuild_dir: trees.rebuild.clone(),
                staging_dir: trees.staging.clone(),
            })
            .unwrap();

        assert_eq!(*codec.dds_calls.lock().unwrap(), 0);
        let expected_len = std::fs::metadata(&replacement).unwrap().len();
        assert_eq!(outcome.payload_len, expected_len);
    }

    #[test]
    fn desktop_path_rejects_non_dds_original() {
        let trees = make_trees(DESKTOP_STAGING, "wall.dds", 300);
        let original = trees.rebuild.join("wall.dds");
        std::fs::write(&original, b"not a dds").unwrap();

        let mapping = DimensionMapping::default();
        let cache = ParamCache::new();
        let codec = FakeCodec::new(0);

        let err = ReplacementEngine::new(&mapping, &cache, &codec)
            .replace_desktop(&ReplaceRequest {
                original,
                replacement: trees.rebuild.join("repl.png"),
                rebuild_dir: trees.rebuild.clone(),
                staging_dir: trees.staging.clone(),
            })
            .unwrap_err();
        assert!(matches!(err, TexError::FormatParse(_)));
    }
}
