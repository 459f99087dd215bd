//! Settings directory and persisted-file locations.
//!
//! The mapping file, the resolved-parameter cache, and (optionally)
//! the bundled codec executables all live under one settings
//! directory. Every path can be overridden on the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use evrtex::{CliCodec, DimensionMapping, ParamCache};

pub const MAPPING_FILE: &str = "texture_mapping.json";
pub const CACHE_FILE: &str = "cache2.json";
/// Cache file name used by older releases; read-only fallback.
pub const LEGACY_CACHE_FILE: &str = "cache.json";

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Settings directory (defaults to the per-user config dir)
    #[arg(long, global = true)]
    pub settings_dir: Option<PathBuf>,

    /// Path to the astcenc executable
    #[arg(long, global = true)]
    pub astcenc: Option<PathBuf>,

    /// Path to the texconv executable
    #[arg(long, global = true)]
    pub texconv: Option<PathBuf>,

    /// Path to the texture mapping file
    #[arg(long, global = true)]
    pub mapping: Option<PathBuf>,

    /// Path to the resolved-parameter cache file
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,
}

pub struct Settings {
    pub settings_dir: PathBuf,
    pub mapping_path: PathBuf,
    pub cache_path: PathBuf,
    args: SettingsArgs,
}

impl Settings {
    pub fn from_args(args: SettingsArgs) -> Result<Self> {
        let settings_dir = match &args.settings_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("", "", "evrtex")
                .context("could not determine a settings directory")?
                .config_dir()
                .to_path_buf(),
        };
        let mapping_path = args
            .mapping
            .clone()
            .unwrap_or_else(|| settings_dir.join(MAPPING_FILE));
        let cache_path = args
            .cache
            .clone()
            .unwrap_or_else(|| settings_dir.join(CACHE_FILE));

        Ok(Self {
            settings_dir,
            mapping_path,
            cache_path,
            args,
        })
    }

    pub fn load_mapping(&self) -> DimensionMapping {
        DimensionMapping::load(&self.mapping_path)
    }

    pub fn load_cache(&self) -> ParamCache {
        let legacy = self.settings_dir.join(LEGACY_CACHE_FILE);
        ParamCache::load(&self.cache_path, Some(&legacy))
    }

    pub fn persist_cache(&self, cache: &ParamCache) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        cache
            .persist(&self.cache_path)
            .with_context(|| format!("Failed to persist cache to {}", self.cache_path.display()))
    }

    pub fn codec(&self) -> Result<CliCodec> {
        CliCodec::discover(
            self.args.astcenc.as_deref(),
            self.args.texconv.as_deref(),
            Some(&self.settings_dir),
        )
        .context("External codec tools not available")
    }
}
