//! evrtex - texture toolkit for proprietary asset containers
//!
//! Inspects DDS containers, recovers decode parameters for headerless
//! mobile payloads, decodes either kind to PNG, and stages
//! byte-compatible replacement payloads for the package rebuilder.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use evrtex::{dds, resolve, DdsInfo, ReplaceRequest, ReplacementEngine, Resolver};

mod batch;
mod settings;

use settings::{Settings, SettingsArgs};

#[derive(Parser)]
#[command(name = "evrtex")]
#[command(about = "Texture inspection, decoding and replacement for EVR asset containers")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Platform {
    /// Headered DDS payloads (PCVR build)
    Desktop,
    /// Headerless ASTC payloads (Quest build)
    Mobile,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed header of a DDS container
    Inspect {
        /// DDS file to inspect
        file: PathBuf,
    },

    /// Recover width/height/block size for a headerless payload
    Resolve {
        /// Raw texture payload
        blob: PathBuf,
    },

    /// Decode a texture payload to PNG
    Decode {
        /// DDS container or raw mobile payload
        input: PathBuf,

        /// Output PNG path (defaults to the input with a .png extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace a texture and patch its descriptor
    Replace {
        /// Target platform
        #[arg(value_enum)]
        platform: Platform,

        /// Original payload inside the rebuild-output tree
        original: PathBuf,

        /// Replacement source image
        replacement: PathBuf,

        /// Root of the rebuild-output tree
        #[arg(long)]
        rebuild_dir: PathBuf,

        /// Root of the staging-input tree
        #[arg(long)]
        staging_dir: PathBuf,
    },

    /// Run a JSON file of replacement jobs on a worker pool
    Batch {
        /// Job file (JSON array of replacement requests)
        jobs: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_args(cli.settings)?;

    match cli.command {
        Commands::Inspect { file } => {
            let info = DdsInfo::parse_file(&file)?
                .with_context(|| format!("{} is not a DDS container", file.display()))?;
            let size = std::fs::metadata(&file)?.len();
            println!("{}", file.display());
            println!("  Format:  {}", info.format_name);
            println!("  Size:    {}x{}", info.width, info.height);
            println!("  Mipmaps: {}", info.mipmap_count);
            println!("  Bytes:   {size}");
            if let Some(code) = info.format_code {
                println!("  DXGI:    {code}");
            }
            if info.needs_external_decode {
                println!("  Note:    requires external conversion to preview");
            }
        }

        Commands::Resolve { blob } => {
            let mapping = settings.load_mapping();
            let cache = settings.load_cache();
            let codec = settings.codec()?;

            let name = resolve::texture_name(&blob);
            let params = Resolver::new(&mapping, &cache, &codec)
                .resolve(&blob)
                .with_context(|| format!("Failed to resolve '{name}'"))?;
            settings.persist_cache(&cache)?;

            println!("{name}: {}x{} @ {}x{} blocks ({} bytes)",
                params.width, params.height, params.block_w, params.block_h, params.original_size);
        }

        Commands::Decode { input, output } => {
            let output = output.unwrap_or_else(|| resolve::default_png_output(&input));
            let codec = settings.codec()?;

            // Headered payloads decode directly; anything else goes
            // through parameter resolution first.
            let is_dds = DdsInfo::parse_file(&input)?.is_some();
            if is_dds {
                dds::decode_to_png(&input, &output, &codec)?;
            } else {
                let mapping = settings.load_mapping();
                let cache = settings.load_cache();
                Resolver::new(&mapping, &cache, &codec).resolve_to(&input, Some(&output))?;
                settings.persist_cache(&cache)?;
            }
            tracing::info!("Decoded {} -> {}", input.display(), output.display());
        }

        Commands::Replace {
            platform,
            original,
            replacement,
            rebuild_dir,
            staging_dir,
        } => {
            let mapping = settings.load_mapping();
            let cache = settings.load_cache();
            let codec = settings.codec()?;
            let engine = ReplacementEngine::new(&mapping, &cache, &codec);

            let request = ReplaceRequest {
                original,
                replacement,
                rebuild_dir,
                staging_dir,
            };
            let outcome = match platform {
                Platform::Desktop => engine.replace_desktop(&request)?,
                Platform::Mobile => engine.replace_mobile(&request)?,
            };
            settings.persist_cache(&cache)?;
            println!("{}", outcome.message);
        }

        Commands::Batch { jobs } => {
            let jobs = batch::load_jobs(&jobs)?;
            if jobs.is_empty() {
                bail!("Job file contains no jobs");
            }
            println!("Running {} replacement jobs...", jobs.len());

            let mapping = settings.load_mapping();
            let cache = settings.load_cache();
            let codec = settings.codec()?;

            let failures = batch::run_jobs(&jobs, &mapping, &cache, &codec)?;
            settings.persist_cache(&cache)?;
            if failures > 0 {
                bail!("{failures} replacement job(s) failed");
            }
        }
    }

    Ok(())
}
