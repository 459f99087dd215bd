//! Batch replacement jobs.
//!
//! A job file is a JSON array of replacement requests. Jobs run on a
//! bounded rayon pool; one failing job never aborts the rest, and the
//! per-job outcome messages are reported at the end.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use evrtex::{ParamCache, ReplaceRequest, ReplacementEngine};

/// Conversions are codec-bound, not CPU-bound; four concurrent
/// external processes is plenty.
const MAX_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Desktop,
    Mobile,
}

#[derive(Debug, Deserialize)]
pub struct BatchJob {
    pub platform: Platform,
    pub original: PathBuf,
    pub replacement: PathBuf,
    pub rebuild_dir: PathBuf,
    pub staging_dir: PathBuf,
}

pub fn load_jobs(path: &Path) -> Result<Vec<BatchJob>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid job file {}", path.display()))
}

/// Run all jobs, returning the number that failed.
pub fn run_jobs(
    jobs: &[BatchJob],
    mapping: &evrtex::DimensionMapping,
    cache: &ParamCache,
    codec: &dyn evrtex::Codec,
) -> Result<usize> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(MAX_WORKERS)
        .build()
        .context("Failed to build worker pool")?;

    let engine = ReplacementEngine::new(mapping, cache, codec);

    let results: Vec<(String, Result<String, String>)> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let name = job
                    .original
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| job.original.display().to_string());
                let request = ReplaceRequest {
                    original: job.original.clone(),
                    replacement: job.replacement.clone(),
                    rebuild_dir: job.rebuild_dir.clone(),
                    staging_dir: job.staging_dir.clone(),
                };
                let outcome = match job.platform {
                    Platform::Desktop => engine.replace_desktop(&request),
                    Platform::Mobile => engine.replace_mobile(&request),
                };
                match outcome {
                    Ok(out) => (name, Ok(out.message)),
                    Err(e) => (name, Err(e.to_string())),
                }
            })
            .collect()
    });

    let mut failures = 0;
    for (name, result) in &results {
        match result {
            Ok(message) => println!("  {name}: {message}"),
            Err(message) => {
                failures += 1;
                eprintln!("  {name}: FAILED - {message}");
            }
        }
    }
    println!(
        "  {}/{} replacements succeeded",
        results.len() - failures,
        results.len()
    );
    Ok(failures)
}
