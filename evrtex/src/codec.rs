//! External codec capability.
//!
//! All compression math lives in two external command-line tools: the
//! ASTC encoder (`astcenc`) for mobile payloads and a DDS converter
//! (`texconv`) for desktop ones. The toolkit never links them; it
//! shells out with a bounded timeout per invocation. Everything above
//! this trait (framing, candidate search, caching, padding) is
//! testable against a fake implementation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{Result, TexError};

/// astcenc encode quality preset (`-fast`, `-medium`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Fast,
    Medium,
    Thorough,
}

impl Quality {
    pub fn flag(self) -> &'static str {
        match self {
            Quality::Fast => "-fast",
            Quality::Medium => "-medium",
            Quality::Thorough => "-thorough",
        }
    }
}

/// Timeouts per operation kind. Decodes are quick; encodes can chew on
/// a 2K texture for a while; the DDS converter also emits mip chains.
pub const DECODE_TIMEOUT: Duration = Duration::from_secs(10);
pub const ENCODE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DDS_ENCODE_TIMEOUT: Duration = Duration::from_secs(60);

/// Narrow interface over the external compression tools.
pub trait Codec: Sync {
    /// Decode a wrapped `.astc` file to a PNG at `out_png`.
    fn decode_astc(&self, wrapped: &Path, out_png: &Path) -> Result<()>;

    /// Encode a source image to a wrapped `.astc` file at `out` using
    /// the given block footprint and quality preset.
    fn encode_astc(&self, src: &Path, out: &Path, block: (u8, u8), quality: Quality)
        -> Result<()>;

    /// Encode a source image to a headered DDS file at `out_dds`.
    fn encode_dds(&self, src: &Path, out_dds: &Path) -> Result<()>;

    /// Decode a DDS file to a PNG at `out_png`.
    fn decode_dds(&self, src_dds: &Path, out_png: &Path) -> Result<()>;
}

/// `Codec` backed by the real command-line tools.
pub struct CliCodec {
    astcenc: PathBuf,
    texconv: PathBuf,
}

impl CliCodec {
    pub fn new(astcenc: PathBuf, texconv: PathBuf) -> Self {
        Self { astcenc, texconv }
    }

    /// Locate both executables: an explicit override wins, then a
    /// settings directory, then `$PATH`.
    pub fn discover(
        astcenc_override: Option<&Path>,
        texconv_override: Option<&Path>,
        settings_dir: Option<&Path>,
    ) -> Result<Self> {
        let astcenc = find_tool("astcenc", astcenc_override, settings_dir)?;
        let texconv = find_tool("texconv", texconv_override, settings_dir)?;
        Ok(Self::new(astcenc, texconv))
    }
}

fn find_tool(name: &str, override_path: Option<&Path>, settings_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(TexError::ToolInvocation(format!(
            "{} not found at {}",
            name,
            path.display()
        )));
    }

    if let Some(dir) = settings_dir {
        for candidate in [dir.join(name), dir.join(format!("{name}.exe"))] {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    which::which(name)
        .map_err(|_| TexError::ToolInvocation(format!("{name} not found on PATH")))
}

impl Codec for CliCodec {
    fn decode_astc(&self, wrapped: &Path, out_png: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.astcenc);
        cmd.arg("-dl").arg(wrapped).arg(out_png);
        run_with_timeout(cmd, DECODE_TIMEOUT)
    }

    fn encode_astc(
        &self,
        src: &Path,
        out: &Path,
        block: (u8, u8),
        quality: Quality,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.astcenc);
        cmd.arg("-cl")
            .arg(src)
            .arg(out)
            .arg(format!("{}x{}", block.0, block.1))
            .arg(quality.flag())
            .arg("-silent");
        run_with_timeout(cmd, ENCODE_TIMEOUT)
    }

    fn encode_dds(&self, src: &Path, out_dds: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.texconv);
        cmd.arg("encode").arg(src).arg(out_dds);
        run_with_timeout(cmd, DDS_ENCODE_TIMEOUT)
    }

    fn decode_dds(&self, src_dds: &Path, out_png: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.texconv);
        cmd.arg("decode").arg(src_dds).arg(out_png);
        run_with_timeout(cmd, DDS_ENCODE_TIMEOUT)
    }
}

/// Run a command to completion with a deadline.
///
/// Polls `try_wait` so a hung tool cannot stall a worker forever; on
/// deadline the child is killed and reaped. A nonzero exit or a
/// timeout is reported as `ToolInvocation` - callers running candidate
/// searches treat that as a soft failure and move on.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let mut child = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| TexError::ToolInvocation(format!("failed to start {program}: {e}")))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    return Ok(());
                }
                return Err(TexError::ToolInvocation(format!(
                    "{program} exited with {status}"
                )));
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(TexError::ToolInvocation(format!(
                        "{program} timed out after {}s",
                        timeout.as_secs()
                    )));
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => {
                return Err(TexError::ToolInvocation(format!(
                    "failed to wait on {program}: {e}"
                )));
            }
        }
    }
}
