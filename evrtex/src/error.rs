//! Error taxonomy for the texture toolkit.
//!
//! Every core operation returns `Result<_, TexError>`; nothing panics
//! across the library boundary. The CLI layer logs the messages
//! verbatim and maps them to a nonzero exit code.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TexError {
    /// Malformed or undersized container header.
    #[error("Format parse error: {0}")]
    FormatParse(String),

    /// External codec missing, exited nonzero, or timed out.
    #[error("Tool invocation failed: {0}")]
    ToolInvocation(String),

    /// No mapping hit and no brute-force candidate within tolerance.
    #[error("Could not resolve decode parameters for '{identity}'")]
    ResolutionNotFound { identity: String },

    /// The target payload size is unknown, so pad/truncate cannot run.
    #[error("Cannot reconcile payload size for '{identity}': target size unknown")]
    SizeReconciliation { identity: String },

    /// Sibling descriptor missing or too short to carry a size field.
    #[error("Descriptor patch failed: {0}")]
    DescriptorPatch(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TexError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TexError>;
