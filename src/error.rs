use std::path::PathBuf;
use thiserror::Error;

/// Why a single file could not be processed. None of these stop a batch.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A legacy file needs the external converter and it is not available.
    #[error("cannot process legacy file {}: {reason}", .path.display())]
    EnvironmentUnavailable { path: PathBuf, reason: String },

    #[error("conversion of {} with {program} failed: {message}", .path.display())]
    Conversion {
        program: String,
        path: PathBuf,
        message: String,
    },

    /// The result would land on another input or on another input's result.
    #[error("refusing to write {}: it belongs to {}", .path.display(), .owner.display())]
    OutputConflict { path: PathBuf, owner: PathBuf },

    #[error("failed to save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Loading errors carry their context chain from the reader.
    #[error(transparent)]
    Load(#[from] anyhow::Error),
}
