//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Session directory missing or not a directory
    #[error("Session directory not found: {}", path.display())]
    SessionDirNotFound { path: PathBuf },

    /// A page file exists but could not be read
    #[error("Failed to read page {page} from {}: {source}", path.display())]
    PageRead {
        page: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No timing page in the session directory
    #[error("No {file} in {}", dir.display())]
    TimingPageMissing { file: String, dir: PathBuf },

    /// Processing exceeded the configured timeout
    #[error("Processing timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The blocking engine task panicked or was cancelled
    #[error("Engine worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] contracts::ContractError),
}

impl CliError {
    pub fn session_dir_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SessionDirNotFound { path: path.into() }
    }

    pub fn page_read(page: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PageRead {
            page: page.into(),
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
