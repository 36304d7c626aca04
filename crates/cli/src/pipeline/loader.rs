//! Session directory loading.

use std::path::{Path, PathBuf};

use ingestion::PageKind;
use timing_engine::SessionPages;
use tracing::{debug, info};

use crate::error::{CliError, Result};

/// Pages read from one session directory
#[derive(Debug)]
pub struct LoadedSession {
    pub pages: SessionPages,
    /// Files that were found, in catalogue order
    pub files: Vec<PathBuf>,
    pub bytes_read: u64,
}

/// Read every known page file present in `dir`.
///
/// Absent files are skipped; the timing page is mandatory.
pub async fn load_session(dir: &Path) -> Result<LoadedSession> {
    let meta = tokio::fs::metadata(dir)
        .await
        .map_err(|_| CliError::session_dir_not_found(dir))?;
    if !meta.is_dir() {
        return Err(CliError::session_dir_not_found(dir));
    }

    let mut pages = SessionPages::new();
    let mut files = Vec::new();
    let mut bytes_read = 0u64;

    for kind in PageKind::ALL {
        let path = dir.join(kind.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!(page = %kind, bytes = text.len(), "page loaded");
                bytes_read += text.len() as u64;
                pages.insert(kind, text);
                files.push(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(page = %kind, "page not captured");
            }
            Err(e) => return Err(CliError::page_read(kind.name(), path, e)),
        }
    }

    if !pages.contains(PageKind::TimingData) {
        return Err(CliError::TimingPageMissing {
            file: PageKind::TimingData.file_name().to_string(),
            dir: dir.to_path_buf(),
        });
    }

    info!(
        dir = %dir.display(),
        pages = pages.len(),
        bytes_read,
        "Session pages loaded"
    );

    Ok(LoadedSession {
        pages,
        files,
        bytes_read,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_present_pages_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("TimingData.jsonStream"),
            "00:00:01.000{\"Lines\":{}}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("LapCount.jsonStream"), "").unwrap();

        let loaded = load_session(dir.path()).await.unwrap();
        assert_eq!(loaded.pages.len(), 2);
        assert!(loaded.pages.contains(PageKind::TimingData));
        assert!(loaded.pages.contains(PageKind::LapCount));
        assert!(!loaded.pages.contains(PageKind::CarData));
        assert_eq!(loaded.files.len(), 2);
        assert!(loaded.files[0].ends_with("TimingData.jsonStream"));
        assert_eq!(loaded.bytes_read, 25);
    }

    #[tokio::test]
    async fn test_timing_page_is_mandatory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("WeatherData.jsonStream"), "").unwrap();

        let err = load_session(dir.path()).await.unwrap_err();
        assert!(matches!(err, CliError::TimingPageMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = load_session(&missing).await.unwrap_err();
        assert!(matches!(err, CliError::SessionDirNotFound { .. }));
    }
}
