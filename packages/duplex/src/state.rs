//! Durable storage of the pair window.
//!
//! The file is rewritten whole on every save: serialized to a temp file in the
//! same directory, synced, then renamed over the old one. A crash leaves either
//! the old or the new state, never a torn file.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DuplexError, Result};
use crate::record::PairWindow;

/// Name of the state file inside the output root.
pub const STATE_FILE_NAME: &str = ".duplex-state.json";

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located at `<output_root>/.duplex-state.json`.
    pub fn in_dir(output_root: &Path) -> Self {
        Self::new(output_root.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last saved window. A missing file is a fresh start.
    pub async fn load(&self) -> Result<Option<PairWindow>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DuplexError::StateUnreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let window: PairWindow =
            serde_json::from_slice(&bytes).map_err(|source| DuplexError::StateCorrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(window))
    }

    pub async fn save(&self, window: &PairWindow) -> Result<()> {
        let save_err = |source: std::io::Error| DuplexError::StateSave {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(window).map_err(|e| save_err(e.into()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| save_err(std::io::Error::other(e)))?
            .map_err(save_err)?;

        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

/// Temp file in the target's directory, fsync, then rename over the target.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
