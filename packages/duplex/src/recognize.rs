//! Recognition and output placement.
//!
//! Outputs are produced in a scratch directory inside the output root, then the
//! whole directory is renamed to its permanent name. Scratch and permanent
//! names share a filesystem, so a partially written output directory is never
//! visible under a permanent name.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::CandidateError;
use crate::record::DocumentRecord;
use crate::tools::Recognizer;

/// Prefix of in-flight scratch directories under the output root.
pub const SCRATCH_PREFIX: &str = ".scratch-";

/// Number of `_NN` variants tried when the plain label is taken.
pub const MAX_COLLISION_SUFFIX: u32 = 10;

/// Run the recognizer for every language and move the results into a fresh
/// output directory named after the record's label. Returns that directory.
pub async fn recognize_into<R: Recognizer>(
    recognizer: &R,
    record: &DocumentRecord,
    languages: &[String],
    output_root: &Path,
) -> Result<PathBuf, CandidateError> {
    // Dropping `scratch` on any early return removes it with its contents.
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(output_root)
        .map_err(|e| CandidateError::Io {
            path: output_root.to_path_buf(),
            source: e,
        })?;

    for language in languages {
        let output = scratch.path().join(record.file_name(language, false));
        debug!(source = %record.source_path.display(), %language, "recognizing");
        recognizer
            .recognize(&record.source_path, language, &output)
            .await
            .map_err(|source| CandidateError::RecognitionFailed {
                path: record.source_path.clone(),
                language: language.clone(),
                source,
            })?;
    }

    let out_dir = allocate_output_dir(output_root, &record.label).await?;
    tokio::fs::rename(scratch.path(), &out_dir)
        .await
        .map_err(|e| CandidateError::Io {
            path: out_dir.clone(),
            source: e,
        })?;
    // The scratch path no longer exists, so dropping the guard is a no-op.
    drop(scratch);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            tokio::fs::set_permissions(&out_dir, std::fs::Permissions::from_mode(0o755)).await
        {
            warn!(dir = %out_dir.display(), "failed to relax output permissions: {}", e);
        }
    }

    Ok(out_dir)
}

/// First free name among `<label>`, `<label>_01` … `<label>_10`.
pub async fn allocate_output_dir(
    output_root: &Path,
    label: &str,
) -> Result<PathBuf, CandidateError> {
    let candidates = std::iter::once(label.to_string())
        .chain((1..=MAX_COLLISION_SUFFIX).map(|i| format!("{label}_{i:02}")));

    for name in candidates {
        let path = output_root.join(name);
        let taken = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CandidateError::Io {
                path: path.clone(),
                source: e,
            })?;
        if !taken {
            return Ok(path);
        }
    }

    Err(CandidateError::TooManyCollisions {
        label: label.to_string(),
    })
}

/// Remove scratch directories left behind by a process that was killed
/// mid-recognition. Returns how many were removed.
pub async fn purge_stale_scratch(output_root: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(output_root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let is_scratch = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(SCRATCH_PREFIX));
        if is_scratch && entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await?;
            removed += 1;
        }
    }
    if removed > 0 {
        info!("removed {} stale scratch directories", removed);
    }
    Ok(removed)
}
