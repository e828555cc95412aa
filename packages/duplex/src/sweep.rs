//! Batch collation of already-recognized documents.
//!
//! Files in the input directory are taken in arrival order and paired
//! consecutively: first with second, third with fourth, and so on. Each merged
//! pair is written to the output directory under the front file's name and
//! both inputs are moved to the archive directory. Nothing is overwritten: a
//! pair whose output or archive name is already taken fails and stays put.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::reconcile::{self, Arrival};
use crate::tools::Merger;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub archive_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub merged: usize,
    pub failed: usize,
    /// A trailing front without a back, left for the next sweep.
    pub leftover: usize,
}

/// Run one sweep over the input directory.
pub async fn sweep<M: Merger>(merger: &M, config: &SweepConfig) -> Result<SweepStats> {
    let arrivals = reconcile::scan_dir(&config.input_dir).await?;
    let mut stats = SweepStats::default();
    let mut front: Option<&Arrival> = None;

    for arrival in &arrivals {
        let Some(current_front) = front.take() else {
            front = Some(arrival);
            continue;
        };

        match merge_and_archive(merger, config, &current_front.path, &arrival.path).await {
            Ok(output) => {
                info!(output = %output.display(), "merged pair");
                stats.merged += 1;
            }
            Err(e) => {
                error!(
                    front = %current_front.path.display(),
                    back = %arrival.path.display(),
                    "failed to merge pair: {}",
                    e
                );
                stats.failed += 1;
                // The back may be the front of the next pair.
                front = Some(arrival);
            }
        }
    }

    if front.is_some() {
        stats.leftover = 1;
    }
    Ok(stats)
}

async fn merge_and_archive<M: Merger>(
    merger: &M,
    config: &SweepConfig,
    front: &Path,
    back: &Path,
) -> std::result::Result<PathBuf, String> {
    let front_name = file_name(front)?;
    let output = config.output_dir.join(front_name);
    let archived_front = config.archive_dir.join(front_name);
    let archived_back = config.archive_dir.join(file_name(back)?);

    // Scanners reuse names, so never overwrite an earlier result or original.
    for dest in [&output, &archived_front, &archived_back] {
        let taken = tokio::fs::try_exists(dest)
            .await
            .map_err(|e| format!("cannot check {}: {}", dest.display(), e))?;
        if taken {
            return Err(format!("{} already exists", dest.display()));
        }
    }

    info!(front = %front.display(), back = %back.display(), "merging");
    merger
        .collate(front, back, &output)
        .await
        .map_err(|e| e.to_string())?;

    if let Err(e) = tokio::fs::rename(front, &archived_front).await {
        discard_output(&output).await;
        return Err(format!("failed to archive {}: {}", front.display(), e));
    }
    if let Err(e) = tokio::fs::rename(back, &archived_back).await {
        // Put the front back so the pair is either fully archived or not at all.
        if let Err(undo) = tokio::fs::rename(&archived_front, front).await {
            error!(
                archived = %archived_front.display(),
                "failed to restore front after a partial archive: {}",
                undo
            );
        }
        discard_output(&output).await;
        return Err(format!("failed to archive {}: {}", back.display(), e));
    }
    Ok(output)
}

fn file_name(path: &Path) -> std::result::Result<&std::ffi::OsStr, String> {
    path.file_name()
        .ok_or_else(|| format!("{} has no file name", path.display()))
}

async fn discard_output(output: &Path) {
    if let Err(e) = tokio::fs::remove_file(output).await {
        warn!(output = %output.display(), "failed to remove merged output: {}", e);
    }
}
