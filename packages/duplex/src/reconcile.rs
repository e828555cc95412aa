//! Directory listing and the resume-point calculation.
//!
//! A single "last processed" record plus a time-ordered listing is enough to
//! find unprocessed work: inputs are never rewritten or renamed after arrival,
//! so everything newer than the last record is new.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DuplexError, Result};
use crate::record::DocumentRecord;

/// A file in the watched directory and its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

impl Arrival {
    fn name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }
}

/// List regular, non-hidden files in `dir`, sorted by modification time and
/// then by name.
///
/// Failing to read the directory itself is fatal. Entries that disappear
/// between listing and stat are skipped.
pub async fn scan_dir(dir: &Path) -> Result<Vec<Arrival>> {
    let inaccessible = |source| DuplexError::WatchDirInaccessible {
        path: dir.to_path_buf(),
        source,
    };

    let mut arrivals = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(inaccessible)?;
    while let Some(entry) = entries.next_entry().await.map_err(inaccessible)? {
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %entry.path().display(), "skipping entry: {}", e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        arrivals.push(Arrival {
            path: entry.path(),
            modified: modified.into(),
        });
    }

    sort_arrivals(&mut arrivals);
    Ok(arrivals)
}

pub fn sort_arrivals(arrivals: &mut [Arrival]) {
    arrivals.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.name().cmp(&b.name()))
    });
}

/// The suffix of `arrivals` (sorted) that still needs processing after `latest`.
pub fn pending_after<'a>(
    arrivals: &'a [Arrival],
    latest: Option<&DocumentRecord>,
) -> &'a [Arrival] {
    let Some(latest) = latest else {
        return arrivals;
    };
    // Siblings sharing the latest mtime sort by name, same as the listing.
    let resume = (latest.arrival, latest.source_path.file_name());
    let mut start = arrivals.partition_point(|a| (a.modified, a.name()) <= resume);
    if arrivals
        .get(start)
        .is_some_and(|a| a.name() == latest.source_path.file_name())
    {
        start += 1;
    }
    &arrivals[start..]
}
