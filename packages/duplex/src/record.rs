//! Document records and the two-slot pair window.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Format of the per-record output directory name.
const LABEL_FORMAT: &str = "%Y-%m-%dT%H_%M_%S";

/// One accepted input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source_path: PathBuf,

    /// Modification time of the source when it was accepted. This is the
    /// ordering key for the whole system, not the time it was processed.
    pub arrival: DateTime<Utc>,

    /// Local-time rendering of `arrival`, safe for use as a directory name.
    pub label: String,

    /// Local calendar date of `arrival`, used in output file names.
    pub date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub pairing: PairingOutcome,
}

/// What happened when this record was considered as the back half of a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingOutcome {
    #[default]
    Standalone,
    Merged,
    MergeFailed,
}

impl DocumentRecord {
    pub fn new(source_path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        let local: DateTime<Local> = modified.into();
        Self {
            source_path: source_path.into(),
            arrival: modified.into(),
            label: local.format(LABEL_FORMAT).to_string(),
            date: local.date_naive().format("%Y-%m-%d").to_string(),
            output_dir: None,
            pairing: PairingOutcome::Standalone,
        }
    }

    /// Create a record from the file's current modification time.
    pub async fn accept(path: &Path) -> std::io::Result<Self> {
        let modified = tokio::fs::metadata(path).await?.modified()?;
        Ok(Self::new(path, modified))
    }

    /// `<date>_<language>[_collated].pdf`
    pub fn file_name(&self, language: &str, collated: bool) -> String {
        let suffix = if collated { "_collated" } else { "" };
        format!("{}_{}{}.pdf", self.date, language, suffix)
    }

    /// Path of an output artifact. `None` until the output has been placed.
    pub fn output_file(&self, language: &str, collated: bool) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(self.file_name(language, collated)))
    }

    /// Records where the output landed. The first placement wins.
    pub fn place(&mut self, dir: PathBuf) {
        debug_assert!(self.output_dir.is_none(), "output placed twice");
        if self.output_dir.is_none() {
            self.output_dir = Some(dir);
        }
    }

    /// Absolute distance between two arrivals.
    pub fn gap(&self, other: &DocumentRecord) -> Duration {
        (self.arrival - other.arrival)
            .abs()
            .to_std()
            .unwrap_or(Duration::MAX)
    }

    /// Whether `self` describes the same arrival as a file seen at `path` with `arrival`.
    ///
    /// Whether `path` with `arrival` is the very file this record was made from.
    pub fn is_same_arrival(&self, path: &Path, arrival: DateTime<Utc>) -> bool {
        arrival == self.arrival && path.file_name() == self.source_path.file_name()
    }

    /// Anything ordered at or before this record by `(arrival, file name)` is
    /// covered too: it is behind the resume point and would also be skipped
    /// after a restart.
    pub fn covers(&self, path: &Path, arrival: DateTime<Utc>) -> bool {
        (arrival, path.file_name()) <= (self.arrival, self.source_path.file_name())
    }
}

/// The most recent record and its immediate predecessor.
///
/// Accepting a record shifts `current` into `previous` and drops the older
/// predecessor, so persisted state never grows with history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairWindow {
    #[serde(default)]
    pub current: Option<DocumentRecord>,
    #[serde(default)]
    pub previous: Option<DocumentRecord>,
}

impl PairWindow {
    pub fn latest(&self) -> Option<&DocumentRecord> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn advance(&mut self, record: DocumentRecord) {
        self.previous = self.current.take();
        self.current = Some(record);
    }
}
