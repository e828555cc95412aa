//! The per-candidate pipeline shared by both delivery modes.
//!
//! readiness → recognition → output placement → pairing → state save.
//! Candidates are handled strictly one at a time; the pair window is owned
//! here and threaded from one candidate to the next.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{CandidateError, Result};
use crate::pairing::{self, PairingPolicy};
use crate::readiness::{self, ReadinessPolicy};
use crate::reconcile;
use crate::recognize;
use crate::record::{DocumentRecord, PairWindow, PairingOutcome};
use crate::state::StateStore;
use crate::tools::{Merger, Recognizer};

/// Runtime configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub watch_dir: PathBuf,
    pub output_dir: PathBuf,
    pub languages: Vec<String>,
    pub readiness: ReadinessPolicy,
    pub pairing: PairingPolicy,
}

impl PipelineConfig {
    pub fn new(watch_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            output_dir: output_dir.into(),
            languages: default_languages(),
            readiness: ReadinessPolicy::default(),
            pairing: PairingPolicy::default(),
        }
    }
}

pub fn default_languages() -> Vec<String> {
    vec!["eng".to_string(), "deu".to_string()]
}

/// How a single candidate ended.
#[derive(Debug)]
pub enum Outcome {
    /// Output placed and state saved.
    Processed {
        output_dir: PathBuf,
        pairing: PairingOutcome,
    },
    /// The arrival is at or behind the resume point.
    AlreadyCovered,
    /// Non-fatal failure. The candidate is dropped.
    Abandoned(CandidateError),
}

impl Outcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Outcome::Processed { .. })
    }
}

pub struct Pipeline<R, M> {
    config: PipelineConfig,
    recognizer: R,
    merger: M,
    store: StateStore,
    window: PairWindow,
}

impl<R: Recognizer, M: Merger> Pipeline<R, M> {
    pub fn new(config: PipelineConfig, recognizer: R, merger: M) -> Self {
        let store = StateStore::in_dir(&config.output_dir);
        Self {
            config,
            recognizer,
            merger,
            store,
            window: PairWindow::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn window(&self) -> &PairWindow {
        &self.window
    }

    /// Load the persisted window. A corrupt state file is fatal.
    pub async fn restore(&mut self) -> Result<Option<&DocumentRecord>> {
        if let Some(window) = self.store.load().await? {
            self.window = window;
        }
        if let Some(latest) = self.window.latest() {
            info!(
                "restored state, latest processed file is {}",
                latest.source_path.display()
            );
        }
        Ok(self.window.latest())
    }

    /// Process every unhandled file in the watched directory, oldest first.
    /// Returns the number of candidates that completed.
    pub async fn reconcile(&mut self) -> Result<usize> {
        let arrivals = reconcile::scan_dir(&self.config.watch_dir).await?;
        let pending = reconcile::pending_after(&arrivals, self.window.latest());
        if pending.is_empty() {
            return Ok(0);
        }
        info!(
            "{} unprocessed files in {}",
            pending.len(),
            self.config.watch_dir.display()
        );

        let mut processed = 0;
        for arrival in pending {
            if self.process_candidate(&arrival.path).await?.is_processed() {
                processed += 1;
            }
        }
        Ok(processed)
    }

    /// Run one candidate through the whole pipeline.
    ///
    /// Only a failure to persist state is returned as an error; everything
    /// scoped to this file ends up in [`Outcome::Abandoned`].
    pub async fn process_candidate(&mut self, path: &Path) -> Result<Outcome> {
        info!(path = %path.display(), "processing");
        match self.accept_and_place(path).await {
            Ok(Some(record)) => self.complete(record).await,
            Ok(None) => Ok(Outcome::AlreadyCovered),
            Err(e) => {
                error!(path = %path.display(), code = e.error_code(), "failed processing: {}", e);
                Ok(Outcome::Abandoned(e))
            }
        }
    }

    async fn accept_and_place(
        &self,
        path: &Path,
    ) -> std::result::Result<Option<DocumentRecord>, CandidateError> {
        readiness::wait_until_ready(path, &self.config.readiness).await?;
        let mut record = DocumentRecord::accept(path)
            .await
            .map_err(|e| CandidateError::from_io(path, e))?;

        if let Some(latest) = self.window.latest() {
            if latest.is_same_arrival(path, record.arrival) {
                info!(path = %path.display(), "already processed, skipping");
                return Ok(None);
            }
            if latest.covers(path, record.arrival) {
                // Processing it would move the resume point backwards.
                warn!(
                    path = %path.display(),
                    arrival = %record.arrival,
                    resume_path = %latest.source_path.display(),
                    resume_arrival = %latest.arrival,
                    "file is older than the last processed one, skipping it"
                );
                return Ok(None);
            }
        }

        let out_dir = recognize::recognize_into(
            &self.recognizer,
            &record,
            &self.config.languages,
            &self.config.output_dir,
        )
        .await?;
        record.place(out_dir);
        Ok(Some(record))
    }

    async fn complete(&mut self, mut record: DocumentRecord) -> Result<Outcome> {
        let pairing = pairing::pair(
            &self.merger,
            &self.config.pairing,
            self.window.latest(),
            &mut record,
            &self.config.languages,
        )
        .await;

        let output_dir = record.output_dir.clone().unwrap_or_default();
        let source = record.source_path.clone();
        self.window.advance(record);
        self.store.save(&self.window).await?;

        info!(path = %source.display(), output = %output_dir.display(), ?pairing, "file is done");
        Ok(Outcome::Processed {
            output_dir,
            pairing,
        })
    }
}
