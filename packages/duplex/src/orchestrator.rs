//! Startup sequence and the main delivery loop.
//!
//! `Start → LoadState → ReconcileOffline → {LiveLoop | PollLoop}`. The loop
//! only ends on a fatal error.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::recognize;
use crate::source::{CandidateSource, Delivery, PollSource};
use crate::tools::{Merger, Recognizer};

/// How new files are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Filesystem notifications, one candidate per event.
    Live,
    /// Rescan the watched directory on a fixed interval.
    Poll(Duration),
}

impl DeliveryMode {
    /// A zero interval selects live delivery.
    pub fn from_poll_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            Self::Live
        } else {
            Self::Poll(interval)
        }
    }
}

pub struct Orchestrator<R, M> {
    pipeline: Pipeline<R, M>,
    mode: DeliveryMode,
}

impl<R: Recognizer, M: Merger> Orchestrator<R, M> {
    pub fn new(pipeline: Pipeline<R, M>, mode: DeliveryMode) -> Self {
        Self { pipeline, mode }
    }

    pub fn pipeline(&self) -> &Pipeline<R, M> {
        &self.pipeline
    }

    /// Load state, catch up on offline arrivals, then deliver forever.
    pub async fn run(mut self) -> Result<()> {
        self.pipeline.restore().await?;
        let output_dir = &self.pipeline.config().output_dir;
        if let Err(e) = recognize::purge_stale_scratch(output_dir).await {
            warn!(dir = %output_dir.display(), "could not clean stale scratch directories: {}", e);
        }

        match self.mode {
            DeliveryMode::Live => self.run_live().await,
            DeliveryMode::Poll(interval) => {
                self.pipeline.reconcile().await?;
                info!("entering polling loop, interval {:?}", interval);
                self.drive(PollSource::new(interval)).await
            }
        }
    }

    #[cfg(feature = "live-watcher")]
    async fn run_live(&mut self) -> Result<()> {
        // Register before the catch-up scan so nothing created during it is missed.
        let source = crate::source::LiveSource::watch(&self.pipeline.config().watch_dir)?;
        self.pipeline.reconcile().await?;
        info!("entering live event loop");
        self.drive(source).await
    }

    #[cfg(not(feature = "live-watcher"))]
    async fn run_live(&mut self) -> Result<()> {
        Err(crate::error::DuplexError::LiveUnavailable)
    }

    /// Handle deliveries one at a time until the source is exhausted.
    pub async fn drive<S: CandidateSource>(&mut self, mut source: S) -> Result<()> {
        while let Some(delivery) = source.next_delivery().await? {
            match delivery {
                Delivery::Candidate(path) => {
                    self.pipeline.process_candidate(&path).await?;
                }
                Delivery::Rescan => {
                    self.pipeline.reconcile().await?;
                }
            }
        }
        Ok(())
    }
}
