//! Candidate delivery.
//!
//! Two interchangeable sources feed the same pipeline: [`LiveSource`] reports
//! each new file as it appears, [`PollSource`] asks for a directory rescan on a
//! fixed interval.

#[cfg(feature = "live-watcher")]
mod live;

#[cfg(feature = "live-watcher")]
pub use live::LiveSource;

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// One unit of work handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A specific file appeared.
    Candidate(PathBuf),
    /// Compare the whole directory against the resume point.
    Rescan,
}

pub trait CandidateSource {
    /// Wait for the next delivery. `None` means the source is exhausted.
    fn next_delivery(&mut self) -> impl Future<Output = Result<Option<Delivery>>> + Send;
}

/// Sleeps for `interval`, then requests a rescan. Never exhausts.
#[derive(Debug, Clone)]
pub struct PollSource {
    interval: Duration,
}

impl PollSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl CandidateSource for PollSource {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        tokio::time::sleep(self.interval).await;
        Ok(Some(Delivery::Rescan))
    }
}

/// A fixed list of deliveries, exhausted once drained.
///
/// Feeds [`Orchestrator::drive`](crate::Orchestrator::drive) from a recorded or
/// hand-written sequence; the test suite uses it in place of a watcher.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    deliveries: VecDeque<Delivery>,
}

impl ScriptedSource {
    pub fn new(deliveries: impl IntoIterator<Item = Delivery>) -> Self {
        Self {
            deliveries: deliveries.into_iter().collect(),
        }
    }
}

impl CandidateSource for ScriptedSource {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        Ok(self.deliveries.pop_front())
    }
}
