use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CandidateSource, Delivery};
use crate::error::{DuplexError, Result};

/// Filesystem notifications for files created in (or renamed into) one directory.
///
/// The watcher thread only enqueues; deliveries are taken one at a time by
/// whoever drives the source.
pub struct LiveSource {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    pending: VecDeque<PathBuf>,
}

impl std::fmt::Debug for LiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSource")
            .field("dir", &self.dir)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl LiveSource {
    /// Start watching `dir`. Events are buffered from this point on.
    pub fn watch(dir: &Path) -> Result<Self> {
        let watch_err = |e: notify::Error| DuplexError::Watcher {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver only goes away when the source is dropped.
            let _ = tx.send(res);
        })
        .map_err(watch_err)?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(watch_err)?;

        info!(dir = %dir.display(), "watching for new files");
        Ok(Self::from_parts(dir, watcher, rx))
    }

    fn from_parts(
        dir: &Path,
        watcher: RecommendedWatcher,
        rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    ) -> Self {
        Self {
            dir: dir.to_path_buf(),
            _watcher: watcher,
            rx,
            pending: VecDeque::new(),
        }
    }
}

impl CandidateSource for LiveSource {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Ok(Some(Delivery::Candidate(path)));
            }

            match self.rx.recv().await {
                Some(Ok(event)) if is_arrival(&event.kind) => {
                    debug!(?event, "arrival event");
                    self.pending
                        .extend(event.paths.into_iter().filter(|p| !is_hidden(p)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("watcher error, falling back to a rescan: {}", e);
                    return Ok(Some(Delivery::Rescan));
                }
                None => {
                    return Err(DuplexError::Watcher {
                        path: self.dir.clone(),
                        reason: "event stream closed".to_string(),
                    });
                }
            }
        }
    }
}

fn is_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
    )
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}
