//! Waits for a candidate to be fully written before it is accepted.

use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::CandidateError;

/// Retry budget for files that show up before their content does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(5),
        }
    }
}

/// Poll `path` until it is a non-empty regular file. Returns its size.
///
/// A file that disappears at any point is [`CandidateError::Vanished`]; one
/// that stays empty for the whole budget is [`CandidateError::NotReady`].
pub async fn wait_until_ready(
    path: &Path,
    policy: &ReadinessPolicy,
) -> Result<u64, CandidateError> {
    for attempt in 1..=policy.attempts {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| CandidateError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(CandidateError::NotAFile(path.to_path_buf()));
        }
        if metadata.len() > 0 {
            return Ok(metadata.len());
        }

        if attempt < policy.attempts {
            warn!(
                path = %path.display(),
                attempt,
                "file has zero length, probably not written yet; retrying in {:?}",
                policy.delay
            );
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(CandidateError::NotReady {
        path: path.to_path_buf(),
        attempts: policy.attempts,
    })
}
