//! Decides whether two adjacent records are the two sides of one document,
//! and merges their outputs when they are.

use std::time::Duration;
use tracing::{error, info};

use crate::record::{DocumentRecord, PairingOutcome};
use crate::tools::Merger;

/// Arrivals closer than `window` are treated as front and back of one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingPolicy {
    pub window: Duration,
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
        }
    }
}

impl PairingPolicy {
    pub fn should_pair(&self, previous: &DocumentRecord, current: &DocumentRecord) -> bool {
        current.gap(previous) < self.window
    }
}

/// Merge `previous` (front pages) with `current` (back pages) for each language.
///
/// The result is written next to the previous record's outputs with a
/// `_collated` marker. Failures are logged and never touch the standalone
/// outputs. The returned outcome is also stored on `current`.
pub async fn pair<M: Merger>(
    merger: &M,
    policy: &PairingPolicy,
    previous: Option<&DocumentRecord>,
    current: &mut DocumentRecord,
    languages: &[String],
) -> PairingOutcome {
    let outcome = match previous {
        Some(previous) if policy.should_pair(previous, current) => {
            merge_pair(merger, previous, current, languages).await
        }
        _ => PairingOutcome::Standalone,
    };
    current.pairing = outcome;
    outcome
}

async fn merge_pair<M: Merger>(
    merger: &M,
    previous: &DocumentRecord,
    current: &DocumentRecord,
    languages: &[String],
) -> PairingOutcome {
    info!(
        front = %previous.source_path.display(),
        back = %current.source_path.display(),
        "collating double-sided scan"
    );

    let mut outcome = PairingOutcome::Merged;
    for language in languages {
        let paths = (
            previous.output_file(language, false),
            current.output_file(language, false),
            previous.output_file(language, true),
        );
        let (Some(front), Some(back), Some(output)) = paths else {
            error!(%language, "cannot collate: output of one side was never placed");
            outcome = PairingOutcome::MergeFailed;
            continue;
        };

        if let Err(e) = merger.collate(&front, &back, &output).await {
            error!(
                %language,
                front = %front.display(),
                back = %back.display(),
                "failed to collate: {}",
                e
            );
            outcome = PairingOutcome::MergeFailed;
        }
    }
    outcome
}
