//! # Duplex
//!
//! Watches an inbox directory for scanned documents, runs each through a text
//! recognizer, and collates two scans that arrive close together into one
//! double-sided document.
//!
//! ## Overview
//!
//! A scanner without a duplex unit produces the front pages of a stack, then
//! (after the stack is flipped) the back pages in reverse order. This crate
//! treats two files that land within a minute of each other as such a pair.
//!
//! - Each new file is waited on until it is non-empty, recognized once per
//!   configured language, and moved into its own output directory.
//! - If the previous file arrived less than the pairing window earlier, the
//!   two outputs are merged into a `_collated` document.
//! - The last two records are persisted after every file, so a restart
//!   resumes exactly after the last processed arrival.
//!
//! ## Output Layout
//!
//! ```text
//! <output-root>/
//! ├── .duplex-state.json
//! ├── 2024-03-01T10_15_02/
//! │   ├── 2024-03-01_eng.pdf
//! │   ├── 2024-03-01_deu.pdf
//! │   ├── 2024-03-01_eng_collated.pdf
//! │   └── 2024-03-01_deu_collated.pdf
//! └── 2024-03-01T10_15_31/
//!     ├── 2024-03-01_eng.pdf
//!     └── 2024-03-01_deu.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duplex::{DeliveryMode, OcrMyPdf, Orchestrator, Pipeline, PipelineConfig, Qpdf};
//! use std::time::Duration;
//!
//! # async fn run() -> duplex::Result<()> {
//! let config = PipelineConfig::new("/input", "/out");
//! let pipeline = Pipeline::new(config, OcrMyPdf::default(), Qpdf::default());
//!
//! Orchestrator::new(pipeline, DeliveryMode::Poll(Duration::from_secs(30)))
//!     .run()
//!     .await
//! # }
//! ```

pub mod error;
pub mod orchestrator;
pub mod pairing;
pub mod pipeline;
pub mod readiness;
pub mod recognize;
pub mod reconcile;
pub mod record;
pub mod source;
pub mod state;
pub mod sweep;
pub mod tools;

pub use error::{CandidateError, DuplexError, Result};
pub use orchestrator::{DeliveryMode, Orchestrator};
pub use pairing::PairingPolicy;
pub use pipeline::{Outcome, Pipeline, PipelineConfig};
pub use readiness::ReadinessPolicy;
pub use record::{DocumentRecord, PairWindow, PairingOutcome};
#[cfg(feature = "live-watcher")]
pub use source::LiveSource;
pub use source::{CandidateSource, Delivery, PollSource, ScriptedSource};
pub use state::StateStore;
pub use sweep::{SweepConfig, SweepStats};
pub use tools::{Merger, OcrMyPdf, Qpdf, Recognizer, ToolError};
