//! Incremental sync: partition cursor, checkpoints and the step loop.
//!
//! ## Architecture
//!
//! - `CheckpointStore`: cursor per stream, written through to the sink
//! - `SyncEngine`: walks day steps from the cursor up to the run's start
//!   instant, fetching and decoding the month's report for every step
//!
//! ## Example
//!
//! ```rust,no_run
//! use tap_googleplay::prelude::*;
//!
//! # async fn example(config: TapConfig) -> Result<()> {
//! let ctx = TapContext::new(config, StreamRegistry::builtin()?);
//! let source = ObjectStoreSource::in_memory();
//! let mut sink = WriterSink::stdout();
//!
//! let summary = SyncEngine::new(&ctx, &source, &mut sink, RunState::default())?
//!     .run()
//!     .await?;
//! println!("{} steps", summary.steps);
//! # Ok(())
//! # }
//! ```

mod checkpoint;
mod engine;


use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;

pub use checkpoint::{CheckpointStore, RunState, StreamBookmark, START_DATE_KEY};
pub use engine::SyncEngine;

/// Stream whose reports are synced.
pub const INSTALLS_STREAM: &str = "installs";

/// Distance between two consecutive cursors.
pub fn step_size() -> Duration {
    Duration::days(1)
}

/// One report family synced into one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportJob {
    /// Target stream id
    pub stream: String,
    /// Report family in the object key, e.g. `installs`
    pub report_type: String,
    /// Dimension injected as `dimension_name`
    pub dimension: String,
}

impl ReportJob {
    pub fn installs(dimension: impl Into<String>) -> Self {
        Self {
            stream: INSTALLS_STREAM.to_string(),
            report_type: INSTALLS_STREAM.to_string(),
            dimension: dimension.into(),
        }
    }
}

/// Where the engine is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Init,
    Prime,
    Step,
    Done,
    Error,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Prime => "prime",
            Self::Step => "step",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Per-stream counters for end-of-run reporting. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamCounts {
    pub new: u64,
    pub updated: u64,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub counts: BTreeMap<String, StreamCounts>,
    /// Day steps completed across all jobs
    pub steps: usize,
    /// State as last flushed
    pub state: RunState,
}
