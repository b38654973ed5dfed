//! # tap-googleplay - Google Play install reports as a record stream
//!
//! tap-googleplay reads the monthly install reports that the Google Play
//! Console exports into a Cloud Storage bucket and turns them into a stream
//! of `SCHEMA`, `RECORD` and `STATE` messages. Runs are incremental: every
//! completed day step persists a cursor, and the next run resumes from it.
//!
//! ## Overview
//!
//! A run walks day steps from the stored cursor up to the instant the run
//! started. Each step fetches the month's report
//! (`stats/installs/installs_{package}_{yyyymm}_{dimension}.csv`), decodes
//! its UTF-16LE text, reshapes every row to the stream schema and emits the
//! records. Only after the last record of a step has been written does the
//! cursor move forward, so an aborted run never skips data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tap_googleplay::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = TapConfig::from_path("config.json")?;
//! let ctx = TapContext::new(config, StreamRegistry::builtin()?);
//!
//! let source = ObjectStoreSource::local("./reports")?;
//! let mut sink = WriterSink::stdout();
//! let state = RunState::from_path("state.json")?;
//!
//! let summary = SyncEngine::new(&ctx, &source, &mut sink, state)?
//!     .run()
//!     .await?;
//! eprintln!("{} day steps", summary.steps);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`catalog`**: stream schemas, discovery output and the stream registry
//! - **`config`**: the JSON configuration file
//! - **`report`**: UTF-16LE decoding and record shaping
//! - **`sources`**: blob access through `object_store` (GCS, local, in-memory)
//! - **`sink`**: the message stream and its durability flush
//! - **`sync`**: checkpoints and the day-step engine
//! - **`logging`**: `tracing` subscriber setup

pub mod catalog;
pub mod config;
pub mod context;
pub mod dates;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod report;
pub mod sink;
pub mod sources;
pub mod sync;
