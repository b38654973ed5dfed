//! Prelude for commonly used types and traits in tap-googleplay.

pub use crate::catalog::{discover, Catalog, StreamRegistry};
pub use crate::config::TapConfig;
pub use crate::context::TapContext;
pub use crate::error::{FetchErrorKind, Result, TapError};
pub use crate::logging::setup::LoggingConfig;
pub use crate::sink::{MemorySink, Message, MessageSink, WriterSink};
pub use crate::sources::{BlobSource, ObjectStoreSource};
pub use crate::sync::{CheckpointStore, RunState, SyncEngine, SyncSummary};
