//! Per-run context shared by the sync engine and its collaborators.

use chrono::{DateTime, Utc};

use crate::catalog::StreamRegistry;
use crate::config::TapConfig;
use crate::sync::ReportJob;

/// Configuration, stream registry and the run's fixed extraction instant.
///
/// Built once at startup and passed by reference; nothing in it changes
/// during a run.
#[derive(Debug, Clone)]
pub struct TapContext {
    config: TapConfig,
    registry: StreamRegistry,
    started_at: DateTime<Utc>,
}

impl TapContext {
    /// Creates a context whose extraction instant is now.
    pub fn new(config: TapConfig, registry: StreamRegistry) -> Self {
        Self {
            config,
            registry,
            started_at: Utc::now(),
        }
    }

    /// Pins the extraction instant, e.g. for replaying a run.
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// The instant the run began; every record is tagged with it.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Reports driven through sync.
    ///
    /// Always the single installs report for the configured dimension,
    /// whatever the catalog selects.
    pub fn jobs(&self) -> Vec<ReportJob> {
        vec![ReportJob::installs(&self.config.dimension)]
    }
}
