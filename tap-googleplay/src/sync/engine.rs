//! The sync engine state machine.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use super::checkpoint::{CheckpointStore, RunState};
use super::{step_size, ReportJob, StreamCounts, SyncPhase, SyncSummary};
use crate::catalog::Stream;
use crate::context::TapContext;
use crate::dates::{format_bookmark, format_record_timestamp};
use crate::error::Result;
use crate::report::{decode_report, RecordShaper};
use crate::sink::MessageSink;
use crate::sources::{report_key, BlobSource};

/// Drives fetch, decode, shape, emit and checkpoint for every day step.
///
/// The engine is the only writer of checkpoint state. A cursor advances
/// only after every record of its step was emitted, so an aborted run
/// resumes at the first step that did not complete.
pub struct SyncEngine<'a, S: MessageSink + ?Sized> {
    ctx: &'a TapContext,
    source: &'a dyn BlobSource,
    sink: &'a mut S,
    checkpoints: CheckpointStore,
    counts: BTreeMap<String, StreamCounts>,
    phase: SyncPhase,
    steps: usize,
}

impl<'a, S: MessageSink + ?Sized> SyncEngine<'a, S> {
    /// Creates an engine resuming from `state`.
    pub fn new(
        ctx: &'a TapContext,
        source: &'a dyn BlobSource,
        sink: &'a mut S,
        state: RunState,
    ) -> Result<Self> {
        let fallback_start = ctx.config().start_date()?;
        Ok(Self {
            ctx,
            source,
            sink,
            checkpoints: CheckpointStore::new(state, fallback_start),
            counts: BTreeMap::new(),
            phase: SyncPhase::Init,
            steps: 0,
        })
    }

    /// `Done` or `Error` once `run` has returned.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Runs every job to completion or to the first fatal error.
    #[instrument(skip_all, fields(started_at = %format_bookmark(&self.ctx.started_at())))]
    pub async fn run(&mut self) -> Result<SyncSummary> {
        let outcome = self.drive().await;
        self.log_counts();
        match outcome {
            Ok(()) => {
                self.phase = SyncPhase::Done;
                info!(steps = self.steps, "Sync finished");
                Ok(SyncSummary {
                    counts: self.counts.clone(),
                    steps: self.steps,
                    state: self.checkpoints.state().clone(),
                })
            }
            Err(e) => {
                let failed_in = self.phase;
                self.phase = SyncPhase::Error;
                error!(phase = %failed_in, steps = self.steps, error = %e, "Sync aborted");
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let jobs = self.ctx.jobs();
        info!(source = %self.source.description(), jobs = jobs.len(), "Starting sync");
        self.init(&jobs)?;
        for job in &jobs {
            self.sync_job(job).await?;
        }
        // final durability flush
        self.checkpoints.flush(&mut *self.sink)
    }

    /// Declares schemas and zeroes counters.
    ///
    /// Selected streams are declared, as is every stream a job drives so its
    /// records never arrive undeclared.
    fn init(&mut self, jobs: &[ReportJob]) -> Result<()> {
        self.phase = SyncPhase::Init;
        let registry = self.ctx.registry();
        for job in jobs {
            registry.resolve(&job.stream)?;
        }
        let driven: BTreeSet<&str> = jobs.iter().map(|job| job.stream.as_str()).collect();

        for stream in registry.streams() {
            if !stream.selected && !driven.contains(stream.id.as_str()) {
                debug!(stream = %stream.id, "Skipping unselected stream");
                continue;
            }
            self.sink
                .write_schema(&stream.id, &stream.raw_schema, &stream.key_properties)?;
            self.counts.insert(stream.id.clone(), StreamCounts::default());
        }
        Ok(())
    }

    /// Reads the stream's cursor and restates it as its bookmark.
    fn prime(&mut self, job: &ReportJob) -> Result<DateTime<Utc>> {
        self.phase = SyncPhase::Prime;
        let cursor = self.checkpoints.get(&job.stream)?;
        self.checkpoints.record(&job.stream, &cursor);
        info!(
            stream = %job.stream,
            cursor = %format_bookmark(&cursor),
            "Resuming from checkpoint"
        );
        Ok(cursor)
    }

    async fn sync_job(&mut self, job: &ReportJob) -> Result<()> {
        let ctx = self.ctx;
        let stream = ctx.registry().resolve(&job.stream)?;
        let extraction_time = ctx.started_at();

        let mut cursor = self.prime(job)?;
        while cursor + step_size() <= extraction_time {
            cursor = self.step(job, stream, cursor).await?;
        }
        debug!(
            stream = %job.stream,
            cursor = %format_bookmark(&cursor),
            "Cursor caught up with extraction time"
        );
        Ok(())
    }

    /// Processes one day step and returns the advanced cursor.
    #[instrument(skip_all, fields(stream = %job.stream, cursor = %format_bookmark(&cursor)))]
    async fn step(
        &mut self,
        job: &ReportJob,
        stream: &Stream,
        cursor: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.phase = SyncPhase::Step;
        let package_name = &self.ctx.config().package_name;
        let key = report_key(&job.report_type, package_name, &cursor, &job.dimension);

        let bytes = self.source.fetch(&key).await?;
        let report = decode_report(&bytes)?;

        let shaper = RecordShaper::new(job.dimension.as_str(), &stream.schema);
        let time_extracted = format_record_timestamp(&self.ctx.started_at());
        for row in &report.rows {
            let record = shaper.shape(row, &report.header)?;
            self.sink.write_record(&stream.id, record, &time_extracted)?;
            self.counts.entry(stream.id.clone()).or_default().new += 1;
        }

        let next = cursor + step_size();
        self.checkpoints.advance(&stream.id, &next, &mut *self.sink)?;
        self.steps += 1;
        info!(key = %key, rows = report.len(), next = %format_bookmark(&next), "Step complete");
        Ok(next)
    }

    fn log_counts(&self) {
        info!("------------------");
        for (stream, counts) in &self.counts {
            info!("{}: {} new, {} updates", stream, counts.new, counts.updated);
        }
        info!("------------------");
    }
}
