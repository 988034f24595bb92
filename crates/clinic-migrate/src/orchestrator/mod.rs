//! Migration orchestrator - drives every selected entity kind end to end.

mod log;
mod result;
mod runner;

pub use log::{LogEntry, LogLevel, MigrationLog};
pub use result::{
    BatchReport, EntityStats, KindPhase, MigrationResult, RecordFailure, RunStatus, Totals,
};
pub use runner::{KindOutcome, KindRunner};

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::JobConfig;
use crate::core::EntityKind;
use crate::error::{MigrateError, Result};
use crate::source::SourceReader;
use crate::target::TargetWriter;
use crate::verify::Reconciler;

/// Migration orchestrator.
pub struct Orchestrator {
    job: Arc<JobConfig>,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetWriter>,
}

impl Orchestrator {
    /// Create a new orchestrator for `job`, validating it first.
    pub fn new(
        job: JobConfig,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetWriter>,
    ) -> Result<Self> {
        let mut job = job;
        job.dedup_entity_types();
        job.validate()?;
        Ok(Self {
            job: Arc::new(job),
            source,
            target,
        })
    }

    /// The job being run.
    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    /// Run the migration.
    ///
    /// Returns the complete result, or [`MigrateError::Aborted`] carrying the
    /// partial result when a store became unavailable. Cancelling `cancel`
    /// stops every kind at its next page boundary; the returned result then
    /// has `cancelled` set.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let log = MigrationLog::new();
        let abort = cancel.child_token();

        info!("Starting migration run: {}", run_id);
        log.info(
            None,
            format!(
                "run {} started: kinds [{}], batch size {}, skip existing {}, dry run {}, {}",
                run_id,
                self.job
                    .entity_types
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.job.batch_size,
                self.job.skip_existing,
                self.job.dry_run,
                if self.job.concurrent { "concurrent" } else { "sequential" }
            ),
        );

        let mut result = MigrationResult::empty(self.job.dry_run);
        result.run_id = run_id;
        result.job_fingerprint = self.job.fingerprint();
        result.started_at = started_at;
        for kind in &self.job.entity_types {
            result.entities.insert(*kind, EntityStats::new(*kind));
        }

        let fatal = if self.job.concurrent {
            self.run_concurrent(&log, &abort, &mut result).await
        } else {
            self.run_sequential(&log, &abort, &mut result).await
        };

        result.cancelled = cancel.is_cancelled();
        if fatal.is_none() && !result.cancelled {
            for stats in result.entities.values_mut() {
                stats.enter(KindPhase::Reconciling);
            }
            let reconciler = Reconciler::new(
                self.job.clone(),
                self.source.clone(),
                self.target.clone(),
                log.clone(),
            );
            match reconciler.reconcile(&result).await {
                Ok(report) => result.validation = Some(report),
                Err(e) => {
                    log.warn(None, format!("reconciliation failed: {}", e));
                }
            }
        }
        for stats in result.entities.values_mut() {
            stats.enter(KindPhase::Done);
        }

        if let Some(e) = &fatal {
            result.fatal_error = Some(e.to_string());
        }
        result.status = result.derive_status();
        result.completed_at = Utc::now();
        result.duration_seconds =
            (result.completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let totals = result.totals();
        log.info(
            None,
            format!(
                "run {:?}: {} migrated, {} skipped, {} errors of {} in {:.1}s",
                result.status,
                totals.migrated,
                totals.skipped,
                totals.errors,
                totals.total,
                result.duration_seconds
            ),
        );
        result.log = log.entries();

        if let Some(path) = &self.job.report_path {
            if let Err(e) = result.write_report(path) {
                tracing::warn!("Failed to write report to {:?}: {}", path, e);
            } else {
                info!("Report written to {:?}", path);
            }
        }

        match fatal {
            Some(cause) => Err(MigrateError::Aborted {
                cause: Box::new(cause),
                partial: Box::new(result),
            }),
            None => Ok(result),
        }
    }

    fn runner(&self, kind: EntityKind, log: &MigrationLog, abort: &CancellationToken) -> KindRunner {
        KindRunner {
            kind,
            job: self.job.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            log: log.clone(),
            cancel: abort.clone(),
        }
    }

    /// Kinds one after another, in configured order. Stops at the first fatal error.
    async fn run_sequential(
        &self,
        log: &MigrationLog,
        abort: &CancellationToken,
        result: &mut MigrationResult,
    ) -> Option<MigrateError> {
        for kind in self.job.entity_types.iter().copied() {
            let runner = self.runner(kind, log, abort);
            let mut stats = EntityStats::new(kind);
            let outcome = runner.run(&mut stats).await;
            result.entities.insert(kind, stats);

            match outcome {
                Ok(KindOutcome::Completed) => {}
                Ok(KindOutcome::Cancelled) => break,
                Err(e) => return Some(e),
            }
        }
        None
    }

    /// One task per kind. The first fatal error or failed task cancels the
    /// others while they are still running.
    async fn run_concurrent(
        &self,
        log: &MigrationLog,
        abort: &CancellationToken,
        result: &mut MigrationResult,
    ) -> Option<MigrateError> {
        let mut tasks: FuturesUnordered<_> = self
            .job
            .entity_types
            .iter()
            .copied()
            .map(|kind| {
                let runner = self.runner(kind, log, abort);
                let handle = tokio::spawn(async move {
                    let mut stats = EntityStats::new(kind);
                    let outcome = runner.run(&mut stats).await;
                    (stats, outcome)
                });
                async move { (kind, handle.await) }
            })
            .collect();

        let mut fatal = None;
        while let Some((kind, joined)) = tasks.next().await {
            match joined {
                Ok((stats, outcome)) => {
                    result.entities.insert(kind, stats);
                    if let Err(e) = outcome {
                        fatal.get_or_insert(e);
                    }
                }
                Err(e) => {
                    log.error(Some(kind), format!("task failed: {}", e));
                    abort.cancel();
                    fatal.get_or_insert(MigrateError::Task(format!("{}: {}", kind, e)));
                }
            }
        }
        fatal
    }
}
