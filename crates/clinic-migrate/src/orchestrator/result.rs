//! Per-kind statistics and the aggregate migration result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::log::LogEntry;
use crate::core::EntityKind;
use crate::target::BatchOutcome;
use crate::verify::ValidationReport;

/// Where a kind's worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindPhase {
    Idle,
    Paginating,
    Transforming,
    Committing,
    Pacing,
    Reconciling,
    Done,
}

/// A record that was not migrated, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub source_id: String,
    /// Field that failed to transform (None for write failures).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: String,
}

/// What happened to one page of source records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Offset of the page in the source.
    pub skip: u64,
    /// Records read from the source.
    pub fetched: usize,
    /// Records skipped because the target already held them.
    pub skipped: usize,
    /// Records rejected by the field mapper.
    pub transform_failures: usize,
    /// Records staged for the commit.
    pub staged: usize,
    /// Writer outcome (None in dry runs or when nothing was staged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BatchOutcome>,
}

/// Counters for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStats {
    pub kind: EntityKind,
    /// Source records selected for migration.
    pub total: u64,
    /// Records written (or that would be written, in a dry run).
    pub migrated: u64,
    /// Records already present in the target.
    pub skipped: u64,
    /// Records that failed to transform or to be written.
    pub errors: u64,
    /// Non-fatal mapping warnings (unknown codes mapped to defaults).
    pub warnings: u64,
    /// One entry per failed record, in processing order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RecordFailure>,
    /// One entry per processed page, in processing order.
    #[serde(default)]
    pub batches: Vec<BatchReport>,
    pub phase: KindPhase,
}

impl EntityStats {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            total: 0,
            migrated: 0,
            skipped: 0,
            errors: 0,
            warnings: 0,
            failures: Vec::new(),
            batches: Vec::new(),
            phase: KindPhase::Idle,
        }
    }

    /// Move to `phase`.
    pub fn enter(&mut self, phase: KindPhase) {
        if self.phase != phase {
            debug!("{}: {:?} -> {:?}", self.kind, self.phase, phase);
            self.phase = phase;
        }
    }

    /// Records accounted for so far.
    pub fn processed(&self) -> u64 {
        self.migrated + self.skipped + self.errors
    }

    /// Whether every selected record has been accounted for.
    pub fn is_balanced(&self) -> bool {
        self.processed() == self.total
    }

    /// Source ids of every failed record.
    pub fn failed_record_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.source_id.as_str()).collect()
    }

    /// Records the field mapper rejected.
    pub fn transform_failures(&self) -> u64 {
        self.batches
            .iter()
            .map(|b| b.transform_failures as u64)
            .sum()
    }

    pub(crate) fn record_failure(
        &mut self,
        source_id: impl Into<String>,
        field: Option<String>,
        reason: impl Into<String>,
    ) {
        self.errors += 1;
        self.failures.push(RecordFailure {
            source_id: source_id.into(),
            field,
            reason: reason.into(),
        });
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
    Cancelled,
    Failed,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Fingerprint of the job configuration.
    pub job_fingerprint: String,

    /// Final status.
    pub status: RunStatus,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Whether the run was cancelled before finishing.
    pub cancelled: bool,

    /// Fatal error that aborted the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Per-kind counters.
    pub entities: BTreeMap<EntityKind, EntityStats>,

    /// Source vs. target reconciliation (absent when cancelled or aborted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,

    /// Timestamped run log.
    pub log: Vec<LogEntry>,
}

/// Counters summed over every kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl MigrationResult {
    /// A result with no kinds processed yet.
    pub fn empty(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: String::new(),
            job_fingerprint: String::new(),
            status: RunStatus::Completed,
            dry_run,
            cancelled: false,
            fatal_error: None,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            entities: BTreeMap::new(),
            validation: None,
            log: Vec::new(),
        }
    }

    /// Counters for `kind`.
    pub fn stats(&self, kind: EntityKind) -> Option<&EntityStats> {
        self.entities.get(&kind)
    }

    /// Counters summed over every kind.
    pub fn totals(&self) -> Totals {
        self.entities.values().fold(Totals::default(), |acc, s| Totals {
            total: acc.total + s.total,
            migrated: acc.migrated + s.migrated,
            skipped: acc.skipped + s.skipped,
            errors: acc.errors + s.errors,
        })
    }

    /// Every failed record across kinds.
    pub fn failures(&self) -> impl Iterator<Item = (EntityKind, &RecordFailure)> {
        self.entities
            .iter()
            .flat_map(|(kind, s)| s.failures.iter().map(move |f| (*kind, f)))
    }

    pub(crate) fn derive_status(&self) -> RunStatus {
        if self.fatal_error.is_some() {
            RunStatus::Failed
        } else if self.cancelled {
            RunStatus::Cancelled
        } else if self.totals().errors > 0 {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        }
    }
}
