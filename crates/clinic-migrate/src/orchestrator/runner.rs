//! Batch loop for a single entity kind.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::log::MigrationLog;
use super::result::{BatchReport, EntityStats, KindPhase, RecordFailure};
use crate::config::JobConfig;
use crate::core::{EntityKind, TargetId, TargetRecord};
use crate::error::Result;
use crate::mapping::map_record;
use crate::source::SourceReader;
use crate::target::TargetWriter;

/// How a kind's loop ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindOutcome {
    /// Every page was processed.
    Completed,
    /// The cancellation token fired before the last page.
    Cancelled,
}

/// Drives one entity kind through paginate, transform, commit and pace.
pub struct KindRunner {
    pub kind: EntityKind,
    pub job: Arc<JobConfig>,
    pub source: Arc<dyn SourceReader>,
    pub target: Arc<dyn TargetWriter>,
    pub log: MigrationLog,
    /// Fires on caller cancellation or when any kind hits a fatal error.
    pub cancel: CancellationToken,
}

/// Counters for one page, folded into [`EntityStats`] only once the page is
/// fully processed so an abandoned page leaves no trace in the totals.
#[derive(Default)]
struct PageTally {
    migrated: u64,
    skipped: u64,
    warnings: u64,
    failures: Vec<RecordFailure>,
}

impl KindRunner {
    /// Run the loop, updating `stats` after every completed page.
    ///
    /// Returns `Err` only for fatal store errors; the abort token is cancelled
    /// first so sibling kinds stop at their next page.
    pub async fn run(&self, stats: &mut EntityStats) -> Result<KindOutcome> {
        match self.run_pages(stats).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.log
                    .error(Some(self.kind), format!("fatal error, aborting: {}", e));
                self.cancel.cancel();
                Err(e)
            }
        }
    }

    async fn run_pages(&self, stats: &mut EntityStats) -> Result<KindOutcome> {
        let kind = self.kind;
        if self.cancel.is_cancelled() {
            self.log.warn(Some(kind), "cancelled before start");
            return Ok(KindOutcome::Cancelled);
        }

        let filter = self.job.filter_for(kind);
        stats.enter(KindPhase::Paginating);
        let total = self.source.count(kind, filter).await?;
        stats.total = total;
        self.log.info(
            Some(kind),
            format!(
                "{} records to migrate into '{}' ({} source)",
                total,
                kind.target_collection(),
                self.source.store_type()
            ),
        );

        let batch_size = self.job.batch_size as u64;
        let mut skip = 0u64;
        while skip < total {
            if self.cancel.is_cancelled() {
                self.log
                    .warn(Some(kind), format!("cancelled at skip {} of {}", skip, total));
                return Ok(KindOutcome::Cancelled);
            }

            let limit = batch_size.min(total - skip);
            stats.enter(KindPhase::Paginating);
            let mut page = self.source.page(kind, filter, skip, limit as usize).await?;
            if page.is_empty() {
                self.log.warn(
                    Some(kind),
                    format!("source returned an empty page at skip {}; stopping", skip),
                );
                break;
            }
            page.truncate(limit as usize);

            stats.enter(KindPhase::Transforming);
            let mut report = BatchReport {
                skip,
                fetched: page.len(),
                ..BatchReport::default()
            };
            let mut tally = PageTally::default();
            let mut staged: Vec<TargetRecord> = Vec::with_capacity(page.len());

            for record in &page {
                if self.job.skip_existing {
                    if let Some(id) = TargetId::from_source(&record.source_id) {
                        if self.target.exists(kind, &id).await? {
                            tally.skipped += 1;
                            continue;
                        }
                    }
                }

                match map_record(record) {
                    Ok(mapped) => {
                        for warning in &mapped.warnings {
                            tally.warnings += 1;
                            self.log.warn(
                                Some(kind),
                                format!("record {}: {}", mapped.source_id, warning),
                            );
                        }
                        staged.push(mapped);
                    }
                    Err(e) => {
                        self.log.warn(Some(kind), e.to_string());
                        report.transform_failures += 1;
                        tally.failures.push(RecordFailure {
                            source_id: e.source_id,
                            field: Some(e.field),
                            reason: e.reason,
                        });
                    }
                }
            }
            report.skipped = tally.skipped as usize;
            report.staged = staged.len();

            if self.cancel.is_cancelled() {
                self.log.warn(
                    Some(kind),
                    format!("cancelled; abandoning uncommitted page at skip {}", skip),
                );
                return Ok(KindOutcome::Cancelled);
            }

            if self.job.dry_run {
                tally.migrated += staged.len() as u64;
            } else if !staged.is_empty() {
                stats.enter(KindPhase::Committing);
                let staged_ids: Vec<String> =
                    staged.iter().map(|r| r.source_id.clone()).collect();
                let outcome = self.target.commit(kind, staged).await?;
                if let Some(batch_error) = &outcome.batch_error {
                    // Whole batch failed, whatever ids the writer listed.
                    self.log.error(
                        Some(kind),
                        format!(
                            "batch at skip {} rejected ({} records): {}",
                            skip,
                            staged_ids.len(),
                            batch_error
                        ),
                    );
                    for id in staged_ids {
                        tally.failures.push(RecordFailure {
                            source_id: id,
                            field: None,
                            reason: batch_error.clone(),
                        });
                    }
                } else {
                    // Only ids from this batch count, each once.
                    let mut not_written: Vec<&String> = Vec::new();
                    for id in &outcome.failed_record_ids {
                        if staged_ids.contains(id) && !not_written.contains(&id) {
                            not_written.push(id);
                        }
                    }
                    let written = outcome
                        .committed
                        .min(staged_ids.len() - not_written.len());
                    tally.migrated += written as u64;
                    for id in not_written {
                        self.log
                            .warn(Some(kind), format!("record {}: not written by target", id));
                        tally.failures.push(RecordFailure {
                            source_id: id.clone(),
                            field: None,
                            reason: "not written by target".to_string(),
                        });
                    }
                }
                report.outcome = Some(outcome);
            }

            let batch_no = stats.batches.len() + 1;
            self.log.info(
                Some(kind),
                format!(
                    "batch {}: {} {}, {} skipped, {} errors",
                    batch_no,
                    tally.migrated,
                    if self.job.dry_run { "would be written" } else { "written" },
                    tally.skipped,
                    tally.failures.len()
                ),
            );
            stats.migrated += tally.migrated;
            stats.skipped += tally.skipped;
            stats.warnings += tally.warnings;
            stats.errors += tally.failures.len() as u64;
            stats.failures.append(&mut tally.failures);
            stats.batches.push(report);

            skip += limit;
            if skip < total {
                self.pace(stats).await;
            }
        }

        self.log.info(
            Some(kind),
            format!(
                "finished: {} migrated, {} skipped, {} errors of {}",
                stats.migrated, stats.skipped, stats.errors, stats.total
            ),
        );
        Ok(KindOutcome::Completed)
    }

    /// Sleep for the inter-batch delay, waking early on cancellation.
    async fn pace(&self, stats: &mut EntityStats) {
        let delay = self.job.inter_batch_delay();
        if delay.is_zero() {
            return;
        }
        stats.enter(KindPhase::Pacing);
        debug!("{}: pacing for {:?}", self.kind, delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}
