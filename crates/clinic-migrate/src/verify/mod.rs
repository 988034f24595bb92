//! Post-run reconciliation of source and target counts.
//!
//! For every kind in the result, the source is re-counted with the job's
//! filter and compared with the size of the target collection, allowing for
//! records the field mapper rejected. Reconciliation is read-only: a mismatch
//! is reported, never corrected.

pub mod types;

pub use types::{KindValidation, ValidationReport};

use std::sync::Arc;

use crate::config::JobConfig;
use crate::error::Result;
use crate::orchestrator::{MigrationLog, MigrationResult};
use crate::source::SourceReader;
use crate::target::TargetWriter;

/// Compares source and target after a run.
pub struct Reconciler {
    job: Arc<JobConfig>,
    source: Arc<dyn SourceReader>,
    target: Arc<dyn TargetWriter>,
    log: MigrationLog,
}

impl Reconciler {
    pub fn new(
        job: Arc<JobConfig>,
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetWriter>,
        log: MigrationLog,
    ) -> Self {
        Self {
            job,
            source,
            target,
            log,
        }
    }

    /// Build the validation report for `result`.
    pub async fn reconcile(&self, result: &MigrationResult) -> Result<ValidationReport> {
        let mut entries = Vec::with_capacity(result.entities.len());

        for (kind, stats) in &result.entities {
            let kind = *kind;
            let source_count = self.source.count(kind, self.job.filter_for(kind)).await?;
            let target_count = self.target.count(kind).await?;
            let entry = KindValidation::new(
                kind,
                source_count,
                target_count,
                stats.transform_failures(),
            );

            if entry.matched {
                self.log.info(
                    Some(kind),
                    format!(
                        "reconciled: source={} target={} excluded={} (match)",
                        source_count, target_count, entry.intentional_exclusions
                    ),
                );
            } else if result.dry_run {
                self.log.info(
                    Some(kind),
                    format!(
                        "dry run: source={} target={} (target not written)",
                        source_count, target_count
                    ),
                );
            } else {
                self.log.warn(
                    Some(kind),
                    format!(
                        "reconciled: source={} target={} excluded={} (MISMATCH, {:+})",
                        source_count,
                        target_count,
                        entry.intentional_exclusions,
                        entry.difference()
                    ),
                );
            }
            entries.push(entry);
        }

        Ok(ValidationReport::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityKind, SourceRecord};
    use crate::orchestrator::EntityStats;
    use crate::source::MemorySource;
    use crate::target::MemoryTarget;
    use serde_json::json;

    #[tokio::test]
    async fn test_extra_target_documents_are_a_mismatch() {
        let source = MemorySource::with_records(vec![SourceRecord::from_json(
            EntityKind::User,
            json!({"objectId": "u1"}),
        )]);
        let target = MemoryTarget::new();
        let log = MigrationLog::new();
        let reconciler = Reconciler::new(
            Arc::new(JobConfig::new()),
            Arc::new(source),
            Arc::new(target),
            log.clone(),
        );

        let mut result = MigrationResult::empty(false);
        result
            .entities
            .insert(EntityKind::User, EntityStats::new(EntityKind::User));

        let report = reconciler.reconcile(&result).await.unwrap();
        assert!(!report.matched);
        let entry = report.entry(EntityKind::User).unwrap();
        assert_eq!(entry.source_count, 1);
        assert_eq!(entry.target_count, 0);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.message.contains("MISMATCH")));
    }
}
