//! Reconciliation report types.

use serde::{Deserialize, Serialize};

use crate::core::EntityKind;

/// Source vs. target comparison for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindValidation {
    pub entity_kind: EntityKind,

    /// Source records matching the job's filter, re-counted after the run.
    pub source_count: u64,

    /// Documents in the kind's target collection.
    pub target_count: u64,

    /// Source records that can never reach the target (rejected by the
    /// field mapper during this run).
    pub intentional_exclusions: u64,

    /// `target_count == source_count - intentional_exclusions`
    pub matched: bool,
}

impl KindValidation {
    pub fn new(
        entity_kind: EntityKind,
        source_count: u64,
        target_count: u64,
        intentional_exclusions: u64,
    ) -> Self {
        Self {
            entity_kind,
            source_count,
            target_count,
            intentional_exclusions,
            matched: target_count == source_count.saturating_sub(intentional_exclusions),
        }
    }

    /// Target documents expected from the source.
    pub fn expected(&self) -> u64 {
        self.source_count.saturating_sub(self.intentional_exclusions)
    }

    /// Signed difference between the target and what was expected.
    pub fn difference(&self) -> i64 {
        self.target_count as i64 - self.expected() as i64
    }
}

/// Reconciliation of every migrated kind. Advisory only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub entries: Vec<KindValidation>,

    /// Whether every entry matched.
    pub matched: bool,
}

impl ValidationReport {
    pub fn new(entries: Vec<KindValidation>) -> Self {
        let matched = entries.iter().all(|e| e.matched);
        Self { entries, matched }
    }

    /// Entry for `kind`.
    pub fn entry(&self, kind: EntityKind) -> Option<&KindValidation> {
        self.entries.iter().find(|e| e.entity_kind == kind)
    }

    /// Entries that did not match.
    pub fn mismatches(&self) -> impl Iterator<Item = &KindValidation> {
        self.entries.iter().filter(|e| !e.matched)
    }
}
