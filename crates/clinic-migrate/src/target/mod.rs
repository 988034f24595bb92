//! Target writer: batched upserts into the document database.

pub mod memory;

pub use memory::MemoryTarget;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{EntityKind, TargetId, TargetRecord};
use crate::error::Result;

/// Write transformed records to the target store.
///
/// Records are keyed by their [`TargetId`] in the kind's collection. Writes
/// are create-or-replace: a committed record fully replaces any document
/// with the same id, never patching individual fields.
///
/// # Errors
///
/// Implementations separate two failure classes:
///
/// - the batch was rejected: return `Ok` with [`BatchOutcome::batch_error`]
///   set; every record in the batch counts as failed and the run continues
/// - the store is unreachable or refuses our credentials: return
///   [`crate::MigrateError::TargetUnavailable`], which aborts the job
///
/// Writers never retry on their own.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Upsert `batch` into the collection of `kind` as a single round trip.
    async fn commit(&self, kind: EntityKind, batch: Vec<TargetRecord>) -> Result<BatchOutcome>;

    /// Whether a document with `id` already exists in the collection of `kind`.
    async fn exists(&self, kind: EntityKind, id: &TargetId) -> Result<bool>;

    /// Number of documents in the collection of `kind`.
    async fn count(&self, kind: EntityKind) -> Result<u64>;

    /// Short identifier of the store type, for logging.
    fn store_type(&self) -> &str;
}

/// Result of committing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Records sent in the batch.
    pub attempted: usize,

    /// Records written.
    pub committed: usize,

    /// Source ids of records the store reported as not written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_record_ids: Vec<String>,

    /// Set when the whole batch was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_error: Option<String>,
}

impl BatchOutcome {
    /// Every record in a batch of `attempted` was written.
    pub fn committed(attempted: usize) -> Self {
        Self {
            attempted,
            committed: attempted,
            failed_record_ids: Vec::new(),
            batch_error: None,
        }
    }

    /// The whole batch was rejected.
    pub fn rejected(batch: &[TargetRecord], error: impl Into<String>) -> Self {
        Self {
            attempted: batch.len(),
            committed: 0,
            failed_record_ids: batch.iter().map(|r| r.source_id.clone()).collect(),
            batch_error: Some(error.into()),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.batch_error.is_some()
    }
}
