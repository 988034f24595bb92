//! Source reader: paginated access to the legacy store.

pub mod memory;

pub use memory::MemorySource;

use async_trait::async_trait;

use crate::config::EntityFilter;
use crate::core::{EntityKind, SourceRecord};
use crate::error::Result;

/// Read records from the legacy store.
///
/// # Ordering
///
/// Within one run, `page` must return records in a stable order (e.g.
/// creation order with the id as tie-breaker), so that paging with an
/// increasing `skip` never repeats or misses a record while the source is
/// not being mutated.
///
/// # Errors
///
/// Connectivity or authorization failures are reported as
/// [`crate::MigrateError::SourceUnavailable`] and abort the whole job.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Number of records of `kind` passing `filter`.
    async fn count(&self, kind: EntityKind, filter: Option<&EntityFilter>) -> Result<u64>;

    /// Up to `limit` records of `kind` passing `filter`, starting at `skip`.
    ///
    /// `limit` is always greater than zero.
    async fn page(
        &self,
        kind: EntityKind,
        filter: Option<&EntityFilter>,
        skip: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>>;

    /// Short identifier of the store type, for logging.
    fn store_type(&self) -> &str;
}
