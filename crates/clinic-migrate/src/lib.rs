//! # clinic-migrate
//!
//! Batch migration engine moving clinic records (users, client profiles,
//! professional profiles, appointments) from a legacy document backend into
//! a document database.
//!
//! The engine provides:
//!
//! - **Declarative field mapping** per entity kind, with type conversions,
//!   code lookups and reference rewriting
//! - **Paginated reads** and **batched upserts** behind two narrow traits
//!   ([`SourceReader`], [`TargetWriter`]) so any store can be plugged in
//! - **Idempotent re-runs**: target ids derive from source ids, and
//!   `skip_existing` leaves already migrated documents alone
//! - **Dry runs**, inter-batch pacing and cooperative cancellation
//! - **Reconciliation** of source and target counts and a JSON report
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clinic_migrate::{JobConfig, MemorySource, MemoryTarget, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> clinic_migrate::Result<()> {
//!     let job = JobConfig::load("job.yaml")?;
//!     let source = MemorySource::from_export_dir("export/")?;
//!     let target = Arc::new(MemoryTarget::new());
//!     let orchestrator = Orchestrator::new(job, Arc::new(source), target.clone())?;
//!     let result = orchestrator.run(CancellationToken::new()).await?;
//!     println!("Migrated {} records", result.totals().migrated);
//!     target.save_snapshot("target.json").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod mapping;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod target;
pub mod verify;

// Re-exports for convenient access
pub use crate::config::{EntityFilter, JobConfig};
pub use crate::core::{Document, EntityKind, GeoPoint, SourceRecord, TargetId, TargetRecord, Value};
pub use error::{MigrateError, Result};
pub use mapping::{map_record, FieldMapping, TransformError};
pub use orchestrator::{
    EntityStats, LogEntry, LogLevel, MigrationLog, MigrationResult, Orchestrator, RunStatus,
};
pub use source::{MemorySource, SourceReader};
pub use target::{BatchOutcome, MemoryTarget, TargetWriter};
pub use verify::{KindValidation, ValidationReport};
