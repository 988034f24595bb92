//! Core domain types for the migration engine.
//!
//! - [`EntityKind`]: the categories of record being migrated
//! - [`Value`] / [`Document`]: document field values on both sides
//! - [`SourceRecord`], [`TargetRecord`], [`TargetId`]: records in flight

pub mod entity;
pub mod record;
pub mod value;

pub use entity::EntityKind;
pub use record::{SourceRecord, TargetId, TargetRecord, SOURCE_ID_FIELD};
pub use value::{Document, GeoPoint, Value};
