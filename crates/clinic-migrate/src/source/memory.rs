//! In-memory source store, loadable from legacy JSON exports.
//!
//! The legacy backend exports one JSON file per class, named after the class
//! (`_User.json`, `Appointment.json`, ...), holding a `results` array of
//! objects. [`MemorySource::from_export_dir`] reads such a directory.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::SourceReader;
use crate::config::EntityFilter;
use crate::core::{EntityKind, SourceRecord, Value};
use crate::error::{MigrateError, Result};

/// Source store holding every record in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: HashMap<EntityKind, Vec<SourceRecord>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let mut source = Self::new();
        source.insert_many(records);
        source
    }

    /// Load every `<SourceClass>.json` export found in `dir`.
    ///
    /// Missing files are treated as empty classes.
    pub fn from_export_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut source = Self::new();

        for kind in EntityKind::ALL {
            let path = dir.join(format!("{}.json", kind.source_class()));
            if !path.exists() {
                debug!("No export for {} at {:?}", kind.source_class(), path);
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let json: serde_json::Value = serde_json::from_str(&content)?;
            let objects = match json {
                serde_json::Value::Array(items) => items,
                serde_json::Value::Object(mut obj) => match obj.remove("results") {
                    Some(serde_json::Value::Array(items)) => items,
                    _ => {
                        return Err(MigrateError::Config(format!(
                            "{:?}: expected a 'results' array",
                            path
                        )))
                    }
                },
                _ => {
                    return Err(MigrateError::Config(format!(
                        "{:?}: expected an array or an object with 'results'",
                        path
                    )))
                }
            };
            info!("Loaded {} {} records from {:?}", objects.len(), kind, path);
            source.insert_many(
                objects
                    .into_iter()
                    .map(|obj| SourceRecord::from_json(kind, obj)),
            );
        }

        Ok(source)
    }

    /// Add records, keeping each kind in creation order.
    pub fn insert_many(&mut self, records: impl IntoIterator<Item = SourceRecord>) {
        let mut touched = Vec::new();
        for record in records {
            if !touched.contains(&record.kind) {
                touched.push(record.kind);
            }
            self.records.entry(record.kind).or_default().push(record);
        }
        for kind in touched {
            if let Some(list) = self.records.get_mut(&kind) {
                list.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
            }
        }
    }

    /// Total records of `kind`, ignoring filters.
    pub fn len(&self, kind: EntityKind) -> usize {
        self.records.get(&kind).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.records.values().all(Vec::is_empty)
    }

    fn filtered<'a>(
        &'a self,
        kind: EntityKind,
        filter: Option<&'a EntityFilter>,
    ) -> impl Iterator<Item = &'a SourceRecord> + 'a {
        self.records
            .get(&kind)
            .into_iter()
            .flatten()
            .filter(move |r| filter.map_or(true, |f| f.matches(r)))
    }
}

/// Stable order: creation time first (records without one sort first), then id.
fn sort_key(record: &SourceRecord) -> (Option<DateTime<Utc>>, &str) {
    let created = match record.field("createdAt") {
        Some(Value::Timestamp(dt)) => Some(*dt),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    };
    (created, record.source_id.as_str())
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn count(&self, kind: EntityKind, filter: Option<&EntityFilter>) -> Result<u64> {
        Ok(self.filtered(kind, filter).count() as u64)
    }

    async fn page(
        &self,
        kind: EntityKind,
        filter: Option<&EntityFilter>,
        skip: u64,
        limit: usize,
    ) -> Result<Vec<SourceRecord>> {
        Ok(self
            .filtered(kind, filter)
            .skip(skip as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    fn store_type(&self) -> &str {
        "memory"
    }
}
