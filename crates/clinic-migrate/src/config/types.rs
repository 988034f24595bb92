//! Job configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{EntityKind, SourceRecord, Value};

/// Largest batch a single target round trip accepts.
pub const MAX_BATCH_SIZE: usize = 500;

/// Configuration of one migration run.
///
/// Immutable once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Entity kinds to migrate, in processing order (default: all).
    #[serde(default = "default_entity_types")]
    pub entity_types: Vec<EntityKind>,

    /// Records per page and per committed batch (default: 50).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches in milliseconds (default: 100).
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    /// Skip records whose target document already exists (default: true).
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Compute what would be written without writing (default: false).
    #[serde(default)]
    pub dry_run: bool,

    /// Optional source-side filter, e.g. restrict users to one role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_filter: Option<EntityFilter>,

    /// Run each entity kind in its own task (default: false).
    #[serde(default)]
    pub concurrent: bool,

    /// Write the JSON report here after the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            entity_types: default_entity_types(),
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            skip_existing: true,
            dry_run: false,
            entity_filter: None,
            concurrent: false,
            report_path: None,
        }
    }
}

impl JobConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the run to the given kinds. Duplicates are dropped.
    pub fn with_entity_types(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.entity_types = kinds.into_iter().collect();
        self.dedup_entity_types();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_skip_existing(mut self, enabled: bool) -> Self {
        self.skip_existing = enabled;
        self
    }

    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn with_entity_filter(mut self, filter: EntityFilter) -> Self {
        self.entity_filter = Some(filter);
        self
    }

    pub fn with_concurrent(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Pause applied between two batches of the same kind.
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// The filter that applies to `kind`, if any.
    pub fn filter_for(&self, kind: EntityKind) -> Option<&EntityFilter> {
        self.entity_filter.as_ref().filter(|f| f.applies_to(kind))
    }

    pub(crate) fn dedup_entity_types(&mut self) {
        let mut seen = Vec::with_capacity(self.entity_types.len());
        self.entity_types.retain(|k| {
            if seen.contains(k) {
                false
            } else {
                seen.push(*k);
                true
            }
        });
    }
}

/// Equality filter on a legacy source field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    /// Legacy field name.
    pub field: String,

    /// Value the field must equal. Pointers match on their object id.
    pub equals: Value,

    /// Kinds the filter applies to (empty: every kind).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<EntityKind>,
}

impl EntityFilter {
    pub fn new(field: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: equals.into(),
            kinds: Vec::new(),
        }
    }

    /// Limit the filter to the given kinds.
    pub fn for_kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn applies_to(&self, kind: EntityKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    /// Whether `record` passes the filter.
    pub fn matches(&self, record: &SourceRecord) -> bool {
        match record.field(&self.field) {
            Some(value) => values_equal(value, &self.equals),
            None => self.equals.is_null(),
        }
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            actual.as_f64() == expected.as_f64()
        }
        (Value::Map(m), Value::String(id)) => {
            m.get("objectId").and_then(Value::as_str) == Some(id.as_str())
        }
        _ => actual == expected,
    }
}

fn default_entity_types() -> Vec<EntityKind> {
    EntityKind::ALL.to_vec()
}

fn default_batch_size() -> usize {
    50
}

fn default_inter_batch_delay_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}
