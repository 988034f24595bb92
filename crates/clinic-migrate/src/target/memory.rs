//! In-memory target store with JSON snapshots.
//!
//! Holds one ordered map of documents per collection. A snapshot can be
//! saved after a run and loaded before the next one, so `skip_existing`
//! sees what earlier runs wrote.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BatchOutcome, TargetWriter};
use crate::core::{Document, EntityKind, TargetId, TargetRecord};
use crate::error::{MigrateError, Result};

type Collection = BTreeMap<TargetId, Document>;

/// Target store holding every document in memory.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    collections: RwLock<HashMap<EntityKind, Collection>>,
    commits: AtomicUsize,
}

impl MemoryTarget {
    /// Create an empty target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryTarget::save_snapshot`].
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, Collection> = serde_json::from_str(&content)?;

        let mut collections = HashMap::new();
        for (name, docs) in raw {
            let kind = EntityKind::ALL
                .into_iter()
                .find(|k| k.target_collection() == name)
                .ok_or_else(|| {
                    MigrateError::Config(format!("Unknown collection in snapshot: {}", name))
                })?;
            collections.insert(kind, docs);
        }

        Ok(Self {
            collections: RwLock::new(collections),
            commits: AtomicUsize::new(0),
        })
    }

    /// Write every collection as pretty JSON (atomic: temp file, then rename).
    pub async fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let collections = self.collections.read().await;
        let named: BTreeMap<&str, &Collection> = collections
            .iter()
            .map(|(kind, docs)| (kind.target_collection(), docs))
            .collect();
        let content = serde_json::to_string_pretty(&named)?;

        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Fetch one document.
    pub async fn get(&self, kind: EntityKind, id: &TargetId) -> Option<Document> {
        self.collections
            .read()
            .await
            .get(&kind)
            .and_then(|c| c.get(id))
            .cloned()
    }

    /// Number of commit round trips served so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TargetWriter for MemoryTarget {
    async fn commit(&self, kind: EntityKind, batch: Vec<TargetRecord>) -> Result<BatchOutcome> {
        self.commits.fetch_add(1, Ordering::Relaxed);
        let attempted = batch.len();

        let mut collections = self.collections.write().await;
        let collection = collections.entry(kind).or_default();
        for record in batch {
            collection.insert(record.target_id, record.fields);
        }

        debug!(
            "{}: committed {} documents ({} total)",
            kind.target_collection(),
            attempted,
            collection.len()
        );
        Ok(BatchOutcome::committed(attempted))
    }

    async fn exists(&self, kind: EntityKind, id: &TargetId) -> Result<bool> {
        Ok(self
            .collections
            .read()
            .await
            .get(&kind)
            .map(|c| c.contains_key(id))
            .unwrap_or(false))
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        Ok(self
            .collections
            .read()
            .await
            .get(&kind)
            .map(|c| c.len() as u64)
            .unwrap_or(0))
    }

    fn store_type(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use tempfile::TempDir;

    fn record(id: &str, name: &str) -> TargetRecord {
        let mut fields = Document::new();
        fields.insert("name".into(), Value::from(name));
        TargetRecord {
            target_id: TargetId::from_source(id).unwrap(),
            source_id: id.to_string(),
            kind: EntityKind::User,
            fields,
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_commit_replaces_whole_document() {
        let target = MemoryTarget::new();
        let mut first = record("u1", "Ana");
        first.fields.insert("nickname".into(), Value::from("Aninha"));
        target.commit(EntityKind::User, vec![first]).await.unwrap();
        target
            .commit(EntityKind::User, vec![record("u1", "Ana Maria")])
            .await
            .unwrap();

        let id = TargetId::from_source("u1").unwrap();
        let doc = target.get(EntityKind::User, &id).await.unwrap();
        assert_eq!(doc["name"], Value::from("Ana Maria"));
        assert!(!doc.contains_key("nickname"));
        assert_eq!(target.count(EntityKind::User).await.unwrap(), 1);
        assert_eq!(target.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_exists_is_per_collection() {
        let target = MemoryTarget::new();
        target
            .commit(EntityKind::User, vec![record("x", "X")])
            .await
            .unwrap();
        let id = TargetId::from_source("x").unwrap();
        assert!(target.exists(EntityKind::User, &id).await.unwrap());
        assert!(!target.exists(EntityKind::Appointment, &id).await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target.json");

        let target = MemoryTarget::new();
        target
            .commit(EntityKind::User, vec![record("u1", "Ana"), record("u2", "Bia")])
            .await
            .unwrap();
        target.save_snapshot(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"users\""));

        let reloaded = MemoryTarget::load_snapshot(&path).unwrap();
        assert_eq!(reloaded.count(EntityKind::User).await.unwrap(), 2);
    }
}
