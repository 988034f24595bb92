//! Source and target record types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityKind;
use super::value::{Document, Value};

/// Field holding the record id in the legacy backend.
pub const SOURCE_ID_FIELD: &str = "objectId";

/// A raw record read from the legacy store. Never mutated after it is read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Stable id in the legacy store.
    pub source_id: String,
    /// Kind of record.
    pub kind: EntityKind,
    /// Raw fields, keyed by legacy field name.
    pub fields: Document,
}

impl SourceRecord {
    pub fn new(kind: EntityKind, source_id: impl Into<String>, fields: Document) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
            fields,
        }
    }

    /// Build a record from one object of a legacy JSON export.
    ///
    /// A missing or non-string `objectId` yields an empty id, which the field
    /// mapper rejects with a transform error for that record alone.
    pub fn from_json(kind: EntityKind, json: serde_json::Value) -> Self {
        let fields = match Value::from_json(json) {
            Value::Map(fields) => fields,
            other => {
                let mut fields = Document::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        let source_id = fields
            .get(SOURCE_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            source_id,
            kind,
            fields,
        }
    }

    /// Get a field, treating explicit nulls as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

/// Document id in the target store.
///
/// Derived from the source id by a pure, injective encoding: `[A-Za-z0-9_-]`
/// pass through unchanged and every other byte becomes `%XX`. Re-running a
/// migration therefore always writes a given source record to the same
/// target document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Derive the target id for a source id. Returns `None` for an empty id.
    pub fn from_source(source_id: &str) -> Option<Self> {
        if source_id.is_empty() {
            return None;
        }
        let mut encoded = String::with_capacity(source_id.len());
        for byte in source_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                encoded.push(byte as char);
            } else {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
        Some(Self(encoded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A transformed record, ready to be upserted into the target store.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRecord {
    /// Target document id (a pure function of `source_id`).
    pub target_id: TargetId,
    /// Id of the record this was produced from.
    pub source_id: String,
    pub kind: EntityKind,
    /// Target fields, keyed by target field name.
    pub fields: Document,
    /// Non-fatal notes raised while mapping (e.g. unknown enum codes).
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_id_keeps_legacy_object_ids() {
        let id = TargetId::from_source("aB3xY9kLmQ").unwrap();
        assert_eq!(id.as_str(), "aB3xY9kLmQ");
    }

    #[test]
    fn test_target_id_escapes_unsafe_bytes() {
        let id = TargetId::from_source("a/b c%").unwrap();
        assert_eq!(id.as_str(), "a%2Fb%20c%25");
    }

    #[test]
    fn test_target_id_is_injective_for_escape_lookalikes() {
        let raw = TargetId::from_source("%2F").unwrap();
        let slash = TargetId::from_source("/").unwrap();
        assert_ne!(raw, slash);
    }

    #[test]
    fn test_target_id_deterministic() {
        assert_eq!(
            TargetId::from_source("x.y@z"),
            TargetId::from_source("x.y@z")
        );
        assert_eq!(TargetId::from_source(""), None);
    }

    #[test]
    fn test_source_record_from_json() {
        let record = SourceRecord::from_json(
            EntityKind::User,
            json!({"objectId": "u1", "email": "a@b.c", "legacyFlag": null}),
        );
        assert_eq!(record.source_id, "u1");
        assert_eq!(record.field("email"), Some(&Value::from("a@b.c")));
        assert_eq!(record.field("legacyFlag"), None);
    }

    #[test]
    fn test_source_record_without_object_id() {
        let record = SourceRecord::from_json(EntityKind::User, json!({"email": "a@b.c"}));
        assert_eq!(record.source_id, "");
    }
}
