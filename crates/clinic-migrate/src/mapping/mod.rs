//! Field mapper: legacy records to target documents.
//!
//! Each [`EntityKind`] has a declarative [`FieldMapping`] table (see
//! [`tables`]). Mapping a record applies the table rule by rule:
//!
//! - present source fields are converted by the rule's [`Transform`]
//! - missing required source fields fail the record with a [`TransformError`]
//! - missing optional fields take the rule's default, or are omitted
//! - source fields without a rule are dropped
//!
//! Every target document also receives `legacyId`, the record's source id.

pub mod tables;
pub mod transform;

pub use tables::mapping_for;
pub use transform::{CodeTable, Literal, Transform};

use thiserror::Error;

use crate::core::{Document, EntityKind, SourceRecord, TargetId, TargetRecord, Value, SOURCE_ID_FIELD};

/// Target field holding the id the record had in the legacy store.
pub const LEGACY_ID_FIELD: &str = "legacyId";

/// A record that could not be transformed. Isolated to that record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Record {source_id}: field '{field}': {reason}")]
pub struct TransformError {
    pub source_id: String,
    pub field: String,
    pub reason: String,
}

impl TransformError {
    pub fn new(source_id: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// One `(source field, target field, transform)` row of a mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Field name in the legacy record.
    pub source: &'static str,
    /// Field name in the target document.
    pub target: &'static str,
    /// Conversion applied to the value.
    pub transform: Transform,
    /// Whether the record is rejected when the source field is missing.
    pub required: bool,
    /// Value written when the source field is missing.
    pub default: Option<Literal>,
}

/// Ordered mapping table for one entity kind.
#[derive(Debug)]
pub struct FieldMapping {
    pub kind: EntityKind,
    pub rules: &'static [FieldRule],
}

impl FieldMapping {
    /// Apply this table to `record`.
    pub fn apply(&self, record: &SourceRecord) -> Result<TargetRecord, TransformError> {
        let target_id = TargetId::from_source(&record.source_id).ok_or_else(|| {
            TransformError::new(&record.source_id, SOURCE_ID_FIELD, "record has no id")
        })?;

        let mut fields = Document::new();
        let mut warnings = Vec::new();

        for rule in self.rules {
            match record.field(rule.source) {
                Some(raw) => {
                    let converted = rule
                        .transform
                        .apply(raw)
                        .map_err(|reason| TransformError::new(&record.source_id, rule.source, reason))?;
                    if let Some(warning) = converted.warning {
                        warnings.push(format!("{}: {}", rule.source, warning));
                    }
                    fields.insert(rule.target.to_string(), converted.value);
                }
                None if rule.required => {
                    return Err(TransformError::new(
                        &record.source_id,
                        rule.source,
                        "required field is missing",
                    ));
                }
                None => {
                    if let Some(default) = rule.default {
                        fields.insert(rule.target.to_string(), default.to_value());
                    }
                }
            }
        }

        fields.insert(
            LEGACY_ID_FIELD.to_string(),
            Value::String(record.source_id.clone()),
        );

        Ok(TargetRecord {
            target_id,
            source_id: record.source_id.clone(),
            kind: self.kind,
            fields,
            warnings,
        })
    }
}

/// Map a source record with its kind's table.
pub fn map_record(record: &SourceRecord) -> Result<TargetRecord, TransformError> {
    mapping_for(record.kind).apply(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn user(json: serde_json::Value) -> SourceRecord {
        SourceRecord::from_json(EntityKind::User, json)
    }

    #[test]
    fn test_user_mapping() {
        let record = user(json!({
            "objectId": "u1",
            "email": "ana@clinic.test",
            "firstName": "Ana",
            "phone": 5511999,
            "role": 1,
            "createdAt": "2022-03-04T10:00:00.000Z",
            "sessionToken": "r:secret",
        }));
        let mapped = map_record(&record).unwrap();

        assert_eq!(mapped.target_id.as_str(), "u1");
        assert_eq!(mapped.fields["email"], Value::from("ana@clinic.test"));
        assert_eq!(mapped.fields["phoneNumber"], Value::from("5511999"));
        assert_eq!(mapped.fields["role"], Value::from("professional"));
        assert_eq!(mapped.fields["emailVerified"], Value::Bool(false));
        assert_eq!(mapped.fields["isActive"], Value::Bool(true));
        assert_eq!(
            mapped.fields["createdAt"],
            Value::Timestamp(Utc.with_ymd_and_hms(2022, 3, 4, 10, 0, 0).unwrap())
        );
        assert_eq!(mapped.fields[LEGACY_ID_FIELD], Value::from("u1"));
        assert!(!mapped.fields.contains_key("sessionToken"));
        assert!(!mapped.fields.contains_key("updatedAt"));
        assert!(mapped.warnings.is_empty());
    }

    #[test]
    fn test_missing_required_field() {
        let record = user(json!({"objectId": "u2", "createdAt": "2022-01-01"}));
        let err = map_record(&record).unwrap_err();
        assert_eq!(err, TransformError::new("u2", "email", "required field is missing"));
    }

    #[test]
    fn test_null_required_field_is_missing() {
        let record = user(json!({"objectId": "u3", "email": null, "createdAt": "2022-01-01"}));
        assert_eq!(map_record(&record).unwrap_err().field, "email");
    }

    #[test]
    fn test_missing_id_is_transform_error() {
        let record = user(json!({"email": "x@y.z", "createdAt": "2022-01-01"}));
        assert_eq!(map_record(&record).unwrap_err().field, SOURCE_ID_FIELD);
    }

    #[test]
    fn test_unknown_role_code_warns_not_fails() {
        let record = user(json!({
            "objectId": "u4",
            "email": "x@y.z",
            "role": 42,
            "createdAt": "2022-01-01",
        }));
        let mapped = map_record(&record).unwrap();
        assert_eq!(mapped.fields["role"], Value::from("client"));
        assert_eq!(mapped.warnings.len(), 1);
        assert!(mapped.warnings[0].starts_with("role: unknown user role code 42"));
    }

    #[test]
    fn test_bad_conversion_names_field() {
        let record = user(json!({
            "objectId": "u5",
            "email": "x@y.z",
            "createdAt": "not a date",
        }));
        let err = map_record(&record).unwrap_err();
        assert_eq!(err.field, "createdAt");
        assert!(err.reason.contains("not a date"));
    }

    #[test]
    fn test_appointment_references_and_geo() {
        let record = SourceRecord::from_json(
            EntityKind::Appointment,
            json!({
                "objectId": "a1",
                "client": {"__type": "Pointer", "className": "ClientProfile", "objectId": "c1"},
                "professional": "p1",
                "date": {"__type": "Date", "iso": "2024-05-10T14:30:00.000Z"},
                "status": 2,
                "location": {"latitude": -22.9, "longitude": -43.2},
                "createdAt": {"__type": "Date", "iso": "2024-05-01T08:00:00.000Z"},
            }),
        );
        let mapped = map_record(&record).unwrap();
        assert_eq!(mapped.fields["clientId"], Value::from("c1"));
        assert_eq!(mapped.fields["professionalId"], Value::from("p1"));
        assert_eq!(mapped.fields["status"], Value::from("completed"));
        assert_eq!(mapped.fields["durationMinutes"], Value::Int(30));
        assert!(matches!(mapped.fields["location"], Value::GeoPoint(_)));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let record = user(json!({"objectId": "same", "email": "a@b.c", "createdAt": "2022-01-01"}));
        let first = map_record(&record).unwrap();
        let second = map_record(&record).unwrap();
        assert_eq!(first.target_id, second.target_id);
        assert_eq!(first, second);
    }
}
