//! Document value types shared by the source and target sides.
//!
//! Both stores are document oriented, so a record is a map of field names to
//! [`Value`]s. The JSON form follows the legacy backend's export format:
//! dates and geo points are tagged objects (`{"__type": "Date", "iso": ...}`),
//! everything else is plain JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field name to value mapping for one document.
pub type Document = BTreeMap<String, Value>;

/// Geographic point in the target store's representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Native timestamp, always held in UTC.
    Timestamp(DateTime<Utc>),
    GeoPoint(GeoPoint),
    Array(Vec<Value>),
    Map(Document),
}

impl Value {
    /// Short type name used in transform error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::GeoPoint(_) => "geo point",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Document> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert from the legacy JSON export representation.
    ///
    /// Tagged `Date` and `GeoPoint` objects become native values. Tagged
    /// objects that fail to parse are kept as plain maps so the field mapper
    /// can report them with the record's id.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => {
                match obj.get("__type").and_then(|t| t.as_str()) {
                    Some("Date") => {
                        let parsed = obj
                            .get("iso")
                            .and_then(|iso| iso.as_str())
                            .and_then(|iso| DateTime::parse_from_rfc3339(iso).ok());
                        if let Some(dt) = parsed {
                            return Value::Timestamp(dt.with_timezone(&Utc));
                        }
                    }
                    Some("GeoPoint") => {
                        let lat = obj.get("latitude").and_then(|v| v.as_f64());
                        let lng = obj.get("longitude").and_then(|v| v.as_f64());
                        if let (Some(latitude), Some(longitude)) = (lat, lng) {
                            return Value::GeoPoint(GeoPoint {
                                latitude,
                                longitude,
                            });
                        }
                    }
                    _ => {}
                }
                Value::Map(
                    obj.into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Convert to JSON, tagging timestamps and geo points.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(dt) => serde_json::json!({
                "__type": "Date",
                "iso": dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
            Value::GeoPoint(p) => serde_json::json!({
                "__type": "GeoPoint",
                "latitude": p.latitude,
                "longitude": p.longitude,
            }),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(json))
    }
}
