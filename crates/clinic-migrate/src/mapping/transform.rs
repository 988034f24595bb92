//! Per-field type conversions.
//!
//! Each [`Transform`] is a pure function from a raw legacy value to a target
//! value. Conversions that cannot make sense of their input return a reason
//! string; the mapper wraps it into a [`super::TransformError`] carrying the
//! record id and field name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::core::{GeoPoint, TargetId, Value};

/// Fixed lookup table from legacy integer codes to symbolic values.
#[derive(Debug)]
pub struct CodeTable {
    /// Name used in warnings (e.g. "user role").
    pub name: &'static str,
    /// Known codes.
    pub codes: &'static [(i64, &'static str)],
    /// Symbol used for any code not listed in `codes`.
    pub default: &'static str,
}

impl CodeTable {
    /// Look up a known code.
    pub fn lookup(&self, code: i64) -> Option<&'static str> {
        self.codes.iter().find(|(c, _)| *c == code).map(|(_, s)| *s)
    }

    /// Whether `symbol` is already one of this table's target values.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        symbol == self.default || self.codes.iter().any(|(_, s)| *s == symbol)
    }
}

/// Constant default for a target field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Str(&'static str),
    Bool(bool),
    Int(i64),
}

impl Literal {
    pub fn to_value(self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s.to_string()),
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
        }
    }
}

/// Conversion applied to one field.
#[derive(Debug, Clone, Copy)]
pub enum Transform {
    /// Copy the value as-is.
    Copy,
    /// String; numbers and booleans are rendered as text.
    Text,
    /// Boolean; accepts 0/1 and "true"/"false".
    Boolean,
    /// Integer; accepts integral floats and numeric strings.
    Integer,
    /// Float; accepts integers and numeric strings.
    Float,
    /// Native timestamp, preserving the instant (no timezone shift).
    Timestamp,
    /// `{latitude, longitude}` reshaped to a geo point.
    GeoPoint,
    /// Coded enumeration mapped through a fixed table.
    Code(&'static CodeTable),
    /// Pointer or id of another record, rewritten to its target id.
    Reference,
}

/// Output of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub value: Value,
    pub warning: Option<String>,
}

impl Converted {
    fn ok(value: Value) -> Self {
        Self {
            value,
            warning: None,
        }
    }
}

impl Transform {
    /// Apply the conversion to a non-null raw value.
    pub fn apply(&self, raw: &Value) -> Result<Converted, String> {
        let value = match self {
            Transform::Copy => raw.clone(),
            Transform::Text => to_text(raw)?,
            Transform::Boolean => to_bool(raw)?,
            Transform::Integer => to_integer(raw)?,
            Transform::Float => to_float(raw)?,
            Transform::Timestamp => Value::Timestamp(to_timestamp(raw)?),
            Transform::GeoPoint => Value::GeoPoint(to_geo_point(raw)?),
            Transform::Code(table) => return Ok(to_code(table, raw)),
            Transform::Reference => to_reference(raw)?,
        };
        Ok(Converted::ok(value))
    }
}

fn mismatch(expected: &str, raw: &Value) -> String {
    format!("expected {}, found {}", expected, raw.type_name())
}

fn to_text(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Int(i) => Ok(Value::String(i.to_string())),
        Value::Float(f) => Ok(Value::String(f.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(mismatch("string", other)),
    }
}

fn to_bool(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Int(0) => Ok(Value::Bool(false)),
        Value::Int(1) => Ok(Value::Bool(true)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("cannot read '{}' as bool", s)),
        },
        other => Err(mismatch("bool", other)),
    }
}

fn to_integer(raw: &Value) -> Result<Value, String> {
    if let Some(i) = raw.as_i64() {
        return Ok(Value::Int(i));
    }
    match raw {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("cannot read '{}' as integer", s)),
        other => Err(mismatch("integer", other)),
    }
}

fn to_float(raw: &Value) -> Result<Value, String> {
    if let Some(f) = raw.as_f64() {
        return Ok(Value::Float(f));
    }
    match raw {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("cannot read '{}' as number", s)),
        other => Err(mismatch("number", other)),
    }
}

/// Convert a legacy date to a UTC timestamp.
///
/// Strings with an offset keep their instant; strings without one are read
/// as UTC wall-clock time. Integers are epoch milliseconds.
pub fn to_timestamp(raw: &Value) -> Result<DateTime<Utc>, String> {
    match raw {
        Value::Timestamp(dt) => Ok(*dt),
        Value::Int(millis) => Utc
            .timestamp_millis_opt(*millis)
            .single()
            .ok_or_else(|| format!("epoch millis {} out of range", millis)),
        Value::String(s) => parse_date_string(s.trim())
            .ok_or_else(|| format!("cannot read '{}' as a date", s)),
        Value::Map(m) => {
            // Legacy tagged date whose `iso` did not parse during import.
            match m.get("iso").and_then(Value::as_str) {
                Some(iso) => parse_date_string(iso.trim())
                    .ok_or_else(|| format!("cannot read '{}' as a date", iso)),
                None => Err(mismatch("date", raw)),
            }
        }
        other => Err(mismatch("date", other)),
    }
}

fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Reshape a `{latitude, longitude}` map into a geo point. Values are not
/// altered or range checked; only a missing or non-numeric coordinate fails.
pub fn to_geo_point(raw: &Value) -> Result<GeoPoint, String> {
    match raw {
        Value::GeoPoint(p) => Ok(*p),
        Value::Map(m) => {
            let latitude = m
                .get("latitude")
                .and_then(Value::as_f64)
                .ok_or_else(|| "geo point is missing a numeric latitude".to_string())?;
            let longitude = m
                .get("longitude")
                .and_then(Value::as_f64)
                .ok_or_else(|| "geo point is missing a numeric longitude".to_string())?;
            Ok(GeoPoint {
                latitude,
                longitude,
            })
        }
        other => Err(mismatch("geo point", other)),
    }
}

/// Map a coded value through `table`. Never fails: unknown codes fall back
/// to the table default and carry a warning.
pub fn to_code(table: &CodeTable, raw: &Value) -> Converted {
    let code = match raw {
        Value::String(s) if table.is_symbol(s) => {
            return Converted::ok(Value::String(s.clone()));
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        other => other.as_i64(),
    };

    if let Some(symbol) = code.and_then(|c| table.lookup(c)) {
        return Converted::ok(Value::String(symbol.to_string()));
    }

    let shown = match raw {
        Value::String(s) => format!("'{}'", s),
        Value::Int(i) => i.to_string(),
        other => other.type_name().to_string(),
    };
    Converted {
        value: Value::String(table.default.to_string()),
        warning: Some(format!(
            "unknown {} code {}, using '{}'",
            table.name, shown, table.default
        )),
    }
}

fn to_reference(raw: &Value) -> Result<Value, String> {
    let id = match raw {
        Value::String(s) => s.as_str(),
        Value::Map(m) => m
            .get("objectId")
            .and_then(Value::as_str)
            .ok_or_else(|| "pointer has no objectId".to_string())?,
        other => return Err(mismatch("pointer", other)),
    };
    TargetId::from_source(id)
        .map(|t| Value::String(t.to_string()))
        .ok_or_else(|| "pointer has an empty id".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Document;

    static COLORS: CodeTable = CodeTable {
        name: "color",
        codes: &[(0, "red"), (1, "green")],
        default: "unknown",
    };

    fn lat_lng(lat: f64, lng: f64) -> Value {
        let mut m = Document::new();
        m.insert("latitude".into(), Value::Float(lat));
        m.insert("longitude".into(), Value::Float(lng));
        Value::Map(m)
    }

    #[test]
    fn test_timestamp_keeps_instant() {
        let dt = to_timestamp(&Value::from("2023-06-01T12:00:00+02:00")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_timestamp_read_as_utc() {
        let dt = to_timestamp(&Value::from("2023-06-01 08:15:00")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 6, 1, 8, 15, 0).unwrap());
        let day = to_timestamp(&Value::from("1990-02-17")).unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(1990, 2, 17, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_from_epoch_millis() {
        let dt = to_timestamp(&Value::Int(1_700_000_000_000)).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(to_timestamp(&Value::from("next tuesday")).is_err());
        assert!(to_timestamp(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_geo_point_reshaped_unchanged() {
        let p = to_geo_point(&lat_lng(-23.55052, -46.633308)).unwrap();
        assert_eq!(p.latitude, -23.55052);
        assert_eq!(p.longitude, -46.633308);
    }

    #[test]
    fn test_geo_point_keeps_out_of_range_values() {
        let p = to_geo_point(&lat_lng(91.0, -181.0)).unwrap();
        assert_eq!(p.latitude, 91.0);
        assert_eq!(p.longitude, -181.0);
    }

    #[test]
    fn test_geo_point_needs_both_coordinates() {
        let mut m = Document::new();
        m.insert("latitude".into(), Value::Float(1.0));
        assert!(to_geo_point(&Value::Map(m)).is_err());
        assert!(to_geo_point(&Value::from("1,2")).is_err());
    }

    #[test]
    fn test_code_lookup_and_default() {
        assert_eq!(to_code(&COLORS, &Value::Int(1)).value, Value::from("green"));
        assert_eq!(to_code(&COLORS, &Value::from("0")).value, Value::from("red"));
        assert_eq!(to_code(&COLORS, &Value::from("green")).warning, None);

        let unknown = to_code(&COLORS, &Value::Int(7));
        assert_eq!(unknown.value, Value::from("unknown"));
        assert_eq!(
            unknown.warning.as_deref(),
            Some("unknown color code 7, using 'unknown'")
        );
    }

    #[test]
    fn test_reference_from_pointer() {
        let mut ptr = Document::new();
        ptr.insert("__type".into(), Value::from("Pointer"));
        ptr.insert("className".into(), Value::from("_User"));
        ptr.insert("objectId".into(), Value::from("u/1"));
        let converted = Transform::Reference.apply(&Value::Map(ptr)).unwrap();
        assert_eq!(converted.value, Value::from("u%2F1"));
    }

    #[test]
    fn test_lenient_scalars() {
        assert_eq!(Transform::Boolean.apply(&Value::Int(1)).unwrap().value, Value::Bool(true));
        assert_eq!(Transform::Integer.apply(&Value::from(" 45 ")).unwrap().value, Value::Int(45));
        assert_eq!(Transform::Float.apply(&Value::Int(120)).unwrap().value, Value::Float(120.0));
        assert_eq!(Transform::Text.apply(&Value::Int(5)).unwrap().value, Value::from("5"));
        assert!(Transform::Integer.apply(&Value::from("ten")).is_err());
    }
}
