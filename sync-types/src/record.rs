//! Schema-less records with typed field values.
//!
//! Health events arrive from the server as JSON objects whose shape varies
//! by resource type. A [`Record`] keeps that openness while every value is
//! one of the variants of [`FieldValue`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field holding the server's last-modified time.
pub const UPDATED_AT: &str = "updated_at";

/// Field holding the creation time.
pub const CREATED_AT: &str = "created_at";

/// A single field value.
///
/// Untagged, so a JSON document maps onto it directly. RFC 3339 strings
/// decode as [`FieldValue::Timestamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit null.
    Null,
    /// Boolean flag (e.g. read markers).
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// Free text.
    Text(String),
    /// Ordered list of values.
    List(Vec<FieldValue>),
    /// Nested record.
    Object(Record),
}

impl FieldValue {
    /// Interpret this value as a point in time.
    ///
    /// Accepts timestamps, RFC 3339 text, and integer epoch milliseconds.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Integer(ms) => DateTime::<Utc>::from_timestamp_millis(*ms),
            _ => None,
        }
    }

    /// Borrow the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Null or empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(record) => write!(f, "{{{} fields}}", record.len()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Record> for FieldValue {
    fn from(value: Record) -> Self {
        Self::Object(value)
    }
}

/// A record: field name to value, ordered by field name.
///
/// Ordering makes iteration, and everything computed from it, deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Set a field value, returning the previous one.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    /// Check whether a field is present (null counts as present).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a field as a point in time.
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_timestamp)
    }

    /// Last-modified time: `updated_at`, else `created_at`.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.timestamp(UPDATED_AT)
            .or_else(|| self.timestamp(CREATED_AT))
    }

    /// Build a record from a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Convert to a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        // Every FieldValue variant has a JSON representation.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn json_maps_onto_variants() {
        let record = Record::from_json(json!({
            "status": "taken",
            "severity": 3,
            "dose_mg": 2.5,
            "is_read": false,
            "deleted_at": null,
            "updated_at": "2024-03-01T10:00:00Z",
            "tags": ["am", "with food"],
            "meta": { "source": "watch" }
        }))
        .unwrap();

        assert_eq!(record.get("status"), Some(&FieldValue::Text("taken".into())));
        assert_eq!(record.get("severity"), Some(&FieldValue::Integer(3)));
        assert_eq!(record.get("dose_mg"), Some(&FieldValue::Float(2.5)));
        assert_eq!(record.get("is_read"), Some(&FieldValue::Bool(false)));
        assert_eq!(record.get("deleted_at"), Some(&FieldValue::Null));
        assert!(matches!(
            record.get("updated_at"),
            Some(FieldValue::Timestamp(_))
        ));
        assert!(matches!(record.get("tags"), Some(FieldValue::List(items)) if items.len() == 2));
        assert!(matches!(record.get("meta"), Some(FieldValue::Object(_))));
    }

    #[test]
    fn last_modified_prefers_updated_at() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let record = Record::new()
            .with(CREATED_AT, created)
            .with(UPDATED_AT, updated);
        assert_eq!(record.last_modified(), Some(updated));

        let record = Record::new().with(CREATED_AT, created);
        assert_eq!(record.last_modified(), Some(created));

        assert_eq!(Record::new().last_modified(), None);
    }

    #[test]
    fn timestamps_read_from_text_and_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        let text = FieldValue::Text("2024-03-01T12:00:00+02:00".into());
        assert_eq!(text.as_timestamp(), Some(expected));

        let millis = FieldValue::Integer(expected.timestamp_millis());
        assert_eq!(millis.as_timestamp(), Some(expected));

        assert_eq!(FieldValue::Text("yesterday".into()).as_timestamp(), None);
        assert_eq!(FieldValue::Bool(true).as_timestamp(), None);
    }

    #[test]
    fn structural_equality_covers_nesting() {
        let a = Record::new().with("meta", Record::new().with("k", 1i64));
        let b = Record::new().with("meta", Record::new().with("k", 1i64));
        let c = Record::new().with("meta", Record::new().with("k", 2i64));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn blank_values() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::from("  ").is_blank());
        assert!(!FieldValue::from("x").is_blank());
        assert!(!FieldValue::Integer(0).is_blank());
    }

    #[test]
    fn persists_through_messagepack() {
        let record = Record::new()
            .with("notes", "felt dizzy")
            .with("severity", 4i64)
            .with(UPDATED_AT, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());

        let bytes = crate::encode(&record).unwrap();
        let restored: Record = crate::decode(&bytes).unwrap();
        assert_eq!(record, restored);
    }
}
