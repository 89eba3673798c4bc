//! Detection event model and the JSON boundary that validates it
//!
//! Producers emit events shaped like
//! `{"timestamp": ..., "vehicles_detected": N, "class_counts": {"car": N, ...}}`.
//! Parsing is strict: counts must be non-negative integers, nothing is coerced.

use crate::error::EventError;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::{collections::HashMap, fmt};

/// Producer-supplied point in time
///
/// Kept exactly as received. Ordering is never derived from it; arrival order wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    Numeric(Number),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Text(text) => f.write_str(text),
            Timestamp::Numeric(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for Timestamp {
    fn from(text: &str) -> Self {
        Timestamp::Text(text.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(text: String) -> Self {
        Timestamp::Text(text)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Timestamp::Numeric(Number::from(secs))
    }
}

/// Ordered label -> count mapping with unique labels
///
/// Iteration follows insertion order. Equality is structural, so two maps
/// with the same entries in a different order are not equal.
#[derive(Debug, Clone, Default)]
pub struct CategoryCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the count for `category`
    pub fn insert(&mut self, category: impl Into<String>, count: u64) {
        let category = category.into();
        match self.index.get(&category) {
            Some(&slot) => self.entries[slot].1 = count,
            None => {
                self.index.insert(category.clone(), self.entries.len());
                self.entries.push((category, count));
            }
        }
    }

    pub fn get(&self, category: &str) -> Option<u64> {
        self.index.get(category).map(|&slot| self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    /// Sum of all counts (saturating)
    pub fn sum(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, (_, count)| acc.saturating_add(*count))
    }
}

// The index is derived from `entries`, so it takes no part in equality
impl PartialEq for CategoryCounts {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for CategoryCounts {}

impl<S: Into<String>> FromIterator<(S, u64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut counts = CategoryCounts::new();
        for (category, count) in iter {
            counts.insert(category, count);
        }
        counts
    }
}

impl From<Vec<(String, u64)>> for CategoryCounts {
    fn from(entries: Vec<(String, u64)>) -> Self {
        entries.into_iter().collect()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

struct CategoryCountsVisitor;

impl<'de> Visitor<'de> for CategoryCountsVisitor {
    type Value = CategoryCounts;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of class label to non-negative integer count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CategoryCounts, A::Error> {
        let mut counts = CategoryCounts::new();
        while let Some((label, count)) = access.next_entry::<String, u64>()? {
            counts.insert(label, count);
        }
        Ok(counts)
    }
}

impl<'de> Deserialize<'de> for CategoryCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CategoryCountsVisitor)
    }
}

/// One observation reported by the upstream detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub timestamp: Timestamp,
    #[serde(rename = "vehicles_detected")]
    pub total_count: u64,
    #[serde(rename = "class_counts")]
    pub category_counts: CategoryCounts,
}

impl DetectionEvent {
    pub fn new(
        timestamp: impl Into<Timestamp>,
        total_count: u64,
        category_counts: CategoryCounts,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            total_count,
            category_counts,
        }
    }

    /// Parse a detection event from one JSON document (e.g. a JSONL line)
    ///
    /// Unknown extra fields are ignored. Class labels keep the producer's order.
    pub fn from_json(line: &str) -> Result<Self, EventError> {
        // Decode as an object first: the derived visitor would also accept a
        // positional array
        let object: Map<String, Value> = serde_json::from_str(line)?;
        Ok(serde_json::from_value(Value::Object(object))?)
    }

    /// Serialize back to the wire shape
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection_line() {
        let line = r#"{"timestamp":"2024-11-20T10:15:02.123456","vehicles_detected":5,"class_counts":{"car":3,"bus":2}}"#;

        let event = DetectionEvent::from_json(line).unwrap();
        assert_eq!(event.timestamp, Timestamp::from("2024-11-20T10:15:02.123456"));
        assert_eq!(event.total_count, 5);
        assert_eq!(event.category_counts.get("car"), Some(3));
        assert_eq!(event.category_counts.get("bus"), Some(2));
        assert_eq!(event.category_counts.get("truck"), None);
    }

    #[test]
    fn test_numeric_timestamp() {
        let line = r#"{"timestamp":1732097702,"vehicles_detected":0,"class_counts":{}}"#;

        let event = DetectionEvent::from_json(line).unwrap();
        assert_eq!(event.timestamp, Timestamp::from(1732097702_i64));
        assert_eq!(event.timestamp.to_string(), "1732097702");
        assert!(event.category_counts.is_empty());
    }

    #[test]
    fn test_class_order_preserved() {
        let line = r#"{"timestamp":"t","vehicles_detected":6,"class_counts":{"truck":1,"car":2,"bus":3}}"#;

        let event = DetectionEvent::from_json(line).unwrap();
        let labels: Vec<&str> = event.category_counts.labels().collect();
        assert_eq!(labels, vec!["truck", "car", "bus"]);
    }

    fn shape_error(line: &str) -> String {
        match DetectionEvent::from_json(line) {
            Err(EventError::InvalidShape(e)) => e.to_string(),
            other => panic!("expected a shape rejection for {}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_missing_fields_rejected() {
        let no_total = r#"{"timestamp":"t","class_counts":{"car":1}}"#;
        assert!(shape_error(no_total).contains("missing field `vehicles_detected`"));

        let no_classes = r#"{"timestamp":"t","vehicles_detected":1}"#;
        assert!(shape_error(no_classes).contains("missing field `class_counts`"));

        let no_timestamp = r#"{"vehicles_detected":1,"class_counts":{}}"#;
        assert!(shape_error(no_timestamp).contains("missing field `timestamp`"));
    }

    #[test]
    fn test_non_numeric_counts_rejected() {
        let string_total = r#"{"timestamp":"t","vehicles_detected":"5","class_counts":{}}"#;
        assert!(shape_error(string_total).contains("expected u64"));

        let negative_class = r#"{"timestamp":"t","vehicles_detected":1,"class_counts":{"car":-1}}"#;
        assert!(shape_error(negative_class).contains("-1"));

        let fractional = r#"{"timestamp":"t","vehicles_detected":1,"class_counts":{"bus":1.5}}"#;
        assert!(shape_error(fractional).contains("1.5"));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        assert!(matches!(
            DetectionEvent::from_json(r#"{"timestamp": "t""#),
            Err(EventError::InvalidJson(_))
        ));
        assert!(matches!(
            DetectionEvent::from_json("not json at all"),
            Err(EventError::InvalidJson(_))
        ));

        shape_error("[1, 2, 3]");
        shape_error(r#"["t", 1, {}]"#);
        shape_error(r#"{"timestamp":true,"vehicles_detected":1,"class_counts":{}}"#);
        shape_error(r#"{"timestamp":"t","vehicles_detected":1,"class_counts":[]}"#);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let line = r#"{"frame":12,"timestamp":"t","vehicles_detected":1,"class_counts":{"van":1},"source":"cam-2"}"#;

        let event = DetectionEvent::from_json(line).unwrap();
        assert_eq!(event.category_counts.get("van"), Some(1));
    }

    #[test]
    fn test_serializes_wire_shape() {
        let event = DetectionEvent::new(
            "t1",
            5,
            vec![("car".to_string(), 3), ("bus".to_string(), 2)].into(),
        );

        let json = event.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":"t1","vehicles_detected":5,"class_counts":{"car":3,"bus":2}}"#
        );
        assert_eq!(DetectionEvent::from_json(&json).unwrap(), event);

        let decoded: DetectionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_category_counts_insert_overwrites() {
        let mut counts = CategoryCounts::new();
        counts.insert("car", 1);
        counts.insert("bus", 2);
        counts.insert("car", 7);

        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("car"), Some(7));
        assert_eq!(counts.sum(), 9);
        let labels: Vec<&str> = counts.labels().collect();
        assert_eq!(labels, vec!["car", "bus"]);
    }

    #[test]
    fn test_duplicate_class_keeps_last_value() {
        let line = r#"{"timestamp":"t","vehicles_detected":3,"class_counts":{"car":1,"bus":1,"car":2}}"#;

        let event = DetectionEvent::from_json(line).unwrap();
        assert_eq!(event.category_counts.len(), 2);
        assert_eq!(event.category_counts.get("car"), Some(2));
    }
}
