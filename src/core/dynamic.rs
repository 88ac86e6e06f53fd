//! Dynamic field values - answers to admin-configured form fields.
//!
//! Sections of a submission can carry values for fields that only exist in the
//! form-builder schema. Values are a tagged variant so a stored answer always says
//! what kind of value it is, and the per-section mapping keeps the order in which
//! the fields were answered.

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One answer to a dynamically configured field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Free text
    Text(String),
    /// Any numeric answer
    Number(f64),
    /// Yes/no answer
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// One of the options of a select field
    Select(String),
}

impl FieldValue {
    /// Numeric reading of the value, if it has one.
    ///
    /// Numbers are returned as-is and text is parsed; every other variant, and text
    /// that is not a finite number, yields `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

/// Ordered `field id -> value` mapping for one section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicData {
    entries: Vec<(String, FieldValue)>,
}

impl DynamicData {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets a field value. Re-setting a field keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Value stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for DynamicData {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (key, value) in iter {
            data.insert(key, value);
        }
        data
    }
}

impl Serialize for DynamicData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct DynamicDataVisitor;

impl<'de> Visitor<'de> for DynamicDataVisitor {
    type Value = DynamicData;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of field ids to tagged field values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut data = DynamicData::new();
        while let Some((key, value)) = access.next_entry::<String, FieldValue>()? {
            data.insert(key, value);
        }
        Ok(data)
    }
}

impl<'de> Deserialize<'de> for DynamicData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DynamicDataVisitor)
    }
}
