//! Records, attribute values and field schemas.
//!
//! A record is one map feature exposed as ordered `field -> value` pairs,
//! plus the geometry and id it was loaded with so it can be exported again.

use anyhow::{Context, Result, anyhow};
use geojson::feature::Id;
use geojson::{Feature, GeoJson, Geometry, JsonObject};
use indexmap::{IndexMap, IndexSet};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use crate::dsl::parse_number;

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    String(String),
}

impl Value {
    /// Convert a GeoJSON property. Booleans and nested JSON keep their text form.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Number(f),
                None => Value::String(n.to_string()),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Numeric reading of the value: numbers as-is, strings if they parse.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_number(s),
        }
    }

    /// Text reading of the value; `None` for null.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::String(s) => Some(Cow::Borrowed(s)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

/// One queryable entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: Option<Id>,
    pub geometry: Option<Geometry>,
    attributes: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    pub fn from_feature(feature: Feature) -> Self {
        let attributes = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(&v)))
            .collect();

        Record {
            id: feature.id,
            geometry: feature.geometry,
            attributes,
        }
    }

    pub fn to_feature(&self) -> Feature {
        let properties: JsonObject = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();

        Feature {
            bbox: None,
            geometry: self.geometry.clone(),
            id: self.id.clone(),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            id: None,
            geometry: None,
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The set of field names valid for a collection, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: IndexSet<String>,
}

impl FieldSchema {
    pub fn from_records(records: &[Record]) -> Self {
        records
            .iter()
            .flat_map(|record| record.attributes.keys().cloned())
            .collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSchema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FieldSchema {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Load records from a GeoJSON or GeoJSON-lines file.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Input: Failed to read {:?}", path))?;
    parse_records(&content).with_context(|| format!("Input: Failed to load records from {:?}", path))
}

/// Parse a FeatureCollection, a single Feature, or one Feature per line.
pub fn parse_records(content: &str) -> Result<Vec<Record>> {
    if let Ok(geojson) = content.parse::<GeoJson>() {
        return records_from_geojson(geojson);
    }

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let geojson = line
            .parse::<GeoJson>()
            .with_context(|| format!("Input: Invalid GeoJSON on line {}", idx + 1))?;
        records.extend(records_from_geojson(geojson)?);
    }
    Ok(records)
}

fn records_from_geojson(geojson: GeoJson) -> Result<Vec<Record>> {
    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection
            .features
            .into_iter()
            .map(Record::from_feature)
            .collect()),
        GeoJson::Feature(feature) => Ok(vec![Record::from_feature(feature)]),
        GeoJson::Geometry(_) => Err(anyhow!(
            "Input: Bare geometries carry no attributes; expected features"
        )),
    }
}
