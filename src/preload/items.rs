//! Item Extraction
//!
//! Pulls identifiers and image URLs out of menu items by dotted field path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CacheError;

// == Field Path ==
/// A dotted path into a JSON object, e.g. `image.url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Follows the path through nested objects.
    pub fn lookup<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(item, |current, segment| current.get(segment.as_str()))
    }

    /// Returns the value at the path if it is a non-empty string.
    pub fn string_at(&self, item: &Value) -> Option<String> {
        match self.lookup(item)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromStr for FieldPath {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(CacheError::InvalidRequest(format!("invalid field path: '{s}'")));
        }
        Ok(Self(segments))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

// == Item Fields ==
/// Where a consumer's items keep their identifier and image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFields {
    pub id: FieldPath,
    pub image: FieldPath,
}

impl Default for ItemFields {
    fn default() -> Self {
        Self {
            id: FieldPath(vec!["id".to_string()]),
            image: FieldPath(vec!["image".to_string(), "url".to_string()]),
        }
    }
}

impl ItemFields {
    /// Image URLs in item order; items without one are dropped.
    pub fn image_urls(&self, items: &[Value]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| self.image.string_at(item))
            .collect()
    }

    /// Marker for a whole collection: item identifiers joined with `-`.
    ///
    /// Numeric and string identifiers render the same way, so `1` and `"1"`
    /// produce the same marker. Items without an identifier contribute an
    /// empty segment.
    pub fn batch_marker(&self, items: &[Value]) -> String {
        items
            .iter()
            .map(|item| match self.id.lookup(item) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}
