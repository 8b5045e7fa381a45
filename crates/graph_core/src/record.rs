//! The record type: a sparse, insertion-ordered map from field name to [`Value`].

use ahash::RandomState;
use indexmap::IndexMap;

use crate::value::{KeyTuple, Value};
use graph_error::{OptionExt, Result};

/// A single row flowing through the graph.
///
/// Backed by an `IndexMap` so serialization reproduces the field order the
/// record was built in, even though the data model treats the mapping as
/// logically unordered.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value, RandomState>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            fields: IndexMap::with_hasher(RandomState::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `this record with every field of `other` copied in, `other`
    /// winning on key collisions. Used to merge a join's left/right pair.
    pub fn merged_over(&self, other: &Record) -> Record {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.set(k.to_string(), v.clone());
        }
        merged
    }

    /// Extracts the sort/group/join key tuple named by `keys`, failing with
    /// [`graph_error::ErrorKind::MissingField`] if any field is absent.
    pub fn key_tuple(&self, keys: &[String]) -> Result<KeyTuple> {
        keys.iter()
            .map(|k| self.get(k).cloned().required(&format!("field '{k}'")))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut r = Record::new();
        for (k, v) in iter {
            r.set(k, v);
        }
        r
    }
}
