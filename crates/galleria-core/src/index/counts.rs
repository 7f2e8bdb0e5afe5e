//! Aggregate counters over folders, tags and extensions.

use crate::record::MediaRecord;
use crate::vault::path;
use serde::Serialize;
use std::collections::BTreeMap;

/// Key -> count map that never holds a zero entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountMap(BTreeMap<String, usize>);

impl CountMap {
    /// Count for `key`; absent keys count zero.
    pub fn get(&self, key: &str) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn increment(&mut self, key: &str) {
        *self.0.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Decrement, dropping the entry once it reaches zero. Decrementing an
    /// absent key is a no-op.
    pub fn decrement(&mut self, key: &str) {
        if let Some(count) = self.0.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.0.remove(key);
            }
        }
    }

    /// Increment every ancestor of `path`, root to leaf.
    pub fn add_hierarchy(&mut self, path: &str) {
        for segment in path::hierarchy(path) {
            self.increment(&segment);
        }
    }

    pub fn remove_hierarchy(&mut self, path: &str) {
        for segment in path::hierarchy(path) {
            self.decrement(&segment);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

/// The three counter families of the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexCounts {
    pub paths: CountMap,
    pub tags: CountMap,
    pub extensions: CountMap,
}

impl IndexCounts {
    pub(crate) fn add_record(&mut self, record: &MediaRecord) {
        self.paths.add_hierarchy(record.folder());
        for tag in record.tags() {
            self.tags.add_hierarchy(tag);
        }
        self.extensions.increment(&record.extension.to_lowercase());
    }

    pub(crate) fn remove_record(&mut self, record: &MediaRecord) {
        self.paths.remove_hierarchy(record.folder());
        for tag in record.tags() {
            self.tags.remove_hierarchy(tag);
        }
        self.extensions.decrement(&record.extension.to_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_removes_zero_entries() {
        let mut counts = CountMap::default();
        counts.increment("x");
        counts.increment("x");
        counts.decrement("x");
        assert_eq!(counts.get("x"), 1);
        counts.decrement("x");
        assert!(!counts.contains_key("x"));
        counts.decrement("x");
        assert_eq!(counts.get("x"), 0);
        assert!(counts.is_empty());
    }

    #[test]
    fn test_hierarchy_counts() {
        let mut counts = CountMap::default();
        counts.add_hierarchy("x/y");
        counts.add_hierarchy("x");
        counts.add_hierarchy("");
        assert_eq!(counts.get("x"), 2);
        assert_eq!(counts.get("x/y"), 1);
        assert_eq!(counts.len(), 2);

        counts.remove_hierarchy("x/y");
        assert_eq!(counts.iter().collect::<Vec<_>>(), vec![("x", 1)]);
    }

    #[test]
    fn test_counts_serialize_as_plain_maps() {
        let mut counts = IndexCounts::default();
        counts.extensions.increment("png");
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["extensions"]["png"], 1);
        assert!(json["paths"].as_object().unwrap().is_empty());
    }
}
