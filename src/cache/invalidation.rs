//! Cache invalidation
//!
//! Bulk removal by exact key, key substring or tag intersection. Services
//! namespace their keys by entity (`"Documento_Vencidos:42"`) and tag entries
//! by the records they were derived from, so a write to one record can drop
//! every dependent entry in one call.
//!
//! Every removal here counts towards the eviction statistic.

use std::collections::HashSet;

use tracing::debug;

use crate::cache::CacheStore;
use crate::error::{CacheError, Result};

impl<V> CacheStore<V> {
    /// Removes a single entry. Returns 1 if it was present, 0 otherwise.
    pub fn remove_by_key(&self, key: &str) -> Result<usize> {
        let removed = usize::from(self.remove(key)?);

        self.stats.record_evictions(removed);
        debug!(key, removed, "invalidated by key");
        Ok(removed)
    }

    /// Removes every entry whose key contains `pattern`, ignoring case.
    pub fn remove_by_pattern(&self, pattern: &str) -> Result<usize> {
        if pattern.trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "pattern cannot be empty".to_string(),
            ));
        }

        let needle = pattern.to_lowercase();
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let matched = key.to_lowercase().contains(&needle);
            if matched {
                removed += 1;
            }
            !matched
        });

        self.stats.record_evictions(removed);
        debug!(pattern, removed, "invalidated by pattern");
        Ok(removed)
    }

    /// Removes every entry carrying at least one of `tags`.
    ///
    /// Untagged entries are never removed. Blank tags are ignored; a tag set
    /// with nothing else in it is rejected.
    pub fn remove_by_tags<I, S>(&self, tags: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: HashSet<String> = tags
            .into_iter()
            .map(Into::into)
            .filter(|tag: &String| !tag.trim().is_empty())
            .collect();
        if wanted.is_empty() {
            return Err(CacheError::InvalidArgument(
                "tag set cannot be empty".to_string(),
            ));
        }

        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let matched = entry.has_any_tag(&wanted);
            if matched {
                removed += 1;
            }
            !matched
        });

        self.stats.record_evictions(removed);
        debug!(tags = ?wanted, removed, "invalidated by tags");
        Ok(removed)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryOptions;
    use std::time::Duration;

    fn store() -> CacheStore<u32> {
        CacheStore::new(100, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_remove_by_key() {
        let store = store();
        store.set("vehicle:1", 1, EntryOptions::default()).unwrap();

        assert_eq!(store.remove_by_key("vehicle:1").unwrap(), 1);
        assert_eq!(store.remove_by_key("vehicle:1").unwrap(), 0);
        assert_eq!(store.statistics().evictions, 1);
    }

    #[test]
    fn test_remove_by_pattern_case_insensitive() {
        let store = store();
        store.set("Documento_Vencidos:1", 1, EntryOptions::default()).unwrap();
        store.set("documento_vencidos:2", 2, EntryOptions::default()).unwrap();
        store.set("Veiculo:1", 3, EntryOptions::default()).unwrap();

        let removed = store.remove_by_pattern("DOCUMENTO_VENCIDOS").unwrap();

        assert_eq!(removed, 2);
        assert!(store.contains_key("Veiculo:1"));
        assert_eq!(store.statistics().evictions, 2);
    }

    #[test]
    fn test_remove_by_pattern_rejects_blank() {
        let store = store();
        assert!(matches!(
            store.remove_by_pattern(" "),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_remove_by_tags_intersection() {
        let store = store();
        store.set("a", 1, EntryOptions::new().tags(["x"])).unwrap();
        store.set("b", 2, EntryOptions::new().tags(["y"])).unwrap();
        store.set("c", 3, EntryOptions::new().tags(["x", "y"])).unwrap();
        store.set("d", 4, EntryOptions::default()).unwrap();

        assert_eq!(store.remove_by_tags(["x"]).unwrap(), 2);

        assert!(!store.contains_key("a"));
        assert!(store.contains_key("b"));
        assert!(!store.contains_key("c"));
        assert!(store.contains_key("d"));
    }

    #[test]
    fn test_remove_by_tags_rejects_empty_set() {
        let store = store();
        assert!(matches!(
            store.remove_by_tags(Vec::<String>::new()),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.remove_by_tags([""]),
            Err(CacheError::InvalidArgument(_))
        ));
    }
}
