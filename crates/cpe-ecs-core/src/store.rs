// # Mapping Store
//
// Concurrent CPE → ECS table consulted on every request.
//
// ## Consistency
//
// - Entries are stored behind `Arc`, so a writer swaps a whole value and a
//   reader holding the old `Arc` keeps a complete entry
// - Last write wins per key; there is no ordering across keys
// - A reload is not atomic: readers may observe the table mid-load
// - Entries are never removed, only superseded

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

use crate::entry::MappingEntry;

/// Concurrent CPE → ECS table
///
/// This implementation stores entries in a HashMap protected by a RwLock.
/// Lookups take the read lock only for the duration of an `Arc` clone.
///
/// # Example
///
/// ```rust
/// use cpe_ecs_core::{MappingEntry, MappingStore};
///
/// let store = MappingStore::new();
/// let entry = MappingEntry::new("a", "10.0.0.1".parse().unwrap(), "192.168.1.1".parse().unwrap());
/// store.store(entry.cpe_address, entry);
///
/// let found = store.lookup(&"10.0.0.1".parse().unwrap()).unwrap();
/// assert_eq!(found.ecs_address, "192.168.1.1".parse::<std::net::IpAddr>().unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MappingStore {
    inner: RwLock<HashMap<IpAddr, Arc<MappingEntry>>>,
}

impl MappingStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry` under `key`, replacing any previous entry
    pub fn store(&self, key: IpAddr, entry: MappingEntry) {
        let entry = Arc::new(entry);
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_canonical(), entry);
    }

    /// Look up the entry for `key`
    ///
    /// A missing key is a normal outcome, not an error.
    pub fn lookup(&self, key: &IpAddr) -> Option<Arc<MappingEntry>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(&key.to_canonical()).cloned()
    }

    /// Get the number of entries in the store
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all entries, in no particular order
    pub fn snapshot(&self) -> Vec<Arc<MappingEntry>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag: &str, cpe: &str, ecs: &str) -> MappingEntry {
        MappingEntry::new(tag, cpe.parse().unwrap(), ecs.parse().unwrap())
    }

    #[test]
    fn test_store_basic() {
        let store = MappingStore::new();

        // Initially empty
        assert!(store.is_empty());
        assert!(store.lookup(&"10.0.0.1".parse().unwrap()).is_none());

        let e = entry("a", "10.0.0.1", "192.168.1.1");
        store.store(e.cpe_address, e);

        assert_eq!(store.len(), 1);
        let found = store.lookup(&"10.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.tag, "a");
        assert_eq!(found.ecs_address, "192.168.1.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_last_write_wins() {
        let store = MappingStore::new();

        for (tag, ecs) in [("a", "192.168.1.1"), ("b", "192.168.1.2"), ("c", "2001:db8::1")] {
            let e = entry(tag, "10.0.0.1", ecs);
            store.store(e.cpe_address, e);
        }

        assert_eq!(store.len(), 1);
        let found = store.lookup(&"10.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(found.tag, "c");
        assert!(found.is_v6);
    }

    #[test]
    fn test_lookup_is_canonical() {
        let store = MappingStore::new();
        let e = entry("a", "10.0.0.1", "192.168.1.1");
        store.store(e.cpe_address, e);

        assert!(store.lookup(&"::ffff:10.0.0.1".parse().unwrap()).is_some());
    }

    #[test]
    fn test_reader_keeps_superseded_entry() {
        let store = MappingStore::new();
        let e = entry("old", "10.0.0.1", "192.168.1.1");
        store.store(e.cpe_address, e);

        let held = store.lookup(&"10.0.0.1".parse().unwrap()).unwrap();
        let e = entry("new", "10.0.0.1", "192.168.1.2");
        store.store(e.cpe_address, e);

        assert_eq!(held.tag, "old");
        assert_eq!(store.lookup(&"10.0.0.1".parse().unwrap()).unwrap().tag, "new");
    }
}
