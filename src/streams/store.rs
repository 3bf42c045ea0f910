use crate::error::Result;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// An ordered in-memory key-value store.
///
/// Point stores are keyed by serialized record keys, range stores by composite
/// index strings; both rely on the ordering for scans.
#[derive(Debug)]
pub struct KeyValueStore<K: Ord> {
    entries: RwLock<BTreeMap<K, Vec<u8>>>,
}

impl<K: Ord + Clone> KeyValueStore<K> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read()?.get(key).cloned())
    }

    pub fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.entries.read()?.contains_key(key))
    }

    pub fn put(&self, key: K, value: Vec<u8>) -> Result<()> {
        self.entries.write()?.insert(key, value);
        Ok(())
    }

    pub fn delete(&self, key: &K) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.write()?.remove(key))
    }

    /// Values with keys in `[from, to]`, in key order. Empty when `from > to`.
    pub fn range(&self, from: &K, to: &K) -> Result<Vec<Vec<u8>>> {
        if from > to {
            return Ok(vec![]);
        }
        let entries = self.entries.read()?;
        Ok(entries
            .range((Bound::Included(from), Bound::Included(to)))
            .map(|(_, v)| v.clone())
            .collect())
    }

    pub fn all(&self) -> Result<Vec<(K, Vec<u8>)>> {
        Ok(self
            .entries
            .read()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<K: Ord + Clone> Default for KeyValueStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore<String> {
    /// Removes every key starting with `prefix`, returning how many were removed.
    pub fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write()?;
        let doomed: Vec<String> = entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();

        for key in doomed.iter() {
            entries.remove(key);
        }
        Ok(doomed.len())
    }
}
