//! Group storage for one node
//!
//! Records are scoped by node id, and `(group_id, node_id)` is unique.
//! Supports an in-memory backend and RocksDB.

use crate::common::{Error, Group, Result};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Trait for group storage backends
pub trait GroupStore: Send + Sync {
    /// Insert a new group; `Error::Duplicate` if it already exists
    fn insert(&self, node_id: &str, group_id: &str) -> Result<Group>;
    fn get(&self, node_id: &str, group_id: &str) -> Result<Option<Group>>;
    /// Remove a group; `Error::NotFound` if it does not exist
    fn remove(&self, node_id: &str, group_id: &str) -> Result<()>;
    fn list(&self, node_id: &str) -> Result<Vec<Group>>;
    /// Remove every group of `node_id`, returning how many went
    fn clear(&self, node_id: &str) -> Result<usize>;
}

/// Open the backend selected by `db_path`
pub fn open_store(db_path: Option<&Path>) -> Result<Arc<dyn GroupStore>> {
    match db_path {
        Some(path) => Ok(Arc::new(RocksStore::open(path)?)),
        None => Ok(Arc::new(MemStore::new())),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Internal("store lock poisoned".into()))
}

/// In-memory store (default)
#[derive(Default)]
pub struct MemStore {
    map: Mutex<BTreeMap<(String, String), Group>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupStore for MemStore {
    fn insert(&self, node_id: &str, group_id: &str) -> Result<Group> {
        let mut map = lock(&self.map)?;
        let key = (node_id.to_string(), group_id.to_string());
        if map.contains_key(&key) {
            return Err(Error::Duplicate(group_id.to_string()));
        }
        let group = Group {
            group_id: group_id.to_string(),
            node_id: node_id.to_string(),
        };
        map.insert(key, group.clone());
        Ok(group)
    }

    fn get(&self, node_id: &str, group_id: &str) -> Result<Option<Group>> {
        let map = lock(&self.map)?;
        Ok(map
            .get(&(node_id.to_string(), group_id.to_string()))
            .cloned())
    }

    fn remove(&self, node_id: &str, group_id: &str) -> Result<()> {
        let mut map = lock(&self.map)?;
        map.remove(&(node_id.to_string(), group_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(group_id.to_string()))
    }

    fn list(&self, node_id: &str) -> Result<Vec<Group>> {
        let map = lock(&self.map)?;
        Ok(map
            .values()
            .filter(|g| g.node_id == node_id)
            .cloned()
            .collect())
    }

    fn clear(&self, node_id: &str) -> Result<usize> {
        let mut map = lock(&self.map)?;
        let before = map.len();
        map.retain(|(owner, _), _| owner != node_id);
        Ok(before - map.len())
    }
}

/// RocksDB store, key `node_id \0 group_id`, JSON value
pub struct RocksStore {
    db: DB,
    // serializes check-then-write in insert/remove
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn prefix(node_id: &str) -> Vec<u8> {
        let mut prefix = node_id.as_bytes().to_vec();
        prefix.push(0);
        prefix
    }

    fn key(node_id: &str, group_id: &str) -> Vec<u8> {
        let mut key = Self::prefix(node_id);
        key.extend_from_slice(group_id.as_bytes());
        key
    }

    fn decode(bytes: &[u8]) -> Result<Group> {
        serde_json::from_slice(bytes).map_err(|e| Error::Corrupted(e.to_string()))
    }

    fn scan(&self, node_id: &str) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let prefix = Self::prefix(node_id);
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_slice(), Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push((key, value));
        }
        Ok(entries)
    }
}

impl GroupStore for RocksStore {
    fn insert(&self, node_id: &str, group_id: &str) -> Result<Group> {
        let _guard = lock(&self.write_lock)?;
        let key = Self::key(node_id, group_id);
        if self.db.get(&key)?.is_some() {
            return Err(Error::Duplicate(group_id.to_string()));
        }
        let group = Group {
            group_id: group_id.to_string(),
            node_id: node_id.to_string(),
        };
        self.db.put(&key, serde_json::to_vec(&group)?)?;
        Ok(group)
    }

    fn get(&self, node_id: &str, group_id: &str) -> Result<Option<Group>> {
        match self.db.get(Self::key(node_id, group_id))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove(&self, node_id: &str, group_id: &str) -> Result<()> {
        let _guard = lock(&self.write_lock)?;
        let key = Self::key(node_id, group_id);
        if self.db.get(&key)?.is_none() {
            return Err(Error::NotFound(group_id.to_string()));
        }
        self.db.delete(&key)?;
        Ok(())
    }

    fn list(&self, node_id: &str) -> Result<Vec<Group>> {
        self.scan(node_id)?
            .iter()
            .map(|(_, value)| Self::decode(value))
            .collect()
    }

    fn clear(&self, node_id: &str) -> Result<usize> {
        let _guard = lock(&self.write_lock)?;
        let entries = self.scan(node_id)?;
        let mut batch = WriteBatch::default();
        for (key, _) in &entries {
            batch.delete(key);
        }
        self.db.write(batch)?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn GroupStore) {
        let created = store.insert("node-1", "1").unwrap();
        assert_eq!(created.group_id, "1");
        assert_eq!(created.node_id, "node-1");

        // (group_id, node_id) is unique
        assert!(matches!(
            store.insert("node-1", "1"),
            Err(Error::Duplicate(_))
        ));
        // ... but the same group id may exist under another node
        store.insert("node-2", "1").unwrap();
        store.insert("node-1", "2").unwrap();

        assert_eq!(store.get("node-1", "1").unwrap(), Some(created));
        assert_eq!(store.get("node-1", "3").unwrap(), None);

        let ids: Vec<String> = store
            .list("node-1")
            .unwrap()
            .into_iter()
            .map(|g| g.group_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        store.remove("node-1", "1").unwrap();
        assert!(matches!(
            store.remove("node-1", "1"),
            Err(Error::NotFound(_))
        ));

        assert_eq!(store.clear("node-1").unwrap(), 1);
        assert!(store.list("node-1").unwrap().is_empty());
        assert_eq!(store.list("node-2").unwrap().len(), 1);
    }

    #[test]
    fn test_mem_store() {
        exercise(&MemStore::new());
    }

    #[test]
    fn test_rocks_store() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path().join("db")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_rocks_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        {
            let store = RocksStore::open(&path).unwrap();
            store.insert("node-1", "42").unwrap();
        }
        let store = RocksStore::open(&path).unwrap();
        assert!(store.get("node-1", "42").unwrap().is_some());
    }

    #[test]
    fn test_prefix_does_not_leak_across_nodes() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path().join("db")).unwrap();
        store.insert("node-1", "a").unwrap();
        store.insert("node-10", "b").unwrap();
        assert_eq!(store.list("node-1").unwrap().len(), 1);
        assert_eq!(store.clear("node-1").unwrap(), 1);
        assert_eq!(store.list("node-10").unwrap().len(), 1);
    }
}
