//! In-memory cluster-state backend (tests and `--db`-less dev runs)

use crate::common::Result;
use crate::store::ClusterStore;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub struct MemStore {
    map: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(BTreeMap::new()),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.map.lock().unwrap()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterStore for MemStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.locked().get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.locked().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.locked().remove(key).is_some())
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .locked()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }
}
