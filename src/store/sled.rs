//! Embedded persistent cluster-state backend

use crate::common::Result;
use crate::store::ClusterStore;
use std::path::Path;

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

impl ClusterStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|ivec| ivec.to_vec()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        // sled's remove returns the previous value atomically, which
        // gives delete-if-present without an extra read.
        let existed = self.db.remove(key)?.is_some();
        self.db.flush()?;
        Ok(existed)
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<Vec<u8>>> {
        let mut values = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (_, value) = item?;
            values.push(value.to_vec());
        }
        Ok(values)
    }
}
