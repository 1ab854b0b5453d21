//! In-process mirror store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use mirror_engine::{Cursor, MirrorRecord, Partition, PartitionStore};
use tokio::sync::Mutex;

use super::{MirrorStore, PartitionLease, StoreError};

/// Mirror kept in memory for the life of the process.
///
/// Leases are per-partition async mutexes, so concurrent passes over one
/// partition queue up while other partitions proceed.
#[derive(Debug, Default)]
pub struct MemoryMirrorStore {
    partitions: DashMap<Partition, PartitionStore>,
    locks: DashMap<Partition, Arc<Mutex<()>>>,
}

impl MemoryMirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared store.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Copy of a partition's current contents.
    pub fn snapshot(&self, partition: &Partition) -> PartitionStore {
        self.partitions
            .get(partition)
            .map(|store| store.clone())
            .unwrap_or_default()
    }

    fn lock_for(&self, partition: &Partition) -> Arc<Mutex<()>> {
        self.locks
            .entry(partition.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl MirrorStore for MemoryMirrorStore {
    async fn lease(&self, partition: &Partition) -> Result<PartitionLease, StoreError> {
        // The map guard must be gone before awaiting the lock.
        let lock = self.lock_for(partition);
        let guard = lock.lock_owned().await;
        Ok(PartitionLease::new(partition.clone(), guard))
    }

    async fn find(&self, partition: &Partition) -> Result<Vec<MirrorRecord>, StoreError> {
        Ok(self
            .partitions
            .get(partition)
            .map(|store| store.records().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        partition: &Partition,
        entity_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError> {
        Ok(self
            .partitions
            .get(partition)
            .and_then(|store| store.get(entity_id).cloned()))
    }

    async fn upsert(&self, record: &MirrorRecord) -> Result<(), StoreError> {
        self.partitions
            .entry(record.partition())
            .or_default()
            .upsert(record.clone());
        Ok(())
    }

    async fn delete(&self, partition: &Partition, entity_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .partitions
            .get_mut(partition)
            .is_some_and(|mut store| store.delete(entity_id)))
    }

    async fn advance_cursor(
        &self,
        partition: &Partition,
        cursor: Cursor,
    ) -> Result<u64, StoreError> {
        Ok(self
            .partitions
            .get_mut(partition)
            .map(|mut store| store.advance_cursor(cursor) as u64)
            .unwrap_or(0))
    }
}
