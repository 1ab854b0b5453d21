//! Local persistence for mirrored records.
//!
//! A [`MirrorStore`] offers single-record writes plus one bulk cursor
//! update. There is no multi-record transaction: a reconciliation pass that
//! fails midway leaves the writes it already made, and the next pass picks up
//! from the minimum stored cursor.

mod memory;

pub use memory::MemoryMirrorStore;

use async_trait::async_trait;
use mirror_engine::{Cursor, MirrorRecord, Partition};
use std::any::Any;
use std::fmt;

/// Errors raised by mirror stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row that cannot be turned back into a record
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Exclusive access to one partition.
///
/// Held for the duration of a reconciliation pass or a write-back mirror
/// update. Dropping the lease releases the partition.
pub struct PartitionLease {
    partition: Partition,
    _guard: Box<dyn Any + Send>,
}

impl PartitionLease {
    pub fn new(partition: Partition, guard: impl Any + Send) -> Self {
        Self {
            partition,
            _guard: Box::new(guard),
        }
    }
}

impl fmt::Debug for PartitionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionLease")
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

/// Storage for mirrored records, scoped by partition.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Wait for exclusive access to a partition.
    async fn lease(&self, partition: &Partition) -> Result<PartitionLease, StoreError>;

    /// Every record of a partition.
    async fn find(&self, partition: &Partition) -> Result<Vec<MirrorRecord>, StoreError>;

    async fn find_one(
        &self,
        partition: &Partition,
        entity_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError>;

    /// Insert or overwrite one record.
    async fn upsert(&self, record: &MirrorRecord) -> Result<(), StoreError>;

    /// Remove one record. Returns whether it existed.
    async fn delete(&self, partition: &Partition, entity_id: &str) -> Result<bool, StoreError>;

    /// Raise every cursor of the partition that is below `cursor`.
    /// Returns the number of records changed.
    async fn advance_cursor(&self, partition: &Partition, cursor: Cursor)
        -> Result<u64, StoreError>;
}
