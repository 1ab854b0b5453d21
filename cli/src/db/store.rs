//! PostgreSQL-backed mirror store.

use async_trait::async_trait;
use mirror_engine::{Cursor, MirrorRecord, Partition};

use super::{records, Pool};
use crate::mirror::{MirrorStore, PartitionLease, StoreError};

/// Mirror persisted in the `mirror_records` table.
///
/// A lease is an open transaction holding a transaction-scoped advisory lock
/// on the partition key, so passes over one partition also serialize across
/// processes. Record writes run outside that transaction and commit one at a
/// time.
#[derive(Debug, Clone)]
pub struct PgMirrorStore {
    pool: Pool,
}

impl PgMirrorStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Connect, apply pending migrations and return the store.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = super::create_pool(database_url, max_connections).await?;
        tracing::debug!("Running mirror migrations");
        super::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MirrorStore for PgMirrorStore {
    async fn lease(&self, partition: &Partition) -> Result<PartitionLease, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(partition.key())
            .execute(&mut *tx)
            .await?;
        // Never committed: dropping the lease rolls back and unlocks.
        Ok(PartitionLease::new(partition.clone(), tx))
    }

    async fn find(&self, partition: &Partition) -> Result<Vec<MirrorRecord>, StoreError> {
        records::get_records_in_partition(&self.pool, partition)
            .await?
            .into_iter()
            .map(records::StoredRecord::into_record)
            .collect()
    }

    async fn find_one(
        &self,
        partition: &Partition,
        entity_id: &str,
    ) -> Result<Option<MirrorRecord>, StoreError> {
        records::get_record(&self.pool, partition, entity_id)
            .await?
            .map(records::StoredRecord::into_record)
            .transpose()
    }

    async fn upsert(&self, record: &MirrorRecord) -> Result<(), StoreError> {
        records::upsert_record(&self.pool, record).await
    }

    async fn delete(&self, partition: &Partition, entity_id: &str) -> Result<bool, StoreError> {
        Ok(records::delete_record(&self.pool, partition, entity_id).await?)
    }

    async fn advance_cursor(
        &self,
        partition: &Partition,
        cursor: Cursor,
    ) -> Result<u64, StoreError> {
        let cursor = records::cursor_column(cursor)?;
        Ok(records::advance_partition_cursor(&self.pool, partition, cursor).await?)
    }
}
