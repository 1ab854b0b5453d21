//! Database operations for the mirror_records table.

use mirror_engine::{Cursor, MirrorRecord, Partition};
use sqlx::{PgPool, Row};

use crate::mirror::StoreError;

/// A stored record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    pub budget_id: String,
    pub collection: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub change_cursor: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            budget_id: row.try_get("budget_id")?,
            collection: row.try_get("collection")?,
            entity_id: row.try_get("entity_id")?,
            payload: row.try_get("payload")?,
            change_cursor: row.try_get("change_cursor")?,
        })
    }
}

impl StoredRecord {
    /// Convert a database row to a mirror record.
    pub fn into_record(self) -> Result<MirrorRecord, StoreError> {
        let collection = self
            .collection
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown collection '{}'", self.collection)))?;
        let change_cursor = Cursor::try_from(self.change_cursor).map_err(|_| {
            StoreError::Corrupt(format!(
                "negative cursor {} on {}",
                self.change_cursor, self.entity_id
            ))
        })?;

        let partition = Partition::new(self.budget_id, collection);
        Ok(MirrorRecord::new(
            &partition,
            self.entity_id,
            self.payload,
            change_cursor,
        ))
    }
}

/// Cursors are stored as BIGINT.
pub fn cursor_column(cursor: Cursor) -> Result<i64, StoreError> {
    i64::try_from(cursor).map_err(|_| StoreError::Corrupt(format!("cursor {cursor} out of range")))
}

/// Upsert a record (insert or update).
pub async fn upsert_record(pool: &PgPool, record: &MirrorRecord) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO mirror_records (budget_id, collection, entity_id, payload, change_cursor)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (budget_id, collection, entity_id) DO UPDATE SET
            payload = EXCLUDED.payload,
            change_cursor = EXCLUDED.change_cursor
        "#,
    )
    .bind(&record.budget_id)
    .bind(record.collection.as_str())
    .bind(&record.entity_id)
    .bind(&record.payload)
    .bind(cursor_column(record.change_cursor)?)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a record by partition and entity id.
pub async fn get_record(
    pool: &PgPool,
    partition: &Partition,
    entity_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT budget_id, collection, entity_id, payload, change_cursor
        FROM mirror_records
        WHERE budget_id = $1 AND collection = $2 AND entity_id = $3
        "#,
    )
    .bind(&partition.budget_id)
    .bind(partition.collection.as_str())
    .bind(entity_id)
    .fetch_optional(pool)
    .await
}

/// Get all records in a partition.
pub async fn get_records_in_partition(
    pool: &PgPool,
    partition: &Partition,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT budget_id, collection, entity_id, payload, change_cursor
        FROM mirror_records
        WHERE budget_id = $1 AND collection = $2
        ORDER BY entity_id
        "#,
    )
    .bind(&partition.budget_id)
    .bind(partition.collection.as_str())
    .fetch_all(pool)
    .await
}

/// Delete a record. Returns whether a row was removed.
pub async fn delete_record(
    pool: &PgPool,
    partition: &Partition,
    entity_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM mirror_records
        WHERE budget_id = $1 AND collection = $2 AND entity_id = $3
        "#,
    )
    .bind(&partition.budget_id)
    .bind(partition.collection.as_str())
    .bind(entity_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Raise every cursor in a partition below `cursor` to `cursor`.
pub async fn advance_partition_cursor(
    pool: &PgPool,
    partition: &Partition,
    cursor: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE mirror_records
        SET change_cursor = $3
        WHERE budget_id = $1 AND collection = $2 AND change_cursor < $3
        "#,
    )
    .bind(&partition.budget_id)
    .bind(partition.collection.as_str())
    .bind(cursor)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
