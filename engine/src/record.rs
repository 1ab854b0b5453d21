//! Mirror record types.

use crate::{error::Result, BudgetId, Cursor, EntityId, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower date bound sent with every transactions delta request.
pub const EPOCH_DATE: &str = "1970-01-01";

/// A remote entity collection that can be mirrored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Accounts,
    Payees,
    Transactions,
}

impl Collection {
    /// Every mirrored collection.
    pub const ALL: [Collection; 3] = [
        Collection::Accounts,
        Collection::Payees,
        Collection::Transactions,
    ];

    /// Name used for the URL path segment, the response key and the
    /// stored collection column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::Payees => "payees",
            Collection::Transactions => "transactions",
        }
    }

    /// Date lower bound for delta requests, if the collection takes one.
    pub fn since_date(&self) -> Option<&'static str> {
        match self {
            Collection::Transactions => Some(EPOCH_DATE),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accounts" => Ok(Collection::Accounts),
            "payees" => Ok(Collection::Payees),
            "transactions" => Ok(Collection::Transactions),
            other => Err(Error::UnknownCollection(other.to_string())),
        }
    }
}

/// The unit of reconciliation: one collection of one budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub budget_id: BudgetId,
    pub collection: Collection,
}

impl Partition {
    pub fn new(budget_id: impl Into<BudgetId>, collection: Collection) -> Self {
        Self {
            budget_id: budget_id.into(),
            collection,
        }
    }

    /// Stable textual key, used for lock names.
    pub fn key(&self) -> String {
        format!("{}/{}", self.budget_id, self.collection)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Extract the remote id of a payload.
pub fn entity_id_of(payload: &serde_json::Value) -> Result<&str> {
    payload
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or(Error::MissingEntityId)
}

/// Whether the remote marked a payload as tombstoned. A missing flag means live.
pub fn is_deleted(payload: &serde_json::Value) -> bool {
    payload
        .get("deleted")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// A locally mirrored copy of one remote entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorRecord {
    /// Budget this record belongs to
    pub budget_id: BudgetId,
    /// Collection this record belongs to
    pub collection: Collection,
    /// Remote-assigned identifier, unique within the partition
    pub entity_id: EntityId,
    /// Payload exactly as returned by the remote API
    pub payload: serde_json::Value,
    /// Remote cursor as of which the payload was last confirmed
    pub change_cursor: Cursor,
}

impl MirrorRecord {
    /// Create a new record.
    pub fn new(
        partition: &Partition,
        entity_id: impl Into<EntityId>,
        payload: serde_json::Value,
        change_cursor: Cursor,
    ) -> Self {
        Self {
            budget_id: partition.budget_id.clone(),
            collection: partition.collection,
            entity_id: entity_id.into(),
            payload,
            change_cursor,
        }
    }

    /// Wrap a remote payload, taking the entity id from its `id` field.
    pub fn from_remote(
        partition: &Partition,
        payload: serde_json::Value,
        change_cursor: Cursor,
    ) -> Result<Self> {
        let entity_id = entity_id_of(&payload)?.to_string();
        Ok(Self::new(partition, entity_id, payload, change_cursor))
    }

    /// The partition this record lives in.
    pub fn partition(&self) -> Partition {
        Partition::new(self.budget_id.clone(), self.collection)
    }

    /// Check if the remote entity was tombstoned.
    pub fn is_deleted(&self) -> bool {
        is_deleted(&self.payload)
    }

    /// Replace the payload, keeping the confirmed cursor.
    pub fn refresh_payload(&mut self, payload: serde_json::Value) {
        self.payload = payload;
    }
}
