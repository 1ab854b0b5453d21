//! Batch memo edits.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// How new text is combined with an existing memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Add text to the beginning. Spaces are kept as given.
    Prepend,
    /// Add text to the end. Spaces are kept as given.
    Append,
    /// Replace the memo.
    Overwrite,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Prepend => write!(f, "prepend"),
            EditMode::Append => write!(f, "append"),
            EditMode::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl FromStr for EditMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prepend" => Ok(EditMode::Prepend),
            "append" => Ok(EditMode::Append),
            "overwrite" => Ok(EditMode::Overwrite),
            other => Err(Error::InvalidPayload(format!("unknown edit mode: {other}"))),
        }
    }
}

/// An edit to apply to the memo of every selected transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoEdit {
    pub mode: EditMode,
    pub text: String,
}

impl MemoEdit {
    pub fn new(mode: EditMode, text: impl Into<String>) -> Self {
        Self {
            mode,
            text: text.into(),
        }
    }

    /// The memo after the edit. A missing memo counts as empty.
    pub fn apply(&self, memo: Option<&str>) -> String {
        let memo = memo.unwrap_or("");
        match self.mode {
            EditMode::Prepend => format!("{}{}", self.text, memo),
            EditMode::Append => format!("{}{}", memo, self.text),
            EditMode::Overwrite => self.text.clone(),
        }
    }

    /// Build the update batch for a set of transactions.
    ///
    /// Each entry carries only `id` and the new `memo`, which is all the bulk
    /// endpoint needs to change a memo. The id is passed through as given,
    /// string or number.
    pub fn build_batch(&self, transactions: &[Value]) -> Result<Vec<Value>> {
        transactions
            .iter()
            .map(|transaction| {
                let id = match transaction.get("id") {
                    Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
                    _ => return Err(Error::MissingEntityId),
                };
                let memo = transaction.get("memo").and_then(|v| v.as_str());
                Ok(json!({ "id": id, "memo": self.apply(memo) }))
            })
            .collect()
    }
}
