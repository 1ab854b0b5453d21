//! Payload filters for mirror queries.
//!
//! A [`RecordFilter`] is a conjunction of per-field conditions evaluated
//! against remote payloads. The same filter runs against a refreshed mirror
//! and against a direct remote listing, so both paths agree on results.

use crate::{error::Result, Error};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a single field is matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Match {
    /// Structural JSON equality
    Equals { value: serde_json::Value },
    /// Substring match on a text field
    #[serde(rename_all = "camelCase")]
    Contains {
        needle: String,
        case_insensitive: bool,
    },
}

/// A condition on one top-level payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub field: String,
    #[serde(flatten)]
    pub matcher: Match,
}

impl Condition {
    /// Evaluate against a payload. Missing and null fields never match.
    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        let value = match payload.get(&self.field) {
            None | Some(serde_json::Value::Null) => return false,
            Some(v) => v,
        };

        match &self.matcher {
            Match::Equals { value: expected } => value == expected,
            Match::Contains {
                needle,
                case_insensitive,
            } => match value.as_str() {
                Some(text) if *case_insensitive => {
                    text.to_lowercase().contains(&needle.to_lowercase())
                }
                Some(text) => text.contains(needle.as_str()),
                None => false,
            },
        }
    }
}

/// Conjunction of conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    conditions: Vec<Condition>,
}

impl RecordFilter {
    /// Create a filter that matches every payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            matcher: Match::Equals {
                value: value.into(),
            },
        });
        self
    }

    /// Require text `field` to contain `needle`, ignoring case.
    pub fn contains(self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.contains_with_case(field, needle, true)
    }

    /// Require text `field` to contain `needle` with explicit case handling.
    pub fn contains_with_case(
        mut self,
        field: impl Into<String>,
        needle: impl Into<String>,
        case_insensitive: bool,
    ) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            matcher: Match::Contains {
                needle: needle.into(),
                case_insensitive,
            },
        });
        self
    }

    /// Combine two filters.
    pub fn and(mut self, other: RecordFilter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, payload: &serde_json::Value) -> bool {
        self.conditions.iter().all(|c| c.matches(payload))
    }

    /// Keep the matching payloads.
    pub fn apply<I>(&self, payloads: I) -> Vec<serde_json::Value>
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        payloads.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// Restrict transactions to one account.
pub fn account_scope(account_id: &str) -> RecordFilter {
    RecordFilter::new().eq("account_id", account_id)
}

/// Parse a remote `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(input.to_string()))
}

/// Ways of selecting transactions for a batch edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSearch {
    /// Memo contains the text, ignoring case
    MemoContains(String),
    /// Transactions of one payee id
    Payee(String),
    /// Transactions dated exactly this day
    Date(NaiveDate),
}

impl TransactionSearch {
    pub fn to_filter(&self) -> RecordFilter {
        match self {
            TransactionSearch::MemoContains(text) => {
                RecordFilter::new().contains("memo", text.as_str())
            }
            TransactionSearch::Payee(payee_id) => {
                RecordFilter::new().eq("payee_id", payee_id.as_str())
            }
            TransactionSearch::Date(date) => {
                RecordFilter::new().eq("date", date.format("%Y-%m-%d").to_string())
            }
        }
    }
}
