//! Read-only payee analyses.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Payee the remote creates for reconciliation adjustments. Never unused.
pub const RESERVED_PAYEE_NAME: &str = "Manual Balance Adjustment";

/// The parts of a payee shown to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeRef {
    pub id: String,
    pub name: String,
}

impl PayeeRef {
    fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let id = payload.get("id")?.as_str()?;
        let name = payload.get("name").and_then(|v| v.as_str()).unwrap_or("");
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
        })
    }
}

/// Distinct payee ids referenced by any transaction.
pub fn used_payee_ids(transactions: &[serde_json::Value]) -> HashSet<&str> {
    transactions
        .iter()
        .filter_map(|t| t.get("payee_id").and_then(|v| v.as_str()))
        .collect()
}

fn is_transfer(payee: &serde_json::Value) -> bool {
    payee
        .get("transfer_account_id")
        .is_some_and(|v| !v.is_null())
}

fn is_reserved(payee: &serde_json::Value) -> bool {
    payee.get("name").and_then(|v| v.as_str()) == Some(RESERVED_PAYEE_NAME)
}

/// Payees no transaction refers to.
///
/// Reserved, transfer and tombstoned payees are never reported. The result
/// is sorted by name, ignoring case.
pub fn unused_payees(
    payees: &[serde_json::Value],
    transactions: &[serde_json::Value],
) -> Vec<PayeeRef> {
    let used = used_payee_ids(transactions);

    let mut unused: Vec<PayeeRef> = payees
        .iter()
        .filter(|p| !is_reserved(p) && !is_transfer(p) && !crate::record::is_deleted(p))
        .filter_map(PayeeRef::from_payload)
        .filter(|p| !used.contains(p.id.as_str()))
        .collect();

    sort_by_name(&mut unused);
    unused
}

/// Payees offered when searching transactions by payee.
///
/// With a scoped transaction set only payees that set refers to are kept.
pub fn payee_choices(
    payees: &[serde_json::Value],
    scoped_transactions: Option<&[serde_json::Value]>,
) -> Vec<PayeeRef> {
    let used = scoped_transactions.map(used_payee_ids);

    let mut choices: Vec<PayeeRef> = payees
        .iter()
        .filter(|p| !crate::record::is_deleted(p))
        .filter_map(PayeeRef::from_payload)
        .filter(|p| used.as_ref().map_or(true, |u| u.contains(p.id.as_str())))
        .collect();

    sort_by_name(&mut choices);
    choices
}

fn sort_by_name(payees: &mut [PayeeRef]) {
    payees.sort_by(|a, b| {
        a.name
            .to_uppercase()
            .cmp(&b.name.to_uppercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}
