//! CLI command implementations.

pub mod audit;
pub mod budgets;
pub mod edit_memos;
pub mod payees;
pub mod sync;

use mirror_engine::RecordFilter;

use crate::context::Context;
use crate::error::{Error, Result};

/// Resolve an account given by id or name (ignoring case) to its id.
pub async fn resolve_account(ctx: &Context, budget_id: &str, wanted: &str) -> Result<String> {
    let accounts = ctx
        .query()
        .list_accounts(budget_id, &RecordFilter::new())
        .await?;

    let text = |account: &serde_json::Value, key: &str| -> Option<String> {
        account.get(key).and_then(|v| v.as_str()).map(str::to_string)
    };

    if accounts.iter().any(|a| text(a, "id").as_deref() == Some(wanted)) {
        return Ok(wanted.to_string());
    }

    let matches: Vec<String> = accounts
        .iter()
        .filter(|a| text(a, "name").is_some_and(|name| name.eq_ignore_ascii_case(wanted)))
        .filter_map(|a| text(a, "id"))
        .collect();

    match matches.as_slice() {
        [id] => Ok(id.clone()),
        [] => Err(Error::invalid_input(format!("no account matches '{wanted}'"))),
        _ => Err(Error::invalid_input(format!(
            "account name '{wanted}' is ambiguous; use its id"
        ))),
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
