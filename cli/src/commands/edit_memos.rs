//! `edit-memos`: select transactions and rewrite their memos in one batch.

use clap::Args;
use mirror_engine::{parse_date, EditMode, MemoEdit, PayeeRef, TransactionSearch};

use super::{payees, plural, resolve_account};
use crate::api::BudgetSummary;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::prompt;

#[derive(Debug, Clone, Args)]
pub struct EditMemosArgs {
    /// Only transactions of this account (id or name)
    #[arg(long)]
    pub account: Option<String>,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(flatten)]
    pub action: ActionArgs,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// How transactions are selected. Exactly one is required.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct SearchArgs {
    /// Memo contains this text, ignoring case
    #[arg(long)]
    pub memo_contains: Option<String>,

    /// Payee id or name
    #[arg(long)]
    pub payee: Option<String>,

    /// Exact date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
}

/// What to do to each memo. Exactly one is required.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct ActionArgs {
    /// Add text to the beginning of the memo (spaces are kept)
    #[arg(long, allow_hyphen_values = true)]
    pub prepend: Option<String>,

    /// Add text to the end of the memo (spaces are kept)
    #[arg(long, allow_hyphen_values = true)]
    pub append: Option<String>,

    /// Replace the memo
    #[arg(long, allow_hyphen_values = true)]
    pub overwrite: Option<String>,
}

impl ActionArgs {
    pub fn to_edit(&self) -> Result<MemoEdit> {
        match (&self.prepend, &self.append, &self.overwrite) {
            (Some(text), None, None) => Ok(MemoEdit::new(EditMode::Prepend, text.as_str())),
            (None, Some(text), None) => Ok(MemoEdit::new(EditMode::Append, text.as_str())),
            (None, None, Some(text)) => Ok(MemoEdit::new(EditMode::Overwrite, text.as_str())),
            _ => Err(Error::invalid_input(
                "exactly one of --prepend, --append or --overwrite is required",
            )),
        }
    }
}

/// Turn the search flags into a search, resolving a payee name among the
/// payees the scoped transactions use.
pub async fn resolve_search(
    ctx: &Context,
    budget_id: &str,
    scope: Option<&str>,
    args: &SearchArgs,
) -> Result<TransactionSearch> {
    match (&args.memo_contains, &args.payee, &args.date) {
        (Some(text), None, None) => Ok(TransactionSearch::MemoContains(text.clone())),
        (None, Some(wanted), None) => {
            let choices = payees::choices(ctx, budget_id, scope).await?;
            let payee = pick_payee(&choices, wanted)?;
            Ok(TransactionSearch::Payee(payee.id.clone()))
        }
        (None, None, Some(date)) => Ok(TransactionSearch::Date(parse_date(date)?)),
        _ => Err(Error::invalid_input(
            "exactly one of --memo-contains, --payee or --date is required",
        )),
    }
}

fn pick_payee<'a>(choices: &'a [PayeeRef], wanted: &str) -> Result<&'a PayeeRef> {
    if let Some(payee) = choices.iter().find(|p| p.id == wanted) {
        return Ok(payee);
    }

    let named: Vec<&PayeeRef> = choices
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(wanted))
        .collect();
    match named.as_slice() {
        [payee] => Ok(*payee),
        [] => Err(Error::invalid_input(format!("no payee matches '{wanted}'"))),
        _ => Err(Error::invalid_input(format!(
            "payee name '{wanted}' is ambiguous; use its id"
        ))),
    }
}

/// Transactions a batch edit would touch.
pub async fn select_transactions(
    ctx: &Context,
    budget_id: &str,
    scope: Option<&str>,
    search: &TransactionSearch,
) -> Result<Vec<serde_json::Value>> {
    ctx.query()
        .list_transactions(budget_id, scope, &search.to_filter())
        .await
}

/// Edit the memos of `transactions` and push the batch upstream.
pub async fn apply(
    ctx: &Context,
    budget_id: &str,
    transactions: &[serde_json::Value],
    edit: &MemoEdit,
) -> Result<Vec<serde_json::Value>> {
    let batch = edit.build_batch(transactions)?;
    ctx.write_back().apply_edits(budget_id, batch).await
}

pub async fn run(ctx: &Context, budget: &BudgetSummary, args: &EditMemosArgs) -> Result<()> {
    let edit = args.action.to_edit()?;
    let scope = match &args.account {
        Some(wanted) => Some(resolve_account(ctx, &budget.id, wanted).await?),
        None => None,
    };
    let search = resolve_search(ctx, &budget.id, scope.as_deref(), &args.search).await?;

    let transactions = select_transactions(ctx, &budget.id, scope.as_deref(), &search).await?;
    if transactions.is_empty() {
        println!("No matching transactions found.");
        return Ok(());
    }
    println!("Matching transactions: {}", transactions.len());

    if !args.yes {
        let question = format!(
            "Update {} ({} with '{}')?",
            plural(transactions.len(), "transaction"),
            edit.mode,
            edit.text
        );
        if !prompt::confirm(&question)? {
            println!("No changes made.");
            return Ok(());
        }
    }

    let updated = apply(ctx, &budget.id, &transactions, &edit).await?;
    println!("Updated {}.", plural(updated.len(), "transaction"));
    Ok(())
}
