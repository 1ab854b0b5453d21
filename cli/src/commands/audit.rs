//! `audit-payees`: report payees no transaction uses.

use mirror_engine::{unused_payees, PayeeRef, RecordFilter};

use crate::api::BudgetSummary;
use crate::context::Context;
use crate::error::Result;

/// Unused payees of a budget, sorted by name.
pub async fn unused(ctx: &Context, budget_id: &str) -> Result<Vec<PayeeRef>> {
    let query = ctx.query();
    let everything = RecordFilter::new();

    let payees = query.list_payees(budget_id, &everything).await?;
    let transactions = query.list_transactions(budget_id, None, &everything).await?;

    Ok(unused_payees(&payees, &transactions))
}

pub async fn run(ctx: &Context, budget: &BudgetSummary) -> Result<()> {
    let payees = unused(ctx, &budget.id).await?;

    if payees.is_empty() {
        println!("No unused payees found.");
        return Ok(());
    }
    println!("Unused payees:");
    for payee in payees {
        println!("  {}", payee.name);
    }
    Ok(())
}
