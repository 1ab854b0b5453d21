//! `payees`: payees available for a transaction search.

use mirror_engine::{payee_choices, PayeeRef, RecordFilter};

use super::resolve_account;
use crate::api::BudgetSummary;
use crate::context::Context;
use crate::error::Result;

/// Payees to pick from, limited to those the account's transactions use
/// when an account is given.
pub async fn choices(ctx: &Context, budget_id: &str, scope: Option<&str>) -> Result<Vec<PayeeRef>> {
    let query = ctx.query();
    let everything = RecordFilter::new();
    let payees = query.list_payees(budget_id, &everything).await?;

    match scope {
        Some(account_id) => {
            let transactions = query
                .list_transactions(budget_id, Some(account_id), &everything)
                .await?;
            Ok(payee_choices(&payees, Some(&transactions)))
        }
        None => Ok(payee_choices(&payees, None)),
    }
}

pub async fn run(ctx: &Context, budget: &BudgetSummary, account: Option<&str>) -> Result<()> {
    let scope = match account {
        Some(wanted) => Some(resolve_account(ctx, &budget.id, wanted).await?),
        None => None,
    };

    for payee in choices(ctx, &budget.id, scope.as_deref()).await? {
        println!("{}  {}", payee.id, payee.name);
    }
    Ok(())
}
