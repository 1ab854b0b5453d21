//! `budgets`: list the budgets the token can access.

use crate::context::Context;
use crate::error::Result;

pub async fn run(ctx: &Context) -> Result<()> {
    let budgets = ctx.api().list_budgets().await?;

    if budgets.is_empty() {
        println!("No budgets found.");
        return Ok(());
    }
    for budget in budgets {
        println!("{}  {}", budget.id, budget.name);
    }
    Ok(())
}
