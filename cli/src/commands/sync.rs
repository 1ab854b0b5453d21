//! `sync`: reconcile every mirrored collection of a budget.

use crate::api::BudgetSummary;
use crate::context::Context;
use crate::error::{Error, Result};

pub async fn run(ctx: &Context, budget: &BudgetSummary) -> Result<()> {
    let sync = ctx
        .sync()
        .ok_or_else(|| Error::invalid_input("mirroring is disabled; set DATABASE_URL"))?;

    for summary in sync.reconcile_all(&budget.id).await? {
        println!(
            "{:<13} cursor {} -> {}  ({} upserted, {} deleted)",
            summary.partition.collection.as_str(),
            summary.from_cursor,
            summary.to_cursor,
            summary.upserted,
            summary.deleted
        );
    }
    Ok(())
}
