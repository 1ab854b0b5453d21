//! budget-mirror command-line entry point.

use budget_mirror::commands::{self, edit_memos::EditMemosArgs};
use budget_mirror::config::ConfigError;
use budget_mirror::{prompt, BudgetSummary, Config, Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Bulk edits and audits for a YNAB budget.
#[derive(Parser)]
#[command(name = "budget-mirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Budget to work on (id or name)
    #[arg(global = true, short, long, env = "YNAB_BUDGET")]
    budget: Option<String>,

    /// Query the remote directly even if DATABASE_URL is set
    #[arg(global = true, long)]
    no_mirror: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the budgets the token can access
    Budgets,

    /// Report payees that no transaction uses
    AuditPayees,

    /// List payees, optionally only those used in one account
    Payees {
        /// Account id or name
        #[arg(long)]
        account: Option<String>,
    },

    /// Prepend, append or overwrite the memo of matching transactions
    EditMemos(EditMemosArgs),

    /// Bring the local mirror up to date
    Sync,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("budget_mirror=debug,mirror_engine=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "budget_mirror=info,mirror_engine=info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::from(e.severity().exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;

    let token = match &config.api_token {
        Some(token) => token.clone(),
        None => prompt::read_token()?,
    };
    if token.is_empty() {
        return Err(ConfigError::MissingToken.into());
    }

    let ctx = Context::connect(&config, &token, !cli.no_mirror).await?;
    if !ctx.mirror_enabled() {
        tracing::debug!("Querying the remote directly");
    }

    match cli.command {
        Commands::Budgets => commands::budgets::run(&ctx).await,
        Commands::AuditPayees => {
            let budget = budget(&ctx, cli.budget.as_deref()).await?;
            commands::audit::run(&ctx, &budget).await
        }
        Commands::Payees { account } => {
            let budget = budget(&ctx, cli.budget.as_deref()).await?;
            commands::payees::run(&ctx, &budget, account.as_deref()).await
        }
        Commands::EditMemos(args) => {
            let budget = budget(&ctx, cli.budget.as_deref()).await?;
            commands::edit_memos::run(&ctx, &budget, &args).await
        }
        Commands::Sync => {
            let budget = budget(&ctx, cli.budget.as_deref()).await?;
            commands::sync::run(&ctx, &budget).await
        }
    }
}

async fn budget(ctx: &Context, wanted: Option<&str>) -> Result<BudgetSummary> {
    let budget = ctx.budget(wanted).await?;
    tracing::info!(budget = %budget.name, "Using budget");
    Ok(budget)
}

