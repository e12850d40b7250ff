use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratewatch::core::log::init_logging;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for ratewatch::AppCommand {
    fn from(cmd: Commands) -> ratewatch::AppCommand {
        match cmd {
            Commands::Watch { events } => ratewatch::AppCommand::Watch {
                show_events: events,
            },
            Commands::Fetch => ratewatch::AppCommand::Fetch,
            Commands::Rate { history, page } => ratewatch::AppCommand::Rate { history, page },
            Commands::Balance { adjust } => ratewatch::AppCommand::Balance { adjust },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Poll the BTC/USD rate until interrupted
    Watch {
        /// Print the recorded event trail on exit
        #[arg(long)]
        events: bool,
    },
    /// Refresh the rate once and show what happened
    Fetch,
    /// Show the latest cached rate
    Rate {
        /// Show every cached rate instead
        #[arg(long)]
        history: bool,

        /// History page to show, starting at 1
        #[arg(
            long,
            default_value_t = 1,
            requires = "history",
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        page: usize,
    },
    /// Show the current balance
    Balance {
        /// Add this amount (negative to subtract) before showing
        #[arg(long, allow_hyphen_values = true)]
        adjust: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ratewatch::cli::setup::setup(),
        Some(cmd) => ratewatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
