use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxboard::core::{Currency, MAX_SERIES_DAYS};
use fxboard::core::log::init_logging;

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

impl From<Commands> for fxboard::AppCommand {
    fn from(cmd: Commands) -> fxboard::AppCommand {
        match cmd {
            Commands::Convert {
                from,
                to,
                amount,
                swap,
            } => fxboard::AppCommand::Convert {
                from,
                to,
                amount,
                swap,
            },
            Commands::History { from, to, days } => fxboard::AppCommand::History {
                from,
                to,
                days: days.map(usize::from),
            },
            Commands::Banks { currency } => fxboard::AppCommand::Banks { currency },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount and show the trend chart and bank quotes
    Convert {
        /// Source currency code (default SGD)
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code (default USD)
        #[arg(short, long)]
        to: Option<String>,
        /// Amount to convert (default 1000)
        #[arg(short, long)]
        amount: Option<String>,
        /// Exchange source and target before converting
        #[arg(short, long)]
        swap: bool,
    },
    /// Show daily rates for a currency pair
    History {
        #[arg(short, long)]
        from: Currency,
        #[arg(short, long)]
        to: Currency,
        /// Number of days (default from configuration)
        #[arg(
            short,
            long,
            value_parser = clap::value_parser!(u16).range(1..=MAX_SERIES_DAYS as i64)
        )]
        days: Option<u16>,
    },
    /// Show bank buy/sell quotes against RUB
    Banks {
        /// USD or EUR; both when omitted
        #[arg(long)]
        currency: Option<Currency>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fxboard::cli::setup::setup_at_path(path),
            None => fxboard::cli::setup::setup(),
        },
        Some(cmd) => fxboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
