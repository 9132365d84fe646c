use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxconv::core::log::init_logging;

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

impl From<Commands> for fxconv::AppCommand {
    fn from(cmd: Commands) -> fxconv::AppCommand {
        match cmd {
            Commands::Convert {
                amount,
                from,
                to,
                chart,
            } => fxconv::AppCommand::Convert(fxconv::cli::convert::ConvertOptions {
                amount,
                from,
                to,
                chart,
            }),
            Commands::Rates { base } => fxconv::AppCommand::Rates { base },
            Commands::Watch { from, to } => fxconv::AppCommand::Watch { from, to },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount once
    Convert {
        /// Amount in the base currency
        #[arg(allow_negative_numbers = true)]
        amount: Option<f64>,
        /// Base currency code
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code
        #[arg(short, long)]
        to: Option<String>,
        /// Write the rate chart to the configured canvas file
        #[arg(long)]
        chart: bool,
    },
    /// List the rate table for a base currency
    Rates {
        /// Base currency code
        #[arg(short, long)]
        base: Option<String>,
    },
    /// Run the interactive converter with periodic refresh
    Watch {
        /// Base currency code
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code
        #[arg(short, long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxconv::cli::setup::setup(),
        Some(cmd) => fxconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
