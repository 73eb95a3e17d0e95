mod app;
mod commands;
mod logging;
mod plugins;
mod session;
mod startup;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use app::Exit;
use startup::ConfigLocation;

#[derive(Parser)]
#[command(name = "ajshell")]
#[command(about = "Terminal admin console for a single server", long_about = None)]
struct Cli {
    /// Config file (default: $AJSHELL_CONFIG, then ajshell.yml in the current directory or a parent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (default)
    Tui,
    /// Rank navigation entries against a query
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the identity the shell runs as
    Identity,
    /// Check configuration and plugin requirements
    Doctor,
    /// Write a default ajshell.yml
    Init {
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let location = ConfigLocation::resolve(cli.config);

    match cli.command {
        Some(Commands::Init { yes }) => {
            return commands::run_init(yes).map_err(anyhow::Error::msg);
        }
        Some(Commands::Doctor) => {
            return commands::run_doctor(&location)
                .await
                .map_err(anyhow::Error::msg);
        }
        _ => {}
    }

    let log_path = location.log_path();
    logging::init(&log_path)?;

    match cli.command {
        Some(Commands::Search { query, json }) => {
            commands::run_search(&location, &query, json).await
        }
        Some(Commands::Identity) => commands::run_identity(&location).await,
        _ => {
            match app::run_tui(location).await? {
                Exit::Quit => {}
                Exit::LoggedOut => println!("Logged out."),
                Exit::Expired => println!("Session expired."),
            }
            Ok(())
        }
    }
}
