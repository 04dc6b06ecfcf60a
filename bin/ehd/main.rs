//! Erasmus Helpdesk CLI
//!
//! Usage:
//!   ehd wizard                    # Interactive three-step advising wizard
//!   ehd wizard --mock             # Same, against canned data
//!   ehd universities              # List home universities with a call
//!   ehd portal login --email ...  # University portal commands
//!   ehd config show               # Print the resolved configuration

mod commands;
mod style;
mod wizard;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use erasmus_helpdesk::{ClientConfig, ConfigOverrides};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::commands::portal::PortalCommand;
use crate::style::*;

#[derive(Parser)]
#[command(name = "ehd")]
#[command(author, version, about = "Erasmus Helpdesk - study-abroad advising from the terminal")]
#[command(propagate_version = true)]
struct Cli {
    /// Student advising API base URL
    #[arg(long, global = true, env = "EHD_API_BASE")]
    api_base: Option<String>,

    /// University portal API base URL
    #[arg(long, global = true, env = "EHD_PORTAL_BASE")]
    portal_base: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "EHD_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// Directory for config, sessions and tokens
    #[arg(long, global = true, env = "EHD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive advising wizard
    #[command(visible_alias = "w")]
    Wizard {
        /// Use canned data instead of the advising API
        #[arg(long)]
        mock: bool,

        /// Resume a previous wizard tab
        #[arg(long)]
        tab: Option<String>,

        /// Keep the session in memory only
        #[arg(long, conflicts_with = "tab")]
        ephemeral: bool,

        /// Where to save downloaded course catalogues
        #[arg(long, default_value = ".")]
        download_dir: PathBuf,
    },

    /// List home universities with a published Erasmus call
    #[command(visible_alias = "u")]
    Universities {
        #[arg(long)]
        mock: bool,
    },

    /// University portal
    #[command(subcommand)]
    Portal(PortalCommand),

    /// Show or save configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Write the resolved URLs and timeout to config.toml
    Save,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "warn,erasmus_helpdesk=debug,ehd=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::resolve(ConfigOverrides {
        api_base: cli.api_base,
        portal_base: cli.portal_base,
        timeout_secs: cli.timeout,
        data_dir: cli.data_dir,
    })
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Wizard {
            mock,
            tab,
            ephemeral,
            download_dir,
        } => {
            wizard::run(
                &config,
                wizard::WizardOptions {
                    mock,
                    tab,
                    ephemeral,
                    download_dir,
                },
            )
            .await
        }
        Commands::Universities { mock } => commands::universities::run(&config, mock).await,
        Commands::Portal(cmd) => commands::portal::run(&config, cmd).await,
        Commands::Config(cmd) => match cmd {
            ConfigCommand::Show => {
                print_config(&config);
                Ok(())
            }
            ConfigCommand::Save => {
                let path = config.save().context("Failed to save configuration")?;
                print_success(&format!("Saved {}", path.display()));
                Ok(())
            }
        },
    }
}

fn print_config(config: &ClientConfig) {
    print_header("Configuration");
    print_key_value("Advising API", &config.api_base);
    print_key_value("Portal API", &config.portal_base);
    print_key_value("Timeout", &format!("{}s", config.timeout_secs));
    print_key_value("Data dir", &config.data_dir.display().to_string());
    println!();
}
