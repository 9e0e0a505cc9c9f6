mod cart;
mod catalog;
mod price;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cart::CartCommands;
use crate::catalog::CatalogCommands;
use crate::price::PriceCommands;

#[derive(Debug, Parser)]
#[command(name = "vitrina-cli")]
#[command(about = "Catalog overlay and cart tooling for the vitrina storefront")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse or format prices the way the storefront does
    Price {
        #[command(subcommand)]
        command: PriceCommands,
    },
    /// Inspect catalog groupings on the backend
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },
}

/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Price { command }) => {
            init_tracing("warn")?;
            price::run(&command)?;
        }
        Some(Commands::Catalog { command }) => {
            let config = vitrina_core::load_app_config_from_env()?;
            init_tracing(&config.log_level)?;
            catalog::run(&config, &command).await?;
        }
        Some(Commands::Cart { command }) => {
            let config = vitrina_core::load_app_config_from_env()?;
            init_tracing(&config.log_level)?;
            cart::run(&config, &command).await?;
        }
        None => println!("vitrina-cli: run with --help to list commands"),
    }

    Ok(())
}
