//! `price` command handlers.

use clap::Subcommand;
use vitrina_core::{PriceNormalizer, PriceValue, DEFAULT_CURRENCY_CODE};

#[derive(Debug, Subcommand)]
pub enum PriceCommands {
    /// Print the canonical numeric value of a source-formatted price
    Parse {
        raw: String,
    },
    /// Print a price the way the storefront displays it
    Format {
        raw: String,

        /// Currency code prefix
        #[arg(long, env = "VITRINA_CURRENCY_CODE", default_value = DEFAULT_CURRENCY_CODE)]
        currency: String,
    },
}

/// # Errors
///
/// Returns an error if `price parse` is given something that is not a price.
pub(crate) fn run(command: &PriceCommands) -> anyhow::Result<()> {
    match command {
        PriceCommands::Parse { raw } => {
            let value = PriceNormalizer::default().parse(&PriceValue::from(raw.as_str()))?;
            println!("{value}");
        }
        PriceCommands::Format { raw, currency } => {
            println!("{}", format_price(raw, currency));
        }
    }
    Ok(())
}

fn format_price(raw: &str, currency: &str) -> String {
    PriceNormalizer::new(currency).format(Some(&PriceValue::from(raw)))
}
