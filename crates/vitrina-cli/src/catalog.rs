//! `catalog` command handlers.

use clap::Subcommand;
use vitrina_client::{CatalogSession, HttpCatalogBackend};
use vitrina_core::{AppConfig, PriceNormalizer, ViewProduct};

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// Print the resolved products of a catalog grouping
    Show {
        catalog_id: u64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// # Errors
///
/// Returns an error if the backend client cannot be built or the grouping
/// cannot be loaded.
pub(crate) async fn run(config: &AppConfig, command: &CatalogCommands) -> anyhow::Result<()> {
    match command {
        CatalogCommands::Show { catalog_id, json } => {
            let backend = HttpCatalogBackend::from_config(config)?;
            let session = CatalogSession::load(
                backend,
                *catalog_id,
                &format!("catalog {catalog_id}"),
                config.overlay_resolver(),
            )
            .await?;
            let products = session.list_view_products().await;
            tracing::debug!(catalog_id, products = products.len(), "catalog loaded");

            if *json {
                println!("{}", serde_json::to_string_pretty(&products)?);
            } else if products.is_empty() {
                println!("catalog {catalog_id} has no products");
            } else {
                let prices = config.price_normalizer();
                for product in &products {
                    println!("{}", render_row(product, &prices));
                }
            }
        }
    }
    Ok(())
}

/// One tab-separated table row: id, name, price, and flags.
pub(crate) fn render_row(product: &ViewProduct, prices: &PriceNormalizer) -> String {
    let mut price = prices.format_amount(product.price);
    if product.has_price_override() {
        price = format!(
            "{price} (was {})",
            prices.format_amount(product.original_price)
        );
    }

    let mut flags = Vec::new();
    if product.is_custom {
        flags.push("custom");
    }
    if product.is_placeholder {
        flags.push("missing");
    }

    format!(
        "{}\t{}\t{price}\t{}",
        product.id,
        product.name,
        flags.join(",")
    )
    .trim_end()
    .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrina_core::{resolve_view_product, OverrideRecord, PriceValue, ProductBase, ProductRef};

    #[test]
    fn row_shows_original_price_when_overridden() {
        let overrides = OverrideRecord {
            catalog_price: Some(PriceValue::Numeric(80_000.0)),
            ..OverrideRecord::default()
        };
        let mut product = resolve_view_product(
            ProductBase::Missing(ProductRef::External(12)),
            Some(&overrides),
        );
        product.is_placeholder = false;
        product.is_custom = false;
        product.name = "Camisa".to_owned();

        assert_eq!(
            render_row(&product, &PriceNormalizer::default()),
            "12\tCamisa\tCOP 80.000 (was COP 0)"
        );
    }

    #[test]
    fn row_flags_placeholders() {
        let product = resolve_view_product(ProductBase::Missing(ProductRef::External(99)), None);
        assert_eq!(
            render_row(&product, &PriceNormalizer::default()),
            "99\tUnnamed product\tCOP 0\tcustom,missing"
        );
    }
}
