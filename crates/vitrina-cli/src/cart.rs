//! `cart` command handlers. The cart lives in `VITRINA_CART_DIR` under
//! `VITRINA_CART_KEY`.

use clap::Subcommand;
use vitrina_client::{CatalogBackend, CatalogSession, HttpCatalogBackend};
use vitrina_core::{
    AppConfig, CartEntry, CartLedger, FileCartStore, PriceNormalizer, ProductBase, ProductRef,
    ViewProduct,
};

#[derive(Debug, Subcommand)]
pub enum CartCommands {
    /// List cart lines
    List,
    /// Add a product, capturing its current price
    Add {
        product_id: u64,

        #[arg(long, default_value_t = 1)]
        qty: i64,

        /// Use the product's price and name as overridden in this catalog
        #[arg(long)]
        catalog: Option<u64>,
    },
    /// Set the quantity of a line; zero or less removes it
    Set {
        product_id: ProductRef,

        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },
    /// Remove a line
    Remove { product_id: ProductRef },
    /// Empty the cart
    Clear,
    /// Print the cart total
    Total,
}

/// # Errors
///
/// Returns an error if a product cannot be fetched or the cart cannot be
/// written.
pub(crate) async fn run(config: &AppConfig, command: &CartCommands) -> anyhow::Result<()> {
    let prices = config.price_normalizer();
    let mut ledger = CartLedger::load(
        FileCartStore::new(&config.cart_dir),
        &config.cart_key,
        prices.clone(),
    );
    tracing::debug!(
        dir = %config.cart_dir.display(),
        key = %config.cart_key,
        lines = ledger.items().len(),
        "cart loaded"
    );

    match command {
        CartCommands::List => {
            if ledger.is_empty() {
                println!("cart is empty");
            }
            for entry in ledger.items() {
                println!("{}", render_line(entry, &prices));
            }
        }
        CartCommands::Add {
            product_id,
            qty,
            catalog,
        } => {
            let product = fetch_view_product(config, *product_id, *catalog).await?;
            ledger.add_item(&product, *qty)?;
            println!("added {qty} × {} ({})", product.name, product.id);
        }
        CartCommands::Set { product_id, qty } => {
            ledger.set_quantity(product_id, *qty)?;
            tracing::info!(product = %product_id, qty, "cart quantity set");
        }
        CartCommands::Remove { product_id } => {
            if !ledger.remove_item(product_id)? {
                println!("{product_id} is not in the cart");
            }
        }
        CartCommands::Clear => {
            ledger.clear()?;
            tracing::info!(key = %config.cart_key, "cart cleared");
        }
        CartCommands::Total => {
            println!(
                "{} ({} items)",
                ledger.formatted_total(),
                ledger.item_count()
            );
        }
    }
    Ok(())
}

async fn fetch_view_product(
    config: &AppConfig,
    product_id: u64,
    catalog_id: Option<u64>,
) -> anyhow::Result<ViewProduct> {
    let backend = HttpCatalogBackend::from_config(config)?;
    let product = ProductRef::External(product_id);

    if let Some(catalog_id) = catalog_id {
        let session = CatalogSession::load(
            backend,
            catalog_id,
            &format!("catalog {catalog_id}"),
            config.overlay_resolver(),
        )
        .await?;
        return session
            .list_view_products()
            .await
            .into_iter()
            .find(|p| p.id == product)
            .ok_or_else(|| anyhow::anyhow!("product {product_id} is not in catalog {catalog_id}"));
    }

    tracing::debug!(product_id, "fetching product from backend");
    let source = backend.get_product(product_id).await?;
    Ok(config
        .overlay_resolver()
        .resolve(ProductBase::External(&source), None))
}

pub(crate) fn render_line(entry: &CartEntry, prices: &PriceNormalizer) -> String {
    let unit = entry
        .captured_price
        .as_ref()
        .map_or_else(|| "no price".to_owned(), |p| prices.format(Some(p)));
    format!(
        "{}\t{}\t{}\t{unit}\t{}",
        entry.product_id,
        entry.quantity,
        entry.name,
        entry.added_at.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use vitrina_core::{CartStore, Environment, FileCartStore, PriceValue, DEFAULT_CART_KEY};

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            log_level: "warn".to_owned(),
            backend_url: "http://127.0.0.1:9".to_owned(),
            backend_token: None,
            app_origin: "https://tienda.test".to_owned(),
            fallback_image: "/images/no-image.png".to_owned(),
            currency_code: "COP".to_owned(),
            cart_dir: dir.to_path_buf(),
            cart_key: DEFAULT_CART_KEY.to_owned(),
            request_timeout_secs: 1,
            user_agent: "vitrina-test/0.1".to_owned(),
            max_retries: 0,
            retry_backoff_base_secs: 0,
        }
    }

    fn seed_cart(config: &AppConfig, raw: &str) {
        FileCartStore::new(&config.cart_dir)
            .write(&config.cart_key, raw)
            .unwrap();
    }

    fn reload(config: &AppConfig) -> CartLedger<FileCartStore> {
        CartLedger::load(
            FileCartStore::new(&config.cart_dir),
            &config.cart_key,
            config.price_normalizer(),
        )
    }

    #[tokio::test]
    async fn set_and_remove_update_the_cart_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        seed_cart(
            &config,
            r#"[{"product_id": {"external": 12}, "quantity": 1, "captured_price": 100},
                {"product_id": {"custom": 12}, "quantity": 1, "captured_price": 50}]"#,
        );

        let set = CartCommands::Set {
            product_id: ProductRef::External(12),
            qty: 4,
        };
        run(&config, &set).await.unwrap();
        let remove = CartCommands::Remove {
            product_id: ProductRef::Custom(12),
        };
        run(&config, &remove).await.unwrap();

        let ledger = reload(&config);
        assert_eq!(ledger.items().len(), 1);
        assert_eq!(ledger.items()[0].product_id, ProductRef::External(12));
        assert_eq!(ledger.item_count(), 4);
    }

    #[tokio::test]
    async fn clear_deletes_the_cart_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        seed_cart(
            &config,
            r#"[{"product_id": {"external": 1}, "quantity": 1, "captured_price": 100}]"#,
        );

        run(&config, &CartCommands::Clear).await.unwrap();
        run(&config, &CartCommands::Total).await.unwrap();

        assert!(reload(&config).is_empty());
        assert_eq!(
            FileCartStore::new(&config.cart_dir)
                .read(&config.cart_key)
                .unwrap(),
            None
        );
    }

    #[test]
    fn line_shows_formatted_unit_price() {
        let entry: CartEntry = serde_json::from_value(serde_json::json!({
            "product_id": {"external": 12},
            "quantity": 2,
            "captured_price": "19000",
            "name": "Camisa",
            "added_at": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            render_line(&entry, &PriceNormalizer::default()),
            "12\t2\tCamisa\tCOP 19.000\t2026-03-01"
        );
        assert_eq!(entry.captured_price, Some(PriceValue::Raw("19000".to_owned())));
    }

    #[test]
    fn line_without_price_is_marked() {
        let entry: CartEntry = serde_json::from_value(serde_json::json!({
            "product_id": {"pending": 5},
            "quantity": 1,
            "added_at": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert!(render_line(&entry, &PriceNormalizer::default()).contains("no price"));
    }
}
