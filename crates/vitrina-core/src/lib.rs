pub mod app_config;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod image;
pub mod overlay;
pub mod price;
pub mod products;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use cart::{
    CartEntry, CartError, CartLedger, CartStore, FileCartStore, MemoryCartStore, DEFAULT_CART_KEY,
};
pub use catalog::{CatalogAggregate, CatalogEntry, EntryBase, EntryStatus, Removal};
pub use config::{load_app_config, load_app_config_from_env};
pub use image::{ImageResolver, DEFAULT_FALLBACK_IMAGE};
pub use overlay::{resolve_view_product, OverlayResolver, ProductBase, PLACEHOLDER_NAME};
pub use price::{PriceNormalizer, PriceParseError, DEFAULT_CURRENCY_CODE};
pub use products::{
    CatalogProductRecord, CustomProduct, CustomProductDraft, ImageRef, LocalId, OverrideRecord,
    PriceValue, ProductRef, SourceImage, SourceProduct, ViewProduct,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
