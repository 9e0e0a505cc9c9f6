use std::path::PathBuf;

use crate::image::ImageResolver;
use crate::overlay::OverlayResolver;
use crate::price::PriceNormalizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Base URL of the commerce backend, e.g. `"https://api.example.com/v1"`.
    pub backend_url: String,
    pub backend_token: Option<String>,
    /// Origin that root-relative image paths are resolved against.
    pub app_origin: String,
    pub fallback_image: String,
    pub currency_code: String,
    pub cart_dir: PathBuf,
    pub cart_key: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("backend_url", &self.backend_url)
            .field(
                "backend_token",
                &self.backend_token.as_ref().map(|_| "[redacted]"),
            )
            .field("app_origin", &self.app_origin)
            .field("fallback_image", &self.fallback_image)
            .field("currency_code", &self.currency_code)
            .field("cart_dir", &self.cart_dir)
            .field("cart_key", &self.cart_key)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .finish()
    }
}

impl AppConfig {
    #[must_use]
    pub fn price_normalizer(&self) -> PriceNormalizer {
        PriceNormalizer::new(&self.currency_code)
    }

    #[must_use]
    pub fn image_resolver(&self) -> ImageResolver {
        ImageResolver::new(&self.app_origin, &self.fallback_image)
    }

    /// Overlay resolver wired with this configuration's currency and image
    /// settings.
    #[must_use]
    pub fn overlay_resolver(&self) -> OverlayResolver {
        OverlayResolver::new(self.price_normalizer(), self.image_resolver())
    }
}
