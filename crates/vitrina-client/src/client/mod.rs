//! HTTP implementation of [`CatalogBackend`].

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use vitrina_core::{AppConfig, CustomProduct, CustomProductDraft, OverrideRecord, SourceProduct};

use crate::backend::CatalogBackend;
use crate::error::ClientError;
use crate::retry::retry_with_backoff;
use crate::types::{CatalogListing, CreatedCatalog, CreatedCustomProduct, NewCatalog};

/// Talks to the catalog backend's JSON API.
///
/// 429 responses and network failures on GET, PUT and DELETE are retried
/// with exponential backoff up to `max_retries` additional attempts. POST
/// creates a resource and is never retried.
pub struct HttpCatalogBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl HttpCatalogBackend {
    /// Creates a backend client rooted at `base_url`.
    ///
    /// `token`, when set, is sent as a bearer token on every request.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidBaseUrl`] if `base_url` is not an absolute
    ///   http(s) URL.
    /// - [`ClientError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        token: Option<&str>,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ClientError> {
        let base_url = Self::parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: token.map(str::to_owned),
            max_retries,
            backoff_base_secs,
        })
    }

    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.backend_url,
            config.request_timeout_secs,
            &config.user_agent,
            config.backend_token.as_deref(),
            config.max_retries,
            config.retry_backoff_base_secs,
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
        let invalid = |reason: String| ClientError::InvalidBaseUrl {
            base_url: raw.to_owned(),
            reason,
        };
        let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_owned()));
        }
        Ok(url)
    }

    /// Appends `segments` to the base URL's path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one request and maps non-2xx statuses to typed errors.
    /// Returns the response body.
    async fn send<B>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&B>,
    ) -> Result<String, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        tracing::debug!(%method, %url, "backend request");
        let mut request = self
            .client
            .request(method, url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ClientError::RateLimited { retry_after_secs });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// [`Self::send`] with retry, for GET/PUT/DELETE.
    async fn send_idempotent<B>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&B>,
    ) -> Result<String, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.send(method.clone(), url, body)
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, ClientError> {
        let body = self.send_idempotent::<()>(Method::GET, url, None).await?;
        decode(&body, context)
    }
}

fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|source| ClientError::Deserialize {
        context: context.to_owned(),
        source,
    })
}

impl CatalogBackend for HttpCatalogBackend {
    async fn list_catalog_products(
        &self,
        catalog_id: u64,
    ) -> Result<Vec<CatalogListing>, ClientError> {
        let url = self.endpoint(&["catalogs", &catalog_id.to_string(), "products"])?;
        self.get_json(&url, &format!("product listing of catalog {catalog_id}"))
            .await
    }

    async fn get_product(&self, product_id: u64) -> Result<SourceProduct, ClientError> {
        let url = self.endpoint(&["products", &product_id.to_string()])?;
        self.get_json(&url, &format!("product {product_id}")).await
    }

    async fn put_catalog_product(
        &self,
        catalog_id: u64,
        product_id: u64,
        overrides: &OverrideRecord,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&[
            "catalogs",
            &catalog_id.to_string(),
            "products",
            &product_id.to_string(),
        ])?;
        self.send_idempotent(Method::PUT, &url, Some(overrides)).await?;
        Ok(())
    }

    async fn delete_catalog_product(
        &self,
        catalog_id: u64,
        product_id: u64,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&[
            "catalogs",
            &catalog_id.to_string(),
            "products",
            &product_id.to_string(),
        ])?;
        self.send_idempotent::<()>(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn create_custom_product(
        &self,
        catalog_id: u64,
        draft: &CustomProductDraft,
    ) -> Result<CustomProduct, ClientError> {
        let url = self.endpoint(&["catalogs", &catalog_id.to_string(), "custom-products"])?;
        let body = self.send(Method::POST, &url, Some(draft)).await?;
        let created: CreatedCustomProduct =
            decode(&body, &format!("custom product created in catalog {catalog_id}"))?;
        Ok(created.into())
    }

    async fn update_custom_product(
        &self,
        catalog_id: u64,
        custom_id: u64,
        draft: &CustomProductDraft,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&[
            "catalogs",
            &catalog_id.to_string(),
            "custom-products",
            &custom_id.to_string(),
        ])?;
        self.send_idempotent(Method::PUT, &url, Some(draft)).await?;
        Ok(())
    }

    async fn delete_custom_product(
        &self,
        catalog_id: u64,
        custom_id: u64,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&[
            "catalogs",
            &catalog_id.to_string(),
            "custom-products",
            &custom_id.to_string(),
        ])?;
        self.send_idempotent::<()>(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn create_catalog(&self, name: &str) -> Result<CreatedCatalog, ClientError> {
        let url = self.endpoint(&["catalogs"])?;
        let body = self
            .send(Method::POST, &url, Some(&NewCatalog { name }))
            .await?;
        decode(&body, "created catalog")
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
