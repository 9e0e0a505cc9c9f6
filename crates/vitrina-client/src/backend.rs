use std::future::Future;

use vitrina_core::{CustomProduct, CustomProductDraft, OverrideRecord, SourceProduct};

use crate::error::ClientError;
use crate::types::{CatalogListing, CreatedCatalog};

/// The remote store of catalog groupings and their product data.
///
/// [`crate::HttpCatalogBackend`] is the production implementation; tests
/// substitute in-memory fakes.
pub trait CatalogBackend: Send + Sync {
    /// `GET /catalogs/{catalog_id}/products`
    fn list_catalog_products(
        &self,
        catalog_id: u64,
    ) -> impl Future<Output = Result<Vec<CatalogListing>, ClientError>> + Send;

    /// `GET /products/{product_id}`
    fn get_product(
        &self,
        product_id: u64,
    ) -> impl Future<Output = Result<SourceProduct, ClientError>> + Send;

    /// `PUT /catalogs/{catalog_id}/products/{product_id}`: adds the
    /// membership if needed and replaces its override.
    fn put_catalog_product(
        &self,
        catalog_id: u64,
        product_id: u64,
        overrides: &OverrideRecord,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `DELETE /catalogs/{catalog_id}/products/{product_id}`
    fn delete_catalog_product(
        &self,
        catalog_id: u64,
        product_id: u64,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `POST /catalogs/{catalog_id}/custom-products`
    fn create_custom_product(
        &self,
        catalog_id: u64,
        draft: &CustomProductDraft,
    ) -> impl Future<Output = Result<CustomProduct, ClientError>> + Send;

    /// `PUT /catalogs/{catalog_id}/custom-products/{custom_id}`: replaces
    /// the custom product's data. Custom products have no membership
    /// record, so their catalog overrides travel here, folded into `draft`.
    fn update_custom_product(
        &self,
        catalog_id: u64,
        custom_id: u64,
        draft: &CustomProductDraft,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `DELETE /catalogs/{catalog_id}/custom-products/{custom_id}`
    fn delete_custom_product(
        &self,
        catalog_id: u64,
        custom_id: u64,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `POST /catalogs`
    fn create_catalog(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<CreatedCatalog, ClientError>> + Send;
}
