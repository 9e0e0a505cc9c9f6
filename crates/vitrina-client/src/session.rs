//! Backend-synchronized editing of one catalog grouping.
//!
//! A [`CatalogSession`] owns the grouping's [`CatalogAggregate`] behind an
//! async mutex that stays held across the backend call of each operation,
//! so mutations of one grouping are applied one at a time and in order.
//! When the grouping is persisted, the backend is written first and local
//! state only changes once that write succeeded.

use std::collections::HashMap;

use futures::StreamExt;
use tokio::sync::Mutex;
use vitrina_core::{
    CatalogAggregate, CatalogEntry, CustomProduct, CustomProductDraft, EntryBase, EntryStatus,
    OverlayResolver, OverrideRecord, ProductRef, SourceProduct, ViewProduct,
};

use crate::backend::CatalogBackend;
use crate::error::{CatalogError, ClientError};
use crate::types::CatalogListing;

/// Concurrent `GET /products/{id}` lookups while loading a grouping.
const LOOKUP_CONCURRENCY: usize = 8;

pub struct CatalogSession<B> {
    backend: B,
    catalog: Mutex<CatalogAggregate>,
}

impl<B: CatalogBackend> CatalogSession<B> {
    /// Starts a new grouping that exists only locally until [`Self::save`].
    pub fn new(backend: B, name: &str, resolver: OverlayResolver) -> Self {
        Self {
            backend,
            catalog: Mutex::new(CatalogAggregate::new(name, resolver)),
        }
    }

    /// Loads a persisted grouping and its members.
    ///
    /// Members listed without embedded source data are looked up
    /// individually; a failed lookup renders as a placeholder instead of
    /// dropping the member.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BackendUnavailable`] if the product listing
    /// itself cannot be fetched.
    pub async fn load(
        backend: B,
        catalog_id: u64,
        name: &str,
        resolver: OverlayResolver,
    ) -> Result<Self, CatalogError> {
        let catalog = fetch_aggregate(&backend, catalog_id, name, resolver).await?;
        Ok(Self {
            backend,
            catalog: Mutex::new(catalog),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn catalog_id(&self) -> Option<u64> {
        self.catalog.lock().await.catalog_id()
    }

    /// A copy of the current aggregate state.
    pub async fn snapshot(&self) -> CatalogAggregate {
        self.catalog.lock().await.clone()
    }

    pub async fn list_view_products(&self) -> Vec<ViewProduct> {
        self.catalog.lock().await.list_view_products()
    }

    /// Re-reads the grouping from the backend, discarding local state.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotPersisted`] if the grouping was never saved.
    /// - [`CatalogError::BackendUnavailable`] if the listing cannot be
    ///   fetched; local state is kept.
    pub async fn refresh(&self) -> Result<(), CatalogError> {
        let mut catalog = self.catalog.lock().await;
        let catalog_id = catalog.catalog_id().ok_or(CatalogError::NotPersisted)?;
        let fresh = fetch_aggregate(
            &self.backend,
            catalog_id,
            catalog.name(),
            catalog.resolver().clone(),
        )
        .await?;
        *catalog = fresh;
        Ok(())
    }

    /// Adds an external product to the grouping.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BackendUnavailable`] if the product cannot be
    /// fetched or, for a persisted grouping, the membership cannot be saved.
    pub async fn add_product(&self, product_id: u64) -> Result<(), CatalogError> {
        let mut catalog = self.catalog.lock().await;
        let source = self
            .backend
            .get_product(product_id)
            .await
            .map_err(CatalogError::backend("fetch product"))?;

        if let Some(catalog_id) = catalog.catalog_id() {
            let overrides = catalog
                .entry(&ProductRef::External(product_id))
                .and_then(|e| e.overrides.clone())
                .unwrap_or_default();
            self.backend
                .put_catalog_product(catalog_id, product_id, &overrides)
                .await
                .map_err(CatalogError::backend("add product"))?;
        }

        catalog.add_product(source);
        Ok(())
    }

    /// Replaces the override of `product`.
    ///
    /// In a persisted grouping an external product's override is saved as
    /// its membership record. A saved custom product has no membership
    /// record, so the override is folded into its product data instead.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotInCatalog`] if `product` is a saved custom
    ///   product that is not a member.
    /// - [`CatalogError::BackendUnavailable`] if a persisted grouping's
    ///   override cannot be saved.
    pub async fn add_override(
        &self,
        product: ProductRef,
        patch: OverrideRecord,
    ) -> Result<(), CatalogError> {
        let mut catalog = self.catalog.lock().await;
        if let Some(catalog_id) = catalog.catalog_id() {
            match product {
                ProductRef::External(product_id) => {
                    self.backend
                        .put_catalog_product(catalog_id, product_id, &patch)
                        .await
                        .map_err(CatalogError::backend("save override"))?;
                }
                ProductRef::Custom(custom_id) => {
                    let draft = match catalog.entry(&product).map(|e| &e.base) {
                        Some(EntryBase::Custom(custom)) => custom.to_draft().with_overrides(&patch),
                        _ => return Err(CatalogError::NotInCatalog(product.to_string())),
                    };
                    self.backend
                        .update_custom_product(catalog_id, custom_id, &draft)
                        .await
                        .map_err(CatalogError::backend("save override"))?;
                }
                ProductRef::Pending(_) => {}
            }
        }
        catalog.add_override(product, patch);
        Ok(())
    }

    /// Removes `product` and its override.
    ///
    /// A backend 404 counts as already removed.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotInCatalog`] if `product` is not a member.
    /// - [`CatalogError::BackendUnavailable`] if the backend delete fails.
    pub async fn remove_product(&self, product: &ProductRef) -> Result<(), CatalogError> {
        let mut catalog = self.catalog.lock().await;
        let entry = catalog
            .entry(product)
            .ok_or_else(|| CatalogError::NotInCatalog(product.to_string()))?;
        let confirmed = entry.status == EntryStatus::Confirmed;

        if let (Some(catalog_id), true) = (catalog.catalog_id(), confirmed) {
            let result = match *product {
                ProductRef::External(id) => {
                    Some(self.backend.delete_catalog_product(catalog_id, id).await)
                }
                ProductRef::Custom(id) => {
                    Some(self.backend.delete_custom_product(catalog_id, id).await)
                }
                ProductRef::Pending(_) => None,
            };
            match result {
                None | Some(Ok(())) => {}
                Some(Err(ClientError::NotFound { url })) => {
                    tracing::debug!(%url, "membership already absent on backend");
                }
                Some(Err(e)) => return Err(CatalogError::backend("remove product")(e)),
            }
        }

        catalog.remove_product(product);
        Ok(())
    }

    /// Creates a custom product. In a persisted grouping it is created on
    /// the backend immediately; otherwise it is staged with a pending id
    /// until [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BackendUnavailable`] if the backend create
    /// fails.
    pub async fn create_custom_product(
        &self,
        draft: CustomProductDraft,
    ) -> Result<CustomProduct, CatalogError> {
        let mut catalog = self.catalog.lock().await;
        let Some(catalog_id) = catalog.catalog_id() else {
            return Ok(catalog.create_custom_product(draft));
        };
        let created = self
            .backend
            .create_custom_product(catalog_id, &draft)
            .await
            .map_err(CatalogError::backend("create custom product"))?;
        catalog.insert_custom_product(created.clone());
        Ok(created)
    }

    /// Persists a local-only grouping: creates it on the backend, then every
    /// staged custom product (with its override folded into the created
    /// data), then every external membership and override.
    ///
    /// Entries are confirmed as their calls succeed. The first failure
    /// aborts; whatever was confirmed before it stays confirmed, so calling
    /// `save` again resumes. On an already persisted grouping the grouping
    /// is not re-created and memberships are re-sent with idempotent PUTs.
    /// Returns the grouping's backend id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BackendUnavailable`] on the first failed call.
    pub async fn save(&self, name: &str) -> Result<u64, CatalogError> {
        let mut catalog = self.catalog.lock().await;

        let catalog_id = if let Some(id) = catalog.catalog_id() {
            id
        } else {
            let created = self
                .backend
                .create_catalog(name)
                .await
                .map_err(CatalogError::backend("create catalog"))?;
            catalog.rename(&created.name);
            catalog.mark_persisted(created.id);
            tracing::info!(catalog_id = created.id, name = %created.name, "catalog created");
            created.id
        };

        let staged: Vec<_> = catalog
            .pending_custom_products()
            .into_iter()
            .filter_map(|p| match p.id {
                ProductRef::Pending(local) => Some((local, p.to_draft())),
                ProductRef::External(_) | ProductRef::Custom(_) => None,
            })
            .collect();

        for (local, draft) in staged {
            let overrides = catalog
                .entry(&ProductRef::Pending(local))
                .and_then(|e| e.overrides.clone())
                .filter(|o| !o.is_empty());
            let payload = overrides
                .as_ref()
                .map_or_else(|| draft.clone(), |o| draft.with_overrides(o));
            let created = self
                .backend
                .create_custom_product(catalog_id, &payload)
                .await
                .map_err(CatalogError::backend("create custom product"))?;
            // The local override stays on top of the unfolded data.
            let confirmed = if overrides.is_some() {
                CustomProduct::from_draft(created.id, draft)
            } else {
                created
            };
            catalog.confirm_custom_product(local, confirmed);
        }

        for (product_id, overrides) in catalog.memberships_to_sync() {
            self.backend
                .put_catalog_product(catalog_id, product_id, &overrides)
                .await
                .map_err(CatalogError::backend("save membership"))?;
        }

        Ok(catalog_id)
    }
}

async fn fetch_aggregate<B: CatalogBackend>(
    backend: &B,
    catalog_id: u64,
    name: &str,
    resolver: OverlayResolver,
) -> Result<CatalogAggregate, CatalogError> {
    let listings = backend
        .list_catalog_products(catalog_id)
        .await
        .map_err(CatalogError::backend("load catalog"))?;

    let bare_ids: Vec<u64> = listings
        .iter()
        .filter_map(|listing| match listing {
            CatalogListing::Record(r) if r.product_id != 0 && r.product.is_none() => {
                Some(r.product_id)
            }
            _ => None,
        })
        .collect();

    let lookups: Vec<(u64, Result<SourceProduct, ClientError>)> = futures::stream::iter(bare_ids)
        .map(|id| async move { (id, backend.get_product(id).await) })
        .buffer_unordered(LOOKUP_CONCURRENCY)
        .collect()
        .await;

    let mut fetched: HashMap<u64, SourceProduct> = HashMap::with_capacity(lookups.len());
    for (id, result) in lookups {
        match result {
            Ok(source) => {
                fetched.insert(id, source);
            }
            Err(e) => {
                tracing::warn!(catalog_id, product_id = id, error = %e, "product lookup failed");
            }
        }
    }

    let mut catalog = CatalogAggregate::persisted(catalog_id, name, resolver);
    for listing in listings {
        match listing {
            CatalogListing::Source(source) => {
                catalog.add_product(source);
            }
            CatalogListing::Record(record) if record.product_id == 0 => {
                if let Some(custom) = record.custom_product() {
                    catalog.insert_custom_product(custom);
                } else if let Some(draft) = record.custom_draft() {
                    let product = catalog.insert_unaddressed_custom_product(draft);
                    tracing::warn!(
                        catalog_id,
                        %product,
                        "custom product record without id, shown under a local id"
                    );
                }
            }
            CatalogListing::Record(record) => {
                let source = record
                    .product
                    .or_else(|| fetched.remove(&record.product_id));
                let overrides = Some(record.overrides).filter(|o| !o.is_empty());
                catalog.upsert_entry(CatalogEntry {
                    product: ProductRef::External(record.product_id),
                    base: source.map_or(EntryBase::Unresolved, EntryBase::External),
                    overrides,
                    status: EntryStatus::Confirmed,
                });
            }
        }
    }

    tracing::debug!(catalog_id, entries = catalog.len(), "catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
