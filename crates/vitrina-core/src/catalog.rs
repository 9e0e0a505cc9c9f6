//! The product membership of one catalog grouping.
//!
//! A [`CatalogAggregate`] holds at most one entry per [`ProductRef`]. Entries
//! are kept in insertion order, which is the order the storefront lists them.
//! Custom products created before the grouping exists on the backend carry
//! [`ProductRef::Pending`] ids and stay [`EntryStatus::Pending`] until the
//! save step confirms them.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::overlay::{OverlayResolver, ProductBase};
use crate::products::{
    CustomProduct, CustomProductDraft, LocalId, OverrideRecord, ProductRef, SourceProduct,
    ViewProduct,
};

/// Whether an entry still needs a backend create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Confirmed,
}

/// What an entry's override is applied on top of.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryBase {
    External(SourceProduct),
    Custom(CustomProduct),
    /// Membership is known but the source item has not been (or could not
    /// be) fetched.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub product: ProductRef,
    pub base: EntryBase,
    pub overrides: Option<OverrideRecord>,
    pub status: EntryStatus,
}

impl CatalogEntry {
    fn product_base(&self) -> ProductBase<'_> {
        match &self.base {
            EntryBase::External(source) => ProductBase::External(source),
            EntryBase::Custom(custom) => ProductBase::Custom(custom),
            EntryBase::Unresolved => ProductBase::Missing(self.product),
        }
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self.base, EntryBase::Custom(_))
    }
}

/// Result of [`CatalogAggregate::remove_product`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub entry: CatalogEntry,
    /// `true` when the membership also exists on the backend and must be
    /// deleted there.
    pub requires_backend_delete: bool,
}

#[derive(Debug, Clone)]
pub struct CatalogAggregate {
    catalog_id: Option<u64>,
    name: String,
    entries: Vec<CatalogEntry>,
    version: u64,
    last_local_id: u64,
    resolver: OverlayResolver,
}

impl CatalogAggregate {
    /// A grouping that does not exist on the backend yet.
    #[must_use]
    pub fn new(name: &str, resolver: OverlayResolver) -> Self {
        Self {
            catalog_id: None,
            name: name.to_owned(),
            entries: Vec::new(),
            version: 0,
            last_local_id: 0,
            resolver,
        }
    }

    /// A grouping already saved on the backend under `catalog_id`.
    #[must_use]
    pub fn persisted(catalog_id: u64, name: &str, resolver: OverlayResolver) -> Self {
        Self {
            catalog_id: Some(catalog_id),
            ..Self::new(name, resolver)
        }
    }

    #[must_use]
    pub fn catalog_id(&self) -> Option<u64> {
        self.catalog_id
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.catalog_id.is_some()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Incremented on every mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, product: &ProductRef) -> bool {
        self.position(product).is_some()
    }

    #[must_use]
    pub fn entry(&self, product: &ProductRef) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.product == *product)
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn resolver(&self) -> &OverlayResolver {
        &self.resolver
    }

    /// Adds an external product, or refreshes its source data if it is
    /// already a member. Any existing override is kept.
    ///
    /// Returns `true` when the product was not a member before.
    pub fn add_product(&mut self, source: SourceProduct) -> bool {
        let product = ProductRef::External(source.id);
        self.version += 1;
        if let Some(idx) = self.position(&product) {
            self.entries[idx].base = EntryBase::External(source);
            return false;
        }
        self.entries.push(CatalogEntry {
            product,
            base: EntryBase::External(source),
            overrides: None,
            status: EntryStatus::Confirmed,
        });
        true
    }

    /// Sets the override for `product`, replacing any previous one.
    ///
    /// An id that is not yet a member is added with an unresolved base.
    /// Returns `true` when an existing entry was updated.
    pub fn add_override(&mut self, product: ProductRef, patch: OverrideRecord) -> bool {
        self.version += 1;
        if let Some(idx) = self.position(&product) {
            self.entries[idx].overrides = Some(patch);
            return true;
        }
        let status = if product.is_pending() {
            EntryStatus::Pending
        } else {
            EntryStatus::Confirmed
        };
        self.entries.push(CatalogEntry {
            product,
            base: EntryBase::Unresolved,
            overrides: Some(patch),
            status,
        });
        false
    }

    /// Inserts or replaces a whole entry, keeping its position if present.
    pub fn upsert_entry(&mut self, entry: CatalogEntry) {
        self.version += 1;
        match self.position(&entry.product) {
            Some(idx) => self.entries[idx] = entry,
            None => self.entries.push(entry),
        }
    }

    /// Removes `product` together with its local override.
    pub fn remove_product(&mut self, product: &ProductRef) -> Option<Removal> {
        let idx = self.position(product)?;
        self.version += 1;
        let entry = self.entries.remove(idx);
        let requires_backend_delete = self.is_persisted()
            && entry.status == EntryStatus::Confirmed
            && !entry.product.is_pending();
        Some(Removal {
            entry,
            requires_backend_delete,
        })
    }

    /// Resolved view of every member, in listing order.
    #[must_use]
    pub fn list_view_products(&self) -> Vec<ViewProduct> {
        self.entries
            .iter()
            .map(|e| self.resolver.resolve(e.product_base(), e.overrides.as_ref()))
            .collect()
    }

    /// Resolved view of one member.
    #[must_use]
    pub fn view_product(&self, product: &ProductRef) -> Option<ViewProduct> {
        self.entry(product)
            .map(|e| self.resolver.resolve(e.product_base(), e.overrides.as_ref()))
    }

    /// Creates a custom product locally with a temporary id. It stays
    /// pending until [`Self::confirm_custom_product`] is called for it.
    pub fn create_custom_product(&mut self, draft: CustomProductDraft) -> CustomProduct {
        let local = self.next_local_id();
        let product = CustomProduct::from_draft(ProductRef::Pending(local), draft);
        self.version += 1;
        self.entries.push(CatalogEntry {
            product: product.id,
            base: EntryBase::Custom(product.clone()),
            overrides: None,
            status: EntryStatus::Pending,
        });
        tracing::debug!(catalog = %self.name, product = %product.id, "staged custom product");
        product
    }

    /// Adds a custom product that already exists on the backend.
    pub fn insert_custom_product(&mut self, product: CustomProduct) {
        let overrides = self.entry(&product.id).and_then(|e| e.overrides.clone());
        self.upsert_entry(CatalogEntry {
            product: product.id,
            base: EntryBase::Custom(product),
            overrides,
            status: EntryStatus::Confirmed,
        });
    }

    /// Custom products that still need a backend create call.
    #[must_use]
    pub fn pending_custom_products(&self) -> Vec<&CustomProduct> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .filter_map(|e| match &e.base {
                EntryBase::Custom(custom) => Some(custom),
                _ => None,
            })
            .collect()
    }

    /// Re-keys a pending custom product to its permanent backend identity,
    /// keeping its position and override.
    ///
    /// Returns `false` if no pending entry has id `local`.
    pub fn confirm_custom_product(&mut self, local: LocalId, persisted: CustomProduct) -> bool {
        let pending = ProductRef::Pending(local);
        if !self.contains(&pending) {
            return false;
        }
        let new_ref = persisted.id;
        // A reload between create and confirm may already list the product.
        if new_ref != pending {
            if let Some(dup) = self.position(&new_ref) {
                tracing::debug!(
                    catalog = %self.name,
                    product = %new_ref,
                    "custom product already listed under its backend id, merging"
                );
                self.entries.remove(dup);
            }
        }
        let Some(idx) = self.position(&pending) else {
            return false;
        };
        let entry = &mut self.entries[idx];
        entry.product = new_ref;
        entry.base = EntryBase::Custom(persisted);
        entry.status = EntryStatus::Confirmed;
        self.version += 1;
        true
    }

    /// Adds a custom product the backend lists without an id. It gets a
    /// local id so it can be shown, but it is never sent to the backend.
    pub fn insert_unaddressed_custom_product(&mut self, draft: CustomProductDraft) -> ProductRef {
        let local = self.next_local_id();
        let product = CustomProduct::from_draft(ProductRef::Pending(local), draft);
        let id = product.id;
        self.upsert_entry(CatalogEntry {
            product: id,
            base: EntryBase::Custom(product),
            overrides: None,
            status: EntryStatus::Confirmed,
        });
        id
    }

    /// External members whose membership and override must be pushed to
    /// the backend when the grouping is saved, as `(product_id, override)`.
    #[must_use]
    pub fn memberships_to_sync(&self) -> Vec<(u64, OverrideRecord)> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Confirmed && !e.is_custom())
            .filter_map(|e| match e.product {
                ProductRef::External(id) => Some((id, e.overrides.clone().unwrap_or_default())),
                ProductRef::Custom(_) | ProductRef::Pending(_) => None,
            })
            .collect()
    }

    pub fn rename(&mut self, name: &str) {
        self.version += 1;
        name.clone_into(&mut self.name);
    }

    /// Records the backend id assigned to this grouping.
    pub fn mark_persisted(&mut self, catalog_id: u64) {
        self.version += 1;
        self.catalog_id = Some(catalog_id);
    }

    fn position(&self, product: &ProductRef) -> Option<usize> {
        self.entries.iter().position(|e| e.product == *product)
    }

    /// Timestamp-based, strictly increasing within this aggregate.
    fn next_local_id(&mut self) -> LocalId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let next = now.max(self.last_local_id + 1);
        self.last_local_id = next;
        LocalId(next)
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
