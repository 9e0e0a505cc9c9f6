//! Locally persisted shopping cart.
//!
//! The ledger keeps its entries in memory and writes the whole collection
//! to a [`CartStore`] after every mutation. A mutation whose write fails
//! leaves the in-memory state untouched.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::price::PriceNormalizer;
use crate::products::{PriceValue, ProductRef, ViewProduct};

pub use store::{CartStore, FileCartStore, MemoryCartStore};

/// Key the cart collection is stored under unless configured otherwise.
pub const DEFAULT_CART_KEY: &str = "vitrina.cart";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart storage failed for key {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cart: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One line of the cart.
///
/// The price is captured when the product is added and never refreshed.
/// Older stored carts may carry string prices or lack fields; those load
/// with defaults and are skipped by [`CartLedger::total`] when unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product_id: ProductRef,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub captured_price: Option<PriceValue>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

pub struct CartLedger<S> {
    store: S,
    key: String,
    prices: PriceNormalizer,
    entries: Vec<CartEntry>,
}

impl<S: CartStore> CartLedger<S> {
    /// Rehydrates the cart stored under `key`.
    ///
    /// Never fails: unreadable, missing or corrupt data yields an empty
    /// cart, and individual malformed entries are dropped.
    pub fn load(store: S, key: &str, prices: PriceNormalizer) -> Self {
        let entries = match store.read(key) {
            Ok(Some(raw)) => decode_entries(key, &raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "could not read stored cart, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(key, entries = entries.len(), "cart loaded");
        Self {
            store,
            key: key.to_owned(),
            prices,
            entries,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CartEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds `quantity` units of `product`, capturing its current resolved
    /// price. An existing line keeps its captured price and only grows.
    /// `quantity <= 0` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the updated cart cannot be persisted.
    pub fn add_item(&mut self, product: &ViewProduct, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return Ok(());
        }
        let mut next = self.entries.clone();
        match next.iter_mut().find(|e| e.product_id == product.id) {
            Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
            None => next.push(CartEntry {
                product_id: product.id,
                quantity,
                captured_price: Some(PriceValue::Numeric(product.price)),
                name: product.name.clone(),
                image: product.image.clone(),
                added_at: Utc::now(),
            }),
        }
        self.commit(next)
    }

    /// Sets the quantity of an existing line; `quantity <= 0` removes it.
    /// Unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the updated cart cannot be persisted.
    pub fn set_quantity(&mut self, product: &ProductRef, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            self.remove_item(product)?;
            return Ok(());
        }
        let mut next = self.entries.clone();
        let Some(entry) = next.iter_mut().find(|e| e.product_id == *product) else {
            return Ok(());
        };
        entry.quantity = quantity;
        self.commit(next)
    }

    /// Returns `true` if a line was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the updated cart cannot be persisted.
    pub fn remove_item(&mut self, product: &ProductRef) -> Result<bool, CartError> {
        let mut next = self.entries.clone();
        let before = next.len();
        next.retain(|e| e.product_id != *product);
        if next.len() == before {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Empties the cart and deletes its stored value.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the stored value cannot be removed.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.store
            .remove(&self.key)
            .map_err(|source| CartError::Storage {
                key: self.key.clone(),
                source,
            })?;
        self.entries.clear();
        Ok(())
    }

    /// Sum of `price × quantity` over every usable line.
    ///
    /// Lines with a missing or unparseable price, or a non-positive
    /// quantity, are skipped with a warning.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total(&self) -> f64 {
        self.entries
            .iter()
            .filter_map(|entry| {
                if entry.quantity <= 0 {
                    tracing::warn!(
                        product = %entry.product_id,
                        quantity = entry.quantity,
                        "skipping cart line with non-positive quantity"
                    );
                    return None;
                }
                let Some(price) = entry.captured_price.as_ref() else {
                    tracing::warn!(product = %entry.product_id, "skipping cart line without price");
                    return None;
                };
                match self.prices.parse(price) {
                    Ok(unit) => Some(unit * entry.quantity as f64),
                    Err(e) => {
                        tracing::warn!(
                            product = %entry.product_id,
                            error = %e,
                            "skipping cart line with unparseable price"
                        );
                        None
                    }
                }
            })
            .sum()
    }

    /// [`Self::total`] rendered for display.
    #[must_use]
    pub fn formatted_total(&self) -> String {
        self.prices.format_amount(self.total())
    }

    /// Total number of units across all lines with a positive quantity.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.entries
            .iter()
            .map(|e| e.quantity.max(0))
            .fold(0, i64::saturating_add)
    }

    fn commit(&mut self, next: Vec<CartEntry>) -> Result<(), CartError> {
        let encoded = serde_json::to_string(&next)?;
        self.store
            .write(&self.key, &encoded)
            .map_err(|source| CartError::Storage {
                key: self.key.clone(),
                source,
            })?;
        self.entries = next;
        Ok(())
    }
}

/// Decodes a stored collection entry by entry so one bad line does not
/// discard the rest of the cart.
fn decode_entries(key: &str, raw: &str) -> Vec<CartEntry> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored cart is corrupt, starting empty");
            return Vec::new();
        }
    };
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<CartEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key, error = %e, "dropping malformed cart entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
