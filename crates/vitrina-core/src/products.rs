//! Product data model shared by the overlay resolver, the catalog aggregate
//! and the cart ledger.
//!
//! ## Observed shapes from the commerce backend
//!
//! ### Prices
//! Arrive either as JSON numbers (`50000`) or as source-formatted strings
//! (`"80000"`, `"80.000"`, `"COP 19.000"`). Both are kept verbatim in
//! [`PriceValue`] and only interpreted by [`crate::price::PriceNormalizer`].
//!
//! ### Images
//! "No image" has several encodings: `null`, a missing field, the boolean
//! `false`, and the string `"false"`. Older records carry `{ "src": ... }`
//! objects instead of bare strings. [`ImageRef`] folds all of these into one
//! tagged union at deserialization time.
//!
//! ### Custom products
//! Catalog records with `product_id == 0` have no external backing. Their
//! display data lives in the `catalog_*` override fields of the record itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::image::unwrap_array_string;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Locally assigned identifier for a custom product that has not been
/// created on the backend yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pending-{}", self.0)
    }
}

/// Identity of an entry inside a catalog grouping.
///
/// External products and custom products are numbered by independent
/// backend sequences, so the same number can name one of each. The variant
/// keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRef {
    /// Item of the external commerce catalog.
    #[serde(alias = "persisted")]
    External(u64),
    /// Custom product saved on the backend.
    Custom(u64),
    /// Temporary id of an unsaved custom product.
    Pending(LocalId),
}

impl ProductRef {
    /// External-catalog id, or `0` when the entry has no external backing.
    #[must_use]
    pub fn product_id(&self) -> u64 {
        match self {
            ProductRef::External(id) => *id,
            ProductRef::Custom(_) | ProductRef::Pending(_) => 0,
        }
    }

    /// Backend id of a saved custom product.
    #[must_use]
    pub fn custom_id(&self) -> Option<u64> {
        match self {
            ProductRef::Custom(id) => Some(*id),
            ProductRef::External(_) | ProductRef::Pending(_) => None,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, ProductRef::Pending(_))
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductRef::External(id) => write!(f, "{id}"),
            ProductRef::Custom(id) => write!(f, "custom-{id}"),
            ProductRef::Pending(local) => write!(f, "{local}"),
        }
    }
}

impl FromStr for ProductRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("pending-") {
            return rest
                .parse::<u64>()
                .map(|n| ProductRef::Pending(LocalId(n)))
                .map_err(|e| format!("invalid pending id \"{s}\": {e}"));
        }
        let (rest, custom) = match s.strip_prefix("custom-") {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        match rest.parse::<u64>() {
            Ok(0) => Err("product id 0 is reserved for unbacked entries".to_string()),
            Ok(id) if custom => Ok(ProductRef::Custom(id)),
            Ok(id) => Ok(ProductRef::External(id)),
            Err(e) => Err(format!("invalid product id \"{s}\": {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Loosely typed wire values
// ---------------------------------------------------------------------------

/// A price as it arrived: already numeric, or a raw source-formatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Numeric(f64),
    Raw(String),
}

impl PriceValue {
    /// `true` for empty or whitespace-only raw strings.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            PriceValue::Numeric(_) => false,
            PriceValue::Raw(s) => s.trim().is_empty(),
        }
    }
}

impl Default for PriceValue {
    fn default() -> Self {
        PriceValue::Numeric(0.0)
    }
}

impl From<f64> for PriceValue {
    fn from(value: f64) -> Self {
        PriceValue::Numeric(value)
    }
}

impl From<u32> for PriceValue {
    fn from(value: u32) -> Self {
        PriceValue::Numeric(f64::from(value))
    }
}

impl From<&str> for PriceValue {
    fn from(value: &str) -> Self {
        PriceValue::Raw(value.to_owned())
    }
}

impl From<String> for PriceValue {
    fn from(value: String) -> Self {
        PriceValue::Raw(value)
    }
}

/// An image reference in any of the encodings the backend produces.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawImageRef", into = "RawImageRef")]
pub enum ImageRef {
    Url(String),
    /// Explicit "no image" marker (`false`, `"false"`, `{ "src": null }`).
    #[default]
    Sentinel,
    /// Legacy `{ "src": "..." }` object.
    Legacy { src: String },
}

impl ImageRef {
    /// `true` when the reference carries a non-empty, non-sentinel value.
    /// Array-encoded strings count by their first element, so `"[]"` is
    /// not usable.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        match self {
            ImageRef::Sentinel => false,
            ImageRef::Url(s) | ImageRef::Legacy { src: s } => match unwrap_array_string(s) {
                Some(first) => first.as_deref().is_some_and(is_present),
                None => is_present(s),
            },
        }
    }
}

fn is_present(s: &str) -> bool {
    let s = s.trim().trim_matches('"');
    !s.is_empty() && !s.eq_ignore_ascii_case("false")
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        RawImageRef::Text(value.to_owned()).into()
    }
}

/// Wire form of [`ImageRef`]; untagged so serde tries each JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawImageRef {
    Flag(bool),
    Text(String),
    Object {
        #[serde(default)]
        src: Option<String>,
    },
}

impl From<RawImageRef> for ImageRef {
    fn from(raw: RawImageRef) -> Self {
        match raw {
            RawImageRef::Flag(_) | RawImageRef::Object { src: None } => ImageRef::Sentinel,
            RawImageRef::Text(s) if s.trim() == "false" => ImageRef::Sentinel,
            RawImageRef::Text(s) => ImageRef::Url(s),
            RawImageRef::Object { src: Some(src) } => ImageRef::Legacy { src },
        }
    }
}

impl From<ImageRef> for RawImageRef {
    fn from(image: ImageRef) -> Self {
        match image {
            ImageRef::Url(s) => RawImageRef::Text(s),
            ImageRef::Sentinel => RawImageRef::Flag(false),
            ImageRef::Legacy { src } => RawImageRef::Object { src: Some(src) },
        }
    }
}

// ---------------------------------------------------------------------------
// Source entities
// ---------------------------------------------------------------------------

/// One image entry of a [`SourceProduct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub src: ImageRef,
    #[serde(default)]
    pub alt: Option<String>,
}

/// An item owned by the external commerce backend. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProduct {
    pub id: u64,
    pub name: String,
    /// Source-formatted price, e.g. `"80000"` or `"80.000"`. May be absent
    /// on draft items.
    #[serde(default)]
    pub price: Option<PriceValue>,
    #[serde(default)]
    pub regular_price: Option<PriceValue>,
    #[serde(default)]
    pub sale_price: Option<PriceValue>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub images: Vec<SourceImage>,
    #[serde(default)]
    pub permalink: Option<String>,
    /// `"instock"`, `"outofstock"` or `"onbackorder"`.
    #[serde(default)]
    pub stock_status: Option<String>,
}

/// Creation payload for a custom product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomProductDraft {
    pub name: String,
    #[serde(default)]
    pub price: PriceValue,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl CustomProductDraft {
    /// This draft with `overrides` folded in, field by field: a present,
    /// non-empty override value replaces the draft's value.
    ///
    /// Custom products have no separate membership record on the backend,
    /// so their catalog overrides are stored as product data.
    #[must_use]
    pub fn with_overrides(&self, overrides: &OverrideRecord) -> Self {
        let text = |over: &Option<String>, base: &Option<String>| {
            over.clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| base.clone())
        };
        let usable = |image: Option<&ImageRef>| image.filter(|i| i.is_usable()).cloned();

        let gallery_len = overrides.catalog_images.len().max(self.images.len());
        let images = (0..gallery_len)
            .filter_map(|i| {
                usable(overrides.catalog_images.get(i)).or_else(|| usable(self.images.get(i)))
            })
            .collect();

        Self {
            name: overrides
                .catalog_name
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| self.name.clone()),
            price: overrides
                .catalog_price
                .clone()
                .filter(|p| !p.is_blank())
                .unwrap_or_else(|| self.price.clone()),
            sku: text(&overrides.catalog_sku, &self.sku),
            description: text(&overrides.catalog_description, &self.description),
            short_description: text(
                &overrides.catalog_short_description,
                &self.short_description,
            ),
            image: usable(overrides.catalog_image.as_ref())
                .or_else(|| usable(overrides.catalog_images.first()))
                .or_else(|| self.image.clone()),
            images,
        }
    }
}

/// A product that only exists inside one catalog grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProduct {
    pub id: ProductRef,
    pub name: String,
    pub price: PriceValue,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// Primary image.
    pub image: Option<ImageRef>,
    /// Secondary images, in display order.
    pub images: Vec<ImageRef>,
}

impl CustomProduct {
    #[must_use]
    pub fn from_draft(id: ProductRef, draft: CustomProductDraft) -> Self {
        Self {
            id,
            name: draft.name,
            price: draft.price,
            sku: draft.sku,
            description: draft.description,
            short_description: draft.short_description,
            image: draft.image,
            images: draft.images,
        }
    }

    /// Creation payload carrying this product's current data.
    #[must_use]
    pub fn to_draft(&self) -> CustomProductDraft {
        CustomProductDraft {
            name: self.name.clone(),
            price: self.price.clone(),
            sku: self.sku.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone(),
            image: self.image.clone(),
            images: self.images.clone(),
        }
    }
}

/// Per-grouping, per-product field overrides. Every field is optional;
/// absent or empty means "defer to the base product".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverrideRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_price: Option<PriceValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog_images: Vec<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_custom: Option<bool>,
}

impl OverrideRecord {
    /// `true` when no field would change the resolved product.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let text_empty = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        self.catalog_price.as_ref().is_none_or(PriceValue::is_blank)
            && text_empty(&self.catalog_name)
            && text_empty(&self.catalog_description)
            && text_empty(&self.catalog_short_description)
            && text_empty(&self.catalog_sku)
            && self.catalog_image.as_ref().is_none_or(|i| !i.is_usable())
            && !self.catalog_images.iter().any(ImageRef::is_usable)
            && self.is_custom != Some(true)
    }
}

/// One item of `GET /catalogs/{id}/products` for entries that were saved
/// with catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProductRecord {
    /// External product id; `0` for custom products.
    pub product_id: u64,
    /// Custom product id, present when `product_id == 0`.
    #[serde(default)]
    pub id: Option<u64>,
    /// Embedded source item, when the backend expanded it.
    #[serde(default)]
    pub product: Option<SourceProduct>,
    #[serde(flatten)]
    pub overrides: OverrideRecord,
}

impl CatalogProductRecord {
    /// `true` when the record has no external backing.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.product_id == 0 || self.overrides.is_custom == Some(true)
    }

    /// Identity of the entry within its grouping, if it has one.
    #[must_use]
    pub fn product_ref(&self) -> Option<ProductRef> {
        if self.product_id != 0 {
            Some(ProductRef::External(self.product_id))
        } else {
            self.id.filter(|id| *id != 0).map(ProductRef::Custom)
        }
    }

    /// The custom product data carried by this record's catalog fields.
    ///
    /// Returns `None` for records with external backing.
    #[must_use]
    pub fn custom_draft(&self) -> Option<CustomProductDraft> {
        if self.product_id != 0 {
            return None;
        }
        let o = &self.overrides;
        Some(CustomProductDraft {
            name: o.catalog_name.clone().unwrap_or_default(),
            price: o.catalog_price.clone().unwrap_or_default(),
            sku: o.catalog_sku.clone(),
            description: o.catalog_description.clone(),
            short_description: o.catalog_short_description.clone(),
            image: o.catalog_image.clone(),
            images: o.catalog_images.clone(),
        })
    }

    /// Builds the custom product described by this record's catalog fields.
    ///
    /// Returns `None` for records with external backing or without an id.
    #[must_use]
    pub fn custom_product(&self) -> Option<CustomProduct> {
        let id = self.product_ref().filter(|r| r.custom_id().is_some())?;
        Some(CustomProduct::from_draft(id, self.custom_draft()?))
    }
}

// ---------------------------------------------------------------------------
// Resolved output
// ---------------------------------------------------------------------------

/// The unified product a storefront renders: resolved display fields plus
/// the unresolved originals needed for "was/now" comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewProduct {
    pub id: ProductRef,
    /// External-catalog id; `0` when the entry has no external backing.
    pub product_id: u64,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub sku: String,
    pub price: f64,
    pub image: String,
    pub images: Vec<String>,
    pub original_name: String,
    /// Base product price before any catalog override, normalized.
    pub original_price: f64,
    pub regular_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub original_image: String,
    pub is_custom: bool,
    /// `true` when neither a source item nor custom data could be found.
    pub is_placeholder: bool,
}

impl ViewProduct {
    /// `true` when the catalog price differs from the base price.
    ///
    /// Compares normalized numbers; `"80000"` and `"80.000"` are the same
    /// price.
    #[must_use]
    pub fn has_price_override(&self) -> bool {
        (self.price - self.original_price).abs() >= f64::EPSILON
    }
}
