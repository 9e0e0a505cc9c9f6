//! Merges a base product with a catalog override into a [`ViewProduct`].
//!
//! Every overridable field is resolved independently:
//! override (present and non-empty) → base product → field default.
//! Defaults are the empty string for text, `0` for prices and the image
//! fallback for images.

use crate::image::ImageResolver;
use crate::price::PriceNormalizer;
use crate::products::{
    CustomProduct, ImageRef, OverrideRecord, PriceValue, ProductRef, SourceProduct, ViewProduct,
};

/// Display name for entries whose base product could not be found.
pub const PLACEHOLDER_NAME: &str = "Unnamed product";

/// The product an override is applied on top of.
#[derive(Debug, Clone, Copy)]
pub enum ProductBase<'a> {
    /// Item mirrored from the external commerce catalog.
    External(&'a SourceProduct),
    /// Item that only exists inside the grouping.
    Custom(&'a CustomProduct),
    /// Neither a source item nor custom data is available for this id.
    Missing(ProductRef),
}

/// Resolves [`ViewProduct`]s. Pure; holds only formatting configuration.
#[derive(Debug, Clone, Default)]
pub struct OverlayResolver {
    prices: PriceNormalizer,
    images: ImageResolver,
}

impl OverlayResolver {
    #[must_use]
    pub fn new(prices: PriceNormalizer, images: ImageResolver) -> Self {
        Self { prices, images }
    }

    #[must_use]
    pub fn prices(&self) -> &PriceNormalizer {
        &self.prices
    }

    #[must_use]
    pub fn images(&self) -> &ImageResolver {
        &self.images
    }

    /// Produces the unified view of `base` with `overrides` applied.
    #[must_use]
    pub fn resolve(&self, base: ProductBase<'_>, overrides: Option<&OverrideRecord>) -> ViewProduct {
        let fields = BaseFields::from(base);
        let empty = OverrideRecord::default();
        let o = overrides.unwrap_or(&empty);

        if fields.placeholder {
            tracing::warn!(
                product = %fields.id,
                "no source or custom data for catalog entry, rendering placeholder"
            );
        }

        let original_price = self.prices.parse_or_zero(non_blank_price(fields.price));
        let price = non_blank_price(o.catalog_price.as_ref())
            .map_or(original_price, |p| self.prices.parse_or_zero(Some(p)));

        let parse_optional = |p: Option<&PriceValue>| {
            non_blank_price(p).map(|p| self.prices.parse_or_zero(Some(p)))
        };

        let primary = usable(o.catalog_image.as_ref())
            .or_else(|| usable(o.catalog_images.first()))
            .or_else(|| usable(fields.primary_image));

        let gallery_len = o.catalog_images.len().max(fields.images.len());
        let images = (0..gallery_len)
            .filter_map(|i| {
                usable(o.catalog_images.get(i)).or_else(|| usable(fields.images.get(i).copied()))
            })
            .map(|image| self.images.resolve(Some(image)))
            .collect();

        let default_name = if fields.placeholder { PLACEHOLDER_NAME } else { "" };
        let original_name = non_empty(fields.name).unwrap_or(default_name).to_owned();

        ViewProduct {
            id: fields.id,
            product_id: fields.product_id,
            name: pick_text(o.catalog_name.as_deref(), Some(original_name.as_str())),
            description: pick_text(o.catalog_description.as_deref(), fields.description),
            short_description: pick_text(
                o.catalog_short_description.as_deref(),
                fields.short_description,
            ),
            sku: pick_text(o.catalog_sku.as_deref(), fields.sku),
            price,
            image: self.images.resolve(primary),
            images,
            original_name,
            original_price,
            regular_price: parse_optional(fields.regular_price),
            sale_price: parse_optional(fields.sale_price),
            original_image: self.images.resolve(usable(fields.primary_image)),
            is_custom: !fields.external || o.is_custom == Some(true),
            is_placeholder: fields.placeholder,
        }
    }
}

/// Convenience wrapper around [`OverlayResolver::resolve`] with default
/// formatting configuration.
#[must_use]
pub fn resolve_view_product(
    base: ProductBase<'_>,
    overrides: Option<&OverrideRecord>,
) -> ViewProduct {
    OverlayResolver::default().resolve(base, overrides)
}

/// Base-product fields flattened out of whichever base variant was given.
struct BaseFields<'a> {
    id: ProductRef,
    product_id: u64,
    external: bool,
    placeholder: bool,
    name: Option<&'a str>,
    description: Option<&'a str>,
    short_description: Option<&'a str>,
    sku: Option<&'a str>,
    price: Option<&'a PriceValue>,
    regular_price: Option<&'a PriceValue>,
    sale_price: Option<&'a PriceValue>,
    primary_image: Option<&'a ImageRef>,
    images: Vec<&'a ImageRef>,
}

impl<'a> From<ProductBase<'a>> for BaseFields<'a> {
    fn from(base: ProductBase<'a>) -> Self {
        match base {
            ProductBase::External(source) => {
                let images: Vec<&ImageRef> = source.images.iter().map(|i| &i.src).collect();
                Self {
                    id: ProductRef::External(source.id),
                    product_id: source.id,
                    external: true,
                    placeholder: false,
                    name: Some(&source.name),
                    description: source.description.as_deref(),
                    short_description: source.short_description.as_deref(),
                    sku: source.sku.as_deref(),
                    price: source.price.as_ref(),
                    regular_price: source.regular_price.as_ref(),
                    sale_price: source.sale_price.as_ref(),
                    primary_image: images.first().copied(),
                    images,
                }
            }
            ProductBase::Custom(custom) => Self {
                id: custom.id,
                product_id: 0,
                external: false,
                placeholder: false,
                name: Some(&custom.name),
                description: custom.description.as_deref(),
                short_description: custom.short_description.as_deref(),
                sku: custom.sku.as_deref(),
                price: Some(&custom.price),
                regular_price: None,
                sale_price: None,
                primary_image: usable(custom.image.as_ref()).or_else(|| custom.images.first()),
                images: custom.images.iter().collect(),
            },
            ProductBase::Missing(id) => Self {
                id,
                product_id: 0,
                external: false,
                placeholder: true,
                name: None,
                description: None,
                short_description: None,
                sku: None,
                price: None,
                regular_price: None,
                sale_price: None,
                primary_image: None,
                images: Vec::new(),
            },
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn non_blank_price(value: Option<&PriceValue>) -> Option<&PriceValue> {
    value.filter(|p| !p.is_blank())
}

fn usable(image: Option<&ImageRef>) -> Option<&ImageRef> {
    image.filter(|i| i.is_usable())
}

fn pick_text(over: Option<&str>, base: Option<&str>) -> String {
    non_empty(over)
        .or_else(|| non_empty(base))
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
#[path = "overlay_test.rs"]
mod tests;
