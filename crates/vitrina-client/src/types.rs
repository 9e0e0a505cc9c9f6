//! Wire shapes specific to the catalog backend's responses.

use serde::{Deserialize, Serialize};
use vitrina_core::{
    CatalogProductRecord, CustomProduct, CustomProductDraft, ProductRef, SourceProduct,
};

/// One item of a catalog product listing.
///
/// Saved entries come back as [`CatalogProductRecord`]s; older groupings
/// list bare source items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CatalogListing {
    Record(CatalogProductRecord),
    Source(SourceProduct),
}

/// Body of `POST /catalogs`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewCatalog<'a> {
    pub name: &'a str,
}

/// Response of `POST /catalogs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedCatalog {
    pub id: u64,
    pub name: String,
}

/// Response of `POST /catalogs/{id}/custom-products`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedCustomProduct {
    pub id: u64,
    #[serde(flatten)]
    pub draft: CustomProductDraft,
}

impl From<CreatedCustomProduct> for CustomProduct {
    fn from(created: CreatedCustomProduct) -> Self {
        CustomProduct::from_draft(ProductRef::Custom(created.id), created.draft)
    }
}
