pub mod backend;
pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod session;
pub mod types;

pub use backend::CatalogBackend;
pub use client::HttpCatalogBackend;
pub use error::{CatalogError, ClientError};
pub use session::CatalogSession;
pub use types::{CatalogListing, CreatedCatalog};
