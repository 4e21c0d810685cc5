//! Product search against the marketplace service.

mod client;
mod error;
mod product;

pub use client::CatalogClient;
pub use error::{CatalogError, CatalogResult};
pub use product::{normalize_listing, ProductItem};
