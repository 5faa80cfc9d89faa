//! Native catalogue fetcher for Shopify stores
//!
//! Shopify storefronts expose `/products.json?limit=<n>&page=<p>`; pages are
//! requested in order until one comes back empty.

mod catalogue;
mod error;
mod shopify;

pub use catalogue::{write_catalogue, Catalogue, CatalogueFetcher};
pub use error::FetchError;
pub use shopify::{PageSource, ShopifySource};
