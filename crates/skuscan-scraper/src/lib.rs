pub mod cache;
pub mod catalog;
pub mod client;
pub mod discover;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;
pub mod sku;
pub mod types;

pub use cache::{CacheEntry, CatalogCache};
pub use catalog::{lookup_sku, Catalog, CatalogIndexer, SkuCollision, VariantRecord};
pub use client::StoreClient;
pub use error::ScraperError;
pub use pipeline::Pipeline;
pub use resolver::{
    resolve_item, AnyResolver, NetoResolver, ResolveContext, Resolver, ShopifyResolver,
    WooCommerceResolver,
};
pub use scheduler::Scheduler;
pub use sku::{normalize_sku_key, SkuKeyPolicy};
