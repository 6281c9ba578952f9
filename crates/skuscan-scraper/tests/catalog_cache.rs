//! Integration tests for `CatalogCache`: single-flight builds, TTL expiry,
//! invalidation, and empty-catalog eviction.

mod common;

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{products_page, test_client, two_product_page};
use skuscan_scraper::{CatalogCache, CatalogIndexer};

fn cache(ttl: Duration) -> CatalogCache {
    CatalogCache::new(CatalogIndexer::new(test_client()).with_page_delay_ms(0), ttl)
}

/// Page 1 with the two-product fixture (served `builds` times, slowly) and
/// an empty page 2.
async fn mount_catalog(server: &MockServer, builds: u64) {
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(two_product_page())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(builds)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(vec![])))
        .expect(builds)
        .mount(server)
        .await;
}

#[tokio::test]
async fn concurrent_callers_share_one_build() {
    let server = MockServer::start().await;
    mount_catalog(&server, 1).await;
    let cache = cache(Duration::from_secs(3600));
    let origin = server.uri();

    let (a, b) = tokio::join!(cache.get_or_build(&origin), cache.get_or_build(&origin));

    assert!(Arc::ptr_eq(&a, &b), "both callers must see the same catalog");
    assert_eq!(a.len(), 2);
}

#[tokio::test]
async fn later_batches_reuse_cached_catalog() {
    let server = MockServer::start().await;
    mount_catalog(&server, 1).await;
    let cache = cache(Duration::from_secs(3600));

    let first = cache.get_or_build(&server.uri()).await;
    // Different spelling of the same origin hits the same slot.
    let second = cache
        .get_or_build(&format!("{}/collections/all", server.uri()))
        .await;

    assert!(Arc::ptr_eq(&first, &second));
    let entries = cache.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].origin, server.uri());
    assert_eq!(entries[0].variants, 2);
}

#[tokio::test]
async fn expired_catalog_is_rebuilt() {
    let server = MockServer::start().await;
    mount_catalog(&server, 2).await;
    let cache = cache(Duration::from_millis(50));

    let first = cache.get_or_build(&server.uri()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.entries().await.is_empty(), "expired entries are not listed");
    let second = cache.get_or_build(&server.uri()).await;

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn invalidate_all_forces_refetch() {
    let server = MockServer::start().await;
    mount_catalog(&server, 2).await;
    let cache = cache(Duration::from_secs(3600));

    cache.get_or_build(&server.uri()).await;
    cache.invalidate_all().await;
    assert!(cache.entries().await.is_empty());
    let rebuilt = cache.get_or_build(&server.uri()).await;

    assert_eq!(rebuilt.len(), 2);
}

#[tokio::test]
async fn empty_catalog_is_not_retained() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;
    let cache = cache(Duration::from_secs(3600));

    let first = cache.get_or_build(&server.uri()).await;
    assert!(first.is_empty());
    assert!(cache.entries().await.is_empty());

    let second = cache.get_or_build(&server.uri()).await;
    assert!(second.is_empty());
}
