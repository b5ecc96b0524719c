use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use vetrina::application::{CacheWarmer, InvalidationService, ProductService, SearchService};
use vetrina::cache::{
    CacheEntry, CacheRead, CacheStore, FragmentRegistry, MemoryStore, PopularityTracker,
    PutOptions, Revalidator, TtlPolicy, keys, put_json,
};
use vetrina::catalog::InMemoryCatalog;
use vetrina::domain::fragment::{FragmentKey, FragmentKind};
use vetrina::search::index::IndexStore;
use vetrina_api_types::{InvalidateRequest, ProductPayload};

struct Harness {
    store: Arc<MemoryStore>,
    revalidator: Revalidator,
    registry: FragmentRegistry,
    popularity: Arc<PopularityTracker>,
    products: ProductService,
    search: SearchService,
}

fn harness() -> Harness {
    let store = MemoryStore::shared();
    let catalog = InMemoryCatalog::seeded();
    let revalidator = Revalidator::new(store.clone(), 0.75);
    let registry = FragmentRegistry::new(store.clone());
    let popularity = Arc::new(PopularityTracker::new(
        store.clone(),
        Duration::from_secs(45 * 24 * 3600),
    ));
    let products = ProductService::new(
        catalog.clone(),
        revalidator.clone(),
        registry.clone(),
        popularity.clone(),
        TtlPolicy::default(),
    );
    let search = SearchService::new(
        catalog,
        IndexStore::new(store.clone(), Duration::from_secs(300)),
        revalidator.clone(),
        Duration::from_secs(60),
    );
    Harness {
        store,
        revalidator,
        registry,
        popularity,
        products,
        search,
    }
}

/// Plant a cache entry whose age already sits past the stale threshold
/// but inside the TTL.
async fn plant_stale_entry(h: &Harness, key: &str, payload: &ProductPayload, ttl_secs: u64) {
    let mut entry = CacheEntry::new(payload.clone(), Duration::from_secs(ttl_secs), 0.75);
    entry.created_at = OffsetDateTime::now_utc() - time::Duration::seconds(ttl_secs as i64 - 5);
    put_json(
        h.store.as_ref(),
        key,
        &entry,
        PutOptions::with_ttl(Duration::from_secs(ttl_secs)),
    )
    .await
    .expect("plant entry");
}

#[tokio::test]
async fn stale_entry_is_served_and_then_refreshed() {
    let h = harness();

    // First serve populates the cache from the catalog.
    let first = h
        .products
        .product_data("seed-1", None)
        .await
        .expect("first serve");
    let original_name = first.product.name.clone();

    // Age the entry past its stale threshold.
    plant_stale_entry(&h, &keys::product_key("seed-1"), &first.product, 3600).await;
    let read: CacheRead<ProductPayload> = h
        .revalidator
        .read(&keys::product_key("seed-1"))
        .await
        .expect("read");
    assert!(matches!(read, CacheRead::Stale(_)));

    // The stale value is still served.
    let served = h
        .products
        .product_data("seed-1", None)
        .await
        .expect("stale serve");
    assert_eq!(served.product.name, original_name);

    // After an explicit refresh the entry classifies fresh again.
    h.products
        .refresh("seed-1", "default")
        .await
        .expect("refresh");
    let read: CacheRead<ProductPayload> = h
        .revalidator
        .read(&keys::product_key("seed-1"))
        .await
        .expect("read");
    assert!(matches!(read, CacheRead::Fresh(_)));
}

#[tokio::test]
async fn expired_envelope_counts_as_miss() {
    let h = harness();
    let payload = ProductPayload {
        id: "ghost".into(),
        ..Default::default()
    };

    // Envelope TTL already elapsed, but no store-level TTL: the entry is
    // physically present and must still classify as a miss.
    let mut entry = CacheEntry::new(payload, Duration::from_secs(10), 0.75);
    entry.created_at = OffsetDateTime::now_utc() - time::Duration::seconds(60);
    put_json(
        h.store.as_ref(),
        &keys::product_key("ghost"),
        &entry,
        PutOptions::default(),
    )
    .await
    .expect("plant entry");

    let read: CacheRead<ProductPayload> = h
        .revalidator
        .read(&keys::product_key("ghost"))
        .await
        .expect("read");
    assert!(matches!(read, CacheRead::Miss));
}

#[tokio::test]
async fn invalidation_drops_cache_entries_and_registry_records() {
    let h = harness();
    let invalidation = InvalidationService::new(h.registry.clone());

    h.products.product_data("seed-1", None).await.expect("serve");
    h.products.product_data("seed-2", None).await.expect("serve");

    let outcome = invalidation
        .invalidate(InvalidateRequest {
            product_ids: vec!["seed-1".into()],
            ..Default::default()
        })
        .await
        .expect("invalidate");
    assert_eq!(outcome.invalidated, 1);

    // seed-1 was cached under its id-or-slug lookup key.
    assert!(h
        .store
        .get(&keys::product_key("seed-1"))
        .await
        .expect("read")
        .is_none());
    assert!(h
        .store
        .get(&keys::product_key("seed-2"))
        .await
        .expect("read")
        .is_some());

    // A second, identical request is an idempotent no-op.
    let again = invalidation
        .invalidate(InvalidateRequest {
            product_ids: vec!["seed-1".into()],
            ..Default::default()
        })
        .await
        .expect("invalidate");
    assert_eq!(again.invalidated, 0);
}

#[tokio::test]
async fn warm_pass_primes_popular_products() {
    let h = harness();
    let warmer = CacheWarmer::new(
        h.products.clone(),
        h.search.clone(),
        h.popularity.clone(),
        5,
    );

    h.popularity.record_hit("seed-3").await.expect("hit");
    h.popularity.record_hit("seed-3").await.expect("hit");

    let warmed = warmer.warm().await.expect("warm");
    assert_eq!(warmed, 1);
    assert!(h
        .store
        .get(&keys::product_key("seed-3"))
        .await
        .expect("read")
        .is_some());
    assert!(h
        .store
        .get(keys::INDEX_CURRENT_KEY)
        .await
        .expect("read")
        .is_some());
}

#[tokio::test]
async fn registry_sweep_removes_expired_fragments() {
    let h = harness();

    h.registry
        .upsert(
            FragmentKey::new("old", "v1", "default"),
            FragmentKind::Banner,
            keys::product_key("old"),
            Duration::ZERO,
        )
        .await
        .expect("upsert");
    h.registry
        .upsert(
            FragmentKey::new("live", "v1", "default"),
            FragmentKind::Banner,
            keys::product_key("live"),
            Duration::from_secs(3600),
        )
        .await
        .expect("upsert");

    tokio::time::sleep(Duration::from_millis(10)).await;
    let outcome = h.registry.sweep_expired().await.expect("sweep");
    assert_eq!(outcome.removed, 1);
    assert!(h
        .registry
        .get(&FragmentKey::new("live", "v1", "default"))
        .await
        .expect("read")
        .is_some());
}

#[tokio::test]
async fn ttl_policy_flows_from_popularity_into_cache_writes() {
    let h = harness();

    // Drive seed-4 above the hot-bucket threshold: 41 hits today weigh 82.
    for _ in 0..41 {
        h.popularity.record_hit("seed-4").await.expect("hit");
    }
    let score = h.popularity.score("seed-4").await.expect("score");
    assert_eq!(score, Some(82));

    h.products.refresh("seed-4", "default").await.expect("refresh");
    let record = h
        .registry
        .get(&FragmentKey::new("seed-4", "v1", "default"))
        .await
        .expect("read")
        .expect("record");

    // Hot products land in the short bucket (30 minutes).
    let lifetime = record.expires_at - record.updated_at;
    assert_eq!(lifetime.whole_seconds(), 30 * 60);
}
