use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use routemill::{CacheError, RouteCache, RouteCollection, RouteCollectionBuilder, RouteFactory};

/// Keeps the collection in memory and counts calls.
#[derive(Default)]
struct MemoryCache {
    slot: Mutex<Option<RouteCollection>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl RouteCache for MemoryCache {
    fn get(&self) -> Option<RouteCollection> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.slot.lock().unwrap().clone()
    }

    fn set(&self, routes: &RouteCollection) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = Some(routes.clone());
        Ok(())
    }
}

struct BrokenCache;

impl RouteCache for BrokenCache {
    fn get(&self) -> Option<RouteCollection> {
        None
    }

    fn set(&self, _routes: &RouteCollection) -> Result<(), CacheError> {
        Err(CacheError::new("read-only store"))
    }
}

fn register(routes: RouteCollectionBuilder) -> RouteCollectionBuilder {
    routes
        .route(&["GET"], "/users", |r| r.to_method("Users", "index").named("Users"))
        .route(&["GET"], "/users/:id(int)", |r| r.to_method("Users", "show"))
}

#[test]
fn no_cache_compiles_every_time() {
    let factory = RouteFactory::new(register);
    let a = factory.create_routes().unwrap();
    let b = factory.create_routes().unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a, b);
}

#[test]
fn miss_then_hit() {
    let cache = Arc::new(MemoryCache::default());
    let compiled = AtomicUsize::new(0);
    let factory = RouteFactory::new(|routes| {
        compiled.fetch_add(1, Ordering::SeqCst);
        register(routes)
    })
    .with_cache(Arc::clone(&cache));

    let first = factory.create_routes().unwrap();
    assert_eq!(compiled.load(Ordering::SeqCst), 1);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);

    let second = factory.create_routes().unwrap();
    assert_eq!(compiled.load(Ordering::SeqCst), 1, "a hit must skip compilation");
    assert_eq!(cache.gets.load(Ordering::SeqCst), 2);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[test]
fn hit_is_authoritative() {
    let cache = Arc::new(MemoryCache::default());
    let stale = RouteCollectionBuilder::new()
        .route(&["GET"], "/old", |r| r.to_handler("old"))
        .build()
        .unwrap();
    *cache.slot.lock().unwrap() = Some(stale.clone());

    let factory = RouteFactory::new(register).with_cache(Arc::clone(&cache));
    assert_eq!(factory.create_routes().unwrap(), stale);
}

#[test]
fn failed_set_still_returns_routes() {
    let factory = RouteFactory::new(register).with_cache(BrokenCache);
    let routes = factory.create_routes().unwrap();
    assert!(routes.get_named_route("Users").is_ok());
}
