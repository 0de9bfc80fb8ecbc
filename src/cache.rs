//! Shared schema cache and exclusion memo.
//!
//! Both structures live behind an `Arc` so every fork of a
//! [`Prefixer`](crate::Prefixer) shares introspection work. Nothing is
//! evicted on its own: compiled models are a fixed set. Callers that swap
//! runtime-described models can drop everything with [`SchemaCache::clear`].

use crate::reflect::TypeKey;
use crate::schema::SchemaNode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Types known to contain no tagged field anywhere in their subtree.
///
/// Grows until the owning cache is cleared.
#[derive(Debug, Default)]
pub struct ExclusionSet {
    keys: RwLock<HashSet<TypeKey>>,
}

impl ExclusionSet {
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Record a type as empty. Returns `false` if it was already known.
    pub fn insert(&self, key: TypeKey) -> bool {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self) {
        self.keys.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Root models with a cached tree.
    pub models: usize,
    /// Types memoized as having no tagged fields.
    pub excluded: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// One cache entry. Built at most once; readers of other keys never wait on it.
type Slot = Arc<OnceLock<Arc<SchemaNode>>>;

#[derive(Debug, Default)]
struct CacheInner {
    models: RwLock<HashMap<TypeKey, Slot>>,
    excluded: ExclusionSet,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Root-model schema trees keyed by qualified type identity.
///
/// Cloning is cheap and shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    inner: Arc<CacheInner>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<SchemaNode>> {
        self.inner
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    /// Store a tree unless one is already cached for `key`.
    ///
    /// Returns the tree that ends up cached.
    pub fn put(&self, key: TypeKey, node: SchemaNode) -> Arc<SchemaNode> {
        Arc::clone(self.slot(&key).get_or_init(|| Arc::new(node)))
    }

    /// Cached tree for `key`, building it with `build` on a miss.
    ///
    /// The map lock is only held to find or create the key's slot. Callers
    /// racing on the same cold key wait for one build; other keys stay
    /// readable meanwhile.
    pub fn get_or_build(&self, key: &TypeKey, build: impl FnOnce(&ExclusionSet) -> SchemaNode) -> Arc<SchemaNode> {
        let slot = self.slot(key);

        let mut built = false;
        let node = slot.get_or_init(|| {
            built = true;
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(model = %key, "schema cache miss, introspecting");
            Arc::new(build(&self.inner.excluded))
        });

        if !built {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(model = %key, "schema cache hit");
        }
        Arc::clone(node)
    }

    /// Drop every cached tree and exclusion entry.
    ///
    /// Builds already in flight finish into detached slots and are not kept.
    pub fn clear(&self) {
        let mut models = self.inner.models.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = models.len();
        models.clear();
        self.inner.excluded.clear();
        tracing::debug!(models = dropped, "schema cache cleared");
    }

    pub fn excluded(&self) -> &ExclusionSet {
        &self.inner.excluded
    }

    /// True when both handles share the same storage.
    pub fn shares_with(&self, other: &SchemaCache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn stats(&self) -> CacheStats {
        let models = self
            .inner
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.get().is_some())
            .count();

        CacheStats {
            models,
            excluded: self.inner.excluded.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, key: &TypeKey) -> Slot {
        if let Some(slot) = self.inner.models.read().unwrap_or_else(PoisonError::into_inner).get(key) {
            return Arc::clone(slot);
        }

        let mut models = self.inner.models.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(models.entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    fn key(name: &'static str) -> TypeKey {
        TypeKey::from_static(name, name)
    }

    #[test]
    fn test_cache_hit_miss() {
        let cache = SchemaCache::new();
        let mut builds = 0;

        cache.get_or_build(&key("app::User"), |_| {
            builds += 1;
            SchemaNode::new("User", "u", "")
        });
        cache.get_or_build(&key("app::User"), |_| {
            builds += 1;
            SchemaNode::new("User", "u", "")
        });

        assert_eq!(builds, 1);
        let stats = cache.stats();
        assert_eq!(stats.models, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_put_keeps_first_tree() {
        let cache = SchemaCache::new();
        cache.put(key("app::User"), SchemaNode::new("User", "first", ""));
        let kept = cache.put(key("app::User"), SchemaNode::new("User", "second", ""));
        assert_eq!(kept.table_alias, "first");
        assert_eq!(cache.get(&key("app::User")).unwrap().table_alias, "first");
    }

    #[test]
    fn test_clones_share_state() {
        let cache = SchemaCache::new();
        let fork = cache.clone();
        fork.excluded().insert(key("app::Money"));

        assert!(cache.shares_with(&fork));
        assert!(cache.excluded().contains(&key("app::Money")));
        assert!(!SchemaCache::new().shares_with(&cache));
    }

    #[test]
    fn test_clear_drops_trees_and_exclusions() {
        let cache = SchemaCache::new();
        let fork = cache.clone();
        cache.put(key("app::User"), SchemaNode::new("User", "u", ""));
        cache.excluded().insert(key("app::Money"));

        fork.clear();

        assert!(cache.get(&key("app::User")).is_none());
        assert!(cache.excluded().is_empty());
        assert_eq!(cache.stats().models, 0);

        let rebuilt = cache.get_or_build(&key("app::User"), |_| SchemaNode::new("User", "v", ""));
        assert_eq!(rebuilt.table_alias, "v");
    }

    #[test]
    fn test_build_does_not_block_other_keys() {
        let cache = SchemaCache::new();
        cache.put(key("app::Address"), SchemaNode::new("Address", "a", ""));

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|scope| {
            let builder = scope.spawn(|| {
                cache.get_or_build(&key("app::User"), move |_| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    SchemaNode::new("User", "u", "")
                })
            });

            started_rx.recv().unwrap();
            // The User build is parked inside its slot.
            assert_eq!(cache.get(&key("app::Address")).unwrap().table_alias, "a");
            assert!(cache.get(&key("app::User")).is_none());
            let other = cache.get_or_build(&key("app::Order"), |_| SchemaNode::new("Order", "o", ""));
            assert_eq!(other.table_alias, "o");

            release_tx.send(()).unwrap();
            assert_eq!(builder.join().unwrap().table_alias, "u");
        });

        let stats = cache.stats();
        assert_eq!(stats.models, 3);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_racing_builders_build_once() {
        let cache = SchemaCache::new();
        let builds = AtomicU64::new(0);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    cache.get_or_build(&key("app::User"), |_| {
                        builds.fetch_add(1, Ordering::Relaxed);
                        SchemaNode::new("User", "u", "")
                    });
                });
            }
        });

        assert_eq!(builds.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 7);
    }

    #[test]
    fn test_exclusion_insert_once() {
        let set = ExclusionSet::default();
        assert!(set.is_empty());
        assert!(set.insert(key("app::Money")));
        assert!(!set.insert(key("app::Money")));
        assert_eq!(set.len(), 1);
    }
}
