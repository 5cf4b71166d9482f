use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::cache::MarkerCache;

/// Window contexts of an application session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowContext {
    /// The controller context; the only one allowed to own the canonical
    /// marker cache.
    Background,
    /// The in-game overlay window.
    Overlay,
    /// The desktop companion window.
    Desktop,
}

impl WindowContext {
    pub fn owns_marker_cache(self) -> bool {
        matches!(self, WindowContext::Background)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "the marker cache cannot be owned by the {0:?} window; fetch the shared instance instead"
)]
pub struct UnsupportedContextError(pub WindowContext);

/// Holds a session's canonical [`MarkerCache`].
#[derive(Default)]
pub struct CacheRegistry {
    slot: OnceLock<Arc<MarkerCache>>,
}

impl CacheRegistry {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Canonical-instance accessor, restricted to the owning context. The
    /// first call constructs the cache; every later call returns the same
    /// instance. Non-owning contexts are rejected and never construct.
    pub fn instance(
        &self,
        ctx: WindowContext,
        build: impl FnOnce() -> MarkerCache,
    ) -> Result<Arc<MarkerCache>, UnsupportedContextError> {
        if !ctx.owns_marker_cache() {
            return Err(UnsupportedContextError(ctx));
        }
        Ok(Arc::clone(self.slot.get_or_init(|| Arc::new(build()))))
    }

    /// The canonical instance, if one has been initialized. Available from
    /// any context; never constructs.
    pub fn get(&self) -> Option<Arc<MarkerCache>> {
        self.slot.get().cloned()
    }
}

/// Well-known slot holding the session's canonical cache.
pub static MARKER_CACHE: CacheRegistry = CacheRegistry::new();

/// Idempotent composition-root entry point: constructs and publishes the
/// canonical cache when called from the background context, and is a no-op
/// everywhere else.
pub fn initialize_marker_cache(
    ctx: WindowContext,
    build: impl FnOnce() -> MarkerCache,
) -> Option<Arc<MarkerCache>> {
    MARKER_CACHE.instance(ctx, build).ok()
}

/// The session's shared cache, from any window context.
pub fn shared_marker_cache() -> Option<Arc<MarkerCache>> {
    MARKER_CACHE.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::names::MemoryOverrideStore;

    fn build_cache() -> MarkerCache {
        MarkerCache::new(
            CacheConfig::default(),
            Arc::new(MemoryOverrideStore::new()),
        )
    }

    #[test]
    fn owning_context_gets_the_same_instance_every_time() {
        let registry = CacheRegistry::new();
        let first = registry
            .instance(WindowContext::Background, build_cache)
            .expect("background context owns the cache");
        let second = registry
            .instance(WindowContext::Background, build_cache)
            .expect("background context owns the cache");
        assert!(Arc::ptr_eq(&first, &second));

        let fetched = registry.get().expect("registry should be populated");
        assert!(Arc::ptr_eq(&first, &fetched));
    }

    #[test]
    fn non_owning_contexts_are_rejected_every_time() {
        let registry = CacheRegistry::new();
        for ctx in [WindowContext::Overlay, WindowContext::Desktop] {
            let err = registry
                .instance(ctx, build_cache)
                .expect_err("only the background context owns the cache");
            assert_eq!(err, UnsupportedContextError(ctx));
            let err = registry
                .instance(ctx, build_cache)
                .expect_err("rejection is not one-shot");
            assert_eq!(err, UnsupportedContextError(ctx));
        }
        assert!(registry.get().is_none());
    }

    #[test]
    fn rejected_construction_does_not_populate_the_slot() {
        let registry = CacheRegistry::new();
        let _ = registry.instance(WindowContext::Overlay, || {
            panic!("build must not run for a rejected context")
        });
        assert!(registry.get().is_none());

        let owned = registry
            .instance(WindowContext::Background, build_cache)
            .expect("background context owns the cache");
        assert!(Arc::ptr_eq(&owned, &registry.get().expect("populated")));
    }

    // Keep global-slot coverage to non-owning contexts so parallel tests
    // never race to populate the process-wide registry.
    #[test]
    fn global_entry_points_are_noops_outside_the_background_context() {
        assert!(initialize_marker_cache(WindowContext::Overlay, build_cache).is_none());
        assert!(initialize_marker_cache(WindowContext::Desktop, build_cache).is_none());
        assert!(shared_marker_cache().is_none());
    }
}
