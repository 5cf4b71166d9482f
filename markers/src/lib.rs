pub mod cache;
pub mod config;
pub mod dataset;
pub mod names;
pub mod registry;

pub use cache::{CachePhase, ListenerGuard, MarkerCache};
pub use config::CacheConfig;
pub use dataset::{LoadError, MarkerTree, RawMarkerEntry, parse_marker_tree};
pub use names::{MemoryOverrideStore, NameOverrideStore, resolve_name};
pub use registry::{
    CacheRegistry, MARKER_CACHE, UnsupportedContextError, WindowContext, initialize_marker_cache,
    shared_marker_cache,
};
