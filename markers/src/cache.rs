use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use waymark_shared::{Marker, MarkerIndex, TileCoordinate, TileGrid};

use crate::config::CacheConfig;
use crate::dataset::{self, LoadError, MarkerTree, RawMarkerEntry};
use crate::names::{NameOverrideStore, resolve_name};

/// Lifecycle phase of a [`MarkerCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePhase {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
enum LoadState {
    Uninitialized,
    Loading,
    Ready {
        index: Arc<MarkerIndex>,
        since: DateTime<Utc>,
    },
    Failed(LoadError),
}

type ReadyListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    fired: bool,
    entries: Vec<(u64, ReadyListener)>,
}

fn lock(listeners: &Mutex<ListenerSet>) -> MutexGuard<'_, ListenerSet> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by [`MarkerCache::on_ready`]. Dropping the guard leaves
/// the listener registered; removal is always explicit.
pub struct ListenerGuard {
    id: u64,
    listeners: Weak<Mutex<ListenerSet>>,
}

impl ListenerGuard {
    /// Removes the listener. Calling it repeatedly, or after the listener
    /// has fired, is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Tile-indexed cache over the remote marker dataset.
///
/// Construction is inert; [`MarkerCache::load`] performs the one fetch and
/// index build of the cache's lifetime. The index is published only once
/// fully built, so `lookup` is safe from any task at any time.
pub struct MarkerCache {
    http: reqwest::Client,
    markers_url: String,
    grid: TileGrid,
    overrides: Arc<dyn NameOverrideStore>,
    state: watch::Sender<LoadState>,
    load_started: AtomicBool,
    listeners: Arc<Mutex<ListenerSet>>,
}

impl MarkerCache {
    pub fn new(config: CacheConfig, overrides: Arc<dyn NameOverrideStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("waymark/", env!("CARGO_PKG_VERSION")))
            .timeout(config.http_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(config.http_timeout)
                    .connect_timeout(config.connect_timeout)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });

        let (state, _) = watch::channel(LoadState::Uninitialized);
        Self {
            http,
            markers_url: config.markers_url,
            grid: TileGrid::new(config.tile_edge),
            overrides,
            state,
            load_started: AtomicBool::new(false),
            listeners: Arc::new(Mutex::new(ListenerSet::default())),
        }
    }

    /// Fetches and indexes the dataset. The first call performs the build;
    /// concurrent and subsequent calls await the same outcome. There is no
    /// refresh path: a failed cache stays failed until a new instance is
    /// constructed.
    pub async fn load(&self) -> Result<Arc<MarkerIndex>, LoadError> {
        self.load_with(|| dataset::fetch_marker_tree(&self.http, &self.markers_url))
            .await
    }

    async fn load_with<F, Fut>(&self, fetch: F) -> Result<Arc<MarkerIndex>, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MarkerTree, LoadError>>,
    {
        if self.load_started.swap(true, Ordering::AcqRel) {
            return self.await_ready().await;
        }

        self.state.send_replace(LoadState::Loading);
        match self.fill_cache(fetch).await {
            Ok(index) => {
                self.state.send_replace(LoadState::Ready {
                    index: Arc::clone(&index),
                    since: Utc::now(),
                });
                self.fire_ready_listeners();
                Ok(index)
            }
            Err(e) => {
                warn!(error = %e, "marker dataset load failed");
                self.state.send_replace(LoadState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    async fn fill_cache<F, Fut>(&self, fetch: F) -> Result<Arc<MarkerIndex>, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MarkerTree, LoadError>>,
    {
        let remote = fetch().await?;
        let custom = dataset::custom_marker_tree()?;

        let mut buckets: HashMap<String, Vec<Marker>> = HashMap::new();
        self.index_tree(&mut buckets, &remote);
        self.index_tree(&mut buckets, &custom);

        let skipped = remote.skipped_entries + custom.skipped_entries;
        if skipped > 0 {
            warn!(skipped, "dropped marker entries with malformed positions");
        }

        let marker_count: usize = buckets.values().map(Vec::len).sum();
        let tile_count = buckets.len();
        let index: MarkerIndex = buckets
            .into_iter()
            .map(|(key, markers)| (key, Arc::from(markers)))
            .collect();
        info!(marker_count, tile_count, "marker index built");

        Ok(Arc::new(index))
    }

    fn index_tree(&self, buckets: &mut HashMap<String, Vec<Marker>>, tree: &MarkerTree) {
        for (category, kinds) in &tree.categories {
            for (kind, entries) in kinds {
                for entry in entries.values() {
                    let position = entry.position();
                    let tile_key = self.grid.key_for_world(position);
                    let display_text = self.display_text(category, kind, entry);

                    buckets.entry(tile_key).or_default().push(Marker {
                        category: category.clone(),
                        kind: kind.clone(),
                        position,
                        display_text,
                    });
                }
            }
        }
    }

    /// Named monsters and points of interest carry their own names; every
    /// other combination is named after its category/kind pair.
    fn display_text(&self, category: &str, kind: &str, entry: &RawMarkerEntry) -> String {
        let named_by_entry = (category == "monsters" && kind == "named") || category == "pois";
        if named_by_entry {
            resolve_name(self.overrides.as_ref(), category, entry.name.as_deref())
        } else {
            resolve_name(self.overrides.as_ref(), category, Some(kind))
        }
    }

    /// Markers in the given tile. `None` while the cache is not ready or
    /// when the tile has no entries; check [`MarkerCache::is_ready`] to tell
    /// the two apart.
    pub fn lookup(&self, tile: TileCoordinate) -> Option<Arc<[Marker]>> {
        match &*self.state.borrow() {
            LoadState::Ready { index, .. } => index.get(&self.grid.key_for_tile(tile)).cloned(),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.borrow(), LoadState::Ready { .. })
    }

    pub fn phase(&self) -> CachePhase {
        match &*self.state.borrow() {
            LoadState::Uninitialized => CachePhase::Uninitialized,
            LoadState::Loading => CachePhase::Loading,
            LoadState::Ready { .. } => CachePhase::Ready,
            LoadState::Failed(_) => CachePhase::Failed,
        }
    }

    /// When the index build completed, if it has.
    pub fn ready_since(&self) -> Option<DateTime<Utc>> {
        match &*self.state.borrow() {
            LoadState::Ready { since, .. } => Some(*since),
            _ => None,
        }
    }

    /// Waits for the build to finish and returns the frozen index. Resolves
    /// immediately once the cache is ready (always with the same index
    /// object); returns the original load error after a failed build. Before
    /// [`MarkerCache::load`] is called this waits indefinitely.
    pub async fn await_ready(&self) -> Result<Arc<MarkerIndex>, LoadError> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|state| {
                matches!(state, LoadState::Ready { .. } | LoadState::Failed(_))
            })
            .await
            .expect("state channel cannot close while the cache is alive");
        match &*state {
            LoadState::Ready { index, .. } => Ok(Arc::clone(index)),
            LoadState::Failed(e) => Err(e.clone()),
            _ => unreachable!("wait_for only yields terminal states"),
        }
    }

    /// Registers a listener fired exactly once, synchronously, when the
    /// index build completes. Listeners fire in registration order; a
    /// registration made after the cache is already ready fires immediately.
    /// Fired listeners stay registered but are never re-fired.
    pub fn on_ready(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerGuard {
        let listener: ReadyListener = Arc::new(listener);
        let (id, fire_now) = {
            let mut set = lock(&self.listeners);
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push((id, Arc::clone(&listener)));
            (id, set.fired)
        };

        if fire_now {
            listener();
        }

        ListenerGuard {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    fn fire_ready_listeners(&self) {
        let snapshot: Vec<(u64, ReadyListener)> = {
            let mut set = lock(&self.listeners);
            set.fired = true;
            set.entries.clone()
        };

        // The lock is not held across callbacks; an entry unsubscribed by an
        // earlier listener in this sweep must not fire.
        for (id, listener) in snapshot {
            let still_registered = lock(&self.listeners)
                .entries
                .iter()
                .any(|(entry_id, _)| *entry_id == id);
            if still_registered {
                listener();
            }
        }
    }
}

impl std::fmt::Debug for MarkerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerCache")
            .field("markers_url", &self.markers_url)
            .finish_non_exhaustive()
    }
}
