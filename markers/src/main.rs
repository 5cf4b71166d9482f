use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use waymark_markers::{
    CacheConfig, MarkerCache, MemoryOverrideStore, WindowContext, initialize_marker_cache,
};
use waymark_shared::MarkerIndex;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = CacheConfig::from_env();
    tracing::info!(url = %config.markers_url, tile_edge = config.tile_edge, "warming marker cache");

    let overrides = Arc::new(MemoryOverrideStore::new());
    let cache = match initialize_marker_cache(WindowContext::Background, || {
        MarkerCache::new(config, overrides)
    }) {
        Some(cache) => cache,
        None => {
            tracing::error!("marker cache initialization was rejected");
            return;
        }
    };

    match cache.load().await {
        Ok(index) => {
            if let Some(since) = cache.ready_since() {
                tracing::info!(since = %since.to_rfc3339(), "marker cache ready");
            }
            log_report(&index);
        }
        Err(e) => {
            tracing::error!(error = %e, "marker dataset load failed");
        }
    }
}

fn log_report(index: &MarkerIndex) {
    let marker_total: usize = index.values().map(|markers| markers.len()).sum();

    let mut busiest: Vec<(&String, usize)> = index
        .iter()
        .map(|(tile, markers)| (tile, markers.len()))
        .collect();
    busiest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (tile, count) in busiest.into_iter().take(5) {
        tracing::info!(%tile, count, "busiest tile");
    }

    tracing::info!(marker_total, tile_total = index.len(), "marker index report");
}
