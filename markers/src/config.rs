use std::time::Duration;

pub const DEFAULT_MARKERS_URL: &str = "https://data.waymarkmap.com/markers.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;

pub fn markers_url() -> String {
    std::env::var("WAYMARK_MARKERS_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_MARKERS_URL.to_string())
}

pub fn http_timeout() -> Duration {
    std::env::var("WAYMARK_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn connect_timeout() -> Duration {
    std::env::var("WAYMARK_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
}

pub fn tile_edge() -> f64 {
    std::env::var("WAYMARK_TILE_EDGE")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(waymark_shared::DEFAULT_TILE_EDGE)
}

/// Settings the marker cache is constructed from.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub markers_url: String,
    pub tile_edge: f64,
    pub http_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            markers_url: DEFAULT_MARKERS_URL.to_string(),
            tile_edge: waymark_shared::DEFAULT_TILE_EDGE,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl CacheConfig {
    /// Configuration from the environment, falling back to the defaults.
    pub fn from_env() -> Self {
        Self {
            markers_url: markers_url(),
            tile_edge: tile_edge(),
            http_timeout: http_timeout(),
            connect_timeout: connect_timeout(),
        }
    }
}
