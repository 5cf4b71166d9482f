use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use waymark_shared::WorldPosition;

/// Top-level branch of the dataset that holds area polygons, not markers.
pub const RESERVED_AREAS_KEY: &str = "areas";

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Hand-maintained markers bundled with the app, merged after the remote set.
pub const CUSTOM_MARKERS_JSON: &str = include_str!("../data/custom_markers.json");

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("marker dataset request failed: {0}")]
    Fetch(Arc<reqwest::Error>),
    #[error("marker endpoint returned {status}; body preview: {preview}")]
    Status {
        status: reqwest::StatusCode,
        preview: String,
    },
    #[error("marker dataset did not match the expected shape: {0}")]
    Decode(Arc<serde_json::Error>),
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Fetch(Arc::new(e))
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Decode(Arc::new(e))
    }
}

/// One leaf of the marker dataset tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMarkerEntry {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawMarkerEntry {
    pub fn position(&self) -> WorldPosition {
        WorldPosition {
            x: self.x,
            y: self.y,
        }
    }
}

pub type KindEntries = BTreeMap<String, RawMarkerEntry>;
pub type CategoryKinds = BTreeMap<String, KindEntries>;

/// Typed marker dataset: category -> kind -> entry id -> entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerTree {
    pub categories: BTreeMap<String, CategoryKinds>,
    /// Entries dropped during decode because their position was malformed.
    pub skipped_entries: usize,
}

/// Decodes the raw dataset into a typed tree at the fetch boundary.
///
/// The reserved `areas` branch is dropped. Category and kind levels must be
/// objects; a single entry with a malformed position is skipped and counted
/// rather than failing the whole dataset.
pub fn parse_marker_tree(bytes: &[u8]) -> Result<MarkerTree, serde_json::Error> {
    let top: BTreeMap<String, serde_json::Value> = serde_json::from_slice(bytes)?;

    let mut categories = BTreeMap::new();
    let mut skipped_entries = 0usize;
    for (category, node) in top {
        if category == RESERVED_AREAS_KEY {
            continue;
        }

        let kinds: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
            serde_json::from_value(node)?;
        let mut typed_kinds: CategoryKinds = BTreeMap::new();
        for (kind, entries) in kinds {
            let mut typed: KindEntries = BTreeMap::new();
            for (id, raw) in entries {
                match serde_json::from_value::<RawMarkerEntry>(raw) {
                    Ok(entry) => {
                        typed.insert(id, entry);
                    }
                    Err(e) => {
                        skipped_entries += 1;
                        warn!("skipping malformed marker entry {category}/{kind}/{id}: {e}");
                    }
                }
            }
            typed_kinds.insert(kind, typed);
        }
        categories.insert(category, typed_kinds);
    }

    Ok(MarkerTree {
        categories,
        skipped_entries,
    })
}

pub fn custom_marker_tree() -> Result<MarkerTree, serde_json::Error> {
    parse_marker_tree(CUSTOM_MARKERS_JSON.as_bytes())
}

/// Single GET of the remote dataset. No retry; a failed fetch fails the load.
pub async fn fetch_marker_tree(
    client: &reqwest::Client,
    url: &str,
) -> Result<MarkerTree, LoadError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let preview = String::from_utf8_lossy(&bytes)
            .chars()
            .take(ERROR_BODY_PREVIEW_CHARS)
            .collect::<String>();
        return Err(LoadError::Status { status, preview });
    }

    Ok(parse_marker_tree(bytes.as_ref())?)
}
