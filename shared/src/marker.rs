use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tiles::WorldPosition;

/// Tile key to the markers inside that tile, frozen after the index build.
pub type MarkerIndex = HashMap<String, Arc<[Marker]>>;

/// A point of interest with its resolved display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: WorldPosition,
    pub display_text: String,
}
