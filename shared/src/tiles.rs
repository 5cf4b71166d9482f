use serde::{Deserialize, Serialize};

/// Default tile edge length in world units.
pub const DEFAULT_TILE_EDGE: f64 = 256.0;

/// A position in 2D world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f64,
    pub y: f64,
}

/// Integer coordinate of a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: i32,
    pub y: i32,
}

/// Fixed-size grid partitioning world space into tiles.
///
/// Key derivation is pure: positions inside one tile always produce the
/// identical key, and distinct tiles always produce distinct keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    tile_edge: f64,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_EDGE)
    }
}

impl TileGrid {
    pub fn new(tile_edge: f64) -> Self {
        debug_assert!(tile_edge > 0.0, "tile edge must be positive: {tile_edge}");
        Self { tile_edge }
    }

    pub fn tile_edge(&self) -> f64 {
        self.tile_edge
    }

    /// Tile containing a world position.
    pub fn tile_for_world(&self, pos: WorldPosition) -> TileCoordinate {
        TileCoordinate {
            x: (pos.x / self.tile_edge).floor() as i32,
            y: (pos.y / self.tile_edge).floor() as i32,
        }
    }

    /// Canonical cache key of a tile.
    pub fn key_for_tile(&self, tile: TileCoordinate) -> String {
        format!("{},{}", tile.x, tile.y)
    }

    /// Canonical cache key of the tile containing a world position.
    pub fn key_for_world(&self, pos: WorldPosition) -> String {
        self.key_for_tile(self.tile_for_world(pos))
    }
}
