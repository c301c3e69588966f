//! Core types for coordinate conversion.

use std::fmt;

use thiserror::Error;

/// Minimum latitude representable in Web Mercator, in degrees.
pub const MIN_LAT: f64 = -85.05112878;

/// Maximum latitude representable in Web Mercator, in degrees.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum supported zoom level.
pub const MAX_ZOOM: u8 = 22;

/// A tile in the slippy-map (XYZ) addressing scheme.
///
/// `x` counts columns west to east, `y` counts rows north to south,
/// both in `0..2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Column index (west to east).
    pub x: u32,
    /// Row index (north to south).
    pub y: u32,
    /// Zoom level.
    pub zoom: u8,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A geographic rectangle in degrees.
///
/// `north` must not be south of `south`, and `east` must not be west of
/// `west`; regions crossing the antimeridian are not supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Northern edge latitude in degrees.
    pub north: f64,
    /// Southern edge latitude in degrees.
    pub south: f64,
    /// Eastern edge longitude in degrees.
    pub east: f64,
    /// Western edge longitude in degrees.
    pub west: f64,
}

impl BoundingBox {
    /// Create a bounding box, validating edge ordering.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, CoordError> {
        if !north.is_finite() || !south.is_finite() || !east.is_finite() || !west.is_finite() {
            return Err(CoordError::InvalidBounds {
                north,
                south,
                east,
                west,
            });
        }
        if north < south || east < west {
            return Err(CoordError::InvalidBounds {
                north,
                south,
                east,
                west,
            });
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// Return a copy with latitudes clamped to the Web Mercator range and
    /// longitudes clamped to [-180, 180].
    pub fn clamped(&self) -> Self {
        Self {
            north: self.north.clamp(MIN_LAT, MAX_LAT),
            south: self.south.clamp(MIN_LAT, MAX_LAT),
            east: self.east.clamp(MIN_LON, MAX_LON),
            west: self.west.clamp(MIN_LON, MAX_LON),
        }
    }
}

/// An inclusive rectangle of tile indices at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    /// Westernmost column.
    pub min_x: u32,
    /// Easternmost column.
    pub max_x: u32,
    /// Northernmost row.
    pub min_y: u32,
    /// Southernmost row.
    pub max_y: u32,
    /// Zoom level of every tile in the range.
    pub zoom: u8,
}

impl TileRange {
    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        let width = (self.max_x - self.min_x) as u64 + 1;
        let height = (self.max_y - self.min_y) as u64 + 1;
        width * height
    }

    /// Iterate the range in row-major order (ascending y, then x).
    pub fn iter(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            next_x: self.min_x,
            next_y: self.min_y,
            done: false,
        }
    }
}

impl IntoIterator for TileRange {
    type Item = TileCoord;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major iterator over a [`TileRange`].
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    next_x: u32,
    next_y: u32,
    done: bool,
}

impl Iterator for TileRangeIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        if self.done {
            return None;
        }

        let tile = TileCoord::new(self.next_x, self.next_y, self.range.zoom);

        if self.next_x < self.range.max_x {
            self.next_x += 1;
        } else if self.next_y < self.range.max_y {
            self.next_x = self.range.min_x;
            self.next_y += 1;
        } else {
            self.done = true;
        }

        Some(tile)
    }
}

/// Errors produced by coordinate conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range.
    #[error("invalid latitude: {0} (must be within [{MIN_LAT}, {MAX_LAT}])")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("invalid longitude: {0} (must be within [{MIN_LON}, {MAX_LON}])")]
    InvalidLongitude(f64),

    /// Zoom level above the supported maximum.
    #[error("invalid zoom level: {0} (must be at most {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// Bounding box edges in the wrong order or not finite.
    #[error("invalid bounding box: north={north} south={south} east={east} west={west}")]
    InvalidBounds {
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coord_display() {
        let tile = TileCoord::new(3, 7, 5);
        assert_eq!(tile.to_string(), "5/3/7");
    }

    #[test]
    fn test_bounding_box_rejects_inverted_edges() {
        assert!(BoundingBox::new(-10.0, 10.0, 10.0, -10.0).is_err());
        assert!(BoundingBox::new(10.0, -10.0, -10.0, 10.0).is_err());
        assert!(BoundingBox::new(10.0, -10.0, f64::NAN, -10.0).is_err());
    }

    #[test]
    fn test_bounding_box_clamps_to_mercator() {
        let bbox = BoundingBox::new(90.0, -90.0, 180.0, -180.0)
            .unwrap()
            .clamped();
        assert_eq!(bbox.north, MAX_LAT);
        assert_eq!(bbox.south, MIN_LAT);
        assert_eq!(bbox.east, MAX_LON);
        assert_eq!(bbox.west, MIN_LON);
    }

    #[test]
    fn test_tile_range_count() {
        let range = TileRange {
            min_x: 2,
            max_x: 4,
            min_y: 10,
            max_y: 11,
            zoom: 6,
        };
        assert_eq!(range.count(), 6);
    }

    #[test]
    fn test_tile_range_iter_row_major() {
        let range = TileRange {
            min_x: 1,
            max_x: 2,
            min_y: 5,
            max_y: 6,
            zoom: 4,
        };

        let tiles: Vec<_> = range.iter().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(1, 5, 4),
                TileCoord::new(2, 5, 4),
                TileCoord::new(1, 6, 4),
                TileCoord::new(2, 6, 4),
            ]
        );
    }

    #[test]
    fn test_tile_range_iter_single_tile() {
        let range = TileRange {
            min_x: 0,
            max_x: 0,
            min_y: 0,
            max_y: 0,
            zoom: 0,
        };
        let tiles: Vec<_> = range.iter().collect();
        assert_eq!(tiles, vec![TileCoord::new(0, 0, 0)]);
    }
}
