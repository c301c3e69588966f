//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and slippy-map tile coordinates, plus enumeration of the tile rectangle
//! covering a bounding box at a given zoom level.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoord, TileRange, TileRangeIter, MAX_LAT, MAX_LON, MAX_ZOOM,
    MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u32 << zoom) - 1;

    // Convert longitude to tile X coordinate
    let x = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);

    // Convert latitude to tile Y coordinate using Web Mercator projection
    let lat_rad = lat * PI / 180.0;
    let y = ((((1.0 - lat_rad.tan().asinh() / PI) / 2.0) * n) as u32).min(max_index);

    Ok(TileCoord { x, y, zoom })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Computes the inclusive tile-index rectangle covering a bounding box at
/// one zoom level.
///
/// The box is clamped to the Web Mercator latitude range before projection,
/// so poles-spanning boxes are accepted. The returned range always contains
/// at least one tile.
pub fn tile_range(bbox: &BoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if bbox.north < bbox.south || bbox.east < bbox.west {
        return Err(CoordError::InvalidBounds {
            north: bbox.north,
            south: bbox.south,
            east: bbox.east,
            west: bbox.west,
        });
    }

    let clamped = bbox.clamped();

    // Northwest corner gives the minimum indices, southeast the maximum.
    let nw = to_tile_coords(clamped.north, clamped.west, zoom)?;
    let se = to_tile_coords(clamped.south, clamped.east, zoom)?;

    Ok(TileRange {
        min_x: nw.x,
        max_x: se.x,
        min_y: nw.y,
        max_y: se.y,
        zoom,
    })
}
