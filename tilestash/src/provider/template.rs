//! URL template expansion and cache key derivation.
//!
//! Both functions are pure: no I/O, no error cases. The subdomain for a
//! tile is picked by hashing its coordinates, so the same tile always
//! resolves to the same host.

use serde::{Deserialize, Serialize};

use crate::coord::TileCoord;

/// A set of subdomains rotated into the `{s}` template token.
///
/// May be built from an explicit list or from one short literal string
/// where each character is a subdomain (`"abc"` means `a`, `b`, `c`),
/// matching the common tile-layer convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subdomains(Vec<String>);

impl Subdomains {
    /// No subdomains; `{s}` expands to the empty string.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Number of configured subdomains.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no subdomains are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pick the subdomain for a tile, or `""` when none are configured.
    ///
    /// Deterministic: `(x + y) mod len`.
    pub fn pick(&self, tile: &TileCoord) -> &str {
        if self.0.is_empty() {
            return "";
        }
        let index = (tile.x as u64 + tile.y as u64) % self.0.len() as u64;
        &self.0[index as usize]
    }
}

impl From<&str> for Subdomains {
    fn from(literal: &str) -> Self {
        Self(literal.chars().map(|c| c.to_string()).collect())
    }
}

impl From<Vec<String>> for Subdomains {
    fn from(list: Vec<String>) -> Self {
        Self(list)
    }
}

impl From<&[&str]> for Subdomains {
    fn from(list: &[&str]) -> Self {
        Self(list.iter().map(|s| s.to_string()).collect())
    }
}

/// Builds the cache key for a tile.
///
/// Deterministic and collision-free for distinct `(provider, z, x, y)`
/// tuples; this string is the only persisted tile identity.
pub fn tile_key(provider_id: &str, tile: &TileCoord) -> String {
    format!("{}/{}/{}/{}", provider_id, tile.zoom, tile.x, tile.y)
}

/// Expands a URL template's `{z}`, `{x}`, `{y}` and `{s}` tokens.
pub fn resolve_url(template: &str, tile: &TileCoord, subdomains: &Subdomains) -> String {
    template
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{s}", subdomains.pick(tile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_key_format() {
        let key = tile_key("osm", &TileCoord::new(3, 7, 5));
        assert_eq!(key, "osm/5/3/7");
    }

    #[test]
    fn test_tile_key_distinct_tuples() {
        let a = tile_key("osm", &TileCoord::new(3, 7, 5));
        let b = tile_key("osm", &TileCoord::new(7, 3, 5));
        let c = tile_key("osm", &TileCoord::new(3, 7, 6));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_resolve_url_is_deterministic() {
        let tile = TileCoord::new(3, 7, 5);
        let subdomains = Subdomains::from("abc");
        let url = resolve_url("https://{s}.host/{z}/{x}/{y}.png", &tile, &subdomains);

        // (3 + 7) % 3 == 1 -> "b", same on every call.
        assert_eq!(url, "https://b.host/5/3/7.png");
        assert_eq!(
            url,
            resolve_url("https://{s}.host/{z}/{x}/{y}.png", &tile, &subdomains)
        );
    }

    #[test]
    fn test_resolve_url_without_subdomains() {
        let tile = TileCoord::new(1, 2, 3);
        let url = resolve_url(
            "https://{s}tiles.example.com/{z}/{x}/{y}.png",
            &tile,
            &Subdomains::none(),
        );
        assert_eq!(url, "https://tiles.example.com/3/1/2.png");
    }

    #[test]
    fn test_subdomains_from_literal() {
        let subdomains = Subdomains::from("abc");
        assert_eq!(subdomains.len(), 3);
        assert_eq!(subdomains.pick(&TileCoord::new(0, 0, 1)), "a");
        assert_eq!(subdomains.pick(&TileCoord::new(1, 0, 1)), "b");
        assert_eq!(subdomains.pick(&TileCoord::new(1, 1, 1)), "c");
        assert_eq!(subdomains.pick(&TileCoord::new(2, 1, 1)), "a");
    }

    #[test]
    fn test_subdomains_from_list() {
        let subdomains = Subdomains::from(vec!["mt0".to_string(), "mt1".to_string()]);
        assert_eq!(subdomains.len(), 2);
        assert_eq!(subdomains.pick(&TileCoord::new(0, 1, 4)), "mt1");
    }

    #[test]
    fn test_subdomains_empty_pick() {
        assert_eq!(Subdomains::none().pick(&TileCoord::new(9, 9, 9)), "");
    }
}
