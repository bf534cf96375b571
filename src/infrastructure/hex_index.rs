//! Hex Spatial Index
//!
//! Assigns hex cell ids to coordinates. The pipeline only depends on the
//! `HexIndex` trait; the GeoJSON implementation here does a plain even-odd
//! point-in-polygon test over the configured hex features, which is all the
//! geodesy the aggregation needs.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Spatial lookup from a coordinate to the hex cell containing it.
pub trait HexIndex: Send + Sync {
    fn locate(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Index used when hex geodata is unavailable; nothing gets a hex id and
/// hex-level aggregation produces no rows.
pub struct NullHexIndex;

impl HexIndex for NullHexIndex {
    fn locate(&self, _latitude: f64, _longitude: f64) -> Option<String> {
        None
    }
}

#[derive(Debug, Error)]
pub enum HexIndexError {
    #[error("Failed to read hex file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse hex file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: HexProperties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct HexProperties {
    h3_id: String,
}

/// GeoJSON geometry; coordinates are [longitude, latitude] pairs.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Geometry::Polygon { coordinates } => polygon_contains(coordinates, x, y),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .any(|polygon| polygon_contains(polygon, x, y)),
        }
    }
}

/// First ring is the outer boundary; any further rings are holes.
fn polygon_contains(rings: &[Vec<[f64; 2]>], x: f64, y: f64) -> bool {
    let outer = match rings.first() {
        Some(ring) => ring,
        None => return false,
    };
    if !ring_contains(outer, x, y) {
        return false;
    }
    !rings[1..].iter().any(|hole| ring_contains(hole, x, y))
}

/// Even-odd ray casting.
fn ring_contains(ring: &[[f64; 2]], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Hex index backed by a GeoJSON feature collection of hex polygons.
pub struct GeoJsonHexIndex {
    features: Vec<(String, Geometry)>,
}

impl GeoJsonHexIndex {
    pub fn from_file(path: &str) -> Result<GeoJsonHexIndex, HexIndexError> {
        let text = std::fs::read_to_string(path).map_err(|source| HexIndexError::Io {
            path: path.to_string(),
            source,
        })?;
        let index = Self::parse(&text).map_err(|source| HexIndexError::Parse {
            path: path.to_string(),
            source,
        })?;
        debug!("Loaded {} hex polygons from {}", index.len(), path);
        Ok(index)
    }

    fn parse(text: &str) -> Result<GeoJsonHexIndex, serde_json::Error> {
        let collection: FeatureCollection = serde_json::from_str(text)?;
        Ok(GeoJsonHexIndex {
            features: collection
                .features
                .into_iter()
                .map(|f| (f.properties.h3_id, f.geometry))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl HexIndex for GeoJsonHexIndex {
    fn locate(&self, latitude: f64, longitude: f64) -> Option<String> {
        self.features
            .iter()
            .find(|(_, geometry)| geometry.contains(longitude, latitude))
            .map(|(hex_id, _)| hex_id.clone())
    }
}
