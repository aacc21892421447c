use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Ground elevation
// ---------------------------------------------------------------------------

/// Sparse half-degree elevation raster keyed by `(round(lon·2), round(lat·2))`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElevationMap {
    cells: HashMap<(i32, i32), f64>,
}

impl ElevationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raster key for a position in degrees, longitude wrapped to [-180, 180).
    pub fn key(lat: f64, lon: f64) -> (i32, i32) {
        let mut mlon = ((lon * 2.0).round() as i64).rem_euclid(720);
        if mlon >= 360 {
            mlon -= 720;
        }
        (mlon as i32, (lat * 2.0).round() as i32)
    }

    pub fn insert(&mut self, lat: f64, lon: f64, height: f64) {
        self.cells.insert(Self::key(lat, lon), height);
    }

    /// Terrain height (m) at a position in degrees, if mapped.
    pub fn height(&self, lat: f64, lon: f64) -> Option<f64> {
        self.cells.get(&Self::key(lat, lon)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Ground model used for height-above-ground and touchdown detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Ground {
    /// No terrain information; contact is judged against altitude.
    #[default]
    Unknown,
    /// Flat terrain at this altitude.
    Constant(f64),
    Map(ElevationMap),
}

impl Ground {
    /// Local terrain altitude at a position in degrees.
    pub fn altitude_at(&self, lat: f64, lon: f64) -> Option<f64> {
        match self {
            Ground::Unknown => None,
            Ground::Constant(alt) => Some(*alt),
            Ground::Map(map) => map.height(lat, lon),
        }
    }
}
