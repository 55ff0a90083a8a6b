//! Geographic primitives: coordinates, bounding boxes and distances.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 position.
///
/// Serialized as a `[lon, lat]` pair, the order GeoJSON and the persisted
/// graph geometry use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both components are finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<(f64, f64)> for Coord {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

impl From<Coord> for (f64, f64) {
    fn from(c: Coord) -> Self {
        (c.lon, c.lat)
    }
}

/// Error returned when a bounding box would have inverted bounds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid bounding box: {reason}")]
pub struct InvalidBoundingBox {
    reason: &'static str,
}

/// An axis-aligned latitude/longitude rectangle.
///
/// `lat_min <= lat_max` and `lon_min <= lon_max` hold for every value of
/// this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
}

impl BoundingBox {
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    ) -> Result<Self, InvalidBoundingBox> {
        if [lat_min, lat_max, lon_min, lon_max]
            .iter()
            .any(|v| v.is_nan())
        {
            return Err(InvalidBoundingBox {
                reason: "bounds must not be NaN",
            });
        }
        if lat_min > lat_max {
            return Err(InvalidBoundingBox {
                reason: "lat_min must not exceed lat_max",
            });
        }
        if lon_min > lon_max {
            return Err(InvalidBoundingBox {
                reason: "lon_min must not exceed lon_max",
            });
        }

        Ok(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        })
    }

    /// The smallest box containing every coordinate, or `None` if empty.
    pub fn enclosing(coords: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let init = Self {
            lat_min: first.lat,
            lat_max: first.lat,
            lon_min: first.lon,
            lon_max: first.lon,
        };
        Some(iter.fold(init, |b, c| Self {
            lat_min: b.lat_min.min(c.lat),
            lat_max: b.lat_max.max(c.lat),
            lon_min: b.lon_min.min(c.lon),
            lon_max: b.lon_max.max(c.lon),
        }))
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    /// Grow each bound outward by the given latitude/longitude margins.
    pub fn expand(&self, lat_margin: f64, lon_margin: f64) -> Self {
        Self {
            lat_min: self.lat_min - lat_margin,
            lat_max: self.lat_max + lat_margin,
            lon_min: self.lon_min - lon_margin,
            lon_max: self.lon_max + lon_margin,
        }
    }

    /// Clamp this box so it never extends beyond `outer`.
    ///
    /// If the two boxes do not overlap the result collapses onto the nearest
    /// edge of `outer`, so the ordering invariant still holds.
    pub fn clamp_to(&self, outer: &BoundingBox) -> Self {
        let lat_min = self.lat_min.clamp(outer.lat_min, outer.lat_max);
        let lat_max = self.lat_max.clamp(outer.lat_min, outer.lat_max);
        let lon_min = self.lon_min.clamp(outer.lon_min, outer.lon_max);
        let lon_max = self.lon_max.clamp(outer.lon_min, outer.lon_max);
        Self {
            lat_min,
            lat_max: lat_max.max(lat_min),
            lon_min,
            lon_max: lon_max.max(lon_min),
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat)
            && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

/// Great-circle distance in metres between two coordinates.
pub fn haversine_m(a: Coord, b: Coord) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Equirectangular projection about a reference latitude.
///
/// Locally flat: Euclidean distance between projected points approximates
/// ground distance in metres near `ref_lat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    cos_ref: f64,
}

impl Equirectangular {
    pub fn new(ref_lat: f64) -> Self {
        Self {
            cos_ref: ref_lat.to_radians().cos(),
        }
    }

    /// Project to `[x, y]` metres.
    pub fn project(&self, lat: f64, lon: f64) -> [f64; 2] {
        [
            EARTH_RADIUS_M * lon.to_radians() * self.cos_ref,
            EARTH_RADIUS_M * lat.to_radians(),
        ]
    }
}
