//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{Coord, TimeError, TimePoint};
use crate::planner::{Mode, Route, RouteRequest};

/// Route weighting as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    #[default]
    Shortest,
    Fastest,
    Rain,
}

/// Request to compute a route.
#[derive(Debug, Deserialize)]
pub struct RouteRequestDto {
    /// Origin as `[lon, lat]`
    pub start: Coord,

    /// Destination as `[lon, lat]`
    pub end: Coord,

    /// Weighting (defaults to shortest)
    #[serde(default)]
    pub mode: ModeName,

    /// Departure time for rain-aware routing, as `YYYYMMDDHHMM` or ISO-8601.
    /// Defaults to now.
    pub time: Option<String>,
}

impl RouteRequestDto {
    /// Convert to an engine request, reading the clock through `now` only
    /// when a rain-aware request carries no time.
    pub fn into_request(
        self,
        now: impl FnOnce() -> Result<TimePoint, TimeError>,
    ) -> Result<RouteRequest, TimeError> {
        let mode = match self.mode {
            ModeName::Shortest => Mode::ShortestDistance,
            ModeName::Fastest => Mode::FastestTime,
            ModeName::Rain => {
                let time = match self.time.as_deref() {
                    Some(t) => t.parse()?,
                    None => now()?,
                };
                Mode::RainAware(time)
            }
        };
        Ok(RouteRequest::new(self.start, self.end, mode))
    }
}

/// A computed route.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    /// `[lon, lat]` pairs in traversal order
    pub coordinates: Vec<Coord>,

    /// Node ids in traversal order
    pub nodes: Vec<i64>,

    pub total_cost: f64,

    /// Metres
    pub total_distance: f64,

    /// Seconds
    pub total_time: f64,

    /// Worst rainfall on the route in mm, when a raster was used
    pub max_hazard: Option<u32>,

    /// Rain-aware routing fell back to shortest distance
    pub degraded: bool,

    /// The search ran on a crop of the network
    pub cropped: bool,
}

impl From<Route> for RouteResponse {
    fn from(route: Route) -> Self {
        Self {
            coordinates: route.coordinates,
            nodes: route.nodes.into_iter().map(|n| n.0).collect(),
            total_cost: route.total_cost,
            total_distance: route.total_distance,
            total_time: route.total_time,
            max_hazard: route.max_hazard,
            degraded: route.degraded,
            cropped: route.cropped,
        }
    }
}

impl RouteResponse {
    /// The route as a GeoJSON `FeatureCollection` holding one `LineString`
    /// whose properties carry the route summary.
    pub fn to_feature_collection(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": self.coordinates,
                },
                "properties": {
                    "nodes": self.nodes,
                    "total_cost": self.total_cost,
                    "total_distance": self.total_distance,
                    "total_time": self.total_time,
                    "max_hazard": self.max_hazard,
                    "degraded": self.degraded,
                    "cropped": self.cropped,
                },
            }],
        })
    }
}

/// Query for the daily occurrence report.
#[derive(Debug, Deserialize)]
pub struct OccurrenceQuery {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Reasons a GeoJSON route request is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoJsonError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid GeoJSON")]
    InvalidGeoJson,

    #[error("Missing horario_saida in properties")]
    MissingDeparture,

    #[error("GeoJSON needs origin and destination Point features")]
    MissingPoints,

    #[error("Invalid horario_saida: {0}")]
    InvalidDeparture(#[from] TimeError),
}

/// A route request read from a GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoJsonRoute {
    pub origin: Coord,
    pub destination: Coord,
    pub departure: TimePoint,
}

impl GeoJsonRoute {
    /// Parse a `FeatureCollection` whose `properties.horario_saida` is the
    /// departure time and whose first and last `Point` features are the
    /// origin and destination.
    pub fn parse(body: &[u8]) -> Result<Self, GeoJsonError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(GeoJsonError::InvalidJson);
        }
        let doc: Value = serde_json::from_slice(body).map_err(|_| GeoJsonError::InvalidJson)?;

        if doc.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(GeoJsonError::InvalidGeoJson);
        }

        let departure = doc
            .get("properties")
            .and_then(|p| p.get("horario_saida"))
            .ok_or(GeoJsonError::MissingDeparture)?;
        let departure: TimePoint = match departure {
            Value::String(s) => s.parse()?,
            Value::Number(n) => n.to_string().parse()?,
            _ => return Err(GeoJsonError::MissingDeparture),
        };

        let points: Vec<Coord> = doc
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::InvalidGeoJson)?
            .iter()
            .filter_map(point_of)
            .collect();

        match points[..] {
            [origin, .., destination] => Ok(Self {
                origin,
                destination,
                departure,
            }),
            _ => Err(GeoJsonError::MissingPoints),
        }
    }

    pub fn into_request(self) -> RouteRequest {
        RouteRequest::new(self.origin, self.destination, Mode::RainAware(self.departure))
    }
}

/// Coordinates of a `Point` feature.
fn point_of(feature: &Value) -> Option<Coord> {
    let geometry = feature.get("geometry")?;
    if geometry.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coords = geometry.get("coordinates")?.as_array()?;
    match coords[..] {
        [ref lon, ref lat, ..] => Some(Coord::new(lon.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}
