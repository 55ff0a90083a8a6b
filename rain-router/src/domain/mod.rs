//! Domain types for the rain-aware route planner.
//!
//! Small value types shared by the network, rainfall and planner layers.
//! All types enforce their invariants at construction time, so code that
//! receives these types can trust their validity.

mod geo;
mod time;

pub use geo::{
    BoundingBox, Coord, EARTH_RADIUS_M, Equirectangular, InvalidBoundingBox, haversine_m,
};
pub use time::{TimeError, TimePoint};
