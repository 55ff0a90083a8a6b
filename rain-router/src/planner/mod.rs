//! Route planner.
//!
//! This module answers: "how do I get from here to there, given the rain?"
//!
//! [`RouteEngine`] snaps both endpoints to the road network, optionally crops
//! the network around a distance-only reference path, prices edges for the
//! requested [`Mode`] and runs A* over the result. Rain-aware requests whose
//! rainfall snapshot cannot be obtained fall back to shortest distance and
//! are flagged as degraded.

mod config;
mod engine;
mod search;

pub use config::{HazardPenalty, RouteConfig};
pub use engine::{Mode, Route, RouteEngine, RouteError, RouteRequest, Stage};
pub use search::{
    EdgeHazards, SearchResult, Weighting, find_path, find_path_with_rate, path_edges,
};
