//! Web layer for the rain-aware route planner.
//!
//! Provides HTTP endpoints for route planning, GeoJSON route requests and
//! daily occurrence reports.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
