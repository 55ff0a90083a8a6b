//! Rain-aware route planner server.
//!
//! A web service that answers: "what is the best way from here to there,
//! given where it is raining right now?"

pub mod config;
pub mod domain;
pub mod network;
pub mod occurrences;
pub mod planner;
pub mod rainfall;
pub mod web;
