//! Rainfall raster snapshots: fetching, caching, and sampling.
//!
//! A snapshot is a whitespace-separated integer grid in millimetres, keyed by
//! a `YYYYMMDDHHMM` time key. [`RainfallGridProvider`] resolves keys through
//! an in-memory cache, an optional cache directory, and a [`RainfallSource`].

mod config;
mod error;
mod grid;
mod matrix;
mod mock;
mod provider;
mod source;

pub use config::RainfallConfig;
pub use error::{NotAvailable, OutOfBoundsError, RainfallError};
pub use grid::{GridSpec, edge_hazard};
pub use matrix::{NO_DATA, RainfallMatrix};
pub use mock::MockRainfallSource;
pub use provider::RainfallGridProvider;
pub use source::{HttpRainfallSource, RainfallSource};
