//! Road network: graph representation, loading, cropping and snapping.
//!
//! The base graph is loaded once at startup and shared read-only for the
//! lifetime of the service. Everything derived from it per request (crops,
//! searches) produces new values instead of mutating it.

mod crop;
mod error;
mod graph;
mod load;
mod nearest;

pub use crop::{crop, crop_box};
pub use error::{EmptyGraphError, LoadError};
pub use graph::{Edge, NetworkGraph, Node, NodeId};
pub use nearest::NearestNodeIndex;
