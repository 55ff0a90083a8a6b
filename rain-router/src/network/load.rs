//! Persisted graph file format.
//!
//! The graph is stored as a single JSON document:
//!
//! ```json
//! {
//!   "nodes": [{"id": 1, "lat": -23.55, "lon": -46.63}],
//!   "edges": [{"from": 1, "to": 2, "length": 120.5, "travel_time": 14.2,
//!              "geometry": [[-46.63, -23.55], [-46.631, -23.551]]}]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::error::LoadError;
use super::graph::{Edge, NetworkGraph, Node};

/// On-disk representation of a [`NetworkGraph`].
#[derive(Debug, Deserialize)]
struct GraphFile {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl NetworkGraph {
    /// Load a graph from a JSON file.
    ///
    /// Fails if the file is missing, is not valid JSON for the schema, or
    /// violates a graph invariant (see [`NetworkGraph::from_parts`]).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file: GraphFile =
            serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let graph = Self::from_parts(file.nodes, file.edges)?;
        info!(
            path = %path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded road network"
        );
        Ok(graph)
    }
}
