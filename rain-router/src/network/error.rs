//! Road network error types.

use std::path::PathBuf;

use super::graph::NodeId;

/// Errors from loading or assembling a [`NetworkGraph`](super::NetworkGraph).
///
/// A load failure is fatal at startup: without a graph there is nothing to
/// route over.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The graph file could not be read
    #[error("failed to read graph file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content does not match the node/edge schema
    #[error("failed to parse graph file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two nodes share an id
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    /// A node has a non-finite or out-of-range coordinate
    #[error("node {id} has an invalid coordinate")]
    InvalidNode { id: NodeId },

    /// An edge references a node that does not exist
    #[error("edge {from} -> {to} references unknown node {missing}")]
    UnknownEndpoint {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },

    /// An edge has a negative or non-finite length or travel time
    #[error("edge {from} -> {to} is invalid: {reason}")]
    InvalidEdge {
        from: NodeId,
        to: NodeId,
        reason: &'static str,
    },
}

/// A spatial index cannot be built over a graph with no nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("graph has no nodes")]
pub struct EmptyGraphError;
