//! Immutable road network graph.
//!
//! Nodes and directed edges are stored in a `petgraph` [`DiGraph`] with a
//! side table from external [`NodeId`]s to internal indices. A value of
//! [`NetworkGraph`] never changes after construction; derived graphs (crops)
//! are built with [`NetworkGraph::subgraph`] and share nothing with their
//! source.

use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::domain::{BoundingBox, Coord};

use super::error::LoadError;

/// External node identifier, unique within a graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A road network node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            id: NodeId(id),
            lat,
            lon,
        }
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.lon, self.lat)
    }
}

/// A directed road segment.
///
/// A two-way road is represented as two edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,

    /// Length in metres.
    pub length: f64,

    /// Traversal time in seconds.
    #[serde(alias = "travelTime")]
    pub travel_time: f64,

    /// Optional polyline, `(lon, lat)` vertices from `from` to `to`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Coord>>,
}

impl Edge {
    pub fn new(from: i64, to: i64, length: f64, travel_time: f64) -> Self {
        Self {
            from: NodeId(from),
            to: NodeId(to),
            length,
            travel_time,
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: Vec<Coord>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason| LoadError::InvalidEdge {
            from: self.from,
            to: self.to,
            reason,
        };
        if !self.length.is_finite() || self.length < 0.0 {
            return Err(invalid("length must be finite and non-negative"));
        }
        if !self.travel_time.is_finite() || self.travel_time < 0.0 {
            return Err(invalid("travel time must be finite and non-negative"));
        }
        if let Some(geometry) = &self.geometry
            && geometry.iter().any(|c| !c.is_valid())
        {
            return Err(invalid("geometry has an invalid coordinate"));
        }
        Ok(())
    }
}

/// Immutable road network: nodes keyed by id, at most one edge per
/// `(from, to)` pair, every edge endpoint present.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    graph: DiGraph<Node, Edge>,
    indices: HashMap<NodeId, NodeIndex>,
}

impl NetworkGraph {
    /// Assemble a graph from nodes and edges, validating the schema.
    ///
    /// Parallel edges between the same ordered pair of nodes are merged into
    /// one edge carrying the smallest length and the smallest travel time
    /// among them, so every weighting sees its cheapest option. The merged
    /// edge keeps the geometry of the shortest.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, LoadError> {
        let mut graph: DiGraph<Node, Edge> = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut indices = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if !node.coord().is_valid() {
                return Err(LoadError::InvalidNode { id: node.id });
            }
            if indices.contains_key(&node.id) {
                return Err(LoadError::DuplicateNode(node.id));
            }
            let idx = graph.add_node(node);
            indices.insert(node.id, idx);
        }

        let mut by_pair: HashMap<(NodeId, NodeId), EdgeIndex> = HashMap::new();
        for edge in edges {
            edge.validate()?;

            let lookup = |id: NodeId| {
                indices.get(&id).copied().ok_or(LoadError::UnknownEndpoint {
                    from: edge.from,
                    to: edge.to,
                    missing: id,
                })
            };
            let a = lookup(edge.from)?;
            let b = lookup(edge.to)?;

            match by_pair.get(&(edge.from, edge.to)) {
                Some(&existing) => {
                    let kept = &mut graph[existing];
                    kept.travel_time = kept.travel_time.min(edge.travel_time);
                    if edge.length < kept.length {
                        kept.length = edge.length;
                        kept.geometry = edge.geometry;
                    }
                }
                None => {
                    let key = (edge.from, edge.to);
                    let idx = graph.add_edge(a, b, edge);
                    by_pair.insert(key, idx);
                }
            }
        }

        Ok(Self { graph, indices })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.indices.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.indices.get(&id).map(|&idx| &self.graph[idx])
    }

    /// The edge from `from` to `to`, if present.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
        let a = *self.indices.get(&from)?;
        let b = *self.indices.get(&to)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Smallest box enclosing every node, or `None` for an empty graph.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(self.nodes().map(Node::coord))
    }

    /// Build a new graph keeping the nodes matched by `keep` and the edges
    /// whose endpoints are both kept. `self` is left untouched.
    pub fn subgraph(&self, keep: impl Fn(&Node) -> bool) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        for node in self.graph.node_weights().filter(|n| keep(n)) {
            indices.insert(node.id, graph.add_node(*node));
        }

        for edge in self.graph.edge_references() {
            let e = edge.weight();
            if let (Some(&a), Some(&b)) = (indices.get(&e.from), indices.get(&e.to)) {
                graph.add_edge(a, b, e.clone());
            }
        }

        Self { graph, indices }
    }

    pub(crate) fn inner(&self) -> &DiGraph<Node, Edge> {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.indices.get(&id).copied()
    }
}
