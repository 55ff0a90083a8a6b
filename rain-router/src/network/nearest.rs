//! Snapping coordinates to graph nodes.

use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::domain::Equirectangular;

use super::error::EmptyGraphError;
use super::graph::{NetworkGraph, NodeId};

type IndexedNode = GeomWithData<[f64; 2], NodeId>;

/// R-tree over node positions projected into a locally flat metric.
///
/// Read-only after construction and safe to share between requests.
#[derive(Debug)]
pub struct NearestNodeIndex {
    tree: RTree<IndexedNode>,
    projection: Equirectangular,
    /// Any indexed node, answered if the tree yields no neighbour.
    fallback: NodeId,
}

impl NearestNodeIndex {
    /// Build an index over every node of `graph`.
    ///
    /// The projection is centred on the mean node latitude.
    pub fn build(graph: &NetworkGraph) -> Result<Self, EmptyGraphError> {
        let fallback = graph.nodes().map(|n| n.id).min().ok_or(EmptyGraphError)?;

        let mean_lat = graph.nodes().map(|n| n.lat).sum::<f64>() / graph.node_count() as f64;
        let projection = Equirectangular::new(mean_lat);

        let entries = graph
            .nodes()
            .map(|n| GeomWithData::new(projection.project(n.lat, n.lon), n.id))
            .collect();

        Ok(Self {
            tree: RTree::bulk_load(entries),
            projection,
            fallback,
        })
    }

    /// The node nearest to `(lat, lon)` in projected space.
    ///
    /// Equidistant candidates resolve to the smallest [`NodeId`].
    pub fn query(&self, lat: f64, lon: f64) -> NodeId {
        let point = self.projection.project(lat, lon);
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&point);

        let Some((first, best)) = candidates.next() else {
            return self.fallback;
        };

        candidates
            .take_while(|(_, d)| *d == best)
            .map(|(entry, _)| entry.data)
            .fold(first.data, NodeId::min)
    }

}
