//! Cropping a graph to the vicinity of a reference path.
//!
//! Cropping bounds the search space of expensive passes (the rain-aware
//! search) while leaving room for detours around the reference path. It is a
//! pure function: the input graph is never modified and the result shares no
//! state with it, so concurrent requests can crop the same base graph.

use std::collections::HashSet;

use crate::domain::BoundingBox;

use super::graph::{NetworkGraph, NodeId};

/// The box a crop around `reference_path` keeps.
///
/// Starts from the lat/lon extents of the path's nodes, grows each bound
/// outward by that axis's span (never less than `min_margin_deg`), then
/// clamps to `boundary`. An axis along which the path does not move at all
/// grows by the other axis's span instead, so a straight east-west or
/// north-south path still leaves room for detours. Returns `None` if no path
/// node is in the graph.
pub fn crop_box(
    graph: &NetworkGraph,
    boundary: &BoundingBox,
    reference_path: &[NodeId],
    min_margin_deg: f64,
) -> Option<BoundingBox> {
    let extents = BoundingBox::enclosing(
        reference_path
            .iter()
            .filter_map(|id| graph.node(*id))
            .map(|n| n.coord()),
    )?;

    let (lat_span, lon_span) = (extents.lat_span(), extents.lon_span());
    let min_margin = min_margin_deg.max(0.0);
    let lat_margin = (if lat_span > 0.0 { lat_span } else { lon_span }).max(min_margin);
    let lon_margin = (if lon_span > 0.0 { lon_span } else { lat_span }).max(min_margin);

    Some(extents.expand(lat_margin, lon_margin).clamp_to(boundary))
}

/// Derive a smaller graph around `reference_path`.
///
/// Keeps a node iff it lies inside [`crop_box`] or is on the reference path,
/// and an edge iff both of its endpoints are kept.
pub fn crop(
    graph: &NetworkGraph,
    boundary: &BoundingBox,
    reference_path: &[NodeId],
    min_margin_deg: f64,
) -> NetworkGraph {
    let on_path: HashSet<NodeId> = reference_path.iter().copied().collect();
    match crop_box(graph, boundary, reference_path, min_margin_deg) {
        Some(bbox) => {
            graph.subgraph(|n| on_path.contains(&n.id) || bbox.contains(n.lat, n.lon))
        }
        None => graph.subgraph(|_| false),
    }
}
