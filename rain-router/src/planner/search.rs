//! Weighted shortest-path search over a [`NetworkGraph`].
//!
//! Searches run A* over the graph with impassable edges filtered out. For
//! distance and time weightings the heuristic is the great-circle distance to
//! the goal scaled by the cheapest cost-per-metre of any edge in the graph,
//! which never overestimates. Rain-aware weighting uses a zero heuristic.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::visit::EdgeFiltered;

use crate::domain::haversine_m;
use crate::network::{Edge, NetworkGraph, NodeId};

use super::config::RouteConfig;

/// Rainfall hazard (mm) per directed edge, keyed by `(from, to)`.
pub type EdgeHazards = HashMap<(NodeId, NodeId), u32>;

/// How edges are priced during a search.
#[derive(Debug, Clone, Copy)]
pub enum Weighting<'a> {
    /// Cost is edge length.
    Distance,

    /// Cost is edge travel time.
    Time,

    /// Cost is length scaled up by the edge's rainfall hazard.
    Rain {
        hazards: &'a EdgeHazards,
        config: &'a RouteConfig,
    },
}

impl Weighting<'_> {
    /// Cost of traversing `edge`, or `None` if it may not be traversed.
    pub fn cost(&self, edge: &Edge) -> Option<f64> {
        match self {
            Weighting::Distance => Some(edge.length),
            Weighting::Time => Some(edge.travel_time),
            Weighting::Rain { config, .. } => {
                let hazard = self.hazard(edge).unwrap_or(0);
                config
                    .is_passable(hazard)
                    .then(|| edge.length * (1.0 + config.penalty.penalty(hazard)))
            }
        }
    }

    /// Hazard of `edge` when the weighting carries a raster.
    pub fn hazard(&self, edge: &Edge) -> Option<u32> {
        match self {
            Weighting::Rain { hazards, .. } => {
                Some(hazards.get(&(edge.from, edge.to)).copied().unwrap_or(0))
            }
            _ => None,
        }
    }

    /// Lower bound on cost per metre of great-circle distance over `graph`.
    ///
    /// Zero when no useful bound exists, which turns A* into Dijkstra. A rate
    /// computed on a graph stays admissible on any subgraph of it.
    pub fn heuristic_rate(&self, graph: &NetworkGraph) -> f64 {
        if matches!(self, Weighting::Rain { .. }) {
            return 0.0;
        }

        let mut rate = f64::INFINITY;
        for edge in graph.edges() {
            let (Some(a), Some(b)) = (graph.node(edge.from), graph.node(edge.to)) else {
                continue;
            };
            let span = haversine_m(a.coord(), b.coord());
            if span <= 0.0 {
                continue;
            }
            if let Some(cost) = self.cost(edge) {
                rate = rate.min(cost / span);
            }
        }

        if rate.is_finite() {
            // Leave headroom for rounding in the haversine terms.
            rate * (1.0 - 1e-9)
        } else {
            0.0
        }
    }
}

/// A path found by [`find_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Nodes in traversal order, starting at the origin.
    pub nodes: Vec<NodeId>,

    /// Sum of the weighting's cost over the traversed edges.
    pub cost: f64,
}

/// Cheapest path from `start` to `goal` under `weighting`.
///
/// Returns `None` when either endpoint is not in the graph or no passable
/// path connects them.
pub fn find_path(
    graph: &NetworkGraph,
    start: NodeId,
    goal: NodeId,
    weighting: &Weighting<'_>,
) -> Option<SearchResult> {
    let rate = weighting.heuristic_rate(graph);
    find_path_with_rate(graph, start, goal, weighting, rate)
}

/// [`find_path`] with a heuristic rate computed ahead of time.
///
/// `rate` must not exceed [`Weighting::heuristic_rate`] of `graph`, or the
/// result may not be the cheapest path.
pub fn find_path_with_rate(
    graph: &NetworkGraph,
    start: NodeId,
    goal: NodeId,
    weighting: &Weighting<'_>,
    rate: f64,
) -> Option<SearchResult> {
    let source = graph.index_of(start)?;
    let target = graph.index_of(goal)?;
    let inner = graph.inner();

    let goal_coord = inner[target].coord();

    let passable = EdgeFiltered::from_fn(inner, |e| weighting.cost(e.weight()).is_some());

    let (cost, path) = astar(
        &passable,
        source,
        |n| n == target,
        |e| OrderedFloat(weighting.cost(e.weight()).unwrap_or(f64::INFINITY)),
        |n| OrderedFloat(rate * haversine_m(inner[n].coord(), goal_coord)),
    )?;

    Some(SearchResult {
        nodes: path.into_iter().map(|idx| inner[idx].id).collect(),
        cost: cost.into_inner(),
    })
}

/// The edges traversed by consecutive pairs in `nodes`.
pub fn path_edges<'g>(graph: &'g NetworkGraph, nodes: &[NodeId]) -> Vec<&'g Edge> {
    nodes
        .windows(2)
        .filter_map(|pair| graph.edge(pair[0], pair[1]))
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::network::Node;
    use petgraph::algo::dijkstra;
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// Small random graphs around São Paulo with arbitrary edge costs.
    fn arb_graph() -> impl Strategy<Value = NetworkGraph> {
        (2usize..12).prop_flat_map(|n| {
            let nodes = prop::collection::vec((-23.6f64..-23.5, -46.7f64..-46.6), n);
            let edges = prop::collection::vec(
                (0..n as i64, 0..n as i64, 0.0f64..5000.0, 0.0f64..600.0),
                0..40,
            );
            (nodes, edges).prop_map(|(nodes, edges)| {
                let nodes = nodes
                    .into_iter()
                    .enumerate()
                    .map(|(i, (lat, lon))| Node::new(i as i64, lat, lon))
                    .collect();
                let edges = edges
                    .into_iter()
                    .filter(|(a, b, _, _)| a != b)
                    .map(|(a, b, len, tt)| Edge::new(a, b, len, tt))
                    .collect();
                NetworkGraph::from_parts(nodes, edges).unwrap()
            })
        })
    }

    /// A graph with a random hazard on each edge and an optional
    /// impassability threshold.
    fn arb_rain() -> impl Strategy<Value = (NetworkGraph, EdgeHazards, RouteConfig)> {
        arb_graph().prop_flat_map(|graph| {
            let edge_count = graph.edge_count();
            (
                Just(graph),
                prop::collection::vec(0u32..100, edge_count),
                prop::option::of(0u32..100),
            )
                .prop_map(|(graph, mm, threshold)| {
                    let hazards = graph
                        .edges()
                        .zip(mm)
                        .map(|(e, mm)| ((e.from, e.to), mm))
                        .collect();
                    let mut config = RouteConfig::default();
                    if let Some(threshold) = threshold {
                        config = config.with_impassable_above(threshold);
                    }
                    (graph, hazards, config)
                })
        })
    }

    fn check_path(
        graph: &NetworkGraph,
        weighting: &Weighting<'_>,
    ) -> Result<(), TestCaseError> {
        let last = NodeId(graph.node_count() as i64 - 1);

        if let Some(result) = find_path(graph, NodeId(0), last, weighting) {
            prop_assert_eq!(result.nodes.first(), Some(&NodeId(0)));
            prop_assert_eq!(result.nodes.last(), Some(&last));

            let unique: HashSet<_> = result.nodes.iter().collect();
            prop_assert_eq!(unique.len(), result.nodes.len());

            let edges = path_edges(graph, &result.nodes);
            prop_assert_eq!(edges.len(), result.nodes.len() - 1);
            let costs: Vec<f64> = edges.iter().filter_map(|e| weighting.cost(e)).collect();
            // Every traversed edge is passable.
            prop_assert_eq!(costs.len(), edges.len());
            let sum: f64 = costs.iter().sum();
            prop_assert!((sum - result.cost).abs() < 1e-6 * sum.max(1.0));
        }
        Ok(())
    }

    fn check_against_dijkstra(
        graph: &NetworkGraph,
        weighting: &Weighting<'_>,
    ) -> Result<(), TestCaseError> {
        let last = NodeId(graph.node_count() as i64 - 1);
        let inner = graph.inner();
        let source = graph.index_of(NodeId(0)).unwrap();
        let target = graph.index_of(last).unwrap();

        let passable = EdgeFiltered::from_fn(inner, |e| weighting.cost(e.weight()).is_some());
        let best = dijkstra(&passable, source, Some(target), |e| {
            weighting.cost(e.weight()).unwrap_or(f64::INFINITY)
        });
        let found = find_path(graph, NodeId(0), last, weighting);

        match (best.get(&target), found) {
            (Some(expected), Some(result)) => {
                prop_assert!((expected - result.cost).abs() < 1e-6 * expected.max(1.0));
            }
            (None, None) => {}
            (expected, found) => {
                prop_assert!(false, "dijkstra {:?} vs astar {:?}", expected, found);
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn paths_are_loop_free_and_cost_consistent(graph in arb_graph(), time in any::<bool>()) {
            let weighting = if time { Weighting::Time } else { Weighting::Distance };
            check_path(&graph, &weighting)?;
        }

        #[test]
        fn rain_paths_are_loop_free_and_cost_consistent((graph, hazards, config) in arb_rain()) {
            let weighting = Weighting::Rain { hazards: &hazards, config: &config };
            check_path(&graph, &weighting)?;
        }

        #[test]
        fn astar_matches_dijkstra(graph in arb_graph(), time in any::<bool>()) {
            let weighting = if time { Weighting::Time } else { Weighting::Distance };
            check_against_dijkstra(&graph, &weighting)?;
        }

        #[test]
        fn rain_search_matches_dijkstra((graph, hazards, config) in arb_rain()) {
            let weighting = Weighting::Rain { hazards: &hazards, config: &config };
            check_against_dijkstra(&graph, &weighting)?;
        }
    }
}
