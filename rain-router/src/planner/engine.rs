//! Route computation: snapping, cropping, rainfall lookup and search.

use std::fmt;
use std::panic;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{BoundingBox, Coord, TimePoint};
use crate::network::{EmptyGraphError, NearestNodeIndex, NetworkGraph, NodeId, crop};
use crate::rainfall::{
    GridSpec, OutOfBoundsError, RainfallGridProvider, RainfallMatrix, RainfallSource, edge_hazard,
};

use super::config::RouteConfig;
use super::search::{EdgeHazards, SearchResult, Weighting, find_path_with_rate, path_edges};

/// How a route is weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Minimise total length.
    ShortestDistance,

    /// Minimise total travel time.
    FastestTime,

    /// Minimise length penalised by rainfall at the given time.
    RainAware(TimePoint),
}

/// Progress of a route request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    NodeSnapped,
    GraphCropped,
    Searched,
    Responded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::NodeSnapped => "node_snapped",
            Stage::GraphCropped => "graph_cropped",
            Stage::Searched => "searched",
            Stage::Responded => "responded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Error from route computation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouteError {
    /// The request itself is unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A point needed for hazard sampling lies outside the rainfall raster.
    #[error("{source}")]
    OutOfBounds {
        #[source]
        source: OutOfBoundsError,
        stage: Stage,
    },

    /// No passable path connects the snapped endpoints.
    #[error("no route from node {from} to node {to}")]
    NoRoute {
        from: NodeId,
        to: NodeId,
        stage: Stage,
    },

    /// The worker running the search was shut down before it finished.
    #[error("route search was interrupted")]
    Interrupted { stage: Stage },
}

impl RouteError {
    /// The last stage the request reached before failing.
    pub fn stage(&self) -> Stage {
        match self {
            RouteError::InvalidRequest(_) => Stage::Received,
            RouteError::OutOfBounds { stage, .. }
            | RouteError::NoRoute { stage, .. }
            | RouteError::Interrupted { stage } => *stage,
        }
    }
}

/// Request for a route between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub start: Coord,
    pub end: Coord,
    pub mode: Mode,
}

impl RouteRequest {
    pub fn new(start: Coord, end: Coord, mode: Mode) -> Self {
        Self { start, end, mode }
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), RouteError> {
        if !self.start.is_valid() {
            return Err(RouteError::InvalidRequest(format!(
                "start coordinate ({}, {}) is not a valid lon/lat",
                self.start.lon, self.start.lat
            )));
        }
        if !self.end.is_valid() {
            return Err(RouteError::InvalidRequest(format!(
                "end coordinate ({}, {}) is not a valid lon/lat",
                self.end.lon, self.end.lat
            )));
        }
        Ok(())
    }
}

/// A computed route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Traversed nodes, origin first.
    pub nodes: Vec<NodeId>,

    /// `(lon, lat)` of each traversed node.
    pub coordinates: Vec<Coord>,

    /// Sum of the search cost over traversed edges.
    pub total_cost: f64,

    /// Sum of edge lengths.
    pub total_distance: f64,

    /// Sum of edge travel times.
    pub total_time: f64,

    /// Worst rainfall on the route, when a raster was used.
    pub max_hazard: Option<u32>,

    /// Rain-aware routing was requested but no raster was available, so the
    /// route was weighted by distance instead.
    pub degraded: bool,

    /// The search ran on a crop of the base graph.
    pub cropped: bool,
}

/// Heuristic rates of the base graph, valid on every crop of it.
#[derive(Debug, Clone, Copy)]
struct Rates {
    distance: f64,
    time: f64,
}

/// Owned edge pricing that can move onto a blocking worker.
enum Pricing {
    Distance,
    Time,
    Rain {
        hazards: EdgeHazards,
        config: RouteConfig,
    },
}

impl Pricing {
    fn weighting(&self) -> Weighting<'_> {
        match self {
            Pricing::Distance => Weighting::Distance,
            Pricing::Time => Weighting::Time,
            Pricing::Rain { hazards, config } => Weighting::Rain { hazards, config },
        }
    }
}

/// Computes routes over a shared road network.
///
/// Searches, crops and hazard sampling run on tokio's blocking pool, so a
/// caller's deadline can abandon a request while its search is in progress.
pub struct RouteEngine<S> {
    graph: Arc<NetworkGraph>,
    index: Arc<NearestNodeIndex>,
    rainfall: Arc<RainfallGridProvider<S>>,
    boundary: BoundingBox,
    config: RouteConfig,
    rates: Rates,
}

impl<S: RainfallSource> RouteEngine<S> {
    /// Create an engine, building the nearest-node index for `graph`.
    pub fn new(
        graph: Arc<NetworkGraph>,
        rainfall: Arc<RainfallGridProvider<S>>,
        config: RouteConfig,
    ) -> Result<Self, EmptyGraphError> {
        let index = NearestNodeIndex::build(&graph)?;
        let boundary = match config.boundary {
            Some(boundary) => boundary,
            None => graph.bounds().ok_or(EmptyGraphError)?,
        };

        let rates = Rates {
            distance: Weighting::Distance.heuristic_rate(&graph),
            time: Weighting::Time.heuristic_rate(&graph),
        };

        Ok(Self {
            graph,
            index: Arc::new(index),
            rainfall,
            boundary,
            config,
            rates,
        })
    }

    #[cfg(test)]
    fn rainfall(&self) -> &RainfallGridProvider<S> {
        &self.rainfall
    }

    /// Compute a route for `request`.
    pub async fn compute_route(&self, request: &RouteRequest) -> Result<Route, RouteError> {
        debug!(stage = %Stage::Received, mode = ?request.mode, "route request");

        let result = self.run(request).await;
        match &result {
            Ok(route) => debug!(
                stage = %Stage::Responded,
                nodes = route.nodes.len(),
                degraded = route.degraded,
                cropped = route.cropped,
                "route computed"
            ),
            Err(e) => debug!(stage = %Stage::Failed, at = %e.stage(), error = %e, "route failed"),
        }
        result
    }

    async fn run(&self, request: &RouteRequest) -> Result<Route, RouteError> {
        request.validate()?;
        debug!(stage = %Stage::Validated);

        let start = self.index.query(request.start.lat, request.start.lon);
        let end = self.index.query(request.end.lat, request.end.lon);
        debug!(stage = %Stage::NodeSnapped, %start, %end);

        match request.mode {
            Mode::ShortestDistance => {
                self.route_on(Arc::clone(&self.graph), start, end, Pricing::Distance, false)
                    .await
            }
            Mode::FastestTime => {
                self.route_on(Arc::clone(&self.graph), start, end, Pricing::Time, false)
                    .await
            }
            Mode::RainAware(time) => self.rain_route(start, end, &time).await,
        }
    }

    async fn rain_route(
        &self,
        start: NodeId,
        end: NodeId,
        time: &TimePoint,
    ) -> Result<Route, RouteError> {
        let (graph, cropped) = if self.config.crop_rain_search {
            let cropped = self.crop_around_reference(start, end).await?;
            debug!(
                stage = %Stage::GraphCropped,
                nodes = cropped.node_count(),
                edges = cropped.edge_count()
            );
            (Arc::new(cropped), true)
        } else {
            (Arc::clone(&self.graph), false)
        };

        let matrix = match self.rainfall.fetch(time).await {
            Ok(matrix) => matrix,
            Err(e) => {
                warn!(%time, error = %e, "rainfall unavailable, routing by distance");
                let mut route = self
                    .route_on(graph, start, end, Pricing::Distance, cropped)
                    .await?;
                route.degraded = true;
                return Ok(route);
            }
        };

        let stage = searched_on(cropped);
        let grid = *self.rainfall.grid();
        let sampled = Arc::clone(&graph);
        let hazards = off_runtime(stage, move || sample_hazards(&sampled, &matrix, &grid))
            .await?
            .map_err(|source| RouteError::OutOfBounds { source, stage })?;

        let pricing = Pricing::Rain {
            hazards,
            config: self.config.clone(),
        };
        self.route_on(graph, start, end, pricing, cropped).await
    }

    /// Crop the base graph around the shortest-distance path from `start` to
    /// `end`.
    async fn crop_around_reference(
        &self,
        start: NodeId,
        end: NodeId,
    ) -> Result<NetworkGraph, RouteError> {
        let base = Arc::clone(&self.graph);
        let boundary = self.boundary;
        let margin = self.config.crop_margin_deg;
        let rate = self.rates.distance;

        off_runtime(Stage::NodeSnapped, move || {
            let reference = find_path_with_rate(&base, start, end, &Weighting::Distance, rate)?;
            Some(crop(&base, &boundary, &reference.nodes, margin))
        })
        .await?
        .ok_or(RouteError::NoRoute {
            from: start,
            to: end,
            stage: Stage::NodeSnapped,
        })
    }

    async fn route_on(
        &self,
        graph: Arc<NetworkGraph>,
        start: NodeId,
        end: NodeId,
        pricing: Pricing,
        cropped: bool,
    ) -> Result<Route, RouteError> {
        let rate = match pricing {
            Pricing::Distance => self.rates.distance,
            Pricing::Time => self.rates.time,
            Pricing::Rain { .. } => 0.0,
        };
        let stage = searched_on(cropped);

        off_runtime(stage, move || {
            let weighting = pricing.weighting();
            let result = find_path_with_rate(&graph, start, end, &weighting, rate).ok_or(
                RouteError::NoRoute {
                    from: start,
                    to: end,
                    stage,
                },
            )?;
            debug!(stage = %Stage::Searched, cost = result.cost);

            Ok(assemble(&graph, result, &weighting, cropped))
        })
        .await?
    }
}

/// Run CPU-bound `work` on the blocking pool.
///
/// A panic in `work` is resumed on the caller.
async fn off_runtime<T, F>(stage: Stage, work: F) -> Result<T, RouteError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        if e.is_panic() {
            panic::resume_unwind(e.into_panic());
        }
        RouteError::Interrupted { stage }
    })
}

/// Hazard of every edge in `graph`.
fn sample_hazards(
    graph: &NetworkGraph,
    matrix: &RainfallMatrix,
    grid: &GridSpec,
) -> Result<EdgeHazards, OutOfBoundsError> {
    graph
        .edges()
        .map(|edge| Ok(((edge.from, edge.to), edge_hazard(graph, edge, matrix, grid)?)))
        .collect()
}

/// The stage a search starts from.
fn searched_on(cropped: bool) -> Stage {
    if cropped {
        Stage::GraphCropped
    } else {
        Stage::NodeSnapped
    }
}

fn assemble(
    graph: &NetworkGraph,
    result: SearchResult,
    weighting: &Weighting<'_>,
    cropped: bool,
) -> Route {
    let edges = path_edges(graph, &result.nodes);

    let max_hazard = match weighting {
        Weighting::Rain { .. } => Some(
            edges
                .iter()
                .filter_map(|e| weighting.hazard(e))
                .max()
                .unwrap_or(0),
        ),
        _ => None,
    };

    Route {
        coordinates: result
            .nodes
            .iter()
            .filter_map(|id| graph.node(*id))
            .map(|n| n.coord())
            .collect(),
        total_cost: result.cost,
        total_distance: edges.iter().map(|e| e.length).sum(),
        total_time: edges.iter().map(|e| e.travel_time).sum(),
        max_hazard,
        degraded: false,
        cropped,
        nodes: result.nodes,
    }
}
