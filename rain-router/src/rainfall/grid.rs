//! Mapping geographic positions onto the rainfall raster.

use crate::network::{Edge, NetworkGraph};

use super::error::OutOfBoundsError;
use super::matrix::RainfallMatrix;

/// Georeferencing of the rainfall raster.
///
/// Cell `(row, col)` covers latitudes `lat0 + row * dlat ..` and longitudes
/// `lon0 + col * dlon ..`. Either step may be negative for rasters stored
/// north-to-south or east-to-west.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub lat0: f64,
    pub lon0: f64,
    pub dlat: f64,
    pub dlon: f64,
}

impl GridSpec {
    pub fn new(lat0: f64, lon0: f64, dlat: f64, dlon: f64) -> Self {
        Self {
            lat0,
            lon0,
            dlat,
            dlon,
        }
    }

    /// The matrix cell containing `(lat, lon)`.
    ///
    /// `row = floor((lat - lat0) / dlat)`, `col = floor((lon - lon0) / dlon)`.
    pub fn cell_for(
        &self,
        matrix: &RainfallMatrix,
        lat: f64,
        lon: f64,
    ) -> Result<(usize, usize), OutOfBoundsError> {
        let out_of_bounds = OutOfBoundsError {
            lat,
            lon,
            rows: matrix.rows(),
            cols: matrix.cols(),
        };

        let row = ((lat - self.lat0) / self.dlat).floor();
        let col = ((lon - self.lon0) / self.dlon).floor();

        if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
            return Err(out_of_bounds);
        }
        if row >= matrix.rows() as f64 || col >= matrix.cols() as f64 {
            return Err(out_of_bounds);
        }

        Ok((row as usize, col as usize))
    }

    /// Rainfall at `(lat, lon)`.
    pub fn sample(
        &self,
        matrix: &RainfallMatrix,
        lat: f64,
        lon: f64,
    ) -> Result<u32, OutOfBoundsError> {
        let (row, col) = self.cell_for(matrix, lat, lon)?;
        Ok(matrix.get(row, col).unwrap_or(0))
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            lat0: -24.0,
            lon0: -47.0,
            dlat: 0.01,
            dlon: 0.01,
        }
    }
}

/// Worst-point rainfall exposure along an edge.
///
/// Samples every vertex of the edge geometry, or just the two endpoints when
/// the edge has none, and returns the maximum reading.
pub fn edge_hazard(
    graph: &NetworkGraph,
    edge: &Edge,
    matrix: &RainfallMatrix,
    grid: &GridSpec,
) -> Result<u32, OutOfBoundsError> {
    let mut hazard = 0;

    match edge.geometry.as_deref() {
        Some(vertices) if !vertices.is_empty() => {
            for v in vertices {
                hazard = hazard.max(grid.sample(matrix, v.lat, v.lon)?);
            }
        }
        _ => {
            for id in [edge.from, edge.to] {
                if let Some(node) = graph.node(id) {
                    hazard = hazard.max(grid.sample(matrix, node.lat, node.lon)?);
                }
            }
        }
    }

    Ok(hazard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coord;
    use crate::network::{Node, NodeId};

    fn grid() -> GridSpec {
        GridSpec::new(0.0, 0.0, 1.0, 1.0)
    }

    fn matrix() -> RainfallMatrix {
        RainfallMatrix::from_rows(vec![vec![0, 1, 2], vec![10, 20, 30], vec![5, 50, 0]])
            .unwrap()
    }

    #[test]
    fn cell_for_floors_offsets() {
        let g = grid();
        let m = matrix();
        assert_eq!(g.cell_for(&m, 0.0, 0.0).unwrap(), (0, 0));
        assert_eq!(g.cell_for(&m, 1.99, 0.5).unwrap(), (1, 0));
        assert_eq!(g.cell_for(&m, 2.5, 2.999).unwrap(), (2, 2));
    }

    #[test]
    fn cell_for_rejects_outside_points() {
        let g = grid();
        let m = matrix();
        assert!(g.cell_for(&m, -0.01, 0.0).is_err());
        assert!(g.cell_for(&m, 3.0, 0.0).is_err());
        assert!(g.cell_for(&m, 0.0, 3.0).is_err());
        assert!(g.cell_for(&m, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn negative_step_reads_north_to_south() {
        let g = GridSpec::new(3.0, 0.0, -1.0, 1.0);
        let m = matrix();
        // lat 2.5 is in the first row when rows count down from lat0 = 3.
        assert_eq!(g.cell_for(&m, 2.5, 0.5).unwrap(), (0, 0));
        assert_eq!(g.cell_for(&m, 0.5, 0.5).unwrap(), (2, 0));
    }

    #[test]
    fn zero_step_is_out_of_bounds() {
        let g = GridSpec::new(0.0, 0.0, 0.0, 1.0);
        assert!(g.cell_for(&matrix(), 0.5, 0.5).is_err());
    }

    #[test]
    fn hazard_uses_endpoints_without_geometry() {
        let graph = NetworkGraph::from_parts(
            vec![Node::new(1, 0.5, 0.5), Node::new(2, 1.5, 2.5)],
            vec![Edge::new(1, 2, 1.0, 1.0)],
        )
        .unwrap();
        let edge = graph.edge(NodeId(1), NodeId(2)).unwrap();
        assert_eq!(edge_hazard(&graph, edge, &matrix(), &grid()).unwrap(), 30);
    }

    #[test]
    fn hazard_is_max_over_geometry_vertices() {
        let graph = NetworkGraph::from_parts(
            vec![Node::new(1, 0.5, 0.5), Node::new(2, 0.5, 2.5)],
            vec![Edge::new(1, 2, 1.0, 1.0).with_geometry(vec![
                Coord::new(0.5, 0.5),
                Coord::new(1.5, 2.5),
                Coord::new(2.5, 0.5),
            ])],
        )
        .unwrap();
        let edge = graph.edge(NodeId(1), NodeId(2)).unwrap();
        // Vertex (lat 2.5, lon 1.5) hits the 50mm cell even though both
        // endpoints are nearly dry.
        assert_eq!(edge_hazard(&graph, edge, &matrix(), &grid()).unwrap(), 50);
    }

    #[test]
    fn hazard_fails_when_a_vertex_is_off_grid() {
        let graph = NetworkGraph::from_parts(
            vec![Node::new(1, 0.5, 0.5), Node::new(2, 9.0, 9.0)],
            vec![Edge::new(1, 2, 1.0, 1.0)],
        )
        .unwrap();
        let edge = graph.edge(NodeId(1), NodeId(2)).unwrap();
        assert!(edge_hazard(&graph, edge, &matrix(), &grid()).is_err());
    }
}
