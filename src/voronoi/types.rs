// SPDX-License-Identifier: AGPL-3.0-or-later
//! The generalised Voronoi diagram as consumed by the retraction and
//! pathfinding stage: a graph over discretised bisector poly-lines, with
//! straight (`Linear`) and curved (`Parabolic`) provenance kept per edge so
//! callers can tell which edges came from a segment-segment bisector versus
//! a segment-endpoint bisector.

use petgraph::graphmap::UnGraphMap;
use vector_traits::glam::DVec2;

pub type VertexId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeShape {
    Linear,
    Parabolic,
}

#[derive(Debug, Clone)]
pub struct GvdVertex {
    pub pos: DVec2,
    /// True if this vertex sits exactly on an input site (segment
    /// endpoint), rather than being an equidistant bisector point.
    pub is_site: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct GvdEdgeData {
    pub shape: EdgeShape,
    /// Euclidean length of the (possibly discretised) poly-line this edge
    /// represents.
    pub length: f64,
    /// Clearance to the nearest obstacle along the edge's midpoint,
    /// used by [`crate::config::EdgeWeightPolicy::PenaliseWalls`].
    pub clearance: f64,
}

/// The GVD as an undirected weighted graph: nodes are discretised bisector
/// points, edges are the poly-line segments between them.
#[derive(Debug, Clone, Default)]
pub struct VoronoiGraph {
    pub vertices: Vec<GvdVertex>,
    pub graph: UnGraphMap<VertexId, GvdEdgeData>,
}

impl VoronoiGraph {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn position(&self, id: VertexId) -> DVec2 {
        self.vertices[id as usize].pos
    }

    pub fn neighbours(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.graph.neighbors(id)
    }
}
