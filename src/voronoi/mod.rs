// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generalised Voronoi diagram construction over the obstacle segments
//! produced by [`crate::segments`].

pub mod builder;
pub mod types;

pub use builder::build_voronoi_graph;
pub use types::{EdgeShape, GvdEdgeData, GvdVertex, VertexId, VoronoiGraph};
