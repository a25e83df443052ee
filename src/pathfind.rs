// SPDX-License-Identifier: AGPL-3.0-or-later
//! Retracts a start/end configuration onto the nearest Voronoi graph vertex
//! and searches the graph for a collision-free route between them. The
//! explicit state machine mirrors how the orchestrator reports progress per
//! stage rather than as one opaque call.

use crate::config::{CoreConfig, EdgeWeightPolicy};
use crate::contour::Contour;
use crate::error::{PlannerError, Result};
use crate::instrument::collision::segments_intersect;
use crate::voronoi::{VertexId, VoronoiGraph};
use crate::walls_index::WallsIndex;
use itertools::Itertools;
use smallvec::SmallVec;
use vector_traits::glam::DVec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Idle,
    RetractStart,
    RetractEnd,
    DirectCheck,
    GraphSearch,
    Assemble,
    Verify,
    Done,
    Failed,
}

/// The retracted and searched route: a poly-line in angle space, plus which
/// state the search last completed (`Done` on success).
#[derive(Debug, Clone)]
pub struct PlannedPath {
    pub points: Vec<DVec2>,
    pub state: PathState,
}

/// Finds the `k` nearest graph vertices to `query` by brute-force scan. The
/// graph's vertex count per query is small enough (a handful to a few
/// hundred) that a k-d tree buys nothing here; `walls_index::WallsIndex`
/// is where that structure earns its keep, over the much larger
/// forbidden-pixel set.
fn k_nearest(graph: &VoronoiGraph, query: DVec2, k: usize) -> SmallVec<[(VertexId, f64); 8]> {
    let mut dists: SmallVec<[(VertexId, f64); 8]> = graph
        .vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (i as VertexId, v.pos.distance_squared(query)))
        .collect();
    dists.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    dists.truncate(k.max(1));
    dists
}

/// Retracts `query` onto the nearest of the `config.retraction_k` closest
/// graph vertices whose connecting segment doesn't cross any obstacle
/// contour; a candidate whose straight line to `query` cuts through a wall
/// isn't a valid retraction target even if it's the closest by distance.
fn retract(
    graph: &VoronoiGraph,
    query: DVec2,
    contours: &[Contour],
    config: &CoreConfig,
) -> Result<VertexId> {
    let candidates = k_nearest(graph, query, config.retraction_k);
    candidates
        .into_iter()
        .find(|&(id, _)| {
            let vertex = graph.position(id);
            !contours
                .iter()
                .any(|c| segment_crosses_contour(query, vertex, c, config.collision_eps))
        })
        .map(|(id, _)| id)
        .ok_or_else(|| {
            PlannerError::PathfindingFailed(
                "no collision-free retraction candidate found among the nearest graph vertices".into(),
            )
        })
}

/// Every edge of a closed contour, wrapping from the last point back to the
/// first.
fn contour_edges(contour: &Contour) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
    contour
        .points
        .iter()
        .copied()
        .chain(contour.points.first().copied())
        .tuple_windows()
}

/// True if the straight segment `a`-`b` crosses any edge of `contour`.
fn segment_crosses_contour(a: DVec2, b: DVec2, contour: &Contour, eps: f64) -> bool {
    contour_edges(contour).any(|(p, q)| {
        segments_intersect(((a.x, a.y), (b.x, b.y)), ((p.x, p.y), (q.x, q.y)), eps)
    })
}

fn edge_cost(data: crate::voronoi::GvdEdgeData, config: &CoreConfig) -> f64 {
    match config.edge_weight_policy {
        EdgeWeightPolicy::Shortest => data.length,
        EdgeWeightPolicy::PenaliseWalls => {
            let clearance = data.clearance.max(1e-9);
            data.length * (1.0 / clearance).powf(config.penalise_walls_alpha)
        }
    }
}

/// Finds a collision-free path from `start` to `end`, both in angle-space
/// radians. When `config.try_direct_path` is set, the two points are within
/// `config.direct_path_search_radius_rad` of each other (by the configured
/// weighted norm), and the straight segment between them doesn't cross any
/// `contours` obstacle, it's returned directly without touching the graph.
pub fn find_path(
    graph: &VoronoiGraph,
    start: DVec2,
    end: DVec2,
    contours: &[Contour],
    walls_index: Option<&WallsIndex>,
    config: &CoreConfig,
) -> Result<PlannedPath> {
    if config.try_direct_path {
        let d = config.weighted_angular_distance(end.x - start.x, end.y - start.y);
        let blocked = contours
            .iter()
            .any(|c| segment_crosses_contour(start, end, c, config.collision_eps));
        if d <= config.direct_path_search_radius_rad && !blocked {
            let path = PlannedPath {
                points: vec![start, end],
                state: PathState::Done,
            };
            if config.verify_path {
                verify_path(&path.points, contours, walls_index, config)?;
            }
            return Ok(path);
        }
    }

    if graph.vertex_count() == 0 {
        return Err(PlannerError::PathfindingFailed(
            "voronoi graph is empty, cannot retract".into(),
        ));
    }

    let start_vertex = retract(graph, start, contours, config)?;
    let end_vertex = retract(graph, end, contours, config)?;

    let route = reconstruct_path(graph, start_vertex, end_vertex, config)?;

    let mut points = Vec::with_capacity(route.len() + 2);
    points.push(start);
    points.extend(route.iter().map(|&id| graph.position(id)));
    points.push(end);

    if config.verify_path {
        verify_path(&points, contours, walls_index, config)?;
    }

    Ok(PlannedPath {
        points,
        state: PathState::Done,
    })
}

/// Re-runs Dijkstra tracking predecessors to recover the actual vertex
/// sequence, since `petgraph::algo::dijkstra` only returns costs.
fn reconstruct_path(
    graph: &VoronoiGraph,
    start: VertexId,
    end: VertexId,
    config: &CoreConfig,
) -> Result<Vec<VertexId>> {
    use std::collections::{BinaryHeap, HashMap};

    #[derive(PartialEq)]
    struct HeapItem(f64, VertexId);
    impl Eq for HeapItem {}
    impl Ord for HeapItem {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            other.0.partial_cmp(&self.0).unwrap_or(std::cmp::Ordering::Equal)
        }
    }
    impl PartialOrd for HeapItem {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut dist: HashMap<VertexId, f64> = HashMap::new();
    let mut prev: HashMap<VertexId, VertexId> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(start, 0.0);
    heap.push(HeapItem(0.0, start));

    while let Some(HeapItem(d, u)) = heap.pop() {
        if u == end {
            break;
        }
        if d > *dist.get(&u).unwrap_or(&f64::INFINITY) {
            continue;
        }
        for v in graph.neighbours(u) {
            let weight = graph.graph.edge_weight(u, v).copied().unwrap_or(
                crate::voronoi::GvdEdgeData {
                    shape: crate::voronoi::EdgeShape::Linear,
                    length: f64::INFINITY,
                    clearance: 1e-9,
                },
            );
            let nd = d + edge_cost(weight, config);
            if nd < *dist.get(&v).unwrap_or(&f64::INFINITY) {
                dist.insert(v, nd);
                prev.insert(v, u);
                heap.push(HeapItem(nd, v));
            }
        }
    }

    if !dist.contains_key(&end) {
        return Err(PlannerError::PathfindingFailed(
            "path reconstruction lost the route found by the cost pass".into(),
        ));
    }

    let mut route = vec![end];
    let mut cur = end;
    while cur != start {
        cur = *prev
            .get(&cur)
            .ok_or_else(|| PlannerError::Internal("broken predecessor chain".into()))?;
        route.push(cur);
    }
    route.reverse();
    Ok(route)
}

/// Sanity-checks the assembled route: strictly finite points, at least two
/// of them, no segment crossing an obstacle contour, and (when
/// `config.min_dist_to_walls_px` is set and `walls_index` is available)
/// every sampled point along the route clears the nearest wall by that
/// margin.
fn verify_path(
    points: &[DVec2],
    contours: &[Contour],
    walls_index: Option<&WallsIndex>,
    config: &CoreConfig,
) -> Result<()> {
    for p in points {
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(PlannerError::PathfindingFailed(
                "assembled path contains a non-finite point".into(),
            ));
        }
    }
    if points.len() < 2 {
        return Err(PlannerError::PathfindingFailed(
            "assembled path has fewer than two points".into(),
        ));
    }

    for window in points.windows(2) {
        let (a, b) = (window[0], window[1]);
        if contours
            .iter()
            .any(|c| segment_crosses_contour(a, b, c, config.collision_eps))
        {
            return Err(PlannerError::PathfindingFailed(
                "assembled path crosses an obstacle contour".into(),
            ));
        }

        if let (Some(min_dist), Some(index)) = (config.min_dist_to_walls_px, walls_index) {
            let steps = config.path_subdivision_steps.max(1);
            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                let p = a.lerp(b, t);
                if let Some((_, dist)) = index.nearest(p) {
                    if dist < min_dist {
                        return Err(PlannerError::PathfindingFailed(
                            "assembled path passes closer to a wall than the configured margin".into(),
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voronoi::{EdgeShape, GvdEdgeData, GvdVertex};

    fn line_graph() -> VoronoiGraph {
        let mut graph = VoronoiGraph::default();
        graph.vertices = vec![
            GvdVertex { pos: DVec2::new(0.0, 0.0), is_site: false },
            GvdVertex { pos: DVec2::new(1.0, 0.0), is_site: false },
            GvdVertex { pos: DVec2::new(2.0, 0.0), is_site: false },
        ];
        graph.graph.add_edge(0, 1, GvdEdgeData { shape: EdgeShape::Linear, length: 1.0, clearance: 1.0 });
        graph.graph.add_edge(1, 2, GvdEdgeData { shape: EdgeShape::Linear, length: 1.0, clearance: 1.0 });
        graph
    }

    fn box_contour() -> Contour {
        Contour {
            points: vec![
                DVec2::new(5.0, -1.0),
                DVec2::new(5.0, 1.0),
                DVec2::new(6.0, 1.0),
                DVec2::new(6.0, -1.0),
            ],
        }
    }

    #[test]
    fn direct_path_short_circuits_the_graph_search() {
        let graph = line_graph();
        let mut config = CoreConfig::default();
        config.direct_path_search_radius_rad = 10.0;
        let path = find_path(
            &graph,
            DVec2::new(0.0, 0.0),
            DVec2::new(0.1, 0.1),
            &[],
            None,
            &config,
        )
        .unwrap();
        assert_eq!(path.points.len(), 2);
    }

    #[test]
    fn direct_path_is_rejected_when_it_crosses_a_contour() {
        let graph = line_graph();
        let mut config = CoreConfig::default();
        config.direct_path_search_radius_rad = 10.0;
        config.try_direct_path = false;
        let contours = vec![box_contour()];
        let direct = find_path(
            &graph,
            DVec2::new(4.0, 0.0),
            DVec2::new(7.0, 0.0),
            &contours,
            None,
            &config,
        );
        // retraction lands on the line graph's vertices, but any route from
        // there out to (7.0, 0.0) still has to cross the contour, so
        // verify_path must catch it even with the direct check disabled.
        assert!(direct.is_err());
    }

    #[test]
    fn graph_search_finds_a_route_across_the_line() {
        let graph = line_graph();
        let mut config = CoreConfig::default();
        config.try_direct_path = false;
        let path = find_path(
            &graph,
            DVec2::new(-0.01, 0.0),
            DVec2::new(2.01, 0.0),
            &[],
            None,
            &config,
        )
        .unwrap();
        assert_eq!(path.state, PathState::Done);
        assert!(path.points.len() >= 2);
    }

    #[test]
    fn empty_graph_without_direct_path_fails() {
        let graph = VoronoiGraph::default();
        let mut config = CoreConfig::default();
        config.try_direct_path = false;
        assert!(find_path(
            &graph,
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 1.0),
            &[],
            None,
            &config
        )
        .is_err());
    }

    #[test]
    fn verify_path_rejects_a_route_crossing_a_contour() {
        let contours = vec![box_contour()];
        let points = vec![DVec2::new(4.0, 0.0), DVec2::new(7.0, 0.0)];
        assert!(verify_path(&points, &contours, None, &CoreConfig::default()).is_err());
    }

    #[test]
    fn verify_path_rejects_a_route_too_close_to_a_wall() {
        let index = WallsIndex::build(vec![DVec2::new(0.5, 0.0)]);
        let mut config = CoreConfig::default();
        config.min_dist_to_walls_px = Some(1.0);
        let points = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)];
        assert!(verify_path(&points, &[], Some(&index), &config).is_err());
    }
}
