// SPDX-License-Identifier: AGPL-3.0-or-later
//! Turns traced contours into the line-segment sites the Voronoi builder
//! consumes, each tagged with the id of the contour (obstacle) it came
//! from so the GVD builder can later tell which bisectors border the same
//! obstacle. Non-convex contours are optionally split into
//! convex pieces via `earcutr`'s ear-clipping triangulation (every
//! triangle is trivially convex, which sidesteps implementing a dedicated
//! convex-partition algorithm).

use crate::config::CoreConfig;
use crate::contour::Contour;
use crate::error::{PlannerError, Result};
use vector_traits::glam::DVec2;

/// One edge of a contour, tagged with the id of the group (obstacle) it
/// bounds.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
    pub group_id: u32,
}

/// Builds the tagged segment list the Voronoi builder will take as its
/// sites, one group id per input contour.
pub fn build_segments(contours: &[Contour], config: &CoreConfig) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for (group_id, contour) in contours.iter().enumerate() {
        let group_id = group_id as u32;
        if config.split_into_convex && contour.points.len() > 3 {
            for tri in triangulate_convex(&contour.points)? {
                segments.extend(polygon_edges(&tri, group_id));
            }
        } else {
            segments.extend(polygon_edges(&contour.points, group_id));
        }
    }
    Ok(segments)
}

fn polygon_edges(points: &[DVec2], group_id: u32) -> Vec<Segment> {
    use itertools::Itertools;
    if points.len() < 2 {
        return Vec::new();
    }
    points
        .iter()
        .copied()
        .chain(points.first().copied())
        .tuple_windows()
        .map(|(a, b)| Segment { a, b, group_id })
        .collect()
}

fn triangulate_convex(points: &[DVec2]) -> Result<Vec<Vec<DVec2>>> {
    let flattened: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    let triangulation = earcutr::earcut(&flattened, &[], 2)
        .map_err(|e| PlannerError::ComputationFailed(format!("ear-clipping failed: {e:?}")))?;
    Ok(triangulation
        .chunks(3)
        .filter(|c| c.len() == 3)
        .map(|c| c.iter().map(|&i| points[i]).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Contour {
        Contour {
            points: vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(1.0, 1.0),
                DVec2::new(0.0, 1.0),
            ],
        }
    }

    #[test]
    fn square_without_convex_split_produces_four_edges() {
        let mut config = CoreConfig::default();
        config.split_into_convex = false;
        let segments = build_segments(&[square()], &config).unwrap();
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.group_id == 0));
    }

    #[test]
    fn square_with_convex_split_produces_two_triangles_worth_of_edges() {
        let mut config = CoreConfig::default();
        config.split_into_convex = true;
        let segments = build_segments(&[square()], &config).unwrap();
        assert_eq!(segments.len(), 6);
    }

    #[test]
    fn distinct_contours_get_distinct_group_ids() {
        let mut second = square();
        for p in &mut second.points {
            *p += DVec2::new(5.0, 5.0);
        }
        let config = CoreConfig::default();
        let segments = build_segments(&[square(), second], &config).unwrap();
        let ids: std::collections::HashSet<u32> = segments.iter().map(|s| s.group_id).collect();
        assert_eq!(ids.len(), 2);
    }
}
