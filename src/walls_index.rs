// SPDX-License-Identifier: AGPL-3.0-or-later
//! A static k-d tree over forbidden-pixel sites, built once per rasterised
//! image and queried repeatedly during path verification for
//! distance-to-nearest-wall, instead of scanning every pixel per query.
//! Coordinates are read through `krakel::PointTrait`, the same point
//! abstraction every geometry helper in this crate's ancestry uses.

use krakel::PointTrait;
use vector_traits::glam::DVec2;

enum Node {
    Leaf,
    Split {
        point: DVec2,
        split_on_y: bool,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Nearest-neighbour index over a fixed point set. Rebuilt whenever the
/// rasterised image changes; never mutated in place.
pub struct WallsIndex {
    root: Node,
    len: usize,
}

impl WallsIndex {
    pub fn build(points: Vec<DVec2>) -> Self {
        let len = points.len();
        Self {
            root: Self::build_node(points, 0),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn build_node(mut points: Vec<DVec2>, depth: usize) -> Node {
        if points.is_empty() {
            return Node::Leaf;
        }
        let split_on_y = depth % 2 == 1;
        points.sort_by(|a, b| {
            let (ka, kb) = if split_on_y {
                (a.y(), b.y())
            } else {
                (a.x(), b.x())
            };
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = points.len() / 2;
        let point = points[mid];
        let right_points = points.split_off(mid + 1);
        let mut left_points = points;
        left_points.truncate(mid);
        Node::Split {
            point,
            split_on_y,
            left: Box::new(Self::build_node(left_points, depth + 1)),
            right: Box::new(Self::build_node(right_points, depth + 1)),
        }
    }

    /// The nearest indexed point to `query` and its Euclidean distance, or
    /// `None` if the index is empty.
    pub fn nearest(&self, query: DVec2) -> Option<(DVec2, f64)> {
        let mut best: Option<(DVec2, f64)> = None;
        Self::nearest_in(&self.root, query, &mut best);
        best
    }

    fn nearest_in(node: &Node, query: DVec2, best: &mut Option<(DVec2, f64)>) {
        let Node::Split { point, split_on_y, left, right } = node else {
            return;
        };
        let d = query.distance(*point);
        if best.is_none_or(|(_, bd)| d < bd) {
            *best = Some((*point, d));
        }
        let (qk, pk) = if *split_on_y {
            (query.y(), point.y())
        } else {
            (query.x(), point.x())
        };
        let (near, far) = if qk < pk { (left, right) } else { (right, left) };
        Self::nearest_in(near, query, best);
        if best.is_none_or(|(_, bd)| (qk - pk).abs() < bd) {
            Self::nearest_in(far, query, best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_has_no_nearest() {
        let index = WallsIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.nearest(DVec2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn nearest_finds_the_closest_of_several_points() {
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(-5.0, 3.0),
        ];
        let index = WallsIndex::build(points);
        let (nearest, dist) = index.nearest(DVec2::new(0.9, 0.9)).unwrap();
        assert_eq!(nearest, DVec2::new(1.0, 1.0));
        assert!((dist - 0.1_f64 * std::f64::consts::SQRT_2).abs() < 1e-9);
    }
}
