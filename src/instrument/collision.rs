// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pairwise 2D collision tests between convex polygon footprints,
//! plus the id-pair whitelist that lets adjacent, permanently touching
//! components opt out of the check. Walks every component pair on each
//! call rather than keeping a persistent BVH; the instrument's component
//! counts are small enough that this isn't a real cost.

use ahash::AHashSet;
use vector_traits::glam::DVec2;

/// An unordered pair of component ids exempted from collision testing,
/// e.g. a sample holder and the sample table it always rests on.
#[derive(Debug, Clone, Default)]
pub struct CollisionWhitelist {
    pairs: AHashSet<(String, String)>,
}

impl CollisionWhitelist {
    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn allow(&mut self, a: &str, b: &str) {
        self.pairs.insert(Self::key(a, b));
    }

    pub fn is_allowed(&self, a: &str, b: &str) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }
}

/// Tests whether two convex polygons, given as ordered vertex lists in a
/// shared 2D frame, overlap. Dispatches to one of the two interchangeable
/// backends selected by [`crate::config::CollisionTestBackend`]; both must
/// agree up to floating-point tolerance on well-separated or clearly
/// overlapping inputs (an Open Question resolved in DESIGN.md).
pub fn polygons_collide(
    a: &[(f64, f64)],
    b: &[(f64, f64)],
    backend: crate::config::CollisionTestBackend,
    eps: f64,
) -> bool {
    match backend {
        crate::config::CollisionTestBackend::HalfPlane => half_plane_overlap(a, b, eps),
        crate::config::CollisionTestBackend::SweepLine => sweep_line_overlap(a, b, eps),
    }
}

/// Separating Axis Theorem: two convex polygons are disjoint iff some edge
/// normal of either polygon separates their projections.
fn half_plane_overlap(a: &[(f64, f64)], b: &[(f64, f64)], eps: f64) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    for poly in [a, b] {
        for edge in edges(poly) {
            let axis = edge_normal(edge);
            let (amin, amax) = project(a, axis);
            let (bmin, bmax) = project(b, axis);
            if amax + eps < bmin || bmax + eps < amin {
                return false;
            }
        }
    }
    true
}

/// Equivalent overlap test phrased as a sweep over both polygons' edges
/// looking for a segment-segment intersection or containment, rather than
/// a separating axis.
fn sweep_line_overlap(a: &[(f64, f64)], b: &[(f64, f64)], eps: f64) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    for ea in edges(a) {
        for eb in edges(b) {
            if segments_intersect(ea, eb, eps) {
                return true;
            }
        }
    }
    point_in_convex_polygon(a[0], b, eps) || point_in_convex_polygon(b[0], a, eps)
}

fn edges(poly: &[(f64, f64)]) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
    use itertools::Itertools;
    poly.iter()
        .copied()
        .chain(poly.first().copied())
        .tuple_windows()
}

fn edge_normal(edge: ((f64, f64), (f64, f64))) -> DVec2 {
    let d = DVec2::new(edge.1.0 - edge.0.0, edge.1.1 - edge.0.1);
    DVec2::new(-d.y, d.x).normalize_or_zero()
}

fn project(poly: &[(f64, f64)], axis: DVec2) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &(x, y) in poly {
        let d = DVec2::new(x, y).dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

pub(crate) fn segments_intersect(
    p: ((f64, f64), (f64, f64)),
    q: ((f64, f64), (f64, f64)),
    eps: f64,
) -> bool {
    let d1 = cross(p.0, p.1, q.0);
    let d2 = cross(p.0, p.1, q.1);
    let d3 = cross(q.0, q.1, p.0);
    let d4 = cross(q.0, q.1, p.1);
    ((d1 > eps && d2 < -eps) || (d1 < -eps && d2 > eps))
        && ((d3 > eps && d4 < -eps) || (d3 < -eps && d4 > eps))
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn point_in_convex_polygon(p: (f64, f64), poly: &[(f64, f64)], eps: f64) -> bool {
    let mut sign = 0.0_f64;
    for edge in edges(poly) {
        let c = cross(edge.0, edge.1, p);
        if c.abs() < eps {
            continue;
        }
        if sign == 0.0 {
            sign = c.signum();
        } else if c.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionTestBackend;

    fn square(cx: f64, cy: f64, half: f64) -> Vec<(f64, f64)> {
        vec![
            (cx - half, cy - half),
            (cx + half, cy - half),
            (cx + half, cy + half),
            (cx - half, cy + half),
        ]
    }

    #[test]
    fn overlapping_squares_collide_on_both_backends() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.5, 1.0);
        assert!(polygons_collide(&a, &b, CollisionTestBackend::HalfPlane, 1e-9));
        assert!(polygons_collide(&a, &b, CollisionTestBackend::SweepLine, 1e-9));
    }

    #[test]
    fn disjoint_squares_do_not_collide_on_either_backend() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(10.0, 10.0, 1.0);
        assert!(!polygons_collide(&a, &b, CollisionTestBackend::HalfPlane, 1e-9));
        assert!(!polygons_collide(&a, &b, CollisionTestBackend::SweepLine, 1e-9));
    }

    #[test]
    fn whitelist_is_symmetric() {
        let mut wl = CollisionWhitelist::default();
        wl.allow("sample_table", "sample_holder");
        assert!(wl.is_allowed("sample_holder", "sample_table"));
        assert!(!wl.is_allowed("sample_holder", "wall"));
    }
}
