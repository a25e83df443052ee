// SPDX-License-Identifier: AGPL-3.0-or-later
//! Geometric primitives attached to axes: a tagged enum
//! (`Box`/`Cylinder`/`Sphere`) rather than a trait-object hierarchy, since
//! every variant's behaviour (trafo, footprint) is a handful of closed-form
//! expressions rather than something a caller extends.

use vector_traits::glam::{DMat4, DVec3};

/// A piece of instrument hardware's shape, in the axis-local frame it is
/// attached to. 2D collision tests only need the object's footprint in its
/// local XY plane, so every variant also knows how to project itself down
/// to a convex polygon (see [`Geometry::footprint_2d`]).
#[derive(Debug, Clone)]
pub enum Geometry {
    Box(BoxGeometry),
    Cylinder(CylinderGeometry),
    Sphere(SphereGeometry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Box,
    Cylinder,
    Sphere,
}

#[derive(Debug, Clone)]
pub struct BoxGeometry {
    pub id: String,
    pub pos1: DVec3,
    pub pos2: DVec3,
    pub height: f64,
    pub depth: f64,
}

#[derive(Debug, Clone)]
pub struct CylinderGeometry {
    pub id: String,
    pub pos: DVec3,
    pub height: f64,
    pub radius: f64,
}

#[derive(Debug, Clone)]
pub struct SphereGeometry {
    pub id: String,
    pub pos: DVec3,
    pub radius: f64,
}

impl Geometry {
    pub fn id(&self) -> &str {
        match self {
            Geometry::Box(g) => &g.id,
            Geometry::Cylinder(g) => &g.id,
            Geometry::Sphere(g) => &g.id,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Box(_) => GeometryKind::Box,
            Geometry::Cylinder(_) => GeometryKind::Cylinder,
            Geometry::Sphere(_) => GeometryKind::Sphere,
        }
    }

    /// Local-frame transform placing the primitive's canonical shape (a unit
    /// box/cylinder/sphere centred appropriately) at its configured position.
    pub fn trafo(&self) -> DMat4 {
        match self {
            Geometry::Box(g) => {
                let centre = (g.pos1 + g.pos2) * 0.5;
                DMat4::from_translation(centre)
            }
            Geometry::Cylinder(g) => DMat4::from_translation(g.pos),
            Geometry::Sphere(g) => DMat4::from_translation(g.pos),
        }
    }

    /// The convex polygon this geometry's footprint occupies when projected
    /// onto the XY plane, in the axis-local frame. Used by the 2D collision
    /// tests.
    pub fn footprint_2d(&self) -> Vec<(f64, f64)> {
        match self {
            Geometry::Box(g) => {
                let length = (g.pos2 - g.pos1).length().max(g.depth);
                let half_len = length * 0.5;
                let half_depth = g.depth * 0.5;
                let centre = (g.pos1 + g.pos2) * 0.5;
                vec![
                    (centre.x - half_len, centre.y - half_depth),
                    (centre.x + half_len, centre.y - half_depth),
                    (centre.x + half_len, centre.y + half_depth),
                    (centre.x - half_len, centre.y + half_depth),
                ]
            }
            Geometry::Cylinder(g) => regular_polygon(g.pos.x, g.pos.y, g.radius, 16),
            Geometry::Sphere(g) => regular_polygon(g.pos.x, g.pos.y, g.radius, 16),
        }
    }
}

/// Approximates a circle of the given radius by a regular `n`-gon, used
/// because the collision tests and convex-decomposition pipeline both
/// expect straight-edged polygons.
fn regular_polygon(cx: f64, cy: f64, radius: f64, n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
            (cx + radius * theta.cos(), cy + radius * theta.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_footprint_has_four_vertices() {
        let g = Geometry::Box(BoxGeometry {
            id: "b1".into(),
            pos1: DVec3::new(0.0, 0.0, 0.0),
            pos2: DVec3::new(1.0, 0.0, 0.0),
            height: 0.2,
            depth: 0.2,
        });
        assert_eq!(g.footprint_2d().len(), 4);
        assert_eq!(g.kind(), GeometryKind::Box);
    }

    #[test]
    fn cylinder_footprint_is_centred_at_its_position() {
        let g = Geometry::Cylinder(CylinderGeometry {
            id: "c1".into(),
            pos: DVec3::new(2.0, 3.0, 0.0),
            height: 1.0,
            radius: 0.5,
        });
        let fp = g.footprint_2d();
        let cx: f64 = fp.iter().map(|p| p.0).sum::<f64>() / fp.len() as f64;
        let cy: f64 = fp.iter().map(|p| p.1).sum::<f64>() / fp.len() as f64;
        assert!((cx - 2.0).abs() < 1e-6);
        assert!((cy - 3.0).abs() < 1e-6);
    }
}
