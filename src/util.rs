// SPDX-License-Identifier: AGPL-3.0-or-later
//! Small generic helpers shared by the rasteriser, contour tracer and
//! Voronoi builder: a growable bitvector and a coordinate-deduplicating
//! vertex table.

use crate::error::PlannerError;
use ahash::AHashMap;
use vector_traits::glam::DVec2;

/// A `vob::Vob` grows on `set`, instead of panicking on out-of-range bits.
pub(crate) trait GrowingVob {
    fn fill(initial_size: usize) -> vob::Vob<u32>;
    fn set_grow(&mut self, bit: usize, state: bool) -> bool;
    /// get with default value: false
    fn get_f(&self, bit: usize) -> bool;
}

impl GrowingVob for vob::Vob<u32> {
    fn fill(initial_size: usize) -> Self {
        let mut v: vob::Vob<u32> = vob::Vob::<u32>::new_with_storage_type(0);
        v.resize(initial_size, false);
        v
    }

    #[inline]
    fn set_grow(&mut self, bit: usize, state: bool) -> bool {
        if bit >= self.len() {
            self.resize(bit + 512, false);
        }
        self.set(bit, state)
    }

    #[inline]
    fn get_f(&self, bit: usize) -> bool {
        self.get(bit).unwrap_or(false)
    }
}

/// De-duplicates `DVec2` vertices that fall within `eps` of one another,
/// handing back a stable index for every distinct coordinate. Used when
/// stitching Voronoi bisector poly-lines and when walking contours back
/// into point lists, where `eps` is `config.eps_gui_px` so vertices closer
/// than that radius collapse onto the same graph node.
///
/// Quantizes each coordinate to its `eps`-sized grid cell to key the hash
/// map; two points within `eps` of each other but straddling a cell
/// boundary can still land in different buckets, the same approximation
/// every grid-quantized spatial hash makes.
pub(crate) struct VertexDeduplicator2D {
    set: AHashMap<(i64, i64), u32>,
    eps: f64,
    pub vertices: Vec<DVec2>,
}

impl VertexDeduplicator2D {
    pub fn with_capacity(capacity: usize, eps: f64) -> Self {
        Self {
            set: AHashMap::with_capacity(capacity),
            eps: eps.max(f64::MIN_POSITIVE),
            vertices: Vec::with_capacity(capacity),
        }
    }

    fn bucket(&self, value: f64) -> i64 {
        (value / self.eps).round() as i64
    }

    pub fn get_index_or_insert(&mut self, v: DVec2) -> Result<u32, PlannerError> {
        let x = v.x + 0.0;
        let y = v.y + 0.0;
        if !(x.is_finite() && y.is_finite()) {
            return Err(PlannerError::InvalidInputData(format!(
                "non-finite vertex ({x}, {y})"
            )));
        }
        let key = (self.bucket(x), self.bucket(y));
        let index = *self.set.entry(key).or_insert_with(|| {
            let new_index = self.vertices.len() as u32;
            self.vertices.push(v);
            new_index
        });
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_vob_grows_past_initial_size() {
        let mut v = vob::Vob::<u32>::fill(4);
        assert!(v.set_grow(100, true));
        assert!(v.get_f(100));
        assert!(!v.get_f(50));
    }

    #[test]
    fn dedup_returns_same_index_for_identical_vertex() {
        let mut dedup = VertexDeduplicator2D::with_capacity(4, 1e-6);
        let a = dedup.get_index_or_insert(DVec2::new(1.0, 2.0)).unwrap();
        let b = dedup.get_index_or_insert(DVec2::new(1.0, 2.0)).unwrap();
        let c = dedup.get_index_or_insert(DVec2::new(1.0, 2.5)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dedup_merges_vertices_within_eps() {
        let mut dedup = VertexDeduplicator2D::with_capacity(4, 0.01);
        let a = dedup.get_index_or_insert(DVec2::new(1.0, 2.0)).unwrap();
        let b = dedup.get_index_or_insert(DVec2::new(1.002, 2.001)).unwrap();
        let c = dedup.get_index_or_insert(DVec2::new(1.2, 2.0)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dedup_rejects_non_finite() {
        let mut dedup = VertexDeduplicator2D::with_capacity(1, 1e-6);
        assert!(
            dedup
                .get_index_or_insert(DVec2::new(f64::NAN, 0.0))
                .is_err()
        );
    }
}
