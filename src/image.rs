// SPDX-License-Identifier: AGPL-3.0-or-later
//! The rasterised configuration-space image: one bit per pixel, set when
//! the instrument collides at that (a2, a4) configuration.

use crate::angle::AngularConfig;
use crate::error::{PlannerError, Result};
use crate::util::GrowingVob;
use vector_traits::glam::DVec2;
use vob::Vob;

/// A dense bitmap over the angular grid defined by `config`, plus the affine
/// map needed to convert back and forth between pixels and angles.
#[derive(Debug, Clone)]
pub struct Image {
    pub config: AngularConfig,
    occupied: Vob<u32>,
}

impl Image {
    pub fn new(config: AngularConfig) -> Self {
        let n = config.width_px as usize * config.height_px as usize;
        Self {
            config,
            occupied: Vob::fill(n),
        }
    }

    pub fn width(&self) -> u32 {
        self.config.width_px
    }

    pub fn height(&self) -> u32 {
        self.config.height_px
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.config.width_px as usize + x as usize
    }

    pub fn set(&mut self, x: u32, y: u32, occupied: bool) {
        let idx = self.index(x, y);
        self.occupied.set_grow(idx, occupied);
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.occupied.get_f(self.index(x, y))
    }

    pub fn set_angle(&mut self, a2: f64, a4: f64, occupied: bool) {
        let (x, y) = self.config.angle_to_pixel_index(a2, a4);
        self.set(x, y, occupied);
    }

    pub fn get_angle(&self, a2: f64, a4: f64) -> bool {
        let (x, y) = self.config.angle_to_pixel_index(a2, a4);
        self.get(x, y)
    }

    /// Writes one row's worth of occupancy, used by the rasteriser to hand
    /// back a whole scan-line from a worker in one call.
    pub fn set_row(&mut self, y: u32, row: &[bool]) {
        for (x, &occ) in row.iter().enumerate() {
            self.set(x as u32, y, occ);
        }
    }

    pub fn row(&self, y: u32) -> Vec<bool> {
        (0..self.config.width_px).map(|x| self.get(x, y)).collect()
    }

    /// Nearest pixel centre in angle space, used when seeding contour
    /// tracing from a pixel coordinate.
    pub fn pixel_centre_angle(&self, x: u32, y: u32) -> (f64, f64) {
        self.config
            .pixel_to_angle(DVec2::new(x as f64 + 0.5, y as f64 + 0.5))
    }

    /// Every occupied pixel's centre, in angle space, for building a
    /// distance-to-nearest-wall index over the rasterised forbidden region.
    pub fn forbidden_points(&self) -> Vec<DVec2> {
        let mut out = Vec::new();
        for y in 0..self.config.height_px {
            for x in 0..self.config.width_px {
                if self.get(x, y) {
                    let (a2, a4) = self.pixel_centre_angle(x, y);
                    out.push(DVec2::new(a2, a4));
                }
            }
        }
        out
    }

    /// Packs the occupancy bitmap into bytes (MSB-first within each byte),
    /// for the cheap serialised cache the orchestrator keeps between runs.
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let n = self.config.width_px as usize * self.config.height_px as usize;
        let mut out = vec![0u8; n.div_ceil(8)];
        for i in 0..n {
            if self.occupied.get_f(i) {
                out[i / 8] |= 1 << (i % 8);
            }
        }
        out
    }

    pub fn from_packed_bytes(config: AngularConfig, bytes: &[u8]) -> Result<Self> {
        let n = config.width_px as usize * config.height_px as usize;
        if bytes.len() < n.div_ceil(8) {
            return Err(PlannerError::InvalidInputData(
                "packed image buffer too short for its declared dimensions".into(),
            ));
        }
        let mut occupied = Vob::fill(n);
        for i in 0..n {
            let bit = (bytes[i / 8] >> (i % 8)) & 1 != 0;
            occupied.set_grow(i, bit);
        }
        Ok(Self { config, occupied })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::AngleBox;

    fn small_image() -> Image {
        let bounds = AngleBox::new(-1.0, 1.0, -1.0, 1.0).unwrap();
        Image::new(AngularConfig::new(bounds, 8, 8).unwrap())
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut img = small_image();
        img.set(3, 4, true);
        assert!(img.get(3, 4));
        assert!(!img.get(3, 5));
    }

    #[test]
    fn pack_unpack_round_trip_preserves_occupancy() {
        let mut img = small_image();
        img.set(0, 0, true);
        img.set(7, 7, true);
        let bytes = img.to_packed_bytes();
        let restored = Image::from_packed_bytes(img.config, &bytes).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(img.get(x, y), restored.get(x, y));
            }
        }
    }

    #[test]
    fn from_packed_bytes_rejects_short_buffer() {
        let img = small_image();
        assert!(Image::from_packed_bytes(img.config, &[0u8; 1]).is_err());
    }
}
