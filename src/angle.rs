// SPDX-License-Identifier: AGPL-3.0-or-later
//! The 2D angular configuration space, and the affine maps between it and
//! the pixel grid the rasteriser and contour tracer operate on.

use crate::error::{PlannerError, Result};
use vector_traits::glam::DVec2;

/// An axis-aligned box in angle space: `[a2_min, a2_max] x [a4_min, a4_max]`,
/// all in radians. Invariant: `min <= max` on both axes (checked by
/// [`AngleBox::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleBox {
    pub a2_min: f64,
    pub a2_max: f64,
    pub a4_min: f64,
    pub a4_max: f64,
}

impl AngleBox {
    pub fn new(a2_min: f64, a2_max: f64, a4_min: f64, a4_max: f64) -> Result<Self> {
        if !(a2_min.is_finite() && a2_max.is_finite() && a4_min.is_finite() && a4_max.is_finite())
        {
            return Err(PlannerError::InvalidConfig(
                "angle box bounds must be finite".into(),
            ));
        }
        if a2_min > a2_max || a4_min > a4_max {
            return Err(PlannerError::InvalidConfig(
                "angle box min must not exceed max on either axis".into(),
            ));
        }
        Ok(Self {
            a2_min,
            a2_max,
            a4_min,
            a4_max,
        })
    }

    pub fn width_a2(&self) -> f64 {
        self.a2_max - self.a2_min
    }

    pub fn width_a4(&self) -> f64 {
        self.a4_max - self.a4_min
    }

    pub fn contains(&self, a2: f64, a4: f64) -> bool {
        a2 >= self.a2_min && a2 <= self.a2_max && a4 >= self.a4_min && a4 <= self.a4_max
    }

    /// Grows the box by `pad` radians on every side, used to give the
    /// rasteriser margin around the region the GUI actually cares about.
    pub fn padded(&self, pad: f64) -> Self {
        Self {
            a2_min: self.a2_min - pad,
            a2_max: self.a2_max + pad,
            a4_min: self.a4_min - pad,
            a4_max: self.a4_max + pad,
        }
    }
}

/// Maps between radian coordinates in an [`AngleBox`] and integer pixel
/// coordinates of an image with the given resolution: pixel x derives from
/// α₄ (the image's width axis), pixel y from α₂ (the image's height axis),
/// flipped to match the raster image's top-left origin.
#[derive(Debug, Clone, Copy)]
pub struct AngularConfig {
    pub bounds: AngleBox,
    pub width_px: u32,
    pub height_px: u32,
}

impl AngularConfig {
    pub fn new(bounds: AngleBox, width_px: u32, height_px: u32) -> Result<Self> {
        if width_px == 0 || height_px == 0 {
            return Err(PlannerError::InvalidConfig(
                "image dimensions must be non-zero".into(),
            ));
        }
        Ok(Self {
            bounds,
            width_px,
            height_px,
        })
    }

    /// Angle-space step covered by one pixel, along each axis. `a2` steps
    /// along the image's height, `a4` along its width.
    pub fn px_step_a2(&self) -> f64 {
        self.bounds.width_a2() / self.height_px as f64
    }

    pub fn px_step_a4(&self) -> f64 {
        self.bounds.width_a4() / self.width_px as f64
    }

    /// Converts an (a2, a4) angle pair, in radians, to a real-valued pixel
    /// coordinate. Does not round or clamp.
    pub fn angle_to_pixel(&self, a2: f64, a4: f64) -> DVec2 {
        let x = (a4 - self.bounds.a4_min) / self.px_step_a4();
        let y = self.height_px as f64 - (a2 - self.bounds.a2_min) / self.px_step_a2();
        DVec2::new(x, y)
    }

    /// Converts a real-valued pixel coordinate back to (a2, a4) radians.
    pub fn pixel_to_angle(&self, px: DVec2) -> (f64, f64) {
        let a4 = self.bounds.a4_min + px.x * self.px_step_a4();
        let a2 = self.bounds.a2_min + (self.height_px as f64 - px.y) * self.px_step_a2();
        (a2, a4)
    }

    /// Nearest integer pixel index for an angle pair, clamped to the image.
    pub fn angle_to_pixel_index(&self, a2: f64, a4: f64) -> (u32, u32) {
        let p = self.angle_to_pixel(a2, a4);
        let x = p.x.round().clamp(0.0, (self.width_px - 1) as f64) as u32;
        let y = p.y.round().clamp(0.0, (self.height_px - 1) as f64) as u32;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> AngularConfig {
        let bounds = AngleBox::new(-1.0, 1.0, -2.0, 2.0).unwrap();
        AngularConfig::new(bounds, 100, 200).unwrap()
    }

    #[test]
    fn angle_box_rejects_inverted_bounds() {
        assert!(AngleBox::new(1.0, -1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn round_trip_angle_pixel_is_stable() {
        let c = cfg();
        let (a2, a4) = (0.25, -0.75);
        let px = c.angle_to_pixel(a2, a4);
        let (a2r, a4r) = c.pixel_to_angle(px);
        assert!((a2 - a2r).abs() < 1e-9);
        assert!((a4 - a4r).abs() < 1e-9);
    }

    #[test]
    fn pixel_index_is_clamped_to_image() {
        let c = cfg();
        let (x, y) = c.angle_to_pixel_index(1000.0, 1000.0);
        assert!(x < c.width_px);
        assert!(y < c.height_px);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_holds_for_any_in_bounds_angle(
            a2 in -0.99_f64..0.99,
            a4 in -1.99_f64..1.99,
        ) {
            let c = cfg();
            let px = c.angle_to_pixel(a2, a4);
            let (a2r, a4r) = c.pixel_to_angle(px);
            proptest::prop_assert!((a2 - a2r).abs() < 1e-9);
            proptest::prop_assert!((a4 - a4r).abs() < 1e-9);
        }
    }
}
