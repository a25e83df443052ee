// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scans the angular grid row by row on a bounded rayon worker pool,
//! cloning the instrument once per worker so no two threads mutate the same
//! kinematic state, and collision-testing every pixel against both the
//! instrument's own components and the static walls.

use crate::config::CoreConfig;
use crate::error::Result;
use crate::image::Image;
use crate::instrument::InstrumentSpace;
use crate::progress::ProgressSink;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Computes the occupancy [`Image`] for the instrument's reachable angular
/// range, padded per `config.raster_padding_rad`. Returns `Err` only on
/// cancellation or a configuration error raised while stamping a row;
/// collisions are not errors, they are what's being mapped.
pub fn rasterise(
    space: &InstrumentSpace,
    config: &CoreConfig,
    progress: &dyn ProgressSink,
) -> Result<Image> {
    let bounds = angle_bounds(space, config)?;
    let angular = crate::angle::AngularConfig::new(
        bounds,
        grid_width(&bounds, config),
        grid_height(&bounds, config),
    )?;
    let mut image = Image::new(angular);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.resolved_worker_count())
        .build()
        .map_err(|e| crate::error::PlannerError::Internal(e.to_string()))?;

    let height = angular.height_px;
    let rows_done = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);

    let rows: Vec<(u32, Vec<bool>)> = pool.install(|| {
        (0..height)
            .into_par_iter()
            .map(|y| {
                if cancelled.load(Ordering::Relaxed) || progress.is_cancelled() {
                    cancelled.store(true, Ordering::Relaxed);
                    return (y, Vec::new());
                }
                let mut worker_space = space.clone();
                let row = rasterise_row(&mut worker_space, &angular, y);
                let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
                if done % config.progress_report_every_n_rows.max(1) == 0 {
                    progress.report(done as f64 / height as f64);
                }
                (y, row)
            })
            .collect()
    });

    if cancelled.into_inner() {
        return Err(crate::error::PlannerError::Cancelled);
    }

    for (y, row) in rows {
        image.set_row(y, &row);
    }
    progress.report(1.0);
    Ok(image)
}

/// A pixel is forbidden when the instrument is out of its angular limits at
/// that configuration, or (if within limits) when it collides with itself
/// or a wall there.
fn rasterise_row(space: &mut InstrumentSpace, angular: &crate::angle::AngularConfig, y: u32) -> Vec<bool> {
    use vector_traits::glam::DVec2;
    (0..angular.width_px)
        .map(|x| {
            let (a2, a4) = angular.pixel_to_angle(DVec2::new(x as f64 + 0.5, y as f64 + 0.5));
            !space.instrument.check_angular_limits(a2, a4)
                || space.instrument.set_configuration(a2, a4).is_err()
                || space.check_collision_2d()
        })
        .collect()
}

fn angle_bounds(
    space: &InstrumentSpace,
    config: &CoreConfig,
) -> Result<crate::angle::AngleBox> {
    let (a2_min, a2_max) = axis_limits(space, config, true);
    let (a4_min, a4_max) = axis_limits(space, config, false);
    crate::angle::AngleBox::new(a2_min, a2_max, a4_min, a4_max)
        .map(|b| b.padded(config.raster_padding_rad))
}

fn axis_limits(space: &InstrumentSpace, _config: &CoreConfig, is_mono: bool) -> (f64, f64) {
    let axis_idx = if is_mono {
        space.instrument.mono_axis
    } else {
        space.instrument.sample_axis
    };
    match axis_idx.map(|idx| space.instrument.axis(idx)) {
        Some(axis) => (
            axis.angle_out_limits.lower.unwrap_or(-std::f64::consts::PI),
            axis.angle_out_limits.upper.unwrap_or(std::f64::consts::PI),
        ),
        None => (-std::f64::consts::PI, std::f64::consts::PI),
    }
}

/// The image's width tracks α₄, its height α₂, matching
/// [`crate::angle::AngularConfig`]'s pixel-axis convention.
fn grid_width(bounds: &crate::angle::AngleBox, config: &CoreConfig) -> u32 {
    ((bounds.width_a4() / config.angular_step_a4_rad).ceil() as u32).max(2)
}

fn grid_height(bounds: &crate::angle::AngleBox, config: &CoreConfig) -> u32 {
    ((bounds.width_a2() / config.angular_step_a2_rad).ceil() as u32).max(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScatteringMode;
    use crate::instrument::{Axis, Instrument};
    use crate::progress::NullProgress;

    #[test]
    fn rasterise_produces_an_image_matching_the_configured_grid() {
        let mut instr = Instrument::new(ScatteringMode::KfFixed, 0.0);
        let mono = instr.add_axis(Axis::new("mono"));
        instr.mono_axis = Some(mono);
        let sample = instr.add_axis(Axis::new("sample"));
        instr.sample_axis = Some(sample);
        let space = InstrumentSpace::new(instr);

        let mut config = CoreConfig::default();
        config.angular_step_a2_rad = 0.5;
        config.angular_step_a4_rad = 0.5;
        config.max_worker_threads = 2;

        let image = rasterise(&space, &config, &NullProgress).unwrap();
        assert_eq!(image.width(), grid_width(&angle_bounds(&space, &config).unwrap(), &config));
        assert_eq!(image.height(), grid_height(&angle_bounds(&space, &config).unwrap(), &config));
    }
}
