// SPDX-License-Identifier: AGPL-3.0-or-later
//! Traces the boundary between occupied and free pixels in a rasterised
//! [`crate::image::Image`] into polygonal contours, then simplifies each
//! one with the Douglas-Peucker implementation `linestring` already ships
//!

use crate::angle::AngularConfig;
use crate::config::CoreConfig;
use crate::image::Image;
use crate::util::GrowingVob;
use linestring::linestring_2d::LineString2;
use vector_traits::glam::DVec2;
use vob::Vob;

/// A closed polygonal boundary, in pixel coordinates, between one connected
/// occupied region and the free space around it.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<DVec2>,
}

/// The four Moore-neighbourhood directions, in clockwise order starting
/// from "up", used to walk a boundary without revisiting the same crossing
/// twice.
const MOORE_DIRS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Finds every occupied connected component's outer boundary and returns it
/// as a simplified, closed contour in angle-space radians.
pub fn extract_contours(image: &Image, config: &CoreConfig) -> Vec<Contour> {
    let width = image.width();
    let height = image.height();
    let mut visited = Vob::<u32>::fill(width as usize * height as usize);

    let mut contours = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let idx = (y as usize) * width as usize + x as usize;
            if !image.get(x, y) || visited.get_f(idx) {
                continue;
            }
            if !is_boundary_pixel(image, x, y) {
                visited.set_grow(idx, true);
                continue;
            }
            let raw = trace_boundary(image, &mut visited, x, y);
            if raw.len() < 3 {
                continue;
            }
            let points: Vec<DVec2> = raw
                .iter()
                .map(|&(px, py)| pixel_to_angle_point(&image.config, px, py))
                .collect();
            let points = if config.simplify_contours {
                simplify(&points, config.douglas_peucker_eps_px * angle_scale(&image.config))
            } else {
                points
            };
            contours.push(Contour { points });
        }
    }
    contours
}

fn angle_scale(config: &AngularConfig) -> f64 {
    config.px_step_a2().max(config.px_step_a4())
}

fn pixel_to_angle_point(config: &AngularConfig, x: u32, y: u32) -> DVec2 {
    let (a2, a4) = config.pixel_to_angle(DVec2::new(x as f64, y as f64));
    DVec2::new(a2, a4)
}

fn is_boundary_pixel(image: &Image, x: u32, y: u32) -> bool {
    for (dx, dy) in MOORE_DIRS {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 0 || ny < 0 || nx >= image.width() as i32 || ny >= image.height() as i32 {
            return true;
        }
        if !image.get(nx as u32, ny as u32) {
            return true;
        }
    }
    false
}

/// Moore-neighbour tracing: walks clockwise around an occupied region's
/// boundary, starting from its top-left-most occupied pixel, marking every
/// boundary pixel visited so outer loops are each traced exactly once.
fn trace_boundary(image: &Image, visited: &mut Vob<u32>, start_x: u32, start_y: u32) -> Vec<(u32, u32)> {
    let width = image.width();
    let mark = |visited: &mut Vob<u32>, x: u32, y: u32| {
        visited.set_grow(y as usize * width as usize + x as usize, true);
    };

    let mut boundary = vec![(start_x, start_y)];
    mark(visited, start_x, start_y);

    let mut current = (start_x as i32, start_y as i32);
    let mut backtrack_dir = 0usize;
    loop {
        let mut found = None;
        for step in 0..8 {
            let dir_idx = (backtrack_dir + step) % 8;
            let (dx, dy) = MOORE_DIRS[dir_idx];
            let nx = current.0 + dx;
            let ny = current.1 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= image.height() as i32 {
                continue;
            }
            if image.get(nx as u32, ny as u32) && is_boundary_pixel(image, nx as u32, ny as u32) {
                found = Some((nx, ny, dir_idx));
                break;
            }
        }
        match found {
            Some((nx, ny, dir_idx)) => {
                mark(visited, nx as u32, ny as u32);
                boundary.push((nx as u32, ny as u32));
                backtrack_dir = (dir_idx + 5) % 8;
                current = (nx, ny);
                if current == (start_x as i32, start_y as i32) || boundary.len() > width as usize * image.height() as usize {
                    break;
                }
            }
            None => break,
        }
    }
    boundary
}

fn simplify(points: &[DVec2], eps: f64) -> Vec<DVec2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let line: LineString2<DVec2> = points.iter().copied().collect();
    let simplified = line.simplify_rdp(eps);
    simplified.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::AngleBox;

    fn make_square_image() -> Image {
        let bounds = AngleBox::new(-1.0, 1.0, -1.0, 1.0).unwrap();
        let mut img = Image::new(AngularConfig::new(bounds, 16, 16).unwrap());
        for y in 4..12 {
            for x in 4..12 {
                img.set(x, y, true);
            }
        }
        img
    }

    #[test]
    fn extracts_one_contour_from_a_single_solid_block() {
        let img = make_square_image();
        let config = CoreConfig::default();
        let contours = extract_contours(&img, &config);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].points.len() >= 3);
    }

    #[test]
    fn empty_image_yields_no_contours() {
        let bounds = AngleBox::new(-1.0, 1.0, -1.0, 1.0).unwrap();
        let img = Image::new(AngularConfig::new(bounds, 8, 8).unwrap());
        let contours = extract_contours(&img, &CoreConfig::default());
        assert!(contours.is_empty());
    }
}
