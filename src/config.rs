// SPDX-License-Identifier: AGPL-3.0-or-later
//! All of the planner's tuning parameters packaged as one struct, passed
//! into the [`crate::orchestrator::Orchestrator`] explicitly rather than
//! read from process-wide globals.

/// Which scattering angle is held fixed by the instrument's monochromator
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatteringMode {
    /// 2θ_M is free, 2θ_A is fixed.
    KfFixed,
    /// 2θ_A is free, 2θ_M is fixed.
    KiFixed,
}

/// Edge-weighting policy for the Voronoi graph search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWeightPolicy {
    /// weight = Euclidean pixel length of the edge.
    Shortest,
    /// weight = length · (1 / mean_clearance(edge))^alpha.
    PenaliseWalls,
}

/// Selects one of the two interchangeable Voronoi construction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoronoiBackend {
    /// Segment-Voronoi construction over the line-segment sites directly.
    SegmentVoronoi,
    /// Point-sampled approximation: every segment is densified into points.
    PointSampled,
}

/// Selects one of the two interchangeable pairwise collision-test backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionTestBackend {
    SweepLine,
    HalfPlane,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourBackend {
    Internal,
}

/// Every tunable parameter the core pipeline consumes. Constructed once by
/// the caller (CLI, future GUI) and threaded through the Orchestrator.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    // -- instrument / kinematics --
    pub scattering_mode: ScatteringMode,
    pub a3_offset_rad: f64,

    // -- rasteriser (4.C) --
    pub angular_step_a2_rad: f64,
    pub angular_step_a4_rad: f64,
    pub raster_padding_rad: f64,
    pub max_worker_threads: usize,
    pub progress_report_every_n_rows: usize,
    pub collision_test_backend: CollisionTestBackend,
    pub collision_eps: f64,

    // -- contour extraction (4.D) --
    pub contour_backend: ContourBackend,
    pub simplify_contours: bool,
    pub douglas_peucker_eps_px: f64,

    // -- line-segment builder (4.E) --
    pub split_into_convex: bool,

    // -- Voronoi builder (4.F) --
    pub voronoi_backend: VoronoiBackend,
    pub point_sample_spacing_px: f64,
    pub use_region_function: bool,
    pub min_dist_to_walls_px: Option<f64>,
    pub eps_voronoi_edge: f64,
    pub eps_gui_px: f64,

    // -- retraction + pathfinder (4.G) --
    pub retraction_k: usize,
    pub try_direct_path: bool,
    pub direct_path_search_radius_rad: f64,
    pub direct_path_weight_a2: f64,
    pub direct_path_weight_a4: f64,
    pub edge_weight_policy: EdgeWeightPolicy,
    pub penalise_walls_alpha: f64,
    pub path_subdivision_steps: usize,
    pub verify_path: bool,

    // -- orchestrator (4.H) --
    pub cache_intermediate_results: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scattering_mode: ScatteringMode::KfFixed,
            a3_offset_rad: 0.0,

            angular_step_a2_rad: 1.0_f64.to_radians(),
            angular_step_a4_rad: 1.0_f64.to_radians(),
            raster_padding_rad: 0.0,
            max_worker_threads: 8,
            progress_report_every_n_rows: 4,
            collision_test_backend: CollisionTestBackend::SweepLine,
            collision_eps: 1e-9,

            contour_backend: ContourBackend::Internal,
            simplify_contours: true,
            douglas_peucker_eps_px: 0.75,

            split_into_convex: true,

            voronoi_backend: VoronoiBackend::SegmentVoronoi,
            point_sample_spacing_px: 2.0,
            use_region_function: true,
            min_dist_to_walls_px: None,
            eps_voronoi_edge: 0.02,
            eps_gui_px: 1e-3,

            retraction_k: 64,
            try_direct_path: true,
            direct_path_search_radius_rad: 5.0_f64.to_radians(),
            direct_path_weight_a2: 1.0,
            direct_path_weight_a4: 1.0,
            edge_weight_policy: EdgeWeightPolicy::Shortest,
            penalise_walls_alpha: 1.0,
            path_subdivision_steps: 0,
            verify_path: true,

            cache_intermediate_results: true,
        }
    }
}

impl CoreConfig {
    /// The worker pool size used by the rasteriser: `min(hw/2, configured_max)`,
    /// never less than 1.
    pub fn resolved_worker_count(&self) -> usize {
        let hw = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (hw / 2).max(1).min(self.max_worker_threads.max(1))
    }

    /// Weighted norm used to compare against `direct_path_search_radius_rad`
    /// (open question resolved in DESIGN.md: weighted, not unweighted sum).
    pub fn weighted_angular_distance(&self, da2: f64, da4: f64) -> f64 {
        ((self.direct_path_weight_a2 * da2).powi(2) + (self.direct_path_weight_a4 * da4).powi(2))
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_at_least_one() {
        let mut cfg = CoreConfig::default();
        cfg.max_worker_threads = 0;
        assert!(cfg.resolved_worker_count() >= 1);
    }

    #[test]
    fn weighted_distance_defaults_to_euclidean() {
        let cfg = CoreConfig::default();
        let d = cfg.weighted_angular_distance(3.0, 4.0);
        assert!((d - 5.0).abs() < 1e-9);
    }
}
