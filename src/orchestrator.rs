// SPDX-License-Identifier: AGPL-3.0-or-later
//! Drives the rasterise -> trace -> build-segments -> build-GVD pipeline and
//! caches its result behind a `mesh_valid` latch, invalidated whenever the
//! instrument reports a geometry change through its update signal. Progress
//! for each stage is pushed over a `crossbeam_channel` so a caller can drive
//! a progress bar without polling.

use crate::config::CoreConfig;
use crate::contour::{self, Contour};
use crate::error::{PlannerError, Result};
use crate::instrument::InstrumentSpace;
use crate::pathfind::{self, PlannedPath};
use crate::progress::{CancellationToken, ChannelProgress, PipelineStage, ProgressEvent, ProgressSink};
use crate::raster;
use crate::segments::{self, Segment};
use crate::voronoi::{self, VoronoiGraph};
use crate::walls_index::WallsIndex;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vector_traits::glam::DVec2;

/// Everything the pipeline produces up to and including the Voronoi graph,
/// kept around so `find_path` can be called repeatedly without recomputing
/// it, and invalidated as a whole on any instrument change.
struct PathMesh {
    contours: Vec<Contour>,
    segments: Vec<Segment>,
    graph: VoronoiGraph,
    walls_index: WallsIndex,
}

/// Owns the instrument, its tuning configuration, and the cached path mesh.
/// This is the crate's main entry point: construct one, call
/// `update_path_mesh` once per instrument change, then `find_path` as many
/// times as needed.
pub struct Orchestrator {
    pub space: InstrumentSpace,
    pub config: CoreConfig,
    mesh: Option<PathMesh>,
    mesh_valid: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Registers an [`InstrumentSpace::on_update`] slot that invalidates the
    /// cached mesh on every wall/geometry change, so a caller that forgets to
    /// call [`Self::invalidate`] by hand after editing `space` still gets a
    /// fresh mesh on the next `update_path_mesh`.
    pub fn new(mut space: InstrumentSpace, config: CoreConfig) -> Self {
        let mesh_valid = Arc::new(AtomicBool::new(false));
        let flag = mesh_valid.clone();
        space.on_update(Box::new(move || {
            flag.store(false, Ordering::SeqCst);
        }));
        Self {
            space,
            config,
            mesh: None,
            mesh_valid,
        }
    }

    /// Marks the cached path mesh stale. Also called automatically whenever
    /// `space` emits its update signal.
    pub fn invalidate(&mut self) {
        self.mesh_valid.store(false, Ordering::SeqCst);
    }

    pub fn mesh_is_valid(&self) -> bool {
        self.mesh_valid.load(Ordering::SeqCst)
    }

    /// Runs the full rasterise/trace/segment/GVD pipeline, reporting
    /// progress over `events` and honouring cancellation via `token`.
    /// Subsequent calls to [`Self::find_path`] reuse the result until the
    /// next `update_path_mesh` or [`Self::invalidate`] call.
    pub fn update_path_mesh(
        &mut self,
        events: Sender<ProgressEvent>,
        token: &CancellationToken,
    ) -> Result<()> {
        let raster_progress = ChannelProgress::new(PipelineStage::Rasterising, events, token.inner());

        let image = raster::rasterise(&self.space, &self.config, &raster_progress)?;
        if token.is_cancelled() {
            return Err(PlannerError::Cancelled);
        }

        let contour_progress = raster_progress.for_stage(PipelineStage::TracingContours);
        contour_progress.report(0.0);
        let contours = contour::extract_contours(&image, &self.config);
        contour_progress.report(1.0);

        let segs = segments::build_segments(&contours, &self.config)?;

        let voronoi_progress = raster_progress.for_stage(PipelineStage::BuildingVoronoiDiagram);
        voronoi_progress.report(0.0);
        let graph = voronoi::build_voronoi_graph(&segs, &self.config)?;
        voronoi_progress.report(1.0);

        let walls_index = WallsIndex::build(image.forbidden_points());

        self.mesh = Some(PathMesh {
            contours,
            segments: segs,
            graph,
            walls_index,
        });
        self.mesh_valid.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Convenience wrapper for callers that don't need progress/cancellation
    /// hookup, used directly by the CLI and by tests.
    pub fn update_path_mesh_blocking(&mut self) -> Result<()> {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let token = CancellationToken::new();
        self.update_path_mesh(tx, &token)
    }

    pub fn contours(&self) -> Result<&[Contour]> {
        self.mesh
            .as_ref()
            .filter(|_| self.mesh_is_valid())
            .map(|m| m.contours.as_slice())
            .ok_or(PlannerError::MeshNotValid)
    }

    /// Finds a path between two angular configurations using the cached
    /// Voronoi graph. Returns [`PlannerError::MeshNotValid`] if
    /// `update_path_mesh` hasn't run since the last invalidation.
    pub fn find_path(&self, start: DVec2, end: DVec2) -> Result<PlannedPath> {
        let mesh = self
            .mesh
            .as_ref()
            .filter(|_| self.mesh_is_valid())
            .ok_or(PlannerError::MeshNotValid)?;
        pathfind::find_path(
            &mesh.graph,
            start,
            end,
            &mesh.contours,
            Some(&mesh.walls_index),
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScatteringMode;
    use crate::instrument::{Axis, Instrument};

    fn orchestrator() -> Orchestrator {
        let mut instr = Instrument::new(ScatteringMode::KfFixed, 0.0);
        let mono = instr.add_axis(Axis::new("mono"));
        instr.mono_axis = Some(mono);
        let sample = instr.add_axis(Axis::new("sample"));
        instr.sample_axis = Some(sample);
        let space = InstrumentSpace::new(instr);
        let mut config = CoreConfig::default();
        config.angular_step_a2_rad = 0.4;
        config.angular_step_a4_rad = 0.4;
        config.max_worker_threads = 2;
        Orchestrator::new(space, config)
    }

    #[test]
    fn find_path_before_update_path_mesh_fails() {
        let orch = orchestrator();
        assert!(orch.find_path(DVec2::ZERO, DVec2::new(0.1, 0.1)).is_err());
    }

    #[test]
    fn update_path_mesh_then_direct_path_succeeds() {
        let mut orch = orchestrator();
        orch.update_path_mesh_blocking().unwrap();
        assert!(orch.mesh_is_valid());
        let path = orch.find_path(DVec2::ZERO, DVec2::new(0.01, 0.01)).unwrap();
        assert!(path.points.len() >= 2);
    }

    #[test]
    fn invalidate_forces_mesh_not_valid() {
        let mut orch = orchestrator();
        orch.update_path_mesh_blocking().unwrap();
        orch.invalidate();
        assert!(orch.find_path(DVec2::ZERO, DVec2::new(0.01, 0.01)).is_err());
    }
}
