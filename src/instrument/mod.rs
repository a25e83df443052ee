// SPDX-License-Identifier: AGPL-3.0-or-later
//! The instrument kinematic model and 2D collision detector: a chain of
//! `Axis` stages (monochromator, sample, analyser) each carrying its own
//! geometry. Axes are stored in a flat arena and referenced by index rather
//! than raw `prev`/`next` pointers, so the whole model stays trivially
//! `Clone` for the rasteriser's per-worker copies.

pub mod collision;
pub mod signals;

use crate::config::{CollisionTestBackend, ScatteringMode};
use crate::error::{PlannerError, Result};
use crate::geometry::Geometry;
use collision::CollisionWhitelist;
use signals::UpdateSignal;
use vector_traits::glam::{DMat4, DVec2, DVec3};

pub type AxisIndex = usize;

/// Which of an axis's three angles a component or child axis is measured
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAngleKind {
    Incoming,
    Internal,
    Outgoing,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AngleLimits {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl AngleLimits {
    pub fn clamp(&self, angle: f64) -> f64 {
        let mut a = angle;
        if let Some(lo) = self.lower {
            a = a.max(lo);
        }
        if let Some(hi) = self.upper {
            a = a.min(hi);
        }
        a
    }

    pub fn contains(&self, angle: f64) -> bool {
        self.lower.is_none_or(|lo| angle >= lo) && self.upper.is_none_or(|hi| angle <= hi)
    }
}

/// One rotation stage of the instrument (monochromator, sample, or
/// analyser turntable), carrying its own geometry at each of the three
/// reference frames: incoming beam, internal (crystal/sample) rotation,
/// and outgoing beam.
#[derive(Debug, Clone)]
pub struct Axis {
    pub id: String,
    pub prev: Option<AxisIndex>,
    pub next: Option<AxisIndex>,
    pub zero_pos: DVec2,

    pub angle_in: f64,
    pub angle_out: f64,
    pub angle_internal: f64,

    pub angle_in_limits: AngleLimits,
    pub angle_out_limits: AngleLimits,
    pub angle_internal_limits: AngleLimits,

    pub comps_in: Vec<Geometry>,
    pub comps_out: Vec<Geometry>,
    pub comps_internal: Vec<Geometry>,
}

impl Axis {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prev: None,
            next: None,
            zero_pos: DVec2::ZERO,
            angle_in: 0.0,
            angle_out: 0.0,
            angle_internal: 0.0,
            angle_in_limits: AngleLimits::default(),
            angle_out_limits: AngleLimits::default(),
            angle_internal_limits: AngleLimits::default(),
            comps_in: Vec::new(),
            comps_out: Vec::new(),
            comps_internal: Vec::new(),
        }
    }

    pub fn angle(&self, which: AxisAngleKind) -> f64 {
        match which {
            AxisAngleKind::Incoming => self.angle_in,
            AxisAngleKind::Internal => self.angle_internal,
            AxisAngleKind::Outgoing => self.angle_out,
        }
    }

    pub fn set_angle(&mut self, which: AxisAngleKind, angle: f64) {
        match which {
            AxisAngleKind::Incoming => self.angle_in = self.angle_in_limits.clamp(angle),
            AxisAngleKind::Internal => self.angle_internal = self.angle_internal_limits.clamp(angle),
            AxisAngleKind::Outgoing => self.angle_out = self.angle_out_limits.clamp(angle),
        }
    }

    pub fn comps(&self, which: AxisAngleKind) -> &[Geometry] {
        match which {
            AxisAngleKind::Incoming => &self.comps_in,
            AxisAngleKind::Internal => &self.comps_internal,
            AxisAngleKind::Outgoing => &self.comps_out,
        }
    }

    /// Local rotation matrix taking this axis's canonical frame to its
    /// current position: translate to `zero_pos`, then rotate by the
    /// selected angle.
    pub fn trafo(&self, which: AxisAngleKind) -> DMat4 {
        DMat4::from_translation(self.zero_pos.extend(0.0))
            * DMat4::from_rotation_z(self.angle(which))
    }
}

/// The kinematic chain: an arena of axes plus the coupling between 2θ_S
/// (`a4`) and the crystal angle α₃, held fixed at `a4/2 + a3_offset` unless
/// explicitly overridden (Open Question resolved in DESIGN.md).
#[derive(Debug, Clone)]
pub struct Instrument {
    pub axes: Vec<Axis>,
    pub mono_axis: Option<AxisIndex>,
    pub sample_axis: Option<AxisIndex>,
    pub ana_axis: Option<AxisIndex>,
    pub scattering_mode: ScatteringMode,
    pub a3_offset: f64,
}

impl Instrument {
    pub fn new(scattering_mode: ScatteringMode, a3_offset: f64) -> Self {
        Self {
            axes: Vec::new(),
            mono_axis: None,
            sample_axis: None,
            ana_axis: None,
            scattering_mode,
            a3_offset,
        }
    }

    pub fn add_axis(&mut self, axis: Axis) -> AxisIndex {
        self.axes.push(axis);
        self.axes.len() - 1
    }

    pub fn axis(&self, idx: AxisIndex) -> &Axis {
        &self.axes[idx]
    }

    pub fn axis_mut(&mut self, idx: AxisIndex) -> &mut Axis {
        &mut self.axes[idx]
    }

    /// The world-frame transform of axis `idx`'s `which` frame: its own
    /// local `trafo`, chained onto its predecessor's outgoing transform so
    /// a downstream axis moves with every upstream axis ahead of it.
    pub fn get_transform(&self, idx: AxisIndex, which: AxisAngleKind) -> DMat4 {
        let axis = self.axis(idx);
        let prev_trafo = match axis.prev {
            Some(prev_idx) => self.get_transform(prev_idx, AxisAngleKind::Outgoing),
            None => DMat4::IDENTITY,
        };
        prev_trafo * axis.trafo(which)
    }

    /// Moves the instrument to the given (a2, a4) configuration, re-coupling
    /// the sample axis's internal angle (α₃) from a4 as the kinematics
    /// require.
    pub fn set_configuration(&mut self, a2: f64, a4: f64) -> Result<()> {
        let mono = self
            .mono_axis
            .ok_or_else(|| PlannerError::InvalidConfig("no monochromator axis set".into()))?;
        let sample = self
            .sample_axis
            .ok_or_else(|| PlannerError::InvalidConfig("no sample axis set".into()))?;
        self.axis_mut(mono).set_angle(AxisAngleKind::Outgoing, a2);
        self.axis_mut(sample)
            .set_angle(AxisAngleKind::Outgoing, a4);
        let a3 = a4 / 2.0 + self.a3_offset;
        self.axis_mut(sample)
            .set_angle(AxisAngleKind::Internal, a3);
        Ok(())
    }

    /// True if `(a2, a4)` (and the α₃ it couples to) falls within every
    /// limit-bearing axis's configured range. Checked against the requested
    /// angles directly, since [`Axis::set_angle`] clamps rather than
    /// rejects, and a clamped angle would otherwise always read as in-range.
    pub fn check_angular_limits(&self, a2: f64, a4: f64) -> bool {
        let mono_ok = self
            .mono_axis
            .map(|i| self.axis(i).angle_out_limits.contains(a2))
            .unwrap_or(true);
        let sample_ok = self.sample_axis.map(|i| {
            let axis = self.axis(i);
            let a3 = a4 / 2.0 + self.a3_offset;
            axis.angle_out_limits.contains(a4) && axis.angle_internal_limits.contains(a3)
        });
        mono_ok && sample_ok.unwrap_or(true)
    }

    /// Collects every geometry primitive's footprint, transformed through
    /// its owning axis's chained world transform, across every axis.
    pub fn world_footprints(&self) -> Vec<(String, Vec<(f64, f64)>)> {
        let mut out = Vec::new();
        for (idx, axis) in self.axes.iter().enumerate() {
            for which in [
                AxisAngleKind::Incoming,
                AxisAngleKind::Internal,
                AxisAngleKind::Outgoing,
            ] {
                if axis.comps(which).is_empty() {
                    continue;
                }
                let trafo = self.get_transform(idx, which);
                for comp in axis.comps(which) {
                    let footprint = comp
                        .footprint_2d()
                        .into_iter()
                        .map(|(x, y)| {
                            let p = trafo.transform_point3(DVec3::new(x, y, 0.0));
                            (p.x, p.y)
                        })
                        .collect();
                    out.push((axis.id.clone(), footprint));
                }
            }
        }
        out
    }
}

/// Top-level scene: the instrument plus static wall geometry, floor
/// extents, an update signal, and the collision whitelist (no interactive
/// drag state, since this crate has no GUI).
pub struct InstrumentSpace {
    pub floor_len_x: f64,
    pub floor_len_y: f64,
    pub walls: Vec<Geometry>,
    pub instrument: Instrument,
    pub whitelist: CollisionWhitelist,
    pub collision_backend: CollisionTestBackend,
    pub collision_eps: f64,
    signal: UpdateSignal,
}

/// Per-worker copies need the geometry but not the observer
/// list, so cloning silently drops any connected update slots.
impl Clone for InstrumentSpace {
    fn clone(&self) -> Self {
        Self {
            floor_len_x: self.floor_len_x,
            floor_len_y: self.floor_len_y,
            walls: self.walls.clone(),
            instrument: self.instrument.clone(),
            whitelist: self.whitelist.clone(),
            collision_backend: self.collision_backend,
            collision_eps: self.collision_eps,
            signal: UpdateSignal::default(),
        }
    }
}

impl std::fmt::Debug for InstrumentSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentSpace")
            .field("floor_len_x", &self.floor_len_x)
            .field("floor_len_y", &self.floor_len_y)
            .field("walls", &self.walls.len())
            .field("instrument", &self.instrument)
            .finish()
    }
}

impl InstrumentSpace {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            floor_len_x: 10.0,
            floor_len_y: 10.0,
            walls: Vec::new(),
            instrument,
            whitelist: CollisionWhitelist::default(),
            collision_backend: CollisionTestBackend::SweepLine,
            collision_eps: 1e-9,
            signal: UpdateSignal::default(),
        }
    }

    pub fn add_wall(&mut self, wall: Geometry) {
        self.walls.push(wall);
        self.emit_update();
    }

    pub fn on_update(&mut self, slot: signals::UpdateSlot) {
        self.signal.connect(slot);
    }

    pub fn defer_updates(&mut self) -> signals::DeferGuard<'_> {
        self.signal.defer()
    }

    pub fn emit_update(&mut self) {
        self.signal.emit();
    }

    /// Moves the instrument to `(a2, a4)`. Angle-only moves don't change any
    /// geometry, so this does not notify observers; wall and component
    /// geometry changes go through [`Self::add_wall`] and
    /// [`Self::emit_update`] instead.
    pub fn set_configuration(&mut self, a2: f64, a4: f64) -> Result<()> {
        self.instrument.set_configuration(a2, a4)
    }

    /// True if any pair of non-whitelisted components (instrument-instrument
    /// or instrument-wall) overlap at the instrument's current
    /// configuration.
    pub fn check_collision_2d(&self) -> bool {
        let mut objects: Vec<(String, Vec<(f64, f64)>)> = self.instrument.world_footprints();
        for wall in &self.walls {
            objects.push((wall.id().to_string(), wall.footprint_2d()));
        }
        for i in 0..objects.len() {
            for j in (i + 1)..objects.len() {
                let (id_a, poly_a) = &objects[i];
                let (id_b, poly_b) = &objects[j];
                if id_a == id_b || self.whitelist.is_allowed(id_a, id_b) {
                    continue;
                }
                if collision::polygons_collide(
                    poly_a,
                    poly_b,
                    self.collision_backend,
                    self.collision_eps,
                ) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoxGeometry, Geometry as Geom};
    use vector_traits::glam::DVec3;

    fn build_space(overlap: bool) -> InstrumentSpace {
        let mut instr = Instrument::new(ScatteringMode::KfFixed, 0.0);
        let mono = instr.add_axis(Axis::new("mono"));
        let offset = if overlap { 0.0 } else { 100.0 };
        instr.axis_mut(mono).comps_out.push(Geom::Box(BoxGeometry {
            id: "mono_arm".into(),
            pos1: DVec3::new(0.0, 0.0, 0.0),
            pos2: DVec3::new(1.0, 0.0, 0.0),
            height: 0.1,
            depth: 0.1,
        }));
        instr.mono_axis = Some(mono);
        let sample = instr.add_axis(Axis::new("sample"));
        instr
            .axis_mut(sample)
            .comps_out
            .push(Geom::Box(BoxGeometry {
                id: "sample_arm".into(),
                pos1: DVec3::new(offset, 0.0, 0.0),
                pos2: DVec3::new(offset + 1.0, 0.0, 0.0),
                height: 0.1,
                depth: 0.1,
            }));
        instr.sample_axis = Some(sample);
        InstrumentSpace::new(instr)
    }

    #[test]
    fn overlapping_components_are_detected() {
        assert!(build_space(true).check_collision_2d());
    }

    #[test]
    fn separated_components_do_not_collide() {
        assert!(!build_space(false).check_collision_2d());
    }

    #[test]
    fn set_configuration_couples_a3_to_a4() {
        let mut space = build_space(false);
        space.set_configuration(0.1, 0.4).unwrap();
        let sample = space.instrument.sample_axis.unwrap();
        let a3 = space.instrument.axis(sample).angle(AxisAngleKind::Internal);
        assert!((a3 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn deferred_updates_fire_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        let mut space = build_space(false);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        space.on_update(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        {
            let _guard = space.defer_updates();
            space.emit_update();
            space.emit_update();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
