// SPDX-License-Identifier: AGPL-3.0-or-later
//! Loads and saves instrument descriptions in the `taspaths.*` XML format,
//! identified by a `PROG_IDENT` string carried in the document root.

use crate::error::{PlannerError, Result};
use crate::geometry::{BoxGeometry, CylinderGeometry, Geometry, SphereGeometry};
use crate::instrument::{Axis, AxisAngleKind, Instrument, InstrumentSpace};
use serde::{Deserialize, Serialize};
use vector_traits::glam::{DVec2, DVec3};

/// Every document this loader accepts must carry this identifier.
pub const PROG_IDENT: &str = "takin_taspaths";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "taspaths")]
struct XmlRoot {
    ident: String,
    #[serde(default)]
    floor_len_x: f64,
    #[serde(default)]
    floor_len_y: f64,
    instrument: XmlInstrument,
    #[serde(default)]
    walls: XmlWalls,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct XmlWalls {
    #[serde(default, rename = "geometry")]
    geometry: Vec<XmlGeometry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlInstrument {
    #[serde(rename = "axis", default)]
    axes: Vec<XmlAxis>,
    mono_axis: Option<String>,
    sample_axis: Option<String>,
    ana_axis: Option<String>,
    #[serde(default)]
    a3_offset: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlAxis {
    id: String,
    #[serde(default)]
    pos_x: f64,
    #[serde(default)]
    pos_y: f64,
    #[serde(default)]
    angle_in: f64,
    #[serde(default)]
    angle_out: f64,
    #[serde(default)]
    angle_internal: f64,
    angle_out_lower: Option<f64>,
    angle_out_upper: Option<f64>,
    #[serde(rename = "geometry", default)]
    comps_out: Vec<XmlGeometry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum XmlGeometry {
    #[serde(rename = "box")]
    Box {
        id: String,
        pos1: [f64; 3],
        pos2: [f64; 3],
        height: f64,
        depth: f64,
    },
    #[serde(rename = "cylinder")]
    Cylinder {
        id: String,
        pos: [f64; 3],
        height: f64,
        radius: f64,
    },
    #[serde(rename = "sphere")]
    Sphere {
        id: String,
        pos: [f64; 3],
        radius: f64,
    },
}

impl From<&Geometry> for XmlGeometry {
    fn from(g: &Geometry) -> Self {
        match g {
            Geometry::Box(b) => XmlGeometry::Box {
                id: b.id.clone(),
                pos1: b.pos1.to_array(),
                pos2: b.pos2.to_array(),
                height: b.height,
                depth: b.depth,
            },
            Geometry::Cylinder(c) => XmlGeometry::Cylinder {
                id: c.id.clone(),
                pos: c.pos.to_array(),
                height: c.height,
                radius: c.radius,
            },
            Geometry::Sphere(s) => XmlGeometry::Sphere {
                id: s.id.clone(),
                pos: s.pos.to_array(),
                radius: s.radius,
            },
        }
    }
}

impl From<XmlGeometry> for Geometry {
    fn from(g: XmlGeometry) -> Self {
        match g {
            XmlGeometry::Box { id, pos1, pos2, height, depth } => Geometry::Box(BoxGeometry {
                id,
                pos1: DVec3::from_array(pos1),
                pos2: DVec3::from_array(pos2),
                height,
                depth,
            }),
            XmlGeometry::Cylinder { id, pos, height, radius } => {
                Geometry::Cylinder(CylinderGeometry {
                    id,
                    pos: DVec3::from_array(pos),
                    height,
                    radius,
                })
            }
            XmlGeometry::Sphere { id, pos, radius } => Geometry::Sphere(SphereGeometry {
                id,
                pos: DVec3::from_array(pos),
                radius,
            }),
        }
    }
}

/// Parses an instrument description from XML text, rejecting documents
/// whose `ident` doesn't match [`PROG_IDENT`].
pub fn load_str(xml: &str) -> Result<InstrumentSpace> {
    let root: XmlRoot =
        quick_xml::de::from_str(xml).map_err(|e| PlannerError::Xml(e.to_string()))?;
    if root.ident != PROG_IDENT {
        return Err(PlannerError::InvalidInputData(format!(
            "unrecognised instrument file identifier {:?}, expected {PROG_IDENT:?}",
            root.ident
        )));
    }

    let mut instrument = Instrument::new(crate::config::ScatteringMode::KfFixed, root.instrument.a3_offset);
    let mut id_to_index = std::collections::HashMap::new();
    for xml_axis in root.instrument.axes {
        let mut axis = Axis::new(xml_axis.id.clone());
        axis.zero_pos = DVec2::new(xml_axis.pos_x, xml_axis.pos_y);
        axis.set_angle(AxisAngleKind::Incoming, xml_axis.angle_in);
        axis.set_angle(AxisAngleKind::Outgoing, xml_axis.angle_out);
        axis.set_angle(AxisAngleKind::Internal, xml_axis.angle_internal);
        axis.angle_out_limits.lower = xml_axis.angle_out_lower;
        axis.angle_out_limits.upper = xml_axis.angle_out_upper;
        axis.comps_out = xml_axis.comps_out.into_iter().map(Geometry::from).collect();
        let idx = instrument.add_axis(axis);
        id_to_index.insert(xml_axis.id, idx);
    }
    instrument.mono_axis = root.instrument.mono_axis.and_then(|id| id_to_index.get(&id).copied());
    instrument.sample_axis = root.instrument.sample_axis.and_then(|id| id_to_index.get(&id).copied());
    instrument.ana_axis = root.instrument.ana_axis.and_then(|id| id_to_index.get(&id).copied());

    // Wire the beam path mono -> sample -> ana as the chain `get_transform`
    // walks, so a downstream axis's world frame carries every upstream
    // axis's current rotation with it.
    if let (Some(mono), Some(sample)) = (instrument.mono_axis, instrument.sample_axis) {
        instrument.axis_mut(sample).prev = Some(mono);
        instrument.axis_mut(mono).next = Some(sample);
    }
    if let (Some(sample), Some(ana)) = (instrument.sample_axis, instrument.ana_axis) {
        instrument.axis_mut(ana).prev = Some(sample);
        instrument.axis_mut(sample).next = Some(ana);
    }

    let mut space = InstrumentSpace::new(instrument);
    space.floor_len_x = root.floor_len_x.max(0.0);
    space.floor_len_y = root.floor_len_y.max(0.0);
    for wall in root.walls.geometry {
        space.add_wall(wall.into());
    }
    Ok(space)
}

pub fn load_file(path: &std::path::Path) -> Result<InstrumentSpace> {
    let text = std::fs::read_to_string(path)?;
    load_str(&text)
}

/// Serialises an instrument description back to XML text.
pub fn save_str(space: &InstrumentSpace) -> Result<String> {
    let root = XmlRoot {
        ident: PROG_IDENT.to_string(),
        floor_len_x: space.floor_len_x,
        floor_len_y: space.floor_len_y,
        instrument: XmlInstrument {
            axes: space
                .instrument
                .axes
                .iter()
                .map(|axis| XmlAxis {
                    id: axis.id.clone(),
                    pos_x: axis.zero_pos.x,
                    pos_y: axis.zero_pos.y,
                    angle_in: axis.angle_in,
                    angle_out: axis.angle_out,
                    angle_internal: axis.angle_internal,
                    angle_out_lower: axis.angle_out_limits.lower,
                    angle_out_upper: axis.angle_out_limits.upper,
                    comps_out: axis.comps_out.iter().map(XmlGeometry::from).collect(),
                })
                .collect(),
            mono_axis: space.instrument.mono_axis.map(|i| space.instrument.axis(i).id.clone()),
            sample_axis: space.instrument.sample_axis.map(|i| space.instrument.axis(i).id.clone()),
            ana_axis: space.instrument.ana_axis.map(|i| space.instrument.axis(i).id.clone()),
            a3_offset: space.instrument.a3_offset,
        },
        walls: XmlWalls {
            geometry: space.walls.iter().map(XmlGeometry::from).collect(),
        },
    };
    quick_xml::se::to_string(&root).map_err(|e| PlannerError::Xml(e.to_string()))
}

pub fn save_file(space: &InstrumentSpace, path: &std::path::Path) -> Result<()> {
    let text = save_str(space)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<taspaths>
        <ident>takin_taspaths</ident>
        <floor_len_x>12.0</floor_len_x>
        <floor_len_y>8.0</floor_len_y>
        <instrument>
            <mono_axis>mono</mono_axis>
            <sample_axis>sample</sample_axis>
            <axis>
                <id>mono</id>
                <angle_out>0.1</angle_out>
            </axis>
            <axis>
                <id>sample</id>
                <angle_out>0.2</angle_out>
            </axis>
        </instrument>
    </taspaths>"#;

    #[test]
    fn loads_a_minimal_instrument_description() {
        let space = load_str(MINIMAL).unwrap();
        assert_eq!(space.instrument.axes.len(), 2);
        assert!(space.instrument.mono_axis.is_some());
        assert!((space.floor_len_x - 12.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_documents_with_the_wrong_ident() {
        let bad = MINIMAL.replace("takin_taspaths", "something_else");
        assert!(load_str(&bad).is_err());
    }

    #[test]
    fn save_file_then_load_file_round_trips_through_disk() {
        let space = load_str(MINIMAL).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instrument.taspaths.xml");
        save_file(&space, &path).unwrap();
        let reloaded = load_file(&path).unwrap();
        assert_eq!(reloaded.instrument.axes.len(), space.instrument.axes.len());
        assert!((reloaded.floor_len_x - space.floor_len_x).abs() < 1e-9);
    }
}
