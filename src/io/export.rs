// SPDX-License-Identifier: AGPL-3.0-or-later
//! Writes a planned path out as instrument-control commands in one of three
//! formats (raw angle pairs, Nomad scan commands, Nicos move commands); a
//! pure function from path to text rather than a file-dialog-driven action.

use crate::error::Result;
use crate::pathfind::PlannedPath;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain `a2 a4` pairs, one per line, in radians.
    Raw,
    /// Nomad-style scan command per waypoint.
    Nomad,
    /// NICOS-style `maw()` move-and-wait command per waypoint.
    Nicos,
}

pub fn export_path(path: &PlannedPath, format: ExportFormat) -> String {
    let mut out = String::new();
    match format {
        ExportFormat::Raw => {
            for p in &path.points {
                let _ = writeln!(out, "{:.9} {:.9}", p.x, p.y);
            }
        }
        ExportFormat::Nomad => {
            let _ = writeln!(out, "# taspaths-planner path, {} waypoints", path.points.len());
            for p in &path.points {
                let _ = writeln!(out, "scan a2 {:.9} a4 {:.9}", p.x, p.y);
            }
        }
        ExportFormat::Nicos => {
            let _ = writeln!(out, "# taspaths-planner path, {} waypoints", path.points.len());
            for p in &path.points {
                let _ = writeln!(out, "maw(a2, {:.9}, a4, {:.9})", p.x, p.y);
            }
        }
    }
    out
}

pub fn export_path_to_file(
    path: &PlannedPath,
    format: ExportFormat,
    file: &std::path::Path,
) -> Result<()> {
    std::fs::write(file, export_path(path, format))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfind::PathState;
    use vector_traits::glam::DVec2;

    fn path() -> PlannedPath {
        PlannedPath {
            points: vec![DVec2::new(0.0, 0.0), DVec2::new(0.1, 0.2)],
            state: PathState::Done,
        }
    }

    #[test]
    fn raw_export_has_one_line_per_waypoint() {
        let text = export_path(&path(), ExportFormat::Raw);
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn nicos_export_uses_maw_commands() {
        let text = export_path(&path(), ExportFormat::Nicos);
        assert!(text.contains("maw(a2"));
    }
}
