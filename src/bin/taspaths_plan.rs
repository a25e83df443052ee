// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command-line front end: load an instrument description, rasterise its
//! configuration space, and find a path between two angular waypoints.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use taspaths_planner::config::CoreConfig;
use taspaths_planner::instrument::{Axis, Instrument, InstrumentSpace};
use taspaths_planner::io::{export, xml};
use taspaths_planner::orchestrator::Orchestrator;
use tracing_subscriber::fmt::SubscriberBuilder;
use vector_traits::glam::DVec2;

#[derive(Parser)]
#[command(name = "taspaths-plan")]
#[command(about = "Plan a collision-free path across a TAS instrument's angular configuration space")]
struct Cli {
    /// Instrument description XML. If omitted, plans over a bare two-axis
    /// instrument with no walls, mainly useful for smoke-testing the build.
    instrument: Option<PathBuf>,

    /// Starting (a2, a4) configuration, in degrees.
    #[arg(long, num_args = 2, value_names = ["A2", "A4"], default_values_t = [0.0, 0.0])]
    start: Vec<f64>,

    /// Target (a2, a4) configuration, in degrees.
    #[arg(long, num_args = 2, value_names = ["A2", "A4"], default_values_t = [10.0, 10.0])]
    end: Vec<f64>,

    /// Where to write the planned path; prints to stdout if omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExportFormatArg::Raw)]
    format: ExportFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormatArg {
    Raw,
    Nomad,
    Nicos,
}

impl From<ExportFormatArg> for export::ExportFormat {
    fn from(f: ExportFormatArg) -> Self {
        match f {
            ExportFormatArg::Raw => export::ExportFormat::Raw,
            ExportFormatArg::Nomad => export::ExportFormat::Nomad,
            ExportFormatArg::Nicos => export::ExportFormat::Nicos,
        }
    }
}

fn default_space() -> InstrumentSpace {
    let mut instr = Instrument::new(taspaths_planner::config::ScatteringMode::KfFixed, 0.0);
    let mono = instr.add_axis(Axis::new("mono"));
    instr.mono_axis = Some(mono);
    let sample = instr.add_axis(Axis::new("sample"));
    instr.sample_axis = Some(sample);
    InstrumentSpace::new(instr)
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cli = Cli::parse();

    let space = match &cli.instrument {
        Some(path) => xml::load_file(path)
            .with_context(|| format!("loading instrument description {}", path.display()))?,
        None => default_space(),
    };

    let config = CoreConfig::default();
    let mut orchestrator = Orchestrator::new(space, config);

    tracing::info!("rasterising configuration space");
    orchestrator
        .update_path_mesh_blocking()
        .context("building the configuration-space path mesh")?;

    let start = DVec2::new(cli.start[0].to_radians(), cli.start[1].to_radians());
    let end = DVec2::new(cli.end[0].to_radians(), cli.end[1].to_radians());

    tracing::info!(?start, ?end, "searching for a path");
    let path = orchestrator
        .find_path(start, end)
        .context("path search failed")?;

    let format = export::ExportFormat::from(cli.format);
    match cli.out {
        Some(out_path) => {
            export::export_path_to_file(&path, format, &out_path)
                .with_context(|| format!("writing path to {}", out_path.display()))?;
        }
        None => print!("{}", export::export_path(&path, format)),
    }

    Ok(())
}
