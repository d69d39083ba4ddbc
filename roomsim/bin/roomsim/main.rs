//! roomsim - Image-source room impulse responses
//!
//! Copyright (C) 2025 Pierre Aubert pierre(at)spinorama(dot)org
//!
//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{error, info, warn};
use schemars::schema_for;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use roomsim::plot::save_room_plots;
use roomsim::{
    Band, BandSelection, ProgressReporter, ReflectionLossModel, RoomReport, RoomScene, RoomSpec,
    SimulationDriver, SimulationOptions, load_room_spec, save_report,
    validate_room_spec,
};
use roomsim_env::{DEFAULT_OUTPUT_DIR, DEFAULT_ROOM_CONFIGS, get_data_dir, get_output_dir};

/// roomsim - Simulate rectangular rooms with the image-source method
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room description JSON files (default: the standard room list of the data directory)
    #[arg(short, long, num_args = 1..)]
    config: Vec<PathBuf>,

    /// Directory holding the standard room list (default: $ROOMSIM_DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for reports and plots
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Band simulated in single-band mode
    #[arg(long, value_enum, default_value_t = Band::Mid)]
    band: Band,

    /// Simulate every band of each room
    #[arg(long)]
    multiband: bool,

    /// Write an HTML comparison of the simple and enhanced responses
    #[arg(long)]
    plot: bool,

    /// Include the raw samples in the reports
    #[arg(long)]
    full: bool,

    /// Stop a room simulation after this many seconds
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Dump JSON schema for the room file format
    #[arg(long)]
    schema: bool,
}

fn main() -> Result<()> {
    // Initialize logger safely
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.schema {
        let schema = schema_for!(RoomSpec);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let configs = room_files(&args)?;
    let output_dir = get_output_dir(&args.output_dir)
        .with_context(|| format!("Cannot use output directory {:?}", args.output_dir))?;

    let mut failed = Vec::new();
    for path in &configs {
        let name = room_name(path);
        if let Err(e) = run_room(&args, &name, path, &output_dir) {
            error!("Room '{}' failed: {:#}", name, e);
            failed.push(name);
        }
    }

    info!(
        "Done: {} room(s) simulated, {} failed",
        configs.len() - failed.len(),
        failed.len()
    );

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} room(s) failed: {}", failed.len(), failed.join(", ")))
    }
}

/// Explicit room files, or the standard list from the data directory
fn room_files(args: &Args) -> Result<Vec<PathBuf>> {
    if !args.config.is_empty() {
        return Ok(args.config.clone());
    }

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => get_data_dir().context("No room file given and no data directory found")?,
    };
    info!("Using room files from {}", data_dir.display());

    Ok(DEFAULT_ROOM_CONFIGS
        .iter()
        .map(|file| data_dir.join(file))
        .collect())
}

/// Positive, finite number of seconds
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value, e))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {}", value));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn room_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("room")
        .to_string()
}

fn run_room(args: &Args, name: &str, path: &Path, output_dir: &Path) -> Result<()> {
    info!("Loading room configuration from {:?}", path);

    let spec =
        load_room_spec(path).with_context(|| format!("Failed to load room file {:?}", path))?;

    let validation = validate_room_spec(&spec);
    validation.log_results();

    let scene = RoomScene::try_from(&spec).context("Invalid room configuration")?;

    let mut report = RoomReport::new(name, &scene)?;
    for (band, rt60) in &report.reverberation.bands {
        info!("[{}] RT60 {}: {:.3} s", name, band, rt60.rt60);
    }

    let bands = if args.multiband {
        BandSelection::All
    } else {
        BandSelection::Single(args.band)
    };

    let mut runs = Vec::new();
    for enhanced in [false, true] {
        let model = ReflectionLossModel::new(enhanced);
        let mut reporter = ProgressReporter::new(format!("{} ({})", name, model.name()));
        if let Some(limit) = args.timeout {
            reporter = reporter.with_deadline(limit);
        }
        let reporter = Arc::new(reporter);

        let driver = SimulationDriver::new(SimulationOptions { enhanced, bands })
            .with_progress(Arc::clone(&reporter).into_callback());
        let responses = driver
            .run(&scene)
            .with_context(|| format!("{} simulation failed", model.name()))?;
        reporter.finish();

        report.add_model(model, &responses, args.full);
        runs.push(responses);
    }

    let report_path = output_dir.join(format!("{}.json", name));
    save_report(&report, &report_path)
        .with_context(|| format!("Failed to save report to {:?}", report_path))?;

    if args.plot {
        match runs.as_slice() {
            [original, extended] => {
                let plot_path = output_dir.join(format!("{}.html", name));
                save_room_plots(name, original, extended, &plot_path)
                    .with_context(|| format!("Failed to save plot to {:?}", plot_path))?;
                info!("Saved plot to {:?}", plot_path);
            }
            _ => warn!("Nothing to plot for '{}'", name),
        }
    }

    Ok(())
}
