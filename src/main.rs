//! Thin CLI shell: read a toolpath, run the simulation, write the two
//! annotated variants next to it.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use roadtherm::config::Config;
use roadtherm::{contacts, road, surface, thermal, toolpath};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: roadtherm <toolpath.gcode>");
        return ExitCode::FAILURE;
    };

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str) -> roadtherm::error::SimResult<()> {
    let source = fs::read_to_string(path)?;
    let config = Config::default();

    let moves = toolpath::decode_moves(&source)?;
    let roads = road::build_roads(&moves, &config);
    let mut contact_graph = contacts::build_contacts(&roads, &config);
    let mut free_areas = surface::compute_free_areas(&roads, &mut contact_graph, &config)?;
    let result = thermal::simulate(&roads, &mut contact_graph, &mut free_areas, &config)?;
    let annotated = roadtherm::annotate::annotate(&source, &roads, &result.states);

    let input_path = Path::new(path);
    let contact_temp_path = sibling_path(input_path, "contact_temp.gcode");
    let time_over_hdt_path = sibling_path(input_path, "time_over_hdt.gcode");

    fs::write(&contact_temp_path, annotated.contact_temperature_gcode)?;
    fs::write(&time_over_hdt_path, annotated.duration_over_hdt_gcode)?;

    let layer_count = roads.iter().map(|r| r.layer_number).max().unwrap_or(0);
    println!(
        "{} layers, {} roads, {:.2}s simulated",
        layer_count,
        roads.len(),
        result.total_time
    );

    tracing::info!(
        contact_temp = %contact_temp_path.display(),
        time_over_hdt = %time_over_hdt_path.display(),
        "wrote annotated toolpaths"
    );
    Ok(())
}

fn sibling_path(input: &Path, suffix: &str) -> std::path::PathBuf {
    let file_name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    input.with_file_name(format!("{file_name}.{suffix}"))
}
