//! Simulates the transient thermal history of an FDM print from its
//! toolpath: decodes `G0`/`G1` moves into roads, builds the contact graph
//! between them, and runs a discrete-time lumped-capacitance thermal model
//! so each road's temperature over time can be read back out.
//!
//! # Features
//! - **f64** (default): use `f64` as the scalar type.
//! - **f32**: use `f32` instead.
//! - **parallel**: parallelize the per-step temperature update with `rayon`.

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::all)]

pub mod annotate;
pub mod config;
pub mod contacts;
pub mod error;
pub mod float_types;
pub mod geometry;
pub mod road;
pub mod surface;
pub mod thermal;
pub mod toolpath;

#[cfg(any(
    all(feature = "f64", feature = "f32"),
    not(any(feature = "f64", feature = "f32"))
))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

use crate::error::SimResult;

/// Runs every stage of the pipeline over a toolpath's text and returns the
/// annotated G-code variants, ready to be written out.
pub fn simulate_toolpath(
    source: &str,
    config: &config::Config,
) -> SimResult<annotate::AnnotatedToolpath> {
    let moves = toolpath::decode_moves(source)?;
    let roads = road::build_roads(&moves, config);
    let mut contacts = contacts::build_contacts(&roads, config);
    let mut free_areas = surface::compute_free_areas(&roads, &mut contacts, config)?;
    let result = thermal::simulate(&roads, &mut contacts, &mut free_areas, config)?;
    Ok(annotate::annotate(source, &roads, &result.states))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_small_toolpath_produces_annotated_output() {
        let config = config::Config::default();
        let source = "G1 Z0.2 F3000\n\
                       G1 X10 Y0 E2 F1200\n\
                       G1 Z0.4 F3000\n\
                       G1 X10 Y0 E2 F1200\n";
        let annotated = simulate_toolpath(source, &config).unwrap();
        assert_eq!(
            annotated.contact_temperature_gcode.lines().count(),
            source.lines().count()
        );
    }
}
