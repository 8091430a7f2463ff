//! Folding a stream of [`Move`]s into [`Road`]s: the machine-state tracking
//! that turns "go to X10 Y0 extruding 0.4mm" into a road with a known
//! length, width and layer.

use crate::config::Config;
use crate::float_types::Real;
use crate::geometry::Footprint;
use crate::toolpath::Move;

/// A single deposited (or travelled) segment, in the order it was printed.
#[derive(Clone, Debug)]
pub struct Road {
    /// Position in the original toolpath; used for annotation re-emission
    /// and in error messages. Not a stable identity across runs.
    pub source_line: usize,
    pub start: (Real, Real),
    pub end: (Real, Real),
    /// Extrusion width, mm. Zero for a travel.
    pub width: Real,
    pub length: Real,
    pub layer_height: Real,
    pub layer_number: u32,
    /// Wall-clock time to traverse this road at its commanded feedrate, s.
    pub duration: Real,
    /// This road's footprint, or `None` for a travel (no geometry, no
    /// thermal state).
    pub footprint: Option<Footprint>,
}

impl Road {
    #[inline]
    pub fn is_travel(&self) -> bool {
        self.width <= 0.0
    }
}

/// Carries forward the machine state a toolpath accumulates between moves:
/// current position, feedrate, extruder position, and the layer tracking
/// derived from Z deltas.
#[derive(Clone, Debug)]
struct MachineState {
    x: Real,
    y: Real,
    z: Real,
    e: Real,
    f: Real,
    layer_number: u32,
    layer_height: Real,
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            e: 0.0,
            // implicit startup feedrate; real prints always set one before
            // the first move that matters, but a dangling 0 would produce
            // an infinite duration for a perverse toolpath.
            f: 3000.0,
            layer_number: 0,
            layer_height: 0.0,
        }
    }
}

/// Folds decoded moves into roads, tracking position/feedrate/layer state
/// the way the original machine firmware would.
pub fn build_roads(moves: &[Move], config: &Config) -> Vec<Road> {
    let mut state = MachineState::default();
    let mut roads = Vec::with_capacity(moves.len());

    for mv in moves {
        if let Some(z) = mv.z {
            let mut layer_height = z - state.z;
            if layer_height < 0.0 {
                // Absolute Z jump backward at startup: treat Z itself as
                // the height of this first layer.
                layer_height = z;
            }
            if layer_height < 1.0 {
                state.z = z;
                state.layer_height = layer_height;
                state.layer_number += 1;
            }
        }

        let start = (state.x, state.y);
        if let Some(x) = mv.x {
            state.x = x;
        }
        if let Some(y) = mv.y {
            state.y = y;
        }
        let end = (state.x, state.y);
        let length = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();

        if let Some(f) = mv.f {
            state.f = f;
        }
        let velocity = state.f / 60.0;
        let duration = if velocity > 0.0 { length / velocity } else { 0.0 };

        let width = if let Some(e) = mv.e {
            let extruder_move = e - state.e;
            state.e = e;
            if length > 0.0 && state.layer_height > 0.0 {
                let extruded_volume = extruder_move * config.filament_cross_section();
                (extruded_volume / (length * state.layer_height)).max(0.0)
            } else {
                0.0
            }
        } else {
            0.0
        };

        let footprint = if width > 0.0 {
            Footprint::from_segment(start, end, width)
        } else {
            None
        };

        let road = Road {
            source_line: mv.source_line,
            start,
            end,
            width,
            length,
            layer_height: state.layer_height,
            layer_number: state.layer_number,
            duration,
            footprint,
        };

        for fragment in split_road(road, config) {
            roads.push(fragment);
        }
    }

    roads
}

/// Fragments a road into pieces no longer than `Config::max_segment_length`,
/// when `Config::split_long_roads` is enabled. Disabled by default, which
/// reproduces the reference implementation's shipped behavior (the
/// splitter existed there but was never wired up).
fn split_road(road: Road, config: &Config) -> Vec<Road> {
    if !config.split_long_roads
        || road.is_travel()
        || road.length <= config.max_segment_length
    {
        return vec![road];
    }

    let pieces = (road.length / config.max_segment_length).ceil().max(1.0) as usize;
    let mut out = Vec::with_capacity(pieces);
    let dx = (road.end.0 - road.start.0) / pieces as Real;
    let dy = (road.end.1 - road.start.1) / pieces as Real;
    let mut cursor = road.start;
    for i in 0..pieces {
        let next = if i + 1 == pieces {
            road.end
        } else {
            (cursor.0 + dx, cursor.1 + dy)
        };
        let length = ((next.0 - cursor.0).powi(2) + (next.1 - cursor.1).powi(2)).sqrt();
        out.push(Road {
            source_line: road.source_line,
            start: cursor,
            end: next,
            width: road.width,
            length,
            layer_height: road.layer_height,
            layer_number: road.layer_number,
            duration: road.duration / pieces as Real,
            footprint: Footprint::from_segment(cursor, next, road.width),
        });
        cursor = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolpath::decode_moves;

    #[test]
    fn travel_then_extrusion_produces_expected_widths() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\nG0 X10 Y0 F3000\nG1 X20 Y0 E0.4 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        assert_eq!(roads.len(), 3);
        assert!(roads[1].is_travel());
        assert!(!roads[2].is_travel());
        assert!(roads[2].width > 0.0);
        assert_eq!(roads[2].layer_number, 1);
    }

    #[test]
    fn layer_number_increments_on_positive_z_delta() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\nG1 X10 Y0 E0.2 F1200\nG1 Z0.4 F3000\nG1 X20 Y0 E0.2 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        assert_eq!(roads[0].layer_number, 1);
        assert_eq!(roads[1].layer_number, 2);
    }

    #[test]
    fn disabled_splitter_leaves_long_roads_intact() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\nG1 X100 Y0 E10 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        assert_eq!(roads.len(), 1);
        assert!((roads[0].length - 100.0).abs() < 1e-6);
    }

    #[test]
    fn enabled_splitter_fragments_long_roads() {
        let mut config = Config::default();
        config.split_long_roads = true;
        config.max_segment_length = 10.0;
        let text = "G1 Z0.2 F3000\nG1 X100 Y0 E10 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        assert_eq!(roads.len(), 10);
        let total: Real = roads.iter().map(|r| r.length).sum();
        assert!((total - 100.0).abs() < 1e-6);
    }
}
