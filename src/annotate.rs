//! Re-emits a toolpath's G-code with its `F` field repurposed to carry
//! simulation results, for viewers that color moves by feedrate.
//!
//! Two variants are produced: one encoding each road's contact temperature
//! at the moment it was deposited, one encoding how long it stayed above
//! the material's heat-deflection temperature.

use std::collections::HashMap;

use crate::float_types::Real;
use crate::road::Road;
use crate::thermal::RoadState;

/// `avg_contact_temperatures_at_deposition` is encoded as feedrate by this
/// factor (degrees C to "mm/min", so a gcode viewer's mm/s readout shows
/// the original degrees C * 10).
const CONTACT_TEMP_SCALE: Real = 600.0;

/// `duration_temp_above_hdt` (seconds) is encoded as feedrate by this
/// factor, so a viewer's mm/s readout shows milliseconds above HDT.
const HDT_DURATION_SCALE: Real = 60_000.0;

pub struct AnnotatedToolpath {
    pub contact_temperature_gcode: String,
    pub duration_over_hdt_gcode: String,
}

/// Builds both annotated variants of `source`, one line at a time.
pub fn annotate(source: &str, roads: &[Road], states: &[RoadState]) -> AnnotatedToolpath {
    let mut road_by_line: HashMap<usize, usize> = HashMap::with_capacity(roads.len());
    for (i, road) in roads.iter().enumerate() {
        // a split road's later fragments share a source line with earlier
        // ones; the last fragment's state wins, consistent with it being
        // the most time-advanced reading for that line.
        road_by_line.insert(road.source_line, i);
    }

    let mut contact_out = String::with_capacity(source.len());
    let mut hdt_out = String::with_capacity(source.len());

    for (zero_based_line, line) in source.lines().enumerate() {
        let line_number = zero_based_line + 1;
        match road_by_line.get(&line_number) {
            Some(&i) => {
                let state = &states[i];
                push_line(
                    &mut contact_out,
                    line,
                    state.avg_contact_temperature_at_deposition,
                    CONTACT_TEMP_SCALE,
                );
                push_line(
                    &mut hdt_out,
                    line,
                    state.duration_temp_above_hdt,
                    HDT_DURATION_SCALE,
                );
            }
            None => {
                contact_out.push_str(line);
                contact_out.push('\n');
                hdt_out.push_str(line);
                hdt_out.push('\n');
            }
        }
    }

    AnnotatedToolpath {
        contact_temperature_gcode: contact_out,
        duration_over_hdt_gcode: hdt_out,
    }
}

fn push_line(out: &mut String, line: &str, metric: Real, scale: Real) {
    if metric > 0.0 {
        out.push_str(&rewrite_f_field(line, (metric * scale) as i64));
    } else {
        out.push_str(line);
    }
    out.push('\n');
}

/// Replaces every `F<digits>` field in `line` with ` F<value>`. If the line
/// had no such field, one is appended instead. Always prefixes the
/// replacement with a space, even when one already precedes the matched
/// field (matching the reference implementation's own `re.sub` behavior,
/// which produces the same doubled space).
fn rewrite_f_field(line: &str, value: i64) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len() + 8);
    let mut i = 0;
    let mut replaced_any = false;
    while i < chars.len() {
        if chars[i] == 'F' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 {
                out.push(' ');
                out.push('F');
                out.push_str(&value.to_string());
                i = j;
                replaced_any = true;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    if replaced_any {
        out
    } else {
        format!("{line} F{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(contact_temp: Real, hdt_duration: Real) -> RoadState {
        RoadState {
            avg_contact_temperature_at_deposition: contact_temp,
            duration_temp_above_hdt: hdt_duration,
            ..Default::default()
        }
    }

    #[test]
    fn rewrites_existing_f_field() {
        let line = "G1 X10 Y0 E0.4 F1800";
        assert_eq!(rewrite_f_field(line, 600), "G1 X10 Y0 E0.4  F600");
    }

    #[test]
    fn appends_f_field_when_absent() {
        let line = "G1 X10 Y0 E0.4";
        assert_eq!(rewrite_f_field(line, 600), "G1 X10 Y0 E0.4 F600");
    }

    #[test]
    fn unmatched_lines_pass_through_unchanged() {
        let roads = vec![];
        let states = vec![];
        let source = "; comment\nM204 S3000\n";
        let annotated = annotate(source, &roads, &states);
        assert_eq!(annotated.contact_temperature_gcode, source);
        assert_eq!(annotated.duration_over_hdt_gcode, source);
    }

    #[test]
    fn road_lines_get_their_own_metric() {
        let roads = vec![Road {
            source_line: 1,
            start: (0.0, 0.0),
            end: (10.0, 0.0),
            width: 0.4,
            length: 10.0,
            layer_height: 0.2,
            layer_number: 1,
            duration: 1.0,
            footprint: None,
        }];
        let states = vec![state_with(123.4, 2.5)];
        let source = "G1 X10 Y0 E2 F1800\n";
        let annotated = annotate(source, &roads, &states);
        assert!(annotated.contact_temperature_gcode.contains("F74040"));
        assert!(annotated.duration_over_hdt_gcode.contains("F150000"));
    }
}
