//! Toolpath decoding: turns G-code text into a stream of abstract moves.
//!
//! Only the fields the rest of the pipeline needs are recognized — this is
//! deliberately not a general G-code parser (§1).

use crate::error::{SimError, SimResult};
use crate::float_types::Real;

/// One recognized `G0`/`G1` line, with whichever of X/Y/Z/E/F were present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Move {
    /// 1-based line number in the source toolpath.
    pub source_line: usize,
    pub x: Option<Real>,
    pub y: Option<Real>,
    pub z: Option<Real>,
    pub e: Option<Real>,
    pub f: Option<Real>,
}

/// Streams [`Move`]s out of a toolpath's text, in source-line order.
///
/// Also watches for toolpath features this simulator cannot model: a
/// homing move (`G28`) after printing has started, or a switch to relative
/// extrusion (`M83`/`G91`). Both are surfaced as
/// [`SimError::UnsupportedOperation`] instead of silently producing
/// meaningless geometry.
pub struct MoveDecoder<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
    seen_move: bool,
    done: bool,
}

impl<'a> MoveDecoder<'a> {
    pub fn new(input: &'a str) -> Self {
        MoveDecoder {
            lines: input.lines(),
            line_number: 0,
            seen_move: false,
            done: false,
        }
    }
}

impl<'a> Iterator for MoveDecoder<'a> {
    type Item = SimResult<Move>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;

            if line.starts_with("M83") || line.starts_with("G91") {
                self.done = true;
                return Some(Err(SimError::UnsupportedOperation {
                    line: self.line_number,
                    reason: "relative extrusion mode is not supported".to_string(),
                }));
            }
            if line.starts_with("G28") && self.seen_move {
                self.done = true;
                return Some(Err(SimError::UnsupportedOperation {
                    line: self.line_number,
                    reason: "mid-file homing is not supported".to_string(),
                }));
            }

            if !(line.starts_with("G0") || line.starts_with("G1")) {
                continue;
            }

            self.seen_move = true;
            let mut mv = Move {
                source_line: self.line_number,
                ..Default::default()
            };
            for token in line.split_whitespace().skip(1) {
                let mut chars = token.chars();
                let Some(letter) = chars.next() else {
                    continue;
                };
                let rest = chars.as_str();
                let field = match letter {
                    'X' => &mut mv.x,
                    'Y' => &mut mv.y,
                    'Z' => &mut mv.z,
                    'E' => &mut mv.e,
                    'F' => &mut mv.f,
                    _ => continue,
                };
                match rest.parse::<Real>() {
                    Ok(v) => *field = Some(v),
                    Err(_) => {
                        self.done = true;
                        return Some(Err(SimError::MalformedToolpath {
                            line: self.line_number,
                            token: token.to_string(),
                        }));
                    }
                }
            }
            return Some(Ok(mv));
        }
    }
}

/// Convenience: decode every move up front.
pub fn decode_moves(input: &str) -> SimResult<Vec<Move>> {
    MoveDecoder::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_recognized_fields_and_skips_others() {
        let text = "; comment\nM204 S3000\nG1 X10 Y0 E0.4 F1800\nG0 X0 Y0\n";
        let moves = decode_moves(text).unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].source_line, 3);
        assert_eq!(moves[0].x, Some(10.0));
        assert_eq!(moves[0].e, Some(0.4));
        assert_eq!(moves[0].f, Some(1800.0));
        assert_eq!(moves[1].source_line, 4);
        assert_eq!(moves[1].e, None);
    }

    #[test]
    fn rejects_malformed_field() {
        let text = "G1 Xabc Y0\n";
        let err = decode_moves(text).unwrap_err();
        matches!(err, SimError::MalformedToolpath { line: 1, .. });
    }

    #[test]
    fn rejects_mid_file_homing() {
        let text = "G1 X10 Y0 E0.1 F1800\nG28\n";
        let err = decode_moves(text).unwrap_err();
        assert!(matches!(err, SimError::UnsupportedOperation { line: 2, .. }));
    }

    #[test]
    fn allows_homing_before_first_move() {
        let text = "G28\nG1 X10 Y0 E0.1 F1800\n";
        let moves = decode_moves(text).unwrap();
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn rejects_relative_extrusion_mode() {
        let text = "G1 X10 Y0 E0.1 F1800\nM83\n";
        let err = decode_moves(text).unwrap_err();
        assert!(matches!(err, SimError::UnsupportedOperation { line: 2, .. }));
    }
}
