//! The one error type returned by any fallible stage of the pipeline.

use thiserror::Error;

/// Errors produced while decoding, building, or simulating a toolpath.
#[derive(Error, Debug)]
pub enum SimError {
    /// A recognized move line contained a token whose value did not parse
    /// as a decimal number.
    #[error("line {line}: malformed field {token:?}")]
    MalformedToolpath {
        /// 1-based source line number.
        line: usize,
        /// The offending whitespace-separated token.
        token: String,
    },

    /// A toolpath feature outside the supported subset was encountered:
    /// mid-file homing, relative extrusion mode, and similar.
    #[error("line {line}: unsupported operation ({reason})")]
    UnsupportedOperation {
        /// 1-based source line number.
        line: usize,
        /// Human-readable description of what was unsupported.
        reason: String,
    },

    /// A computed free area or group contact area violated the bounds
    /// §4.4 requires. Indicates a bug in contact-area clamping, not bad
    /// input.
    #[error("line {source_line}: geometric invariant violated ({detail})")]
    GeometricInvariantViolation {
        /// Source line of the road whose geometry failed the check.
        source_line: usize,
        /// What was violated.
        detail: String,
    },

    /// A road's updated temperature left the physically valid envelope
    /// while its heat capacity was not in the fragile-segment regime.
    #[error("line {source_line}: thermal invariant violated, temperature={temperature}")]
    ThermalInvariantViolation {
        /// Source line of the road whose temperature failed the check.
        source_line: usize,
        /// The offending computed temperature.
        temperature: f64,
    },

    /// Propagated from reading or writing a toolpath file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
