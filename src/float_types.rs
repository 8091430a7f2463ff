//! The scalar type used throughout the simulation.
//!
//! Mirrors the reference implementation's mm/s/°C units: everything is a
//! plain float, there are no newtype wrappers for units.

/// Our scalar type. `f64` by default; `f32` under the `f32` feature.
#[cfg(feature = "f32")]
pub type Real = f32;
/// Our scalar type. `f64` by default; `f32` under the `f32` feature.
#[cfg(not(feature = "f32"))]
pub type Real = f64;

/// A small epsilon for geometric comparisons, adjusted per precision.
#[cfg(feature = "f32")]
pub const EPSILON: Real = 1e-5;
/// A small epsilon for geometric comparisons, adjusted per precision.
#[cfg(not(feature = "f32"))]
pub const EPSILON: Real = 1e-9;

/// Archimedes' constant.
#[cfg(feature = "f32")]
pub const PI: Real = core::f32::consts::PI;
/// Archimedes' constant.
#[cfg(not(feature = "f32"))]
pub const PI: Real = core::f64::consts::PI;
