//! Physical and numerical constants threaded through every stage.
//!
//! Nothing in `toolpath`, `road`, `contacts`, `surface` or `thermal` reads a
//! bare numeric literal for anything listed here — they all take `&Config`.
//! This is what lets a caller simulate a different filament or nozzle
//! geometry without touching engine code.

use crate::float_types::{PI, Real};

/// Every constant the simulation needs, with defaults matching a 1.75 mm
/// PETG filament print.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Surface emissivity used for radiative loss.
    pub emissivity: Real,
    /// Stefan-Boltzmann constant, W/(m^2 K^4).
    pub stefan_boltzmann: Real,
    /// Thermal conductivity of the printed material, W/(m*K).
    pub thermal_conductivity: Real,
    /// Volumetric heat capacity of the printed material, J/(m^3*K).
    pub volumetric_heat_capacity: Real,
    /// Convective heat transfer coefficient to the environment, W/(m^2*K).
    pub h_env: Real,
    /// Ambient/bed temperature, deg C.
    pub environment_temperature: Real,
    /// Absolute zero, deg C.
    pub absolute_zero: Real,
    /// Temperature at which filament is extruded, deg C.
    pub extrusion_temperature: Real,
    /// Filament diameter, mm.
    pub filament_diameter: Real,
    /// Heat-deflection temperature of the material, deg C.
    pub hdt: Real,
    /// Contacts smaller than this are not recorded, mm^2.
    pub min_contact_area: Real,
    /// Printer XY positioning resolution, used to inflate footprints when
    /// querying the spatial index and when estimating contact length, mm.
    pub xy_resolution: Real,
    /// Upper bound on one integration step, s.
    pub max_step: Real,
    /// Lower bound on one integration step; smaller deficits are deferred, s.
    pub min_step: Real,
    /// Maximum road length before the optional splitter fragments it, mm.
    pub max_segment_length: Real,
    /// Whether the splitter actually fragments long roads. Off by default,
    /// matching the reference implementation's shipped (no-op) behavior.
    pub split_long_roads: bool,
    /// Safety cap on the number of trailing cool-down steps taken after the
    /// last road has been deposited, so a pathological input can't loop
    /// forever waiting for the active set to empty.
    pub max_trailing_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            emissivity: 0.92,
            stefan_boltzmann: 5.6703e-8,
            thermal_conductivity: 0.2,
            volumetric_heat_capacity: 1260.0 * 1200.0,
            h_env: 50.0,
            environment_temperature: 25.0,
            absolute_zero: -273.15,
            extrusion_temperature: 220.0,
            filament_diameter: 1.75,
            hdt: 80.0,
            min_contact_area: 0.02,
            xy_resolution: 0.05,
            max_step: 0.2,
            min_step: 0.1,
            max_segment_length: 2.0,
            split_long_roads: false,
            max_trailing_steps: 100_000,
        }
    }
}

impl Config {
    /// Cross-sectional area of the filament, mm^2. Used to convert an
    /// extruder delta into an extruded volume.
    #[inline]
    pub fn filament_cross_section(&self) -> Real {
        0.25 * PI * self.filament_diameter * self.filament_diameter
    }

    /// `environment_temperature` expressed in kelvin, for the radiation term.
    #[inline]
    pub fn environment_temperature_kelvin(&self) -> Real {
        self.environment_temperature - self.absolute_zero
    }
}
