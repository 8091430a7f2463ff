//! The thermal engine: advances every deposited road's temperature over
//! time from conduction through its contacts and convection/radiation from
//! its free surface.
//!
//! Roads are deposited one at a time, in toolpath order; between
//! deposition events the engine advances simulated time in bounded steps
//! (`Config::min_step..=Config::max_step`). Every step reads a full
//! snapshot of the previous temperatures before writing any of the new
//! ones, so a road's update never sees another road's already-updated
//! value for the same step.

use tracing::{debug, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Config;
use crate::contacts::ContactGraph;
use crate::error::{SimError, SimResult};
use crate::float_types::Real;
use crate::road::Road;
use crate::surface::recompute_free_area;

/// Per-road thermal bookkeeping, indexed the same as `roads`.
#[derive(Clone, Debug, Default)]
pub struct RoadState {
    pub temperature: Real,
    pub heat_capacity: Real,
    pub duration_temp_above_hdt: Real,
    pub avg_contact_temperature_at_deposition: Real,
    deposited: bool,
}

/// Everything the annotation emitter needs once the simulation has run.
pub struct SimulationResult {
    pub states: Vec<RoadState>,
    pub total_time: Real,
}

#[inline]
fn heat_capacity(road: &Road, config: &Config) -> Real {
    let volume_mm3 = road.length * road.width * road.layer_height;
    volume_mm3 * 1e-9 * config.volumetric_heat_capacity
}

/// Whether two contacting roads are immediate neighbors along the
/// deposition path (predecessor or successor), by source line distance.
fn is_path_neighbor(road: &Road, other: &Road) -> bool {
    (road.source_line as i64 - other.source_line as i64).abs() == 1
}

fn contact_thickness(road: &Road, other: &Road) -> Real {
    if is_path_neighbor(road, other) {
        road.length + other.length
    } else if road.layer_number != other.layer_number {
        road.layer_height + other.layer_height
    } else {
        road.width + other.width
    }
}

/// Backfills the reverse contact edge onto every road `i` touches, and
/// refreshes their free area to account for it. Mirrors depositing a road
/// "announcing" itself to the roads it now touches.
fn record_contacts_on_deposition(
    i: usize,
    roads: &[Road],
    contacts: &mut ContactGraph,
    free_areas: &mut [Real],
    config: &Config,
) -> SimResult<()> {
    let edges = contacts[i].clone();
    for (other, mut area) in edges {
        if roads[other].is_travel() {
            continue;
        }
        if contacts[other].iter().any(|&(back, _)| back == i) {
            continue;
        }
        if is_path_neighbor(&roads[i], &roads[other]) {
            area = (roads[i].width * roads[i].layer_height)
                .min(roads[other].width * roads[other].layer_height);
        }
        if area > config.min_contact_area {
            contacts[other].push((i, area));
            free_areas[other] = recompute_free_area(other, roads, contacts)?;
        }
    }
    Ok(())
}

/// The area-weighted mean temperature of every contact made at deposition
/// time, excluding the immediate path predecessor (its temperature barely
/// differs from the extrusion temperature and dominates the average
/// otherwise). Falls back to the extrusion temperature with no qualifying
/// contacts, and pins to the environment temperature on the first layer.
fn contact_temperature_at_deposition(
    i: usize,
    roads: &[Road],
    contacts: &ContactGraph,
    states: &[RoadState],
    config: &Config,
) -> Real {
    if roads[i].layer_number == 1 {
        return config.environment_temperature;
    }

    let mut sum_area = 0.0;
    let mut weighted = 0.0;
    for &(other, area) in &contacts[i] {
        if is_path_neighbor(&roads[i], &roads[other]) {
            continue;
        }
        sum_area += area;
        weighted += states[other].temperature * area;
    }

    if sum_area > 0.0 {
        weighted / sum_area
    } else {
        config.extrusion_temperature
    }
}

fn conduction_energy(
    i: usize,
    roads: &[Road],
    contacts: &ContactGraph,
    snapshot: &[RoadState],
    dt: Real,
) -> Real {
    let road = &roads[i];
    let mut power = 0.0;
    for &(other_idx, area) in &contacts[i] {
        let other = &roads[other_idx];
        let thickness_m = contact_thickness(road, other) * 0.001;
        let area_m2 = area * 1e-6;
        power += area_m2 * (snapshot[i].temperature - snapshot[other_idx].temperature) / thickness_m;
    }
    power * dt
}

/// Computes road `i`'s temperature after `dt` seconds, reading every input
/// from `snapshot` so sibling roads stepped in the same pass never observe
/// each other's in-progress update.
fn step_road_temperature(
    i: usize,
    roads: &[Road],
    contacts: &ContactGraph,
    free_areas: &[Real],
    snapshot: &[RoadState],
    config: &Config,
    dt: Real,
    thermal_conductivity: Real,
) -> SimResult<Real> {
    let road = &roads[i];
    if road.layer_number == 1 {
        return Ok(config.environment_temperature);
    }

    let conduction = thermal_conductivity * conduction_energy(i, roads, contacts, snapshot, dt);

    let free_area_m2 = free_areas[i] * 1e-6;
    let t = snapshot[i].temperature;
    let convection = dt * free_area_m2 * config.h_env * (t - config.environment_temperature);

    let t_kelvin = t - config.absolute_zero;
    let env_kelvin = config.environment_temperature_kelvin();
    let radiation = dt
        * free_area_m2
        * config.emissivity
        * config.stefan_boltzmann
        * (t_kelvin.powi(4) - env_kelvin.powi(4));

    let total_energy = conduction + convection + radiation;
    let delta_t = total_energy / snapshot[i].heat_capacity;
    let mut new_temperature = t - delta_t;

    if (new_temperature < config.environment_temperature
        || new_temperature >= config.extrusion_temperature)
        && snapshot[i].heat_capacity < 0.0001
    {
        // Sub-resolution heat capacity: conduction/convection math is too
        // noisy at this scale to trust, fall back to the coolest neighbor.
        new_temperature = contacts[i]
            .iter()
            .map(|&(other, _)| snapshot[other].temperature)
            .fold(None, |min, t| Some(min.map_or(t, |m: Real| m.min(t))))
            .unwrap_or(config.environment_temperature);
    }

    if new_temperature < config.environment_temperature * 0.99
        || new_temperature > config.extrusion_temperature
    {
        return Err(SimError::ThermalInvariantViolation {
            source_line: road.source_line,
            temperature: new_temperature as f64,
        });
    }

    Ok(new_temperature)
}

/// Advances every active road by `dt` seconds, reading a full snapshot
/// first so the step is self-consistent. Active roads more than three
/// layers below `current_layer_number` that have cooled to within 10% of
/// ambient are dropped from the active set afterward.
fn simulate_time_step(
    roads: &[Road],
    contacts: &ContactGraph,
    free_areas: &[Real],
    states: &mut [RoadState],
    active: &mut Vec<usize>,
    current_layer_number: u32,
    config: &Config,
    dt: Real,
) -> SimResult<()> {
    let snapshot = states.to_vec();
    let thermal_conductivity = config.thermal_conductivity;

    #[cfg(feature = "parallel")]
    let new_temperatures: Vec<Real> = active
        .par_iter()
        .map(|&i| {
            step_road_temperature(
                i,
                roads,
                contacts,
                free_areas,
                &snapshot,
                config,
                dt,
                thermal_conductivity,
            )
        })
        .collect::<SimResult<Vec<Real>>>()?;

    #[cfg(not(feature = "parallel"))]
    let new_temperatures: Vec<Real> = active
        .iter()
        .map(|&i| {
            step_road_temperature(
                i,
                roads,
                contacts,
                free_areas,
                &snapshot,
                config,
                dt,
                thermal_conductivity,
            )
        })
        .collect::<SimResult<Vec<Real>>>()?;

    let mut evicted = Vec::new();
    for (slot, &i) in active.iter().enumerate() {
        let new_temperature = new_temperatures[slot];
        if current_layer_number.saturating_sub(roads[i].layer_number) >= 3
            && config.environment_temperature * 1.1 > new_temperature
        {
            evicted.push(i);
        }
        if new_temperature > config.hdt {
            states[i].duration_temp_above_hdt += dt;
        }
        states[i].temperature = new_temperature;
    }

    if !evicted.is_empty() {
        active.retain(|i| !evicted.contains(i));
    }
    Ok(())
}

/// Runs the full deposition-and-cooldown simulation.
///
/// `free_areas` is mutated in place as contacts are backfilled on
/// deposition; the returned result carries each road's final temperature
/// history.
pub fn simulate(
    roads: &[Road],
    contacts: &mut ContactGraph,
    free_areas: &mut [Real],
    config: &Config,
) -> SimResult<SimulationResult> {
    let mut states: Vec<RoadState> = roads
        .iter()
        .map(|road| RoadState {
            heat_capacity: heat_capacity(road, config),
            ..Default::default()
        })
        .collect();

    let mut active: Vec<usize> = Vec::new();
    let mut current_simulation_time: Real = 0.0;
    let mut current_gcode_time: Real = 0.0;
    let mut last_layer_number = 0;

    for i in 0..roads.len() {
        if !roads[i].is_travel() {
            states[i].temperature = if roads[i].layer_number == 1 {
                config.environment_temperature
            } else {
                config.extrusion_temperature
            };
            states[i].deposited = true;
            active.push(i);

            record_contacts_on_deposition(i, roads, contacts, free_areas, config)?;
            states[i].avg_contact_temperature_at_deposition =
                contact_temperature_at_deposition(i, roads, contacts, &states, config);
        }

        last_layer_number = roads[i].layer_number;
        current_gcode_time += roads[i].duration;
        let pending = current_gcode_time - current_simulation_time;

        if pending > config.max_step {
            let whole_steps = (pending / config.max_step).floor() as u64;
            let remainder = pending - whole_steps as Real * config.max_step;
            for _ in 0..whole_steps {
                simulate_time_step(
                    roads,
                    contacts,
                    free_areas,
                    &mut states,
                    &mut active,
                    last_layer_number,
                    config,
                    config.max_step,
                )?;
                current_simulation_time += config.max_step;
            }
            simulate_time_step(
                roads,
                contacts,
                free_areas,
                &mut states,
                &mut active,
                last_layer_number,
                config,
                remainder,
            )?;
            current_simulation_time += remainder;
        } else if pending < config.min_step {
            // not enough elapsed gcode time to justify a step yet
        } else {
            simulate_time_step(
                roads,
                contacts,
                free_areas,
                &mut states,
                &mut active,
                last_layer_number,
                config,
                pending,
            )?;
            current_simulation_time += pending;
        }
    }

    debug!(active = active.len(), "deposition complete, cooling down remaining active roads");

    // Printing is over, so the layer-gap half of the eviction rule (kept
    // during printing to preserve precision on recently-deposited
    // neighbors) no longer applies: every road is now as "recently
    // deposited" as it'll ever get. Passing u32::MAX as the reference
    // layer satisfies that half of the test unconditionally, so eviction
    // here is driven purely by the cold-and-buried temperature test —
    // otherwise the top two layers, whose gap to `last_layer_number` is
    // always < 3, could never be evicted and the loop would run to
    // `max_trailing_steps` on every input.
    let mut trailing_steps = 0;
    while !active.is_empty() && trailing_steps < config.max_trailing_steps {
        simulate_time_step(
            roads,
            contacts,
            free_areas,
            &mut states,
            &mut active,
            u32::MAX,
            config,
            config.max_step,
        )?;
        current_simulation_time += config.max_step;
        trailing_steps += 1;
    }
    if !active.is_empty() {
        warn!(
            remaining = active.len(),
            "trailing cool-down hit its step cap with roads still active"
        );
    }
    trace!(total_time = current_simulation_time, "simulation finished");

    Ok(SimulationResult {
        states,
        total_time: current_simulation_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::build_contacts;
    use crate::road::build_roads;
    use crate::surface::compute_free_areas;
    use crate::toolpath::decode_moves;

    fn run(text: &str, config: &Config) -> SimulationResult {
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, config);
        let mut contacts = build_contacts(&roads, config);
        let mut free_areas = compute_free_areas(&roads, &mut contacts, config).unwrap();
        simulate(&roads, &mut contacts, &mut free_areas, config).unwrap()
    }

    #[test]
    fn first_layer_roads_are_pinned_to_environment_temperature() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\nG1 X10 Y0 E2 F1200\n";
        let result = run(text, &config);
        assert_eq!(result.states[0].temperature, config.environment_temperature);
    }

    #[test]
    fn second_layer_road_starts_hot_and_cools() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 Z0.4 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 X0 Y0.4 E2 F1200\n\
                     G1 X0 Y0 E2 F1200\n";
        let result = run(text, &config);
        assert!(result.states[1].temperature <= config.extrusion_temperature);
        assert!(result.states[1].temperature >= config.environment_temperature * 0.99);
    }

    #[test]
    fn never_leaves_the_physically_valid_envelope() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F600\n\
                     G1 Z0.4 F3000\n\
                     G1 X10 Y0 E2 F600\n";
        let result = run(text, &config);
        for state in &result.states {
            if state.deposited {
                assert!(state.temperature >= config.environment_temperature * 0.99);
            }
        }
    }

    #[test]
    fn trailing_cooldown_drains_the_active_set() {
        let mut config = Config::default();
        config.max_trailing_steps = 10_000;
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 Z0.4 F3000\n\
                     G1 X10 Y0 E2 F1200\n";
        let result = run(text, &config);
        assert!(result.total_time > 0.0);
    }

    #[test]
    fn trailing_cooldown_converges_well_before_the_step_cap() {
        // Before the layer-gap eviction rule was relaxed for the trailing
        // cool-down, the top two layers could never be evicted and every
        // run drove this loop all the way to `max_trailing_steps`. A tiny
        // two-layer print should equilibrate using only a small fraction
        // of the default budget.
        let config = Config::default();
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 Z0.4 F3000\n\
                     G1 X10 Y0 E2 F1200\n";
        let result = run(text, &config);
        let step_cap_time = config.max_trailing_steps as Real * config.max_step;
        assert!(result.total_time < step_cap_time * 0.1);
    }
}
