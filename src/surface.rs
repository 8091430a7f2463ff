//! Free-surface area: how much of a road's face is exposed to the
//! environment once contact area is subtracted out.

use crate::config::Config;
use crate::contacts::ContactGraph;
use crate::error::{SimError, SimResult};
use crate::float_types::Real;
use crate::road::Road;

/// Per-road contact areas, grouped by which face of the road they sit on,
/// derived from comparing the contact's road to `road.layer_number`.
struct FaceGroups {
    /// Contacts to the layer below.
    below: Vec<usize>,
    /// Contacts to the layer above.
    above: Vec<usize>,
    /// Contacts within the same layer (the road's sides).
    side: Vec<usize>,
}

fn group_contacts(road: &Road, contacts: &[(usize, Real)], roads: &[Road]) -> FaceGroups {
    let mut groups = FaceGroups {
        below: Vec::new(),
        above: Vec::new(),
        side: Vec::new(),
    };
    for (edge_idx, &(other, _)) in contacts.iter().enumerate() {
        let other_layer = roads[other].layer_number;
        if other_layer + 1 == road.layer_number {
            groups.below.push(edge_idx);
        } else if other_layer == road.layer_number + 1 {
            groups.above.push(edge_idx);
        } else if other_layer == road.layer_number {
            groups.side.push(edge_idx);
        }
    }
    groups
}

/// Scales down every contact area in `indices` so their sum no longer
/// exceeds `cap`, in place. Mirrors the reference clamp: physical contact
/// area can't exceed the nominal face area it sits on, and small
/// over-estimates from the geometric approximation are rescaled rather
/// than treated as an error.
fn clamp_group(contacts: &mut [(usize, Real)], indices: &[usize], cap: Real) -> SimResult<()> {
    let sum: Real = indices.iter().map(|&i| contacts[i].1).sum();
    if sum > cap * 1.0001 {
        let factor = cap / sum;
        if factor >= 1.0 {
            return Err(SimError::GeometricInvariantViolation {
                source_line: 0,
                detail: "contact clamp factor was not a reduction".to_string(),
            });
        }
        for &i in indices {
            contacts[i].1 *= factor;
        }
    }
    Ok(())
}

/// Recomputes a single road's free area from its current contact list,
/// clamping each face group in place first. Used both for the initial
/// batch pass and to refresh a road whenever a new contact is backfilled
/// onto it during deposition.
pub fn recompute_free_area(i: usize, roads: &[Road], contacts: &mut ContactGraph) -> SimResult<Real> {
    let road = &roads[i];
    if road.is_travel() {
        return Ok(0.0);
    }

    let surface_topbottom = road.length * road.width;
    let surface_sides =
        2.0 * (road.layer_height * road.length) + 2.0 * (road.layer_height * road.width);

    let groups = {
        let edges = contacts[i].clone();
        group_contacts(road, &edges, roads)
    };

    {
        let edges = &mut contacts[i];
        clamp_group(edges, &groups.below, surface_topbottom)?;
        clamp_group(edges, &groups.above, surface_topbottom)?;
        clamp_group(edges, &groups.side, surface_sides)?;
    }

    let total_contact_area: Real = contacts[i].iter().map(|&(_, a)| a).sum();
    let total_surface = 2.0 * surface_topbottom + surface_sides;
    let mut free_area = total_surface - total_contact_area;
    if free_area < 0.0 && free_area > -0.02 {
        free_area = 0.0;
    }
    if free_area < 0.0 {
        return Err(SimError::GeometricInvariantViolation {
            source_line: road.source_line,
            detail: format!("negative free area {free_area}"),
        });
    }
    Ok(free_area)
}

/// Computes every road's free (non-contact) surface area, clamping each
/// face group's contact area to the nominal face area it can physically
/// occupy. Returns the free area per road, indexed like `roads`; travels
/// get `0.0`.
pub fn compute_free_areas(
    roads: &[Road],
    contacts: &mut ContactGraph,
    _config: &Config,
) -> SimResult<Vec<Real>> {
    let mut free_areas = vec![0.0; roads.len()];
    for i in 0..roads.len() {
        free_areas[i] = recompute_free_area(i, roads, contacts)?;
    }
    Ok(free_areas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::build_contacts;
    use crate::road::build_roads;
    use crate::toolpath::decode_moves;

    #[test]
    fn isolated_road_has_full_surface_as_free_area() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\nG1 X10 Y0 E2 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        let mut contacts = build_contacts(&roads, &config);
        let free_areas = compute_free_areas(&roads, &mut contacts, &config).unwrap();
        let road = &roads[0];
        let expected = 2.0 * road.length * road.width
            + 2.0 * road.layer_height * road.length
            + 2.0 * road.layer_height * road.width;
        assert!((free_areas[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn stacked_road_has_reduced_free_area() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 Z0.4 F3000\n\
                     G1 X10 Y0 E2 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        let mut contacts = build_contacts(&roads, &config);
        let free_areas = compute_free_areas(&roads, &mut contacts, &config).unwrap();
        let road = &roads[1];
        let full = 2.0 * road.length * road.width
            + 2.0 * road.layer_height * road.length
            + 2.0 * road.layer_height * road.width;
        assert!(free_areas[1] < full);
    }
}
