//! Contact graph construction: which roads touch which, and how much area
//! they share.
//!
//! This only produces the one-directional "I touch this earlier road"
//! edges. The thermal engine symmetrizes them as each road is deposited
//! (`thermal::record_contacts_on_deposition`), mirroring how the reference
//! implementation only backfills the reverse edge at simulation time.

use rstar::{RTree, RTreeObject, AABB};

use crate::config::Config;
use crate::float_types::Real;
use crate::road::Road;

/// Indexes a road's footprint bounding box for spatial queries, keyed by
/// its position in the road list rather than by geometry identity.
struct RoadEntry {
    index: usize,
    min: [Real; 2],
    max: [Real; 2],
}

impl RTreeObject for RoadEntry {
    type Envelope = AABB<[Real; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// `contacts[i]` lists `(j, area_mm2)` for every road `j` deposited before
/// road `i` that shares a physical contact with it.
pub type ContactGraph = Vec<Vec<(usize, Real)>>;

/// Builds the directional contact graph for every non-travel road.
///
/// Two kinds of contact are recorded, per layer:
/// - same-layer neighbors, found by inflating each road's footprint by
///   `Config::xy_resolution` and querying the layer's spatial index; the
///   shared length is recovered from the area of the neighbor's
///   `resolution`-wide boundary band intersected with the current
///   footprint, divided back out by `resolution`;
/// - previous-layer neighbors, found by exact footprint intersection
///   against the layer below.
pub fn build_contacts(roads: &[Road], config: &Config) -> ContactGraph {
    let mut contacts: ContactGraph = vec![Vec::new(); roads.len()];
    let max_layer = roads.iter().map(|r| r.layer_number).max().unwrap_or(0);

    let mut previous_layer: Option<(Vec<usize>, RTree<RoadEntry>)> = None;

    for layer in 1..=max_layer {
        let layer_indices: Vec<usize> = roads
            .iter()
            .enumerate()
            .filter(|(_, r)| r.layer_number == layer && r.footprint.is_some())
            .map(|(i, _)| i)
            .collect();

        if layer_indices.is_empty() {
            previous_layer = None;
            continue;
        }

        let entries: Vec<RoadEntry> = layer_indices
            .iter()
            .map(|&i| {
                let fp = roads[i].footprint.unwrap();
                let (min, max) = fp.bbox();
                RoadEntry {
                    index: i,
                    min: [min.0, min.1],
                    max: [max.0, max.1],
                }
            })
            .collect();
        let tree = RTree::bulk_load(entries);

        for &i in &layer_indices {
            let road = &roads[i];
            let fp = road.footprint.unwrap();
            let inflated = fp.inflated(config.xy_resolution);
            let (qmin, qmax) = inflated.bbox();
            let envelope = AABB::from_corners([qmin.0, qmin.1], [qmax.0, qmax.1]);

            for entry in tree.locate_in_envelope_intersecting(&envelope) {
                let j = entry.index;
                if j >= i {
                    // ignore self and roads deposited after the current one
                    continue;
                }
                let other = &roads[j];
                let other_fp = other.footprint.unwrap();

                let area = if other.source_line + 1 == road.source_line {
                    // immediate predecessor along the path: the end-cap
                    // contact area is just this road's own cross-section.
                    // The cross-section-minimum rule only applies when the
                    // reverse edge is symmetrized at deposition time.
                    road.width * road.layer_height
                } else {
                    let band = other_fp.boundary_band(config.xy_resolution);
                    let band_area = fp.intersection_area_with(&band);
                    let mut intersection_length = band_area / config.xy_resolution;
                    intersection_length = intersection_length.min(road.length).min(other.length);
                    intersection_length * road.layer_height
                };

                if area > config.min_contact_area {
                    contacts[i].push((j, area));
                }
            }
        }

        if let Some((_, ref prev_tree)) = previous_layer {
            for &i in &layer_indices {
                let road = &roads[i];
                let fp = road.footprint.unwrap();
                let (qmin, qmax) = fp.bbox();
                let envelope = AABB::from_corners([qmin.0, qmin.1], [qmax.0, qmax.1]);

                for entry in prev_tree.locate_in_envelope_intersecting(&envelope) {
                    let j = entry.index;
                    let other_fp = roads[j].footprint.unwrap();
                    let area = fp.intersection_area(&other_fp);
                    if area > config.min_contact_area {
                        contacts[i].push((j, area));
                    }
                }
            }
        }

        previous_layer = Some((layer_indices, tree));
    }

    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::road::build_roads;
    use crate::toolpath::decode_moves;

    #[test]
    fn adjacent_roads_on_same_layer_touch() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 X10 Y0.4 E0.4 F1200\n\
                     G1 X0 Y0.4 E2 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        let contacts = build_contacts(&roads, &config);
        // the third road (a long wall 0.4mm beside the first) should have
        // at least one recorded same-layer contact
        let third_has_contact = contacts[2].iter().any(|&(j, _)| j == 0);
        assert!(third_has_contact, "{:?}", contacts);
    }

    #[test]
    fn stacked_roads_across_layers_touch() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\n\
                     G1 X10 Y0 E2 F1200\n\
                     G1 Z0.4 F3000\n\
                     G1 X10 Y0 E2 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        let contacts = build_contacts(&roads, &config);
        assert!(contacts[1].iter().any(|&(j, _)| j == 0));
    }

    #[test]
    fn immediate_predecessor_uses_own_cross_section_at_build_time() {
        let config = Config::default();
        let text = "G1 Z0.2 F3000\nG1 X10 Y0 E2 F1200\nG1 X20 Y0 E2 F1200\n";
        let moves = decode_moves(text).unwrap();
        let roads = build_roads(&moves, &config);
        let contacts = build_contacts(&roads, &config);
        let (_, area) = contacts[1].iter().find(|&&(j, _)| j == 0).unwrap();
        let expected = roads[1].width * roads[1].layer_height;
        assert!((area - expected).abs() < 1e-9);
    }
}
