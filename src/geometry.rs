//! 2-D road footprints.
//!
//! Every extrusion's footprint is an oriented rectangle with flat end caps
//! (see DESIGN.md for why this implementation reads "semicircular-caps" in
//! the data model as a non-binding gloss over the operational flat-cap
//! rule). Representing it as `(center, direction, half_length, half_width)`
//! rather than a general polygon keeps inflation/erosion exact and cheap;
//! `to_polygon` is only reached for when we actually need `geo`'s boolean
//! ops (intersection area against another road).

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use crate::float_types::Real;

/// An oriented rectangle: a road's footprint, or the query/band shapes
/// derived from one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub center: (Real, Real),
    /// Unit vector along the road's length.
    pub dir: (Real, Real),
    pub half_length: Real,
    pub half_width: Real,
}

impl Footprint {
    /// Build the flat-capped rectangle footprint of a straight extrusion.
    /// Returns `None` for a degenerate (zero-length or zero-width) road —
    /// callers treat that the same as a travel's empty geometry.
    pub fn from_segment(start: (Real, Real), end: (Real, Real), width: Real) -> Option<Footprint> {
        let dx = end.0 - start.0;
        let dy = end.1 - start.1;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= 0.0 || width <= 0.0 {
            return None;
        }
        let dir = (dx / length, dy / length);
        let center = ((start.0 + end.0) * 0.5, (start.1 + end.1) * 0.5);
        Some(Footprint {
            center,
            dir,
            half_length: length * 0.5,
            half_width: width * 0.5,
        })
    }

    /// Perpendicular (left-hand normal) of `dir`.
    #[inline]
    fn normal(&self) -> (Real, Real) {
        (-self.dir.1, self.dir.0)
    }

    /// The four corners of the rectangle, in winding order.
    pub fn corners(&self) -> [(Real, Real); 4] {
        let (dx, dy) = self.dir;
        let (nx, ny) = self.normal();
        let hl = self.half_length;
        let hw = self.half_width;
        let (cx, cy) = self.center;
        [
            (cx - dx * hl - nx * hw, cy - dy * hl - ny * hw),
            (cx + dx * hl - nx * hw, cy + dy * hl - ny * hw),
            (cx + dx * hl + nx * hw, cy + dy * hl + ny * hw),
            (cx - dx * hl + nx * hw, cy - dy * hl + ny * hw),
        ]
    }

    /// Axis-aligned bounding box, `(min, max)`.
    pub fn bbox(&self) -> ((Real, Real), (Real, Real)) {
        let corners = self.corners();
        let mut min = corners[0];
        let mut max = corners[0];
        for &(x, y) in &corners[1..] {
            min.0 = min.0.min(x);
            min.1 = min.1.min(y);
            max.0 = max.0.max(x);
            max.1 = max.1.max(y);
        }
        (min, max)
    }

    /// Grow the rectangle isotropically by `d` on every side.
    pub fn inflated(&self, d: Real) -> Footprint {
        Footprint {
            half_length: self.half_length + d,
            half_width: self.half_width + d,
            ..*self
        }
    }

    /// Shrink the rectangle isotropically by `d`. `None` if that collapses
    /// a side to zero or past it.
    pub fn eroded(&self, d: Real) -> Option<Footprint> {
        let half_length = self.half_length - d;
        let half_width = self.half_width - d;
        if half_length <= 0.0 || half_width <= 0.0 {
            return None;
        }
        Some(Footprint {
            half_length,
            half_width,
            ..*self
        })
    }

    pub fn to_polygon(&self) -> Polygon<Real> {
        let corners = self.corners();
        let mut coords: Vec<Coord<Real>> =
            corners.iter().map(|&(x, y)| Coord { x, y }).collect();
        coords.push(coords[0]);
        Polygon::new(LineString::new(coords), vec![])
    }

    /// The annulus obtained by inflating this rectangle outward by `d` and
    /// removing the part eroded inward by `d` — a stand-in for "buffer the
    /// boundary by `d`" that is exact because our shapes are rectangles.
    pub fn boundary_band(&self, d: Real) -> MultiPolygon<Real> {
        let outer = MultiPolygon(vec![self.inflated(d).to_polygon()]);
        match self.eroded(d) {
            Some(inner) => outer.difference(&MultiPolygon(vec![inner.to_polygon()])),
            None => outer,
        }
    }

    /// Exact 2-D intersection area with another footprint, mm^2.
    pub fn intersection_area(&self, other: &Footprint) -> Real {
        let a = MultiPolygon(vec![self.to_polygon()]);
        let b = MultiPolygon(vec![other.to_polygon()]);
        a.intersection(&b).unsigned_area()
    }

    /// Area of `self` intersected with an arbitrary multipolygon (used for
    /// the buffered-boundary-band trick in contact building).
    pub fn intersection_area_with(&self, other: &MultiPolygon<Real>) -> Real {
        let a = MultiPolygon(vec![self.to_polygon()]);
        a.intersection(other).unsigned_area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_segment_rectangle_area() {
        let fp = Footprint::from_segment((0.0, 0.0), (10.0, 0.0), 1.0).unwrap();
        let poly = fp.to_polygon();
        assert!((poly.unsigned_area() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_segment_has_no_footprint() {
        assert!(Footprint::from_segment((0.0, 0.0), (0.0, 0.0), 1.0).is_none());
        assert!(Footprint::from_segment((0.0, 0.0), (1.0, 0.0), 0.0).is_none());
    }

    #[test]
    fn end_to_end_contact_area_matches_layer_height_times_width() {
        let a = Footprint::from_segment((0.0, 0.0), (10.0, 0.0), 1.0).unwrap();
        let b = Footprint::from_segment((10.0, 0.0), (20.0, 0.0), 1.0).unwrap();
        // Adjacent, touching rectangles: intersection area is ~0 (they only
        // share an edge). This exercises that boundary contact is handled
        // by the explicit predecessor rule in `contacts`, not by area here.
        assert!(a.intersection_area(&b) < 1e-6);
    }

    #[test]
    fn boundary_band_has_expected_order_of_area() {
        let fp = Footprint::from_segment((0.0, 0.0), (10.0, 0.0), 1.0).unwrap();
        let band = fp.boundary_band(0.05);
        // band area should roughly equal perimeter * d for a thin band
        let perimeter = 2.0 * (fp.half_length * 2.0 + fp.half_width * 2.0);
        let approx = perimeter * 0.05;
        assert!((band.unsigned_area() - approx).abs() < approx * 0.5);
    }
}
