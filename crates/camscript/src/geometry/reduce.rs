//! Turn a selection of CAD elements into the point locations an operation
//! visits.
//!
//! Points are used as they are. Every pair of curves is intersected and the
//! crossings become locations. A circle that crosses nothing else in the
//! selection stands for a hole, so its centre is used instead.

use crate::geometry::curve::{Curve, Geometry};
use crate::geometry::intersect::intersect_curves;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Two locations closer than this (mm) are the same location.
pub const LOCATION_TOLERANCE: f64 = 0.001;

/// A concrete position derived from geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl LocationPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &LocationPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    /// Tolerance-based equality.
    pub fn coincides(&self, other: &LocationPoint) -> bool {
        self.distance(other) < LOCATION_TOLERANCE
    }
}

/// Compute the distinct locations implied by a selection of elements.
///
/// Output follows selection order: for each element its own location (point
/// position or isolated circle centre) comes first, then its crossings with
/// the elements selected before it. Curve-derived locations lie at z = 0.
pub fn reduce(handles: &[Geometry]) -> Vec<LocationPoint> {
    let valid: Vec<Option<&Geometry>> = handles
        .iter()
        .enumerate()
        .map(|(index, handle)| match handle.validate() {
            Ok(()) => Some(handle),
            Err(err) => {
                warn!(index, error = %err, "skipping unusable geometry in location search");
                None
            }
        })
        .collect();

    let n = handles.len();
    // crossings[k] holds intersections of pairs (i, k) with i < k.
    let mut crossings: Vec<Vec<LocationPoint>> = vec![Vec::new(); n];
    let mut hit_count = vec![0usize; n];

    for k in 0..n {
        let Some(Geometry::Curve(curve_k)) = valid[k] else {
            continue;
        };
        for i in 0..k {
            let Some(Geometry::Curve(curve_i)) = valid[i] else {
                continue;
            };
            match intersect_curves(curve_i, curve_k) {
                Ok(points) => {
                    hit_count[i] += points.len();
                    hit_count[k] += points.len();
                    crossings[k].extend(points.into_iter().map(|p| LocationPoint::new(p.x, p.y, 0.0)));
                }
                Err(err) => {
                    warn!(first = i, second = k, error = %err, "skipping element pair");
                }
            }
        }
    }

    let mut locations = Vec::new();
    for k in 0..n {
        match valid[k] {
            Some(Geometry::Point(p)) => locations.push(LocationPoint::new(p.x, p.y, p.z)),
            Some(Geometry::Curve(Curve::Circle(circle))) if hit_count[k] == 0 => {
                locations.push(LocationPoint::new(circle.center.x, circle.center.y, 0.0));
            }
            _ => {}
        }
        locations.extend(crossings[k].iter().copied());
    }

    dedupe(locations)
}

/// Drop every location that coincides with an earlier one.
pub fn dedupe(points: Vec<LocationPoint>) -> Vec<LocationPoint> {
    let mut unique: Vec<LocationPoint> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.iter().any(|q| q.coincides(&p)) {
            unique.push(p);
        }
    }
    unique
}

/// Greedy nearest-neighbour ordering starting from `start`.
pub fn sort_by_proximity(points: &[LocationPoint], start: LocationPoint) -> Vec<LocationPoint> {
    let mut remaining: Vec<LocationPoint> = points.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (index, candidate) in remaining.iter().enumerate() {
            let d = current.distance(candidate);
            if d < best_dist {
                best = index;
                best_dist = d;
            }
        }
        current = remaining.remove(best);
        ordered.push(current);
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curve::Point3;
    use kurbo::{Circle, Line};

    #[test]
    fn test_empty_selection() {
        assert!(reduce(&[]).is_empty());
    }

    #[test]
    fn test_points_are_used_directly() {
        let handles = vec![
            Geometry::Point(Point3::new(1.0, 2.0, 3.0)),
            Geometry::Point(Point3::new(4.0, 5.0, 6.0)),
        ];
        let locations = reduce(&handles);
        assert_eq!(
            locations,
            vec![LocationPoint::new(1.0, 2.0, 3.0), LocationPoint::new(4.0, 5.0, 6.0)]
        );
    }

    #[test]
    fn test_circle_crossed_by_line_loses_its_centre() {
        let handles = vec![
            Geometry::Curve(Curve::Circle(Circle::new((0.0, 0.0), 5.0))),
            Geometry::Curve(Curve::Line(Line::new((-10.0, 0.0), (10.0, 0.0)))),
        ];
        let locations = reduce(&handles);
        assert_eq!(locations.len(), 2);
        assert!(!locations.iter().any(|p| p.coincides(&LocationPoint::new(0.0, 0.0, 0.0))));
    }

    #[test]
    fn test_coincident_crossings_collapse() {
        // Three lines through the origin give three pairwise crossings at one spot.
        let handles = vec![
            Geometry::Curve(Curve::Line(Line::new((-1.0, 0.0), (1.0, 0.0)))),
            Geometry::Curve(Curve::Line(Line::new((0.0, -1.0), (0.0, 1.0)))),
            Geometry::Curve(Curve::Line(Line::new((-1.0, -1.0), (1.0, 1.0)))),
        ];
        let locations = reduce(&handles);
        assert_eq!(locations.len(), 1);
    }

    #[test]
    fn test_point_on_crossing_is_deduplicated() {
        let handles = vec![
            Geometry::Point(Point3::new(5.0, 5.0, 0.0)),
            Geometry::Curve(Curve::Line(Line::new((0.0, 0.0), (10.0, 10.0)))),
            Geometry::Curve(Curve::Line(Line::new((0.0, 10.0), (10.0, 0.0)))),
        ];
        assert_eq!(reduce(&handles).len(), 1);
    }

    #[test]
    fn test_bad_element_does_not_blank_the_rest() {
        let handles = vec![
            Geometry::Curve(Curve::Circle(Circle::new((0.0, 0.0), f64::NAN))),
            Geometry::Curve(Curve::Circle(Circle::new((20.0, 0.0), 3.0))),
            Geometry::Point(Point3::new(1.0, 1.0, 0.0)),
        ];
        let locations = reduce(&handles);
        assert_eq!(
            locations,
            vec![LocationPoint::new(20.0, 0.0, 0.0), LocationPoint::new(1.0, 1.0, 0.0)]
        );
    }

    #[test]
    fn test_sort_by_proximity() {
        let points = vec![
            LocationPoint::new(10.0, 0.0, 0.0),
            LocationPoint::new(1.0, 0.0, 0.0),
            LocationPoint::new(5.0, 0.0, 0.0),
        ];
        let sorted = sort_by_proximity(&points, LocationPoint::new(0.0, 0.0, 0.0));
        let xs: Vec<f64> = sorted.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 5.0, 10.0]);
    }
}
