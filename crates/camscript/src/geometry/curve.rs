use crate::error::{CamError, Result};
use kurbo::{Arc, BezPath, Circle, Line, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A point element with its own elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A curve that can be referenced by operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// A straight line segment.
    Line(Line),
    /// A circular arc. Only equal radii are supported.
    Arc(Arc),
    /// A full circle.
    Circle(Circle),
    /// A Bézier path (can contain multiple segments).
    BezPath(BezPath),
}

/// A resolved CAD element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point3),
    Curve(Curve),
}

/// Simple pieces that curves are broken into for intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Segment(Line),
    /// Counter-clockwise sweep from `start`; a full circle has `sweep == TAU`.
    CircleArc {
        center: Point,
        radius: f64,
        start: f64,
        sweep: f64,
    },
}

impl Primitive {
    /// Bounding box; arcs are boxed by their whole circle.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Primitive::Segment(line) => line.bounding_box(),
            Primitive::CircleArc { center, radius, .. } => Rect::new(
                center.x - radius,
                center.y - radius,
                center.x + radius,
                center.y + radius,
            ),
        }
    }
}

impl Curve {
    /// Get the bounding box of the curve.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Curve::Line(line) => line.bounding_box(),
            Curve::Arc(arc) => arc.bounding_box(),
            Curve::Circle(circle) => circle.bounding_box(),
            Curve::BezPath(path) => path.bounding_box(),
        }
    }

    /// Flatten the curve into line segments at the given tolerance.
    /// Returns a vector of (x, y) points.
    pub fn flatten(&self, tolerance: f64) -> Vec<(f64, f64)> {
        match self {
            Curve::Line(line) => {
                vec![(line.p0.x, line.p0.y), (line.p1.x, line.p1.y)]
            }
            Curve::Arc(arc) => {
                let radius = arc.radii.x;
                sample_arc(arc.center, radius, arc.start_angle, arc.sweep_angle, tolerance)
            }
            Curve::Circle(circle) => {
                sample_arc(circle.center, circle.radius, 0.0, TAU, tolerance)
            }
            Curve::BezPath(path) => {
                let mut points: Vec<(f64, f64)> = Vec::new();
                for seg in path.segments() {
                    for p in sample_segment(&seg, tolerance) {
                        if points.last() != Some(&(p.x, p.y)) {
                            points.push((p.x, p.y));
                        }
                    }
                }
                points
            }
        }
    }

    /// Check if the curve is closed (forms a loop).
    pub fn is_closed(&self) -> bool {
        match self {
            Curve::Line(_) => false,
            Curve::Arc(arc) => arc.sweep_angle.abs() >= TAU,
            Curve::Circle(_) => true,
            Curve::BezPath(path) => path
                .elements()
                .last()
                .map(|el| matches!(el, PathEl::ClosePath))
                .unwrap_or(false),
        }
    }

    /// Reject geometry the intersection code cannot work with.
    pub fn validate(&self) -> Result<()> {
        match self {
            Curve::Line(line) => {
                if !finite_point(line.p0) || !finite_point(line.p1) {
                    return Err(CamError::GeometryQuery("line has non-finite coordinates".into()));
                }
                if line.p0.distance(line.p1) <= f64::EPSILON {
                    return Err(CamError::GeometryQuery("line has zero length".into()));
                }
            }
            Curve::Arc(arc) => {
                if !finite_point(arc.center) || !arc.start_angle.is_finite() || !arc.sweep_angle.is_finite() {
                    return Err(CamError::GeometryQuery("arc has non-finite parameters".into()));
                }
                if !(arc.radii.x > 0.0) || (arc.radii.x - arc.radii.y).abs() > 1e-9 {
                    return Err(CamError::GeometryQuery(format!(
                        "arc radii {:?} are not a positive circular radius",
                        arc.radii
                    )));
                }
            }
            Curve::Circle(circle) => {
                if !finite_point(circle.center) {
                    return Err(CamError::GeometryQuery("circle has non-finite centre".into()));
                }
                if !(circle.radius > 0.0) {
                    return Err(CamError::GeometryQuery(format!(
                        "circle radius {} is not positive",
                        circle.radius
                    )));
                }
            }
            Curve::BezPath(path) => {
                if path.elements().is_empty() {
                    return Err(CamError::GeometryQuery("path is empty".into()));
                }
                let bbox = path.bounding_box();
                if !bbox.x0.is_finite() || !bbox.y0.is_finite() || !bbox.x1.is_finite() || !bbox.y1.is_finite() {
                    return Err(CamError::GeometryQuery("path has non-finite coordinates".into()));
                }
            }
        }
        Ok(())
    }

    /// Break the curve into segments and circular arcs.
    pub fn primitives(&self, tolerance: f64) -> Vec<Primitive> {
        match self {
            Curve::Line(line) => vec![Primitive::Segment(*line)],
            Curve::Arc(arc) => {
                let (start, sweep) = normalize_sweep(arc.start_angle, arc.sweep_angle);
                vec![Primitive::CircleArc {
                    center: arc.center,
                    radius: arc.radii.x,
                    start,
                    sweep,
                }]
            }
            Curve::Circle(circle) => vec![Primitive::CircleArc {
                center: circle.center,
                radius: circle.radius,
                start: 0.0,
                sweep: TAU,
            }],
            Curve::BezPath(path) => {
                let mut out = Vec::new();
                for seg in path.segments() {
                    let samples = sample_segment(&seg, tolerance);
                    for pair in samples.windows(2) {
                        if pair[0].distance(pair[1]) > f64::EPSILON {
                            out.push(Primitive::Segment(Line::new(pair[0], pair[1])));
                        }
                    }
                }
                out
            }
        }
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        match self {
            Geometry::Point(p) => {
                if p.x.is_finite() && p.y.is_finite() && p.z.is_finite() {
                    Ok(())
                } else {
                    Err(CamError::GeometryQuery("point has non-finite coordinates".into()))
                }
            }
            Geometry::Curve(curve) => curve.validate(),
        }
    }
}

/// Express a (possibly clockwise) sweep as a counter-clockwise one.
fn normalize_sweep(start: f64, sweep: f64) -> (f64, f64) {
    if sweep.abs() >= TAU {
        return (0.0, TAU);
    }
    if sweep < 0.0 {
        ((start + sweep).rem_euclid(TAU), -sweep)
    } else {
        (start.rem_euclid(TAU), sweep)
    }
}

fn finite_point(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

fn sample_arc(center: Point, radius: f64, start: f64, sweep: f64, tolerance: f64) -> Vec<(f64, f64)> {
    let num_segments = (sweep.abs() * radius / tolerance).ceil().max(4.0) as usize;
    (0..=num_segments)
        .map(|i| {
            let angle = start + sweep * i as f64 / num_segments as f64;
            (center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

fn sample_segment(seg: &PathSeg, tolerance: f64) -> Vec<Point> {
    if let PathSeg::Line(line) = seg {
        return vec![line.p0, line.p1];
    }
    let arclen = seg.arclen(tolerance);
    let num_samples = (arclen / tolerance).ceil().max(2.0) as usize;
    (0..=num_samples)
        .map(|i| seg.eval(i as f64 / num_samples as f64))
        .collect()
}
