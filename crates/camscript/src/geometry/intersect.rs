use crate::error::{CamError, Result};
use crate::geometry::curve::{Curve, Primitive};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use kurbo::{Line, Point, Rect, Vec2};
use std::f64::consts::TAU;

/// Tolerance used when breaking free-form paths into segments.
pub const FLATTEN_TOLERANCE: f64 = 0.01;

const EPSILON: f64 = 1e-9;

/// Slack added around primitive boxes so touching pieces are still compared.
const BOX_TOLERANCE: f64 = 1e-6;

/// Compute every point where two curves cross or touch.
///
/// Overlapping stretches (collinear segments, coincident circles) have no
/// discrete crossing and contribute nothing.
pub fn intersect_curves(a: &Curve, b: &Curve) -> Result<Vec<Point>> {
    a.validate()?;
    b.validate()?;

    let boxed = |curve: &Curve| -> Vec<(Primitive, Rect)> {
        curve
            .primitives(FLATTEN_TOLERANCE)
            .into_iter()
            .map(|p| (p, p.bounding_box().inflate(BOX_TOLERANCE, BOX_TOLERANCE)))
            .collect()
    };
    let prims_a = boxed(a);
    let prims_b = boxed(b);

    let mut points = Vec::new();
    for (pa, box_a) in &prims_a {
        for (pb, box_b) in &prims_b {
            if !boxes_overlap(box_a, box_b) {
                continue;
            }
            points.extend(intersect_primitives(pa, pb)?);
        }
    }
    Ok(points)
}

fn boxes_overlap(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn intersect_primitives(a: &Primitive, b: &Primitive) -> Result<Vec<Point>> {
    let points = match (a, b) {
        (Primitive::Segment(l1), Primitive::Segment(l2)) => segment_segment(*l1, *l2),
        (
            Primitive::Segment(line),
            Primitive::CircleArc {
                center,
                radius,
                start,
                sweep,
            },
        )
        | (
            Primitive::CircleArc {
                center,
                radius,
                start,
                sweep,
            },
            Primitive::Segment(line),
        ) => segment_circle(*line, *center, *radius)
            .into_iter()
            .filter(|p| on_arc(*p, *center, *start, *sweep))
            .collect(),
        (
            Primitive::CircleArc {
                center: c1,
                radius: r1,
                start: s1,
                sweep: w1,
            },
            Primitive::CircleArc {
                center: c2,
                radius: r2,
                start: s2,
                sweep: w2,
            },
        ) => circle_circle(*c1, *r1, *c2, *r2)
            .into_iter()
            .filter(|p| on_arc(*p, *c1, *s1, *w1) && on_arc(*p, *c2, *s2, *w2))
            .collect(),
    };

    if points.iter().any(|p: &Point| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(CamError::GeometryQuery(
            "intersection produced non-finite coordinates".into(),
        ));
    }
    Ok(points)
}

fn segment_segment(l1: Line, l2: Line) -> Vec<Point> {
    let p = geo::Line::new((l1.p0.x, l1.p0.y), (l1.p1.x, l1.p1.y));
    let q = geo::Line::new((l2.p0.x, l2.p0.y), (l2.p1.x, l2.p1.y));
    match line_intersection(p, q) {
        Some(LineIntersection::SinglePoint { intersection, .. }) => {
            vec![Point::new(intersection.x, intersection.y)]
        }
        Some(LineIntersection::Collinear { intersection }) => {
            let start = Point::new(intersection.start.x, intersection.start.y);
            let end = Point::new(intersection.end.x, intersection.end.y);
            if start.distance(end) <= EPSILON {
                vec![start]
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    }
}

/// Points where a finite segment meets a full circle.
fn segment_circle(line: Line, center: Point, radius: f64) -> Vec<Point> {
    let d = line.p1 - line.p0;
    let f = line.p0 - center;
    let a = d.dot(d);
    let b = 2.0 * f.dot(d);
    let c = f.dot(f) - radius * radius;
    let disc = b * b - 4.0 * a * c;

    let scale = EPSILON * a.max(1.0) * radius.max(1.0);
    let params: Vec<f64> = if disc < -scale {
        Vec::new()
    } else if disc.abs() <= scale {
        vec![-b / (2.0 * a)]
    } else {
        let root = disc.sqrt();
        vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
    };

    let t_tol = EPSILON / a.sqrt().max(EPSILON);
    params
        .into_iter()
        .filter(|t| *t >= -t_tol && *t <= 1.0 + t_tol)
        .map(|t| line.p0 + d * t.clamp(0.0, 1.0))
        .collect()
}

/// Points where two full circles meet.
fn circle_circle(c1: Point, r1: f64, c2: Point, r2: f64) -> Vec<Point> {
    let delta: Vec2 = c2 - c1;
    let dist = delta.hypot();
    if dist <= EPSILON {
        // Concentric: either disjoint or coincident, never a discrete crossing.
        return Vec::new();
    }
    let tol = EPSILON * r1.max(r2).max(1.0);
    if dist > r1 + r2 + tol || dist < (r1 - r2).abs() - tol {
        return Vec::new();
    }

    let a = (r1 * r1 - r2 * r2 + dist * dist) / (2.0 * dist);
    let h_sq = r1 * r1 - a * a;
    let unit = delta / dist;
    let base = c1 + unit * a;
    if h_sq <= tol * tol {
        return vec![base];
    }
    let h = h_sq.sqrt();
    let perp = Vec2::new(-unit.y, unit.x);
    vec![base + perp * h, base - perp * h]
}

fn on_arc(p: Point, center: Point, start: f64, sweep: f64) -> bool {
    if sweep >= TAU {
        return true;
    }
    let angle = (p.y - center.y).atan2(p.x - center.x);
    let rel = (angle - start).rem_euclid(TAU);
    let ang_tol = 1e-9;
    rel <= sweep + ang_tol || rel >= TAU - ang_tol
}
