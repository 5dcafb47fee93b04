use crate::error::{CamError, Result};
use kurbo::{Arc, BezPath, Circle, Line, Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub mod curve;
pub mod ids;
pub mod intersect;
pub mod reduce;

// Re-export public types
pub use curve::{Curve, Geometry, Point3, Primitive};
pub use ids::{SymbolId, SymbolReference, SymbolType};
pub use intersect::intersect_curves;
pub use reduce::{dedupe, reduce, sort_by_proximity, LocationPoint, LOCATION_TOLERANCE};

/// Read-only lookup of CAD elements by symbol reference.
pub trait GeometryStore {
    /// Return the element, or `None` if it no longer exists.
    fn lookup(&self, reference: SymbolReference) -> Option<Geometry>;
}

/// Resolve one reference into a live element.
pub fn resolve(store: &dyn GeometryStore, reference: SymbolReference) -> Result<Geometry> {
    store
        .lookup(reference)
        .ok_or(CamError::UnresolvedReference(reference))
}

/// Resolve every reference that still exists, in order. Missing ones are skipped.
pub fn resolve_all(store: &dyn GeometryStore, references: &[SymbolReference]) -> Vec<Geometry> {
    references
        .iter()
        .filter_map(|reference| match resolve(store, *reference) {
            Ok(geometry) => Some(geometry),
            Err(err) => {
                debug!(%err, "skipping reference");
                None
            }
        })
        .collect()
}

/// In-memory store of CAD elements, keyed per symbol type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeRegistry {
    elements: BTreeMap<SymbolType, BTreeMap<SymbolId, Geometry>>,
}

impl ShapeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element under the given type, returning its reference.
    pub fn add(&mut self, symbol_type: SymbolType, geometry: Geometry) -> SymbolReference {
        let by_id = self.elements.entry(symbol_type).or_default();
        let next = by_id
            .keys()
            .next_back()
            .map(|id| id.value() + 1)
            .unwrap_or(1);
        let id = SymbolId::new(next);
        by_id.insert(id, geometry);
        SymbolReference::new(symbol_type, id)
    }

    /// Insert an element with a caller-chosen id, replacing any previous one.
    pub fn insert(&mut self, reference: SymbolReference, geometry: Geometry) -> Option<Geometry> {
        self.elements
            .entry(reference.symbol_type)
            .or_default()
            .insert(reference.id, geometry)
    }

    pub fn get(&self, reference: SymbolReference) -> Option<&Geometry> {
        self.elements
            .get(&reference.symbol_type)
            .and_then(|by_id| by_id.get(&reference.id))
    }

    pub fn remove(&mut self, reference: SymbolReference) -> Option<Geometry> {
        self.elements
            .get_mut(&reference.symbol_type)
            .and_then(|by_id| by_id.remove(&reference.id))
    }

    /// Number of elements across all types.
    pub fn len(&self) -> usize {
        self.elements.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_point(&mut self, x: f64, y: f64, z: f64) -> SymbolReference {
        self.add(SymbolType::Point, Geometry::Point(Point3::new(x, y, z)))
    }

    /// Create a line curve from two points.
    pub fn create_line(&mut self, p0: (f64, f64), p1: (f64, f64)) -> SymbolReference {
        let line = Line::new(Point::new(p0.0, p0.1), Point::new(p1.0, p1.1));
        self.add(SymbolType::Line, Geometry::Curve(Curve::Line(line)))
    }

    /// Create a circle curve.
    pub fn create_circle(&mut self, center: (f64, f64), radius: f64) -> SymbolReference {
        let circle = Circle::new(Point::new(center.0, center.1), radius);
        self.add(SymbolType::Circle, Geometry::Curve(Curve::Circle(circle)))
    }

    /// Create a circular arc; a negative sweep runs clockwise.
    pub fn create_arc(
        &mut self,
        center: (f64, f64),
        radius: f64,
        start_angle: f64,
        sweep_angle: f64,
    ) -> SymbolReference {
        let arc = Arc {
            center: Point::new(center.0, center.1),
            radii: Vec2::new(radius, radius),
            start_angle,
            sweep_angle,
            x_rotation: 0.0,
        };
        self.add(SymbolType::Arc, Geometry::Curve(Curve::Arc(arc)))
    }

    /// Create a free-form sketch from a kurbo BezPath.
    pub fn create_sketch(&mut self, path: BezPath) -> SymbolReference {
        self.add(SymbolType::Sketch, Geometry::Curve(Curve::BezPath(path)))
    }
}

impl GeometryStore for ShapeRegistry {
    fn lookup(&self, reference: SymbolReference) -> Option<Geometry> {
        self.get(reference).cloned()
    }
}
