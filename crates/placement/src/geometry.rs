//! Polygon predicates behind a swappable capability trait.
//!
//! The rule engine never calls `geo` directly: everything goes through
//! [`GeometryCapability`] so tests can count exact-predicate calls and hosts can
//! plug in a different backend. [`GeoGeometry`] validates its input before any
//! predicate runs, so degenerate rings surface as [`GeometryError`] instead of
//! panicking deep inside the overlay code.

use std::fmt;
use std::ops::Deref;

use bevy::prelude::*;
use geo::{
    Area, BoundingRect, Buffer, Coord, CoordsIter, LineString, MultiPolygon, Polygon, Rect, Relate,
    Validation,
};

/// Planar area geometry (one or more polygons).
pub type Shape = MultiPolygon<f64>;

/// A closed ring of planar coordinates in metres.
pub type Ring = Vec<Coord<f64>>;

/// DE-9IM pattern: the two interiors share at least one point.
const INTERIORS_INTERSECT: &str = "T********";
/// DE-9IM pattern for two areas that overlap without either containing the other.
const AREAS_OVERLAP: &str = "T*T***T**";

/// Build a single-polygon shape from a ring. `Polygon::new` closes the ring.
pub fn shape_from_ring(ring: &[Coord<f64>]) -> Shape {
    MultiPolygon::new(vec![Polygon::new(LineString::from(ring.to_vec()), vec![])])
}

/// Convenience for tests and demos: axis-aligned rectangle ring.
pub fn rect_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Ring {
    vec![
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: min_y },
        Coord { x: max_x, y: max_y },
        Coord { x: min_x, y: max_y },
        Coord { x: min_x, y: min_y },
    ]
}

/// Why a geometry operation could not produce a result.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// No polygon, or a ring with fewer than three distinct vertices.
    Empty,
    /// A coordinate is NaN or infinite.
    NonFinite,
    /// Self-intersecting or otherwise invalid polygon.
    Invalid,
    /// The backend failed while evaluating a predicate.
    Predicate(String),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::Empty => write!(f, "empty geometry"),
            GeometryError::NonFinite => write!(f, "non-finite coordinate"),
            GeometryError::Invalid => write!(f, "invalid (self-intersecting) polygon"),
            GeometryError::Predicate(msg) => write!(f, "predicate failed: {msg}"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// The polygon operations the rule engine relies on.
pub trait GeometryCapability: Send + Sync {
    fn area(&self, shape: &Shape) -> Result<f64, GeometryError>;

    /// Interiors intersect and neither shape contains the other.
    fn overlaps(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError>;

    fn contains(&self, outer: &Shape, inner: &Shape) -> Result<bool, GeometryError>;

    fn buffer(&self, shape: &Shape, distance: f64) -> Result<Shape, GeometryError>;

    fn bounding_box(&self, shape: &Shape) -> Result<Rect<f64>, GeometryError>;

    /// Overlap, or containment in either direction.
    fn overlaps_or_contains(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        Ok(self.overlaps(a, b)? || self.contains(a, b)? || self.contains(b, a)?)
    }
}

/// [`GeometryCapability`] backed by the `geo` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoGeometry;

impl GeoGeometry {
    fn check(shape: &Shape) -> Result<(), GeometryError> {
        let has_area_ring = shape.0.iter().any(|p| distinct_vertices(p.exterior()) >= 3);
        if !has_area_ring {
            return Err(GeometryError::Empty);
        }
        if shape.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if !shape.is_valid() {
            return Err(GeometryError::Invalid);
        }
        Ok(())
    }

    fn relate_matches(a: &Shape, b: &Shape, pattern: &str) -> Result<bool, GeometryError> {
        Self::check(a)?;
        Self::check(b)?;
        a.relate(b)
            .matches(pattern)
            .map_err(|e| GeometryError::Predicate(format!("{e:?}")))
    }
}

/// Vertex count of a closed ring, not counting the closing duplicate.
fn distinct_vertices(ring: &LineString<f64>) -> usize {
    let n = ring.0.len();
    if n > 1 && ring.0.first() == ring.0.last() {
        n - 1
    } else {
        n
    }
}

impl GeometryCapability for GeoGeometry {
    fn area(&self, shape: &Shape) -> Result<f64, GeometryError> {
        Self::check(shape)?;
        Ok(shape.unsigned_area())
    }

    fn overlaps(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        Self::relate_matches(a, b, AREAS_OVERLAP)
    }

    fn contains(&self, outer: &Shape, inner: &Shape) -> Result<bool, GeometryError> {
        Self::check(outer)?;
        Self::check(inner)?;
        Ok(outer.relate(inner).is_contains())
    }

    fn buffer(&self, shape: &Shape, distance: f64) -> Result<Shape, GeometryError> {
        Self::check(shape)?;
        if !distance.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        let buffered = Buffer::buffer(shape, distance);
        if buffered.0.is_empty() {
            return Err(GeometryError::Empty);
        }
        Ok(buffered)
    }

    fn bounding_box(&self, shape: &Shape) -> Result<Rect<f64>, GeometryError> {
        let rect = shape.bounding_rect().ok_or(GeometryError::Empty)?;
        let (min, max) = (rect.min(), rect.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        Ok(rect)
    }

    // One relate call instead of three.
    fn overlaps_or_contains(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        Self::relate_matches(a, b, INTERIORS_INTERSECT)
    }
}

/// The geometry backend used by every placement system.
#[derive(Resource)]
pub struct GeometryBackend(pub Box<dyn GeometryCapability>);

impl Default for GeometryBackend {
    fn default() -> Self {
        Self(Box::new(GeoGeometry))
    }
}

impl Deref for GeometryBackend {
    type Target = dyn GeometryCapability;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
