//! Static reference layers (borders, zones) that placements are checked against.

use std::collections::HashMap;

use bevy::prelude::*;
use geo::Rect;
use serde::{Deserialize, Serialize};

use crate::bounds::boxes_intersect;
use crate::geometry::{GeometryCapability, GeometryError, Shape};

/// The named reference layers the rule catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Outer border of the land the event may use.
    PropertyBorder,
    /// Areas open for placements this year (the yellow border).
    PlacementArea,
    /// Zones closed this year, not shown on the public map.
    HiddenForbidden,
    FireRoad,
    Road,
    Slope,
    Hazard,
    Sanctuary,
}

impl LayerKind {
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::PropertyBorder => "property border",
            LayerKind::PlacementArea => "placement area",
            LayerKind::HiddenForbidden => "forbidden zone",
            LayerKind::FireRoad => "fire road",
            LayerKind::Road => "road",
            LayerKind::Slope => "slope",
            LayerKind::Hazard => "hazard zone",
            LayerKind::Sanctuary => "sanctuary",
        }
    }
}

/// One reference feature with its bounding box precomputed.
#[derive(Debug, Clone)]
pub struct LayerFeature {
    pub shape: Shape,
    bbox: Option<Rect<f64>>,
}

/// A read-only collection of reference polygons.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLayer {
    features: Vec<LayerFeature>,
}

impl ReferenceLayer {
    pub fn new(shapes: Vec<Shape>, geometry: &dyn GeometryCapability) -> Self {
        let features = shapes
            .into_iter()
            .map(|shape| {
                let bbox = match geometry.bounding_box(&shape) {
                    Ok(rect) => Some(rect),
                    Err(e) => {
                        warn!("Reference feature skipped from box pruning: {}", e);
                        None
                    }
                };
                LayerFeature { shape, bbox }
            })
            .collect();
        Self { features }
    }

    pub fn features(&self) -> &[LayerFeature] {
        &self.features
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// True if `shape` overlaps, contains, or lies inside any feature.
    ///
    /// Features whose box misses `shape_box` are skipped. Features that fail
    /// the exact test are logged and treated as not overlapping.
    pub fn any_overlaps_or_contains(
        &self,
        shape: &Shape,
        shape_box: &Rect<f64>,
        geometry: &dyn GeometryCapability,
    ) -> bool {
        self.features
            .iter()
            .filter(|f| f.bbox.map_or(true, |b| boxes_intersect(&b, shape_box)))
            .any(|f| log_failure(geometry.overlaps_or_contains(&f.shape, shape)))
    }

    /// True if any feature fully contains `shape`.
    pub fn any_contains(
        &self,
        shape: &Shape,
        shape_box: &Rect<f64>,
        geometry: &dyn GeometryCapability,
    ) -> bool {
        self.features
            .iter()
            .filter(|f| f.bbox.map_or(true, |b| boxes_intersect(&b, shape_box)))
            .any(|f| log_failure(geometry.contains(&f.shape, shape)))
    }
}

fn log_failure(result: Result<bool, GeometryError>) -> bool {
    result.unwrap_or_else(|e| {
        warn!("Reference layer test failed: {}", e);
        false
    })
}

/// All reference layers, keyed by kind. Absent kinds are simply not checked.
#[derive(Resource, Debug, Clone, Default)]
pub struct ReferenceLayers {
    layers: HashMap<LayerKind, ReferenceLayer>,
}

impl ReferenceLayers {
    pub fn insert(&mut self, kind: LayerKind, layer: ReferenceLayer) {
        self.layers.insert(kind, layer);
    }

    /// Returns the layer only if it exists and has at least one feature.
    pub fn get(&self, kind: LayerKind) -> Option<&ReferenceLayer> {
        self.layers.get(&kind).filter(|layer| !layer.is_empty())
    }

    pub fn remove(&mut self, kind: LayerKind) -> Option<ReferenceLayer> {
        self.layers.remove(&kind)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{rect_ring, shape_from_ring, GeoGeometry};

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Shape {
        shape_from_ring(&rect_ring(min_x, min_y, max_x, max_y))
    }

    fn bbox(shape: &Shape) -> Rect<f64> {
        GeoGeometry.bounding_box(shape).unwrap()
    }

    #[test]
    fn test_missing_and_empty_layers_are_absent() {
        let mut layers = ReferenceLayers::default();
        assert!(layers.get(LayerKind::Slope).is_none());
        layers.insert(LayerKind::Slope, ReferenceLayer::new(vec![], &GeoGeometry));
        assert!(layers.get(LayerKind::Slope).is_none());
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn test_overlap_with_second_feature() {
        let layer = ReferenceLayer::new(
            vec![rect(100.0, 100.0, 110.0, 110.0), rect(0.0, 0.0, 10.0, 10.0)],
            &GeoGeometry,
        );
        let shape = rect(5.0, 5.0, 15.0, 15.0);
        assert!(layer.any_overlaps_or_contains(&shape, &bbox(&shape), &GeoGeometry));
    }

    #[test]
    fn test_inside_feature_counts_as_overlap() {
        let layer = ReferenceLayer::new(vec![rect(0.0, 0.0, 100.0, 100.0)], &GeoGeometry);
        let shape = rect(10.0, 10.0, 20.0, 20.0);
        assert!(layer.any_overlaps_or_contains(&shape, &bbox(&shape), &GeoGeometry));
        assert!(layer.any_contains(&shape, &bbox(&shape), &GeoGeometry));
    }

    #[test]
    fn test_partial_overlap_is_not_containment() {
        let layer = ReferenceLayer::new(vec![rect(0.0, 0.0, 10.0, 10.0)], &GeoGeometry);
        let shape = rect(5.0, 5.0, 15.0, 15.0);
        assert!(!layer.any_contains(&shape, &bbox(&shape), &GeoGeometry));
    }

    #[test]
    fn test_far_shape_does_not_overlap() {
        let layer = ReferenceLayer::new(vec![rect(0.0, 0.0, 10.0, 10.0)], &GeoGeometry);
        let shape = rect(50.0, 50.0, 60.0, 60.0);
        assert!(!layer.any_overlaps_or_contains(&shape, &bbox(&shape), &GeoGeometry));
    }
}
