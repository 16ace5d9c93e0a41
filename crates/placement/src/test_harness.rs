//! # TestSite: headless integration test harness
//!
//! Wraps `bevy::app::App` + `PlacementPlugin` so tests can draw, edit and
//! delete placements and assert on the `RuleReport` each one ends up with.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bevy::app::App;
use bevy::prelude::*;

use crate::config::PlacementConfig;
use crate::engine::RuleReport;
use crate::geometry::{
    shape_from_ring, GeoGeometry, GeometryBackend, GeometryCapability, GeometryError, Ring, Shape,
};
use crate::layers::{LayerKind, ReferenceLayer, ReferenceLayers};
use crate::placement::{Placement, PlacementDetails, PlacementId};
use crate::rules::RuleKind;
use crate::spatial_cache::ClusterCache;
use crate::systems::{PlacementDrawn, PlacementEdited, PlacementRejected};
use crate::PlacementPlugin;

/// A headless Bevy App wrapping `PlacementPlugin`.
///
/// Every mutating helper runs one `app.update()`, so reports are current
/// when it returns.
pub struct TestSite {
    app: App,
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSite {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Empty site: default config, no reference layers, `geo` backend.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(PlacementPlugin);
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // Site setup (builder pattern, consumes and returns Self)
    // -----------------------------------------------------------------------

    pub fn with_config(mut self, config: PlacementConfig) -> Self {
        self.app.insert_resource(config);
        self.app.update();
        self
    }

    /// Swap the geometry backend. Only placements created afterwards use it
    /// for their buffer; rule checks use it from the next update on.
    pub fn with_geometry(mut self, geometry: impl GeometryCapability + 'static) -> Self {
        self.app.insert_resource(GeometryBackend(Box::new(geometry)));
        self
    }

    /// Add a reference layer made of the given rings.
    pub fn with_layer(mut self, kind: LayerKind, rings: Vec<Ring>) -> Self {
        let shapes: Vec<Shape> = rings.iter().map(|r| shape_from_ring(r)).collect();
        let layer = ReferenceLayer::new(shapes, &GeoGeometry);
        self.app
            .world_mut()
            .resource_mut::<ReferenceLayers>()
            .insert(kind, layer);
        self.app.update();
        self
    }

    // -----------------------------------------------------------------------
    // Placement actions
    // -----------------------------------------------------------------------

    /// Spawn a placement directly, bypassing the draw-size gate.
    pub fn place(&mut self, id: u64, ring: Ring, details: PlacementDetails) -> Entity {
        let world = self.app.world_mut();
        let placement = {
            let config = world.resource::<PlacementConfig>();
            let geometry = world.resource::<GeometryBackend>();
            Placement::new(PlacementId(id), ring, details, &**geometry, config.fire_buffer_m)
        };
        let entity = world.spawn(placement).id();
        self.app.update();
        entity
    }

    /// Send a `PlacementDrawn` event, as the drawing tool does.
    pub fn draw(&mut self, id: u64, ring: Ring, details: PlacementDetails) {
        self.app.world_mut().send_event(PlacementDrawn {
            id: PlacementId(id),
            ring,
            details,
        });
        self.app.update();
    }

    pub fn reshape(&mut self, entity: Entity, ring: Ring) {
        self.app
            .world_mut()
            .send_event(PlacementEdited { entity, ring });
        self.app.update();
    }

    pub fn remove(&mut self, entity: Entity) {
        self.app.world_mut().despawn(entity);
        self.app.update();
    }

    pub fn set_fire_buffer(&mut self, metres: f64) {
        self.app
            .world_mut()
            .resource_mut::<PlacementConfig>()
            .fire_buffer_m = metres;
        self.app.update();
    }

    pub fn remove_layer(&mut self, kind: LayerKind) {
        self.app
            .world_mut()
            .resource_mut::<ReferenceLayers>()
            .remove(kind);
        self.app.update();
    }

    /// Run N updates without changing anything.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn cache(&self) -> &ClusterCache {
        self.resource::<ClusterCache>()
    }

    /// Latest report of `entity`. Panics if it was never checked.
    pub fn report(&self, entity: Entity) -> RuleReport {
        self.app
            .world()
            .get::<RuleReport>(entity)
            .cloned()
            .unwrap_or_else(|| panic!("{entity:?} has no RuleReport"))
    }

    /// Kinds of the triggered rules of `entity`, worst first.
    pub fn triggered(&self, entity: Entity) -> Vec<RuleKind> {
        self.report(entity).triggered.iter().map(|v| v.kind).collect()
    }

    pub fn has_triggered(&self, entity: Entity, kind: RuleKind) -> bool {
        self.triggered(entity).contains(&kind)
    }

    pub fn placement_count(&mut self) -> usize {
        self.app
            .world_mut()
            .query::<&Placement>()
            .iter(self.app.world())
            .count()
    }

    /// Entity of the placement with `id`, if it exists.
    pub fn entity_of(&mut self, id: u64) -> Option<Entity> {
        let world = self.app.world_mut();
        let mut query = world.query::<(Entity, &Placement)>();
        query
            .iter(world)
            .find(|(_, p)| p.id == PlacementId(id))
            .map(|(entity, _)| entity)
    }

    /// Rejections sent during the last update.
    pub fn rejections(&self) -> Vec<PlacementRejected> {
        self.app
            .world()
            .resource::<Events<PlacementRejected>>()
            .iter_current_update_events()
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CountingGeometry
// ---------------------------------------------------------------------------

/// `geo` backend that counts calls, for asserting the cache and the box
/// pruning avoid exact predicates.
///
/// Clones share their counters, so a test can keep one clone after moving
/// another into `GeometryBackend`.
#[derive(Debug, Default, Clone)]
pub struct CountingGeometry {
    inner: GeoGeometry,
    exact: Arc<AtomicUsize>,
    area: Arc<AtomicUsize>,
}

impl CountingGeometry {
    /// Calls to `overlaps`, `contains` and `overlaps_or_contains`.
    pub fn exact_calls(&self) -> usize {
        self.exact.load(Ordering::Relaxed)
    }

    pub fn area_calls(&self) -> usize {
        self.area.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.exact.store(0, Ordering::Relaxed);
        self.area.store(0, Ordering::Relaxed);
    }
}

impl GeometryCapability for CountingGeometry {
    fn area(&self, shape: &Shape) -> Result<f64, GeometryError> {
        self.area.fetch_add(1, Ordering::Relaxed);
        self.inner.area(shape)
    }

    fn overlaps(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        self.exact.fetch_add(1, Ordering::Relaxed);
        self.inner.overlaps(a, b)
    }

    fn contains(&self, outer: &Shape, inner: &Shape) -> Result<bool, GeometryError> {
        self.exact.fetch_add(1, Ordering::Relaxed);
        self.inner.contains(outer, inner)
    }

    fn buffer(&self, shape: &Shape, distance: f64) -> Result<Shape, GeometryError> {
        self.inner.buffer(shape, distance)
    }

    fn bounding_box(&self, shape: &Shape) -> Result<geo::Rect<f64>, GeometryError> {
        self.inner.bounding_box(shape)
    }

    fn overlaps_or_contains(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
        self.exact.fetch_add(1, Ordering::Relaxed);
        self.inner.overlaps_or_contains(a, b)
    }
}
