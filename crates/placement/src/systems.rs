//! ECS glue: draw/edit events in, `RuleReport` components out.
//!
//! Everything runs in one chained `Update` pass, so a reshape, the cache
//! refresh it causes and the re-check that reads the cache all happen in
//! order within the same frame.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::config::PlacementConfig;
use crate::engine::RuleEngine;
use crate::geometry::{GeometryBackend, Ring};
use crate::layers::ReferenceLayers;
use crate::placement::{Placement, PlacementDetails, PlacementId};
use crate::rules::RuleContext;
use crate::spatial_cache::ClusterCache;

/// The user finished drawing a new polygon.
#[derive(Event, Debug, Clone)]
pub struct PlacementDrawn {
    pub id: PlacementId,
    pub ring: Ring,
    pub details: PlacementDetails,
}

/// The user dragged or removed a vertex of an existing placement.
#[derive(Event, Debug, Clone)]
pub struct PlacementEdited {
    pub entity: Entity,
    pub ring: Ring,
}

/// A drawn polygon was too large to become a placement.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct PlacementRejected {
    pub id: PlacementId,
    pub area: f64,
    pub max_area: f64,
}

/// Spawns drawn polygons, rejecting ones larger than `max_drawn_area_sqm`.
pub fn spawn_drawn_placements(
    mut commands: Commands,
    mut drawn: EventReader<PlacementDrawn>,
    mut rejected: EventWriter<PlacementRejected>,
    config: Res<PlacementConfig>,
    geometry: Res<GeometryBackend>,
) {
    for event in drawn.read() {
        let placement = Placement::new(
            event.id,
            event.ring.clone(),
            event.details.clone(),
            &**geometry,
            config.fire_buffer_m,
        );
        if placement.area() > config.max_drawn_area_sqm {
            warn!(
                "Drawn placement {:?} is {:.0} m², over the {:.0} m² limit; draw something smaller",
                event.id,
                placement.area(),
                config.max_drawn_area_sqm
            );
            rejected.send(PlacementRejected {
                id: event.id,
                area: placement.area(),
                max_area: config.max_drawn_area_sqm,
            });
            continue;
        }
        commands.spawn(placement);
    }
}

/// Applies reshapes. `set_ring` refreshes the buffer before anything reads it.
pub fn apply_edits(
    mut edits: EventReader<PlacementEdited>,
    config: Res<PlacementConfig>,
    geometry: Res<GeometryBackend>,
    mut placements: Query<&mut Placement>,
) {
    for edit in edits.read() {
        match placements.get_mut(edit.entity) {
            Ok(mut placement) => {
                placement.set_ring(edit.ring.clone(), &**geometry, config.fire_buffer_m)
            }
            Err(_) => warn!("Edit for {:?} ignored: not a placement", edit.entity),
        }
    }
}

/// A new fire-safety distance invalidates every buffer and every cached overlap.
pub fn rebuffer_on_config_change(
    config: Res<PlacementConfig>,
    geometry: Res<GeometryBackend>,
    mut cache: ResMut<ClusterCache>,
    mut placements: Query<&mut Placement>,
) {
    if !config.is_changed() {
        return;
    }
    cache.clear();
    for mut placement in &mut placements {
        placement.rebuffer(&**geometry, config.fire_buffer_m);
    }
    debug!(
        "Placement config changed: re-buffered placements at {} m",
        config.fire_buffer_m
    );
}

/// Drops cache entries and reports of despawned placements.
pub fn purge_removed_placements(
    mut removed: RemovedComponents<Placement>,
    mut known: Local<HashMap<Entity, PlacementId>>,
    placements: Query<(Entity, &Placement), Changed<Placement>>,
    mut cache: ResMut<ClusterCache>,
    mut engine: ResMut<RuleEngine>,
) {
    for (entity, placement) in &placements {
        known.insert(entity, placement.id);
    }
    for entity in removed.read() {
        if let Some(id) = known.remove(&entity) {
            cache.invalidate(id);
            engine.forget(id);
            debug!("Placement {:?} removed, cache entries purged", id);
        }
    }
}

/// Re-checks every placement whenever any placement, the config or the
/// reference layers changed, and stores the result as a `RuleReport`.
///
/// Every placement is re-checked because overlap and cluster verdicts of
/// untouched neighbours depend on the edited one.
#[allow(clippy::too_many_arguments)]
pub fn check_placements(
    mut commands: Commands,
    config: Res<PlacementConfig>,
    layers: Res<ReferenceLayers>,
    geometry: Res<GeometryBackend>,
    mut cache: ResMut<ClusterCache>,
    mut engine: ResMut<RuleEngine>,
    mut removed: RemovedComponents<Placement>,
    changed: Query<(), Changed<Placement>>,
    placements: Query<(Entity, &Placement)>,
) {
    let any_removed = removed.read().count() > 0;
    if changed.is_empty() && !any_removed && !config.is_changed() && !layers.is_changed() {
        return;
    }

    let pool: Vec<&Placement> = placements.iter().map(|(_, p)| p).collect();
    let mut ctx = RuleContext {
        config: &config,
        layers: &layers,
        geometry: &**geometry,
        pool: &pool,
        cache: &mut cache,
    };
    for (entity, placement) in &placements {
        let report = engine.check_all(placement, &mut ctx).clone();
        commands.entity(entity).insert(report);
    }
}
