//! Placement rule checking for user-drawn map areas.
//!
//! Users draw polygons ("placements") on a site map. Every placement is run
//! through a catalog of severity-tagged rules: attribute checks, overlap with
//! other placements, overlap with reference layers, and the fire-safety
//! cluster capacity rule, which sums the area of every placement connected
//! through fire-safety buffers.

pub mod bounds;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod layers;
pub mod placement;
pub mod rules;
pub mod severity;
pub mod spatial_cache;
pub mod systems;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

use bevy::prelude::*;

pub use config::PlacementConfig;
pub use engine::{RuleEngine, RuleReport};
pub use geometry::{GeoGeometry, GeometryBackend, GeometryCapability};
pub use layers::{LayerKind, ReferenceLayer, ReferenceLayers};
pub use placement::{Placement, PlacementDetails, PlacementId};
pub use severity::Severity;
pub use spatial_cache::ClusterCache;
pub use systems::{PlacementDrawn, PlacementEdited, PlacementRejected};

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Ordering label for the placement systems, for hosts that need to run
/// UI code before or after the re-check.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlacementSet;

/// Registers the placement resources, events and systems.
///
/// Resources already inserted by the host (a loaded `PlacementConfig`, a
/// custom `GeometryBackend`) are kept.
pub struct PlacementPlugin;

impl Plugin for PlacementPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlacementConfig>()
            .init_resource::<ReferenceLayers>()
            .init_resource::<GeometryBackend>()
            .init_resource::<ClusterCache>()
            .init_resource::<RuleEngine>()
            .add_event::<PlacementDrawn>()
            .add_event::<PlacementEdited>()
            .add_event::<PlacementRejected>()
            .add_systems(
                Update,
                (
                    systems::spawn_drawn_placements,
                    systems::apply_edits,
                    systems::rebuffer_on_config_change,
                    systems::purge_removed_placements,
                    systems::check_placements,
                )
                    .chain()
                    .in_set(PlacementSet),
            );
    }
}
