//! The user-drawn placement and its derived geometry.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::PlacementConfig;
use crate::geometry::{shape_from_ring, GeometryCapability, Ring, Shape};

/// Stable identifier of a placement, independent of the ECS entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlacementId(pub u64);

/// Form data the user fills in for a placement.
///
/// `power_need` and `amplified_sound` are `None` until the user answers; an
/// unanswered field is what the "missing info" rule looks for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementDetails {
    pub name: String,
    pub description: String,
    pub contact_info: String,
    pub people: u32,
    pub vehicles: u32,
    /// Area of tents, domes and other structures beyond people and vehicles.
    pub additional_sqm: f64,
    /// Watts.
    pub power_need: Option<f64>,
    /// Amplified sound level the camp plans to run.
    pub amplified_sound: Option<u32>,
}

/// A drawn area on the map.
///
/// The ring is private: [`Placement::set_ring`] is the only way to move it and
/// it recomputes the buffer polygon and area in the same call, so anything that
/// reads the buffer always sees the expansion of the current ring.
#[derive(Component, Debug, Clone)]
pub struct Placement {
    pub id: PlacementId,
    pub details: PlacementDetails,
    ring: Ring,
    shape: Shape,
    /// `None` when the ring is degenerate and cannot be buffered.
    buffer: Option<Shape>,
    area: f64,
}

impl Placement {
    pub fn new(
        id: PlacementId,
        ring: Ring,
        details: PlacementDetails,
        geometry: &dyn GeometryCapability,
        fire_buffer_m: f64,
    ) -> Self {
        let mut placement = Self {
            id,
            details,
            ring: Vec::new(),
            shape: Shape::new(Vec::new()),
            buffer: None,
            area: 0.0,
        };
        placement.set_ring(ring, geometry, fire_buffer_m);
        placement
    }

    /// Replace the ring and refresh every derived value.
    pub fn set_ring(&mut self, ring: Ring, geometry: &dyn GeometryCapability, fire_buffer_m: f64) {
        self.shape = shape_from_ring(&ring);
        self.ring = ring;
        self.rebuffer(geometry, fire_buffer_m);
    }

    /// Recompute the buffer polygon and area from the current ring, e.g. after
    /// the fire-safety distance changed.
    pub fn rebuffer(&mut self, geometry: &dyn GeometryCapability, fire_buffer_m: f64) {
        self.area = match geometry.area(&self.shape) {
            Ok(area) => area,
            Err(e) => {
                warn!("Placement {:?}: cannot measure area ({}), using 0", self.id, e);
                0.0
            }
        };
        self.buffer = match geometry.buffer(&self.shape, fire_buffer_m) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                warn!("Placement {:?}: cannot buffer ring ({})", self.id, e);
                None
            }
        };
    }

    pub fn ring(&self) -> &[geo::Coord<f64>] {
        &self.ring
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn buffer(&self) -> Option<&Shape> {
        self.buffer.as_ref()
    }

    /// Raw polygon area in m². Zero for degenerate rings.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Number of distinct vertices (the closing vertex is not counted twice).
    pub fn vertex_count(&self) -> usize {
        let n = self.ring.len();
        if n > 1 && self.ring.first() == self.ring.last() {
            n - 1
        } else {
            n
        }
    }

    /// Area the people, vehicles and extra structures need, in m².
    pub fn calculated_area_needed(&self, config: &PlacementConfig) -> f64 {
        self.details.people as f64 * config.sqm_per_person
            + self.details.vehicles as f64 * config.sqm_per_vehicle
            + self.details.additional_sqm
    }
}
