//! Memoized areas and pairwise buffered-overlap results, keyed by placement id.
//!
//! Every entry was computed from one specific ring. The cache remembers that
//! ring (`last_coords`) and [`ClusterCache::refresh`] purges everything keyed
//! by an id whose ring moved, so nothing is ever served across a geometry
//! change. Callers refresh an id before their first read of it in a pass; the
//! cluster aggregator does this itself.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use geo::Coord;
use xxhash_rust::xxh32::Xxh32;

use crate::placement::PlacementId;

const FINGERPRINT_SEED: u32 = 0x5eed_f17e;

/// The ring a set of cache entries was computed from.
///
/// The fingerprint rejects most changed rings without walking them; equal
/// fingerprints still fall through to an exact comparison.
#[derive(Debug, Clone)]
struct CoordSnapshot {
    fingerprint: u32,
    coords: Vec<Coord<f64>>,
}

impl CoordSnapshot {
    fn new(coords: &[Coord<f64>]) -> Self {
        Self {
            fingerprint: fingerprint(coords),
            coords: coords.to_vec(),
        }
    }

    fn matches(&self, coords: &[Coord<f64>]) -> bool {
        self.coords.len() == coords.len()
            && self.fingerprint == fingerprint(coords)
            && self
                .coords
                .iter()
                .zip(coords)
                .all(|(a, b)| a.x.to_bits() == b.x.to_bits() && a.y.to_bits() == b.y.to_bits())
    }
}

fn fingerprint(coords: &[Coord<f64>]) -> u32 {
    let mut hasher = Xxh32::new(FINGERPRINT_SEED);
    for c in coords {
        hasher.update(&c.x.to_le_bytes());
        hasher.update(&c.y.to_le_bytes());
    }
    hasher.digest()
}

/// Unordered pair key: `(a, b)` and `(b, a)` map to the same slot.
fn pair_key(a: PlacementId, b: PlacementId) -> (PlacementId, PlacementId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Spatial cache shared by the cluster aggregator and the rule engine.
#[derive(Resource, Debug, Default)]
pub struct ClusterCache {
    area: HashMap<PlacementId, f64>,
    overlap: HashMap<(PlacementId, PlacementId), bool>,
    /// For each id, the ids it has an overlap entry with. Lets `invalidate`
    /// purge a placement's pairs without scanning the whole overlap map.
    partners: HashMap<PlacementId, HashSet<PlacementId>>,
    last_coords: HashMap<PlacementId, CoordSnapshot>,
}

impl ClusterCache {
    /// True if no snapshot exists for `id` or it differs from `current`.
    pub fn coords_changed(&self, id: PlacementId, current: &[Coord<f64>]) -> bool {
        self.last_coords
            .get(&id)
            .map_or(true, |snapshot| !snapshot.matches(current))
    }

    /// Drop the area, every overlap pair involving `id`, and the snapshot.
    pub fn invalidate(&mut self, id: PlacementId) {
        self.area.remove(&id);
        if let Some(partners) = self.partners.remove(&id) {
            for other in partners {
                self.overlap.remove(&pair_key(id, other));
                if let Some(set) = self.partners.get_mut(&other) {
                    set.remove(&id);
                }
            }
        }
        self.last_coords.remove(&id);
    }

    /// Invalidate `id` if its ring changed, then record `current` as its snapshot.
    /// Returns whether anything was invalidated.
    pub fn refresh(&mut self, id: PlacementId, current: &[Coord<f64>]) -> bool {
        if !self.coords_changed(id, current) {
            return false;
        }
        self.invalidate(id);
        self.last_coords.insert(id, CoordSnapshot::new(current));
        true
    }

    pub fn area(&self, id: PlacementId) -> Option<f64> {
        self.area.get(&id).copied()
    }

    pub fn set_area(&mut self, id: PlacementId, value: f64) {
        self.area.insert(id, value);
    }

    pub fn overlap(&self, a: PlacementId, b: PlacementId) -> Option<bool> {
        self.overlap.get(&pair_key(a, b)).copied()
    }

    pub fn set_overlap(&mut self, a: PlacementId, b: PlacementId, value: bool) {
        self.overlap.insert(pair_key(a, b), value);
        self.partners.entry(a).or_default().insert(b);
        self.partners.entry(b).or_default().insert(a);
    }

    /// Forget everything, e.g. after the fire-safety distance changed.
    pub fn clear(&mut self) {
        self.area.clear();
        self.overlap.clear();
        self.partners.clear();
        self.last_coords.clear();
    }

    pub fn area_entries(&self) -> usize {
        self.area.len()
    }

    pub fn overlap_entries(&self) -> usize {
        self.overlap.len()
    }
}
