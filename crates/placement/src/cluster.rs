//! Fire-safety cluster aggregation.
//!
//! Two placements belong to the same cluster when one's buffer polygon
//! overlaps (or contains, or lies in) the other's polygon. Clusters are the
//! connected components of that relation, and the combined area of a
//! component is what the capacity rule compares against `max_cluster_sqm`.
//!
//! The traversal is an explicit depth-first walk with a visited set, so
//! overlap cycles terminate and every member is counted once. Pairs are
//! pruned with padded bounding boxes before the exact predicate runs, and
//! every area/overlap result goes through the [`ClusterCache`].

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use geo::Rect;

use crate::bounds::{boxes_intersect, padded};
use crate::config::PlacementConfig;
use crate::geometry::GeometryCapability;
use crate::placement::{Placement, PlacementId};
use crate::spatial_cache::ClusterCache;

/// Result of one cluster traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    /// Members in visiting order; the start placement is first.
    pub members: Vec<PlacementId>,
    pub total_area: f64,
}

/// Per-call bookkeeping. Never outlives one top-level traversal.
#[derive(Default)]
struct Pass {
    visited: HashSet<PlacementId>,
    refreshed: HashSet<PlacementId>,
    boxes: HashMap<PlacementId, Option<Rect<f64>>>,
}

/// Walks overlap clusters using an injected cache and geometry backend.
pub struct ClusterAggregator<'a> {
    cache: &'a mut ClusterCache,
    geometry: &'a dyn GeometryCapability,
    fire_buffer_m: f64,
    bbox_epsilon_m: f64,
}

impl<'a> ClusterAggregator<'a> {
    pub fn new(
        cache: &'a mut ClusterCache,
        geometry: &'a dyn GeometryCapability,
        config: &PlacementConfig,
    ) -> Self {
        Self {
            cache,
            geometry,
            fire_buffer_m: config.fire_buffer_m,
            bbox_epsilon_m: config.bbox_epsilon_m,
        }
    }

    /// Total area of the cluster containing `start`, drawn from `pool`.
    pub fn cluster_area(&mut self, start: &Placement, pool: &[&Placement]) -> f64 {
        self.cluster(start, pool).total_area
    }

    /// Members and total area of the cluster containing `start`.
    ///
    /// `pool` may include `start` itself; it is skipped by id.
    pub fn cluster(&mut self, start: &Placement, pool: &[&Placement]) -> Cluster {
        let mut pass = Pass::default();
        let mut cluster = Cluster::default();
        let mut stack: Vec<&Placement> = vec![start];

        while let Some(current) = stack.pop() {
            if !pass.visited.insert(current.id) {
                continue;
            }
            self.refresh_once(current, &mut pass);
            cluster.total_area += self.area_of(current);
            cluster.members.push(current.id);

            let Some(reach) = self
                .box_of(current, &mut pass)
                .map(|rect| padded(rect, self.fire_buffer_m + self.bbox_epsilon_m))
            else {
                continue;
            };

            for &other in pool {
                if other.id == current.id || pass.visited.contains(&other.id) {
                    continue;
                }
                self.refresh_once(other, &mut pass);
                if self.within_buffer(current, &reach, other, &mut pass) {
                    stack.push(other);
                }
            }
        }

        cluster
    }

    /// First placement in `pool` whose polygon overlaps, contains, or lies
    /// inside `placement`'s polygon. Raw polygons, no buffer, not cached.
    pub fn first_overlapping(
        &self,
        placement: &Placement,
        pool: &[&Placement],
    ) -> Option<PlacementId> {
        let own_box = match self.geometry.bounding_box(placement.shape()) {
            Ok(rect) => rect,
            Err(e) => {
                warn!("Placement {:?}: no bounding box ({})", placement.id, e);
                return None;
            }
        };
        pool.iter()
            .filter(|other| other.id != placement.id)
            .filter(|other| {
                self.geometry
                    .bounding_box(other.shape())
                    .is_ok_and(|b| boxes_intersect(&own_box, &b))
            })
            .find(|other| {
                match self
                    .geometry
                    .overlaps_or_contains(placement.shape(), other.shape())
                {
                    Ok(hit) => hit,
                    Err(e) => {
                        warn!(
                            "Overlap test {:?} vs {:?} failed: {}",
                            placement.id, other.id, e
                        );
                        false
                    }
                }
            })
            .map(|other| other.id)
    }

    pub fn cache(&self) -> &ClusterCache {
        &*self.cache
    }

    /// Purge stale entries for `p` before its first read in this pass.
    fn refresh_once(&mut self, p: &Placement, pass: &mut Pass) {
        if pass.refreshed.insert(p.id) && self.cache.refresh(p.id, p.ring()) {
            debug!("Cluster cache: ring of {:?} changed, entries purged", p.id);
        }
    }

    fn area_of(&mut self, p: &Placement) -> f64 {
        if let Some(area) = self.cache.area(p.id) {
            return area;
        }
        let area = match self.geometry.area(p.shape()) {
            Ok(area) => area,
            Err(e) => {
                warn!("Placement {:?}: counted as 0 m² in cluster ({})", p.id, e);
                0.0
            }
        };
        self.cache.set_area(p.id, area);
        area
    }

    fn box_of(&self, p: &Placement, pass: &mut Pass) -> Option<Rect<f64>> {
        *pass
            .boxes
            .entry(p.id)
            .or_insert_with(|| match self.geometry.bounding_box(p.shape()) {
                Ok(rect) => Some(rect),
                Err(e) => {
                    warn!("Placement {:?}: no bounding box ({})", p.id, e);
                    None
                }
            })
    }

    /// Cached, box-pruned test of `current`'s buffer against `other`'s polygon.
    fn within_buffer(
        &mut self,
        current: &Placement,
        reach: &Rect<f64>,
        other: &Placement,
        pass: &mut Pass,
    ) -> bool {
        if let Some(hit) = self.cache.overlap(current.id, other.id) {
            return hit;
        }
        let hit = match self.box_of(other, pass) {
            Some(other_box) if boxes_intersect(reach, &other_box) => {
                self.exact_within_buffer(current, other)
            }
            _ => false,
        };
        self.cache.set_overlap(current.id, other.id, hit);
        hit
    }

    fn exact_within_buffer(&self, current: &Placement, other: &Placement) -> bool {
        let Some(buffer) = current.buffer() else {
            warn!("Placement {:?}: no buffer polygon, treated as isolated", current.id);
            return false;
        };
        match self.geometry.overlaps_or_contains(buffer, other.shape()) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(
                    "Buffer test {:?} vs {:?} failed, treated as no overlap: {}",
                    current.id, other.id, e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{rect_ring, GeoGeometry, Ring};
    use crate::placement::PlacementDetails;
    use crate::test_harness::CountingGeometry;

    fn placement(id: u64, ring: Ring) -> Placement {
        Placement::new(
            PlacementId(id),
            ring,
            PlacementDetails::default(),
            &GeoGeometry,
            PlacementConfig::default().fire_buffer_m,
        )
    }

    /// 20x20 square (400 m²) with its lower-left corner at (x, y).
    fn square(id: u64, x: f64, y: f64) -> Placement {
        placement(id, rect_ring(x, y, x + 20.0, y + 20.0))
    }

    fn area(cache: &mut ClusterCache, start: &Placement, pool: &[&Placement]) -> f64 {
        let config = PlacementConfig::default();
        ClusterAggregator::new(cache, &GeoGeometry, &config).cluster_area(start, pool)
    }

    #[test]
    fn test_lone_placement_is_its_own_cluster() {
        let a = square(1, 0.0, 0.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &a, &[&a]) - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_neighbours_within_buffer_join() {
        // 3 m gap, buffer is 5 m.
        let a = square(1, 0.0, 0.0);
        let b = square(2, 23.0, 0.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &a, &[&a, &b]) - 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_neighbours_beyond_buffer_stay_apart() {
        // 8 m gap
        let a = square(1, 0.0, 0.0);
        let b = square(2, 28.0, 0.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &a, &[&a, &b]) - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_chain_is_transitive() {
        // a-b and b-c are within the buffer, a-c are 46 m apart.
        let a = square(1, 0.0, 0.0);
        let b = square(2, 23.0, 0.0);
        let c = square(3, 46.0, 0.0);
        let mut cache = ClusterCache::default();
        let config = PlacementConfig::default();
        let cluster =
            ClusterAggregator::new(&mut cache, &GeoGeometry, &config).cluster(&a, &[&a, &b, &c]);
        assert_eq!(cluster.members.len(), 3);
        assert_eq!(cluster.members[0], PlacementId(1));
        assert!((cluster.total_area - 1200.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric_from_every_start() {
        let a = square(1, 0.0, 0.0);
        let b = square(2, 10.0, 10.0);
        let c = square(3, 5.0, 22.0);
        let pool = [&a, &b, &c];
        let mut cache = ClusterCache::default();
        for start in pool {
            assert!((area(&mut cache, start, &pool) - 1200.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_three_way_cycle_counts_each_once() {
        // Pairwise overlapping triangle of squares.
        let a = square(1, 0.0, 0.0);
        let b = square(2, 10.0, 0.0);
        let c = square(3, 5.0, 10.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &b, &[&a, &b, &c]) - 1200.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_pool_entries_are_counted_once() {
        let a = square(1, 0.0, 0.0);
        let b = square(2, 23.0, 0.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &a, &[&b, &a, &b, &b]) - 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_repeat_call_is_idempotent() {
        let a = square(1, 0.0, 0.0);
        let b = square(2, 23.0, 0.0);
        let c = square(3, 200.0, 0.0);
        let pool = [&a, &b, &c];
        let mut cache = ClusterCache::default();
        let first = area(&mut cache, &a, &pool);
        let entries = (cache.area_entries(), cache.overlap_entries());
        let overlap_ab = cache.overlap(a.id, b.id);
        let second = area(&mut cache, &a, &pool);
        assert_eq!(first, second);
        assert_eq!(entries, (cache.area_entries(), cache.overlap_entries()));
        assert_eq!(cache.overlap(a.id, b.id), overlap_ab);
    }

    #[test]
    fn test_repeat_call_skips_exact_predicates() {
        let geometry = CountingGeometry::default();
        let config = PlacementConfig::default();
        let a = square(1, 0.0, 0.0);
        let b = square(2, 23.0, 0.0);
        let mut cache = ClusterCache::default();

        ClusterAggregator::new(&mut cache, &geometry, &config).cluster_area(&a, &[&a, &b]);
        let after_first = geometry.exact_calls();
        assert!(after_first > 0);

        ClusterAggregator::new(&mut cache, &geometry, &config).cluster_area(&a, &[&a, &b]);
        assert_eq!(geometry.exact_calls(), after_first);
        assert_eq!(geometry.area_calls(), 2, "areas should come from the cache");
    }

    #[test]
    fn test_moved_placement_is_recomputed() {
        let a = square(1, 0.0, 0.0);
        let mut b = square(2, 23.0, 0.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &a, &[&a, &b]) - 800.0).abs() < 1e-6);

        // Move b far away and shrink it; stale overlap and area must not be reused.
        b.set_ring(rect_ring(500.0, 0.0, 510.0, 10.0), &GeoGeometry, 5.0);
        assert!((area(&mut cache, &a, &[&a, &b]) - 400.0).abs() < 1e-6);
        assert!((area(&mut cache, &b, &[&a, &b]) - 100.0).abs() < 1e-6);
        assert_eq!(cache.overlap(a.id, b.id), Some(false));
    }

    #[test]
    fn test_moving_into_range_joins_cluster() {
        let a = square(1, 0.0, 0.0);
        let mut b = square(2, 100.0, 0.0);
        let mut cache = ClusterCache::default();
        assert!((area(&mut cache, &a, &[&a, &b]) - 400.0).abs() < 1e-6);
        b.set_ring(rect_ring(22.0, 0.0, 42.0, 20.0), &GeoGeometry, 5.0);
        assert!((area(&mut cache, &a, &[&a, &b]) - 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_pruning_skips_exact_predicate() {
        let geometry = CountingGeometry::default();
        let config = PlacementConfig::default();
        let a = square(1, 0.0, 0.0);
        let far = square(2, 1000.0, 1000.0);
        let mut cache = ClusterCache::default();
        let total =
            ClusterAggregator::new(&mut cache, &geometry, &config).cluster_area(&a, &[&a, &far]);
        assert!((total - 400.0).abs() < 1e-6);
        assert_eq!(geometry.exact_calls(), 0);
        assert_eq!(cache.overlap(a.id, far.id), Some(false));
    }

    #[test]
    fn test_degenerate_member_contributes_nothing() {
        let a = square(1, 0.0, 0.0);
        let bowtie = placement(
            2,
            vec![
                geo::Coord { x: 5.0, y: 5.0 },
                geo::Coord { x: 15.0, y: 15.0 },
                geo::Coord { x: 15.0, y: 5.0 },
                geo::Coord { x: 5.0, y: 15.0 },
                geo::Coord { x: 5.0, y: 5.0 },
            ],
        );
        let empty = placement(3, Vec::new());
        let mut cache = ClusterCache::default();
        let pool = [&a, &bowtie, &empty];
        assert!((area(&mut cache, &a, &pool) - 400.0).abs() < 1e-6);
        assert_eq!(area(&mut cache, &empty, &pool), 0.0);
        assert_eq!(area(&mut cache, &bowtie, &pool), 0.0);
    }

    #[test]
    fn test_first_overlapping_uses_raw_polygons() {
        let geometry = GeoGeometry;
        let config = PlacementConfig::default();
        let a = square(1, 0.0, 0.0);
        let near = square(2, 23.0, 0.0);
        let over = square(3, 10.0, 10.0);
        let mut cache = ClusterCache::default();
        let aggregator = ClusterAggregator::new(&mut cache, &geometry, &config);
        assert_eq!(aggregator.first_overlapping(&a, &[&a, &near]), None);
        assert_eq!(
            aggregator.first_overlapping(&a, &[&a, &near, &over]),
            Some(PlacementId(3))
        );
    }
}
