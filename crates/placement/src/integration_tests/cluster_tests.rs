//! Fire-safety cluster rule across draw/edit/delete cycles.

use super::{complete_details, square};
use crate::rules::RuleKind;
use crate::test_harness::TestSite;
use crate::{PlacementConfig, PlacementId};

/// Site where two 400 m² placements together exceed the cluster limit.
fn tight_site() -> TestSite {
    TestSite::new().with_config(PlacementConfig {
        max_cluster_sqm: 700.0,
        ..PlacementConfig::default()
    })
}

#[test]
fn test_close_pair_flags_both_members() {
    let mut site = tight_site();
    // 3 m gap, inside the 5 m fire-safety distance.
    let a = site.place(1, square(0.0, 0.0), complete_details());
    let b = site.place(2, square(23.0, 0.0), complete_details());

    assert!(site.has_triggered(a, RuleKind::ClusterTooBig));
    assert!(site.has_triggered(b, RuleKind::ClusterTooBig));
    assert!(!site.has_triggered(a, RuleKind::OverlapsPlacement));

    let report = site.report(a);
    let verdict = report
        .triggered
        .iter()
        .find(|v| v.kind == RuleKind::ClusterTooBig)
        .unwrap();
    assert!(verdict.message.contains("800 m²"), "{}", verdict.message);
    assert!(verdict.message.contains("2 areas"), "{}", verdict.message);
}

#[test]
fn test_moving_apart_clears_both() {
    let mut site = tight_site();
    let a = site.place(1, square(0.0, 0.0), complete_details());
    let b = site.place(2, square(23.0, 0.0), complete_details());
    assert!(site.has_triggered(a, RuleKind::ClusterTooBig));

    site.reshape(b, square(100.0, 0.0));
    assert!(!site.has_triggered(a, RuleKind::ClusterTooBig));
    assert!(!site.has_triggered(b, RuleKind::ClusterTooBig));
    assert_eq!(
        site.cache().overlap(PlacementId(1), PlacementId(2)),
        Some(false)
    );
}

#[test]
fn test_moving_back_rejoins() {
    let mut site = tight_site();
    let a = site.place(1, square(0.0, 0.0), complete_details());
    let b = site.place(2, square(100.0, 0.0), complete_details());
    assert!(site.report(a).is_clean());

    site.reshape(b, square(24.0, 0.0));
    assert!(site.has_triggered(a, RuleKind::ClusterTooBig));
    assert!(site.has_triggered(b, RuleKind::ClusterTooBig));
}

#[test]
fn test_chain_links_distant_ends() {
    // a and c are 26 m apart but both lie within b's reach.
    let mut site = TestSite::new().with_config(PlacementConfig {
        max_cluster_sqm: 1100.0,
        ..PlacementConfig::default()
    });
    let a = site.place(1, square(0.0, 0.0), complete_details());
    let b = site.place(2, square(23.0, 0.0), complete_details());
    let c = site.place(3, square(46.0, 0.0), complete_details());

    for entity in [a, b, c] {
        assert!(site.has_triggered(entity, RuleKind::ClusterTooBig));
    }

    // Removing the middle link splits the cluster.
    site.remove(b);
    assert!(!site.has_triggered(a, RuleKind::ClusterTooBig));
    assert!(!site.has_triggered(c, RuleKind::ClusterTooBig));
}

#[test]
fn test_unrelated_placement_keeps_its_verdict() {
    let mut site = tight_site();
    let a = site.place(1, square(0.0, 0.0), complete_details());
    site.place(2, square(23.0, 0.0), complete_details());
    let far = site.place(3, square(500.0, 500.0), complete_details());

    assert!(site.has_triggered(a, RuleKind::ClusterTooBig));
    assert!(site.report(far).is_clean());
}

#[test]
fn test_wider_fire_buffer_reaches_neighbour() {
    let mut site = tight_site();
    // 10 m gap: outside 5 m, inside 12 m.
    let a = site.place(1, square(0.0, 0.0), complete_details());
    let b = site.place(2, square(30.0, 0.0), complete_details());
    assert!(!site.has_triggered(a, RuleKind::ClusterTooBig));

    site.set_fire_buffer(12.0);
    assert!(site.has_triggered(a, RuleKind::ClusterTooBig));
    assert!(site.has_triggered(b, RuleKind::ClusterTooBig));

    site.set_fire_buffer(5.0);
    assert!(!site.has_triggered(a, RuleKind::ClusterTooBig));
}

#[test]
fn test_overlapping_pair_reports_overlap_and_cluster() {
    let mut site = tight_site();
    let a = site.place(1, square(0.0, 0.0), complete_details());
    let b = site.place(2, square(10.0, 10.0), complete_details());

    for entity in [a, b] {
        assert!(site.has_triggered(entity, RuleKind::OverlapsPlacement));
        assert!(site.has_triggered(entity, RuleKind::ClusterTooBig));
    }
}
