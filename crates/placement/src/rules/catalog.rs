//! The static rule table. Order here is the display order for equal severities.

use serde::{Deserialize, Serialize};

use crate::layers::LayerKind;
use crate::placement::Placement;
use crate::severity::Severity;

use super::conditions;
use super::{Outcome, RuleContext};

/// Identifies a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    TooBig,
    ManyPoints,
    LargePowerNeed,
    MissingFields,
    BiggerThanNeeded,
    SmallerThanNeeded,
    CalculatedNeedTooBig,
    OverlapsPlacement,
    FireRoad,
    ClusterTooBig,
    OutsidePropertyBorder,
    OutsidePlacementArea,
    ForbiddenZone,
    HazardZone,
    Road,
    Sanctuary,
    Slope,
}

/// Predicate attached to a catalog entry.
#[derive(Clone, Copy)]
pub enum Condition {
    /// Attribute or cluster check.
    Check(fn(&Placement, &mut RuleContext<'_>) -> Outcome),
    /// Polygon overlaps, contains, or lies inside any feature of the layer.
    OverlapsLayer(LayerKind),
    /// Polygon is not fully inside any feature of the layer.
    OutsideLayer(LayerKind),
}

/// One row of the rule table.
pub struct RuleSpec {
    pub kind: RuleKind,
    pub severity: Severity,
    pub short_message: &'static str,
    pub message: &'static str,
    pub condition: Condition,
}

pub static CATALOG: [RuleSpec; 17] = [
    RuleSpec {
        kind: RuleKind::TooBig,
        severity: Severity::High,
        short_message: "Too big!",
        message: "This area is larger than one fire-safety cluster may be. \
                  Split it in two so a fire-safety gap separates the parts.",
        condition: Condition::Check(conditions::too_big),
    },
    RuleSpec {
        kind: RuleKind::ManyPoints,
        severity: Severity::Low,
        short_message: "Many points.",
        message: "This shape has a lot of corners. Remember that it has to be \
                  staked out on the ground as well.",
        condition: Condition::Check(conditions::many_points),
    },
    RuleSpec {
        kind: RuleKind::LargePowerNeed,
        severity: Severity::Low,
        short_message: "Powerful.",
        message: "The power need is very high, double-check it is not a typo.",
        condition: Condition::Check(conditions::large_power_need),
    },
    RuleSpec {
        kind: RuleKind::MissingFields,
        severity: Severity::Medium,
        short_message: "Missing info",
        message: "Fill in name, description, contact info, power need and sound level.",
        condition: Condition::Check(conditions::missing_fields),
    },
    RuleSpec {
        kind: RuleKind::BiggerThanNeeded,
        severity: Severity::Medium,
        short_message: "Bigger than needed.",
        message: "The area is much bigger than the calculated need.",
        condition: Condition::Check(conditions::bigger_than_needed),
    },
    RuleSpec {
        kind: RuleKind::SmallerThanNeeded,
        severity: Severity::Low,
        short_message: "Too small.",
        message: "The area is smaller than the calculated need. Consider making it larger.",
        condition: Condition::Check(conditions::smaller_than_needed),
    },
    RuleSpec {
        kind: RuleKind::CalculatedNeedTooBig,
        severity: Severity::High,
        short_message: "Too many people/vehicles!",
        message: "The calculated area need is bigger than the maximum area size. \
                  Add another area to fix this.",
        condition: Condition::Check(conditions::calculated_need_too_big),
    },
    RuleSpec {
        kind: RuleKind::OverlapsPlacement,
        severity: Severity::Medium,
        short_message: "Overlapping!",
        message: "This area overlaps another placement.",
        condition: Condition::Check(conditions::overlaps_placement),
    },
    RuleSpec {
        kind: RuleKind::FireRoad,
        severity: Severity::High,
        short_message: "Watch the fire road!",
        message: "This area overlaps a fire road, move it off the road.",
        condition: Condition::OverlapsLayer(LayerKind::FireRoad),
    },
    RuleSpec {
        kind: RuleKind::ClusterTooBig,
        severity: Severity::High,
        short_message: "Cluster too big!",
        message: "Together with the areas inside its fire-safety distance, this \
                  cluster is bigger than allowed.",
        condition: Condition::Check(conditions::cluster_too_big),
    },
    RuleSpec {
        kind: RuleKind::OutsidePropertyBorder,
        severity: Severity::High,
        short_message: "Outside border.",
        message: "This area is outside the land we may use.",
        condition: Condition::OutsideLayer(LayerKind::PropertyBorder),
    },
    RuleSpec {
        kind: RuleKind::OutsidePlacementArea,
        severity: Severity::Medium,
        short_message: "Outside placement areas.",
        message: "This area is outside the placement areas (yellow border).",
        condition: Condition::OutsideLayer(LayerKind::PlacementArea),
    },
    RuleSpec {
        kind: RuleKind::ForbiddenZone,
        severity: Severity::High,
        short_message: "Inside forbidden zone!",
        message: "This area touches a zone that cannot be used this year.",
        condition: Condition::OverlapsLayer(LayerKind::HiddenForbidden),
    },
    RuleSpec {
        kind: RuleKind::HazardZone,
        severity: Severity::Medium,
        short_message: "Hazard zone.",
        message: "This area is in a hazard zone.",
        condition: Condition::OverlapsLayer(LayerKind::Hazard),
    },
    RuleSpec {
        kind: RuleKind::Road,
        severity: Severity::Medium,
        short_message: "On a road.",
        message: "This area overlaps a road.",
        condition: Condition::OverlapsLayer(LayerKind::Road),
    },
    RuleSpec {
        kind: RuleKind::Sanctuary,
        severity: Severity::Medium,
        short_message: "Sanctuary.",
        message: "This area overlaps a sanctuary, keep it quiet and clear.",
        condition: Condition::OverlapsLayer(LayerKind::Sanctuary),
    },
    RuleSpec {
        kind: RuleKind::Slope,
        severity: Severity::Low,
        short_message: "Slopey!",
        message: "This area is on sloped, uneven terrain. Check the slope map \
                  to make sure you know what you are doing.",
        condition: Condition::OverlapsLayer(LayerKind::Slope),
    },
];

/// Catalog entry for `kind`.
pub fn spec(kind: RuleKind) -> &'static RuleSpec {
    CATALOG
        .iter()
        .find(|s| s.kind == kind)
        .unwrap_or_else(|| unreachable!("every RuleKind has a catalog row"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_kinds_are_unique() {
        let kinds: HashSet<RuleKind> = CATALOG.iter().map(|s| s.kind).collect();
        assert_eq!(kinds.len(), CATALOG.len());
    }

    #[test]
    fn test_no_rule_has_none_severity() {
        assert!(CATALOG.iter().all(|s| s.severity > Severity::None));
    }

    #[test]
    fn test_spec_lookup() {
        assert_eq!(spec(RuleKind::ClusterTooBig).severity, Severity::High);
        assert_eq!(spec(RuleKind::BiggerThanNeeded).severity, Severity::Medium);
        assert_eq!(spec(RuleKind::SmallerThanNeeded).severity, Severity::Low);
    }
}
