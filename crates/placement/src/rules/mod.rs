//! Placement rules: a static catalog of severity-tagged conditions and the
//! runtime [`Rule`] objects the engine evaluates.
//!
//! Split into sub-modules:
//! - `catalog`: the rule table (`CATALOG`), `RuleKind`, `Condition`
//! - `conditions`: the check functions the table points at

mod catalog;
mod conditions;

pub use catalog::{spec, Condition, RuleKind, RuleSpec, CATALOG};

use crate::cluster::ClusterAggregator;
use crate::config::PlacementConfig;
use crate::geometry::GeometryCapability;
use crate::layers::ReferenceLayers;
use crate::placement::Placement;
use crate::severity::Severity;
use crate::spatial_cache::ClusterCache;

/// What a condition decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Clear,
    /// Triggered with the catalog message.
    Triggered,
    /// Triggered with a message computed for this placement.
    TriggeredWith(String),
}

impl From<bool> for Outcome {
    fn from(triggered: bool) -> Self {
        if triggered {
            Outcome::Triggered
        } else {
            Outcome::Clear
        }
    }
}

/// Everything a condition may read while checking one placement.
pub struct RuleContext<'a> {
    pub config: &'a PlacementConfig,
    pub layers: &'a ReferenceLayers,
    pub geometry: &'a dyn GeometryCapability,
    /// Candidate placements for overlap and cluster checks. May include the
    /// placement being checked; conditions skip it by id.
    pub pool: &'a [&'a Placement],
    pub cache: &'a mut ClusterCache,
}

impl<'a> RuleContext<'a> {
    /// Cluster aggregator over this context's cache and geometry.
    pub fn aggregator(&mut self) -> ClusterAggregator<'_> {
        ClusterAggregator::new(self.cache, self.geometry, self.config)
    }
}

/// Outcome of one rule for one placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub kind: RuleKind,
    pub triggered: bool,
    /// `Severity::None` when not triggered.
    pub severity: Severity,
    pub short_message: &'static str,
    pub message: String,
}

/// A catalog entry plus the state of its last evaluation.
///
/// The state is overwritten by every `evaluate`; nothing about a previous
/// placement survives into the next one.
pub struct Rule {
    spec: &'static RuleSpec,
    triggered: bool,
    message: String,
}

impl Rule {
    pub fn new(spec: &'static RuleSpec) -> Self {
        Self {
            spec,
            triggered: false,
            message: spec.message.to_string(),
        }
    }

    pub fn evaluate(&mut self, placement: &Placement, ctx: &mut RuleContext<'_>) -> Verdict {
        let outcome = match self.spec.condition {
            Condition::Check(check) => check(placement, ctx),
            Condition::OverlapsLayer(kind) => conditions::overlaps_layer(kind, placement, ctx),
            Condition::OutsideLayer(kind) => conditions::outside_layer(kind, placement, ctx),
        };
        let (triggered, message) = match outcome {
            Outcome::Clear => (false, self.spec.message.to_string()),
            Outcome::Triggered => (true, self.spec.message.to_string()),
            Outcome::TriggeredWith(message) => (true, message),
        };
        self.triggered = triggered;
        self.message = message;
        self.verdict()
    }

    pub fn kind(&self) -> RuleKind {
        self.spec.kind
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Configured severity if triggered, otherwise `Severity::None`.
    pub fn severity(&self) -> Severity {
        if self.triggered {
            self.spec.severity
        } else {
            Severity::None
        }
    }

    pub fn short_message(&self) -> &'static str {
        self.spec.short_message
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn verdict(&self) -> Verdict {
        Verdict {
            kind: self.spec.kind,
            triggered: self.triggered,
            severity: self.severity(),
            short_message: self.spec.short_message,
            message: self.message.clone(),
        }
    }
}
