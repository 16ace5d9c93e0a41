//! The rule engine: runs the whole catalog against one placement and keeps
//! the sorted result per placement for display.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::placement::{Placement, PlacementId};
use crate::rules::{Rule, RuleContext, RuleSpec, Verdict, CATALOG};
use crate::severity::Severity;

/// Triggered rules of one placement, worst first, plus the numbers the
/// on-screen summary shows.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct RuleReport {
    pub triggered: Vec<Verdict>,
    pub area: f64,
    pub calculated_area_needed: f64,
}

impl RuleReport {
    pub fn worst_severity(&self) -> Severity {
        self.triggered.first().map_or(Severity::None, |v| v.severity)
    }

    pub fn is_clean(&self) -> bool {
        self.triggered.is_empty()
    }

    /// Compact indicator text: the area, unless a High rule fired, in which
    /// case that rule's short message.
    pub fn on_screen_text(&self) -> String {
        match self.triggered.first() {
            Some(v) if v.severity >= Severity::High => v.short_message.to_string(),
            _ => format!("{:.0} m²", self.area),
        }
    }

    /// Header for the issue list, e.g. "3 issues found".
    pub fn issue_summary(&self) -> String {
        match self.triggered.len() {
            0 => "No issues found".to_string(),
            1 => "1 issue found".to_string(),
            n => format!("{n} issues found"),
        }
    }

    /// `(display class, message)` for each triggered rule, worst first.
    pub fn issue_lines(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.triggered
            .iter()
            .map(|v| (v.severity.display_class(), v.message.as_str()))
    }
}

/// Holds the ordered rules and the latest report per placement.
#[derive(Resource)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    reports: HashMap<PlacementId, RuleReport>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::from_catalog(&CATALOG)
    }
}

impl RuleEngine {
    pub fn from_catalog(catalog: &'static [RuleSpec]) -> Self {
        Self {
            rules: catalog.iter().map(Rule::new).collect(),
            reports: HashMap::new(),
        }
    }

    /// Evaluate every rule against `placement` and store the result.
    pub fn check_all(&mut self, placement: &Placement, ctx: &mut RuleContext<'_>) -> &RuleReport {
        let mut triggered: Vec<Verdict> = self
            .rules
            .iter_mut()
            .map(|rule| rule.evaluate(placement, ctx))
            .filter(|verdict| verdict.triggered)
            .collect();
        // Stable: equal severities keep catalog order.
        triggered.sort_by(|a, b| b.severity.cmp(&a.severity));

        let report = RuleReport {
            triggered,
            area: placement.area(),
            calculated_area_needed: placement.calculated_area_needed(ctx.config),
        };
        self.reports.insert(placement.id, report);
        &self.reports[&placement.id]
    }

    /// Triggered verdicts of the last check, worst first. Empty if never checked.
    pub fn triggered_rules(&self, id: PlacementId) -> &[Verdict] {
        self.reports
            .get(&id)
            .map(|report| report.triggered.as_slice())
            .unwrap_or_default()
    }

    pub fn worst_severity(&self, id: PlacementId) -> Severity {
        self.reports
            .get(&id)
            .map_or(Severity::None, RuleReport::worst_severity)
    }

    pub fn report(&self, id: PlacementId) -> Option<&RuleReport> {
        self.reports.get(&id)
    }

    /// Rules in catalog order, carrying the state of the last evaluation.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Drop the stored report of a deleted placement.
    pub fn forget(&mut self, id: PlacementId) {
        self.reports.remove(&id);
    }
}
