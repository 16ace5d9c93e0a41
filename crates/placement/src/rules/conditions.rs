use bevy::prelude::*;
use geo::Rect;

use crate::layers::LayerKind;
use crate::placement::Placement;

use super::{Outcome, RuleContext};

pub(super) fn too_big(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    Outcome::from(placement.area() > ctx.config.max_cluster_sqm)
}

/// Counts ring coordinates including the closing one, so an octagon is "many".
pub(super) fn many_points(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    Outcome::from(placement.ring().len() > ctx.config.max_points_before_warning)
}

pub(super) fn large_power_need(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    let max = ctx.config.max_power_need;
    Outcome::from(placement.details.power_need.is_some_and(|watts| watts > max))
}

pub(super) fn missing_fields(placement: &Placement, _ctx: &mut RuleContext<'_>) -> Outcome {
    let d = &placement.details;
    Outcome::from(
        d.name.trim().is_empty()
            || d.description.trim().is_empty()
            || d.contact_info.trim().is_empty()
            || d.power_need.is_none()
            || d.amplified_sound.is_none(),
    )
}

pub(super) fn bigger_than_needed(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    let need = placement.calculated_area_needed(ctx.config);
    let allowed = ctx.config.reasonable_allowed_area(need);
    let area = placement.area();
    if area <= allowed {
        return Outcome::Clear;
    }
    Outcome::TriggeredWith(format!(
        "Area is {:.0} m² bigger than suggested ({:.0} m² for a calculated need of {:.0} m²).",
        area - allowed,
        allowed,
        need
    ))
}

pub(super) fn smaller_than_needed(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    Outcome::from(placement.area() < placement.calculated_area_needed(ctx.config))
}

pub(super) fn calculated_need_too_big(
    placement: &Placement,
    ctx: &mut RuleContext<'_>,
) -> Outcome {
    Outcome::from(placement.calculated_area_needed(ctx.config) > ctx.config.max_cluster_sqm)
}

pub(super) fn overlaps_placement(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    let pool = ctx.pool;
    Outcome::from(ctx.aggregator().first_overlapping(placement, pool).is_some())
}

pub(super) fn cluster_too_big(placement: &Placement, ctx: &mut RuleContext<'_>) -> Outcome {
    let pool = ctx.pool;
    let max = ctx.config.max_cluster_sqm;
    let cluster = ctx.aggregator().cluster(placement, pool);
    if cluster.total_area <= max {
        return Outcome::Clear;
    }
    Outcome::TriggeredWith(format!(
        "The fire-safety cluster covers {:.0} m² across {} areas; the maximum is {:.0} m².",
        cluster.total_area,
        cluster.members.len(),
        max
    ))
}

/// Bounding box of a usable polygon, or `None` when the ring is degenerate.
fn usable_box(placement: &Placement, ctx: &RuleContext<'_>) -> Option<Rect<f64>> {
    let checked = ctx
        .geometry
        .area(placement.shape())
        .and_then(|_| ctx.geometry.bounding_box(placement.shape()));
    match checked {
        Ok(rect) => Some(rect),
        Err(e) => {
            warn!("Placement {:?}: layer rules skipped ({})", placement.id, e);
            None
        }
    }
}

pub(super) fn overlaps_layer(
    kind: LayerKind,
    placement: &Placement,
    ctx: &mut RuleContext<'_>,
) -> Outcome {
    let Some(layer) = ctx.layers.get(kind) else {
        debug!("No {} layer loaded, rule skipped", kind.name());
        return Outcome::Clear;
    };
    let Some(rect) = usable_box(placement, ctx) else {
        return Outcome::Clear;
    };
    Outcome::from(layer.any_overlaps_or_contains(placement.shape(), &rect, ctx.geometry))
}

pub(super) fn outside_layer(
    kind: LayerKind,
    placement: &Placement,
    ctx: &mut RuleContext<'_>,
) -> Outcome {
    let Some(layer) = ctx.layers.get(kind) else {
        debug!("No {} layer loaded, rule skipped", kind.name());
        return Outcome::Clear;
    };
    let Some(rect) = usable_box(placement, ctx) else {
        return Outcome::Clear;
    };
    Outcome::from(!layer.any_contains(placement.shape(), &rect, ctx.geometry))
}
