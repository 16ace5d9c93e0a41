//! Axis-aligned box helpers used to prune exact polygon tests.

use geo::{Coord, Rect};

/// Grow `rect` by `by` metres on every side.
pub fn padded(rect: Rect<f64>, by: f64) -> Rect<f64> {
    let (min, max) = (rect.min(), rect.max());
    Rect::new(
        Coord {
            x: min.x - by,
            y: min.y - by,
        },
        Coord {
            x: max.x + by,
            y: max.y + by,
        },
    )
}

/// Closed-interval box intersection: boxes that only touch still intersect.
#[inline]
pub fn boxes_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && b.min().x <= a.max().x
        && a.min().y <= b.max().y
        && b.min().y <= a.max().y
}
