//! Mask shape primitives and their rasterization into pixel coordinates.
//!
//! Coordinates are `(x, y)` with `x` the column and `y` the physical row
//! counted from the bottom of the detector. Rasterizers only return points
//! inside the `width` x `height` grid, so their cost is bounded by the grid
//! whatever the shape's extent.

use serde::{Deserialize, Serialize};

/// Geometric primitive drawn on the detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Filled disc.
    Circle { center: (i64, i64), radius: i64 },
    /// Axis-aligned rectangle spanning two opposite corners, inclusive.
    Rectangle { corner: (i64, i64), opposite: (i64, i64) },
    /// Closed polygon, filled with the even-odd rule.
    Polygon { vertices: Vec<(f64, f64)> },
}

impl Shape {
    /// Pixel coordinates covered by this shape on a `width` x `height` grid.
    pub fn rasterize(&self, width: usize, height: usize) -> Vec<(i64, i64)> {
        match self {
            Shape::Circle { center, radius } => rasterize_circle(*center, *radius, width, height),
            Shape::Rectangle { corner, opposite } => {
                rasterize_rectangle(*corner, *opposite, width, height)
            }
            Shape::Polygon { vertices } => rasterize_polygon(vertices, width, height),
        }
    }
}

/// A shape plus its polarity.
///
/// Positive shapes exclude the pixels they cover; negative shapes select
/// the only pixels to keep and win over positives on overlap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskShape {
    pub shape: Shape,
    #[serde(default)]
    pub negative: bool,
}

impl MaskShape {
    pub fn positive(shape: Shape) -> Self {
        Self {
            shape,
            negative: false,
        }
    }

    pub fn negative(shape: Shape) -> Self {
        Self {
            shape,
            negative: true,
        }
    }
}

/// Inclusive index range `[lo, hi]` clipped to `[0, len)`, `None` when empty.
fn clip(lo: i64, hi: i64, len: usize) -> Option<(i64, i64)> {
    let last = i64::try_from(len).ok()?.checked_sub(1)?;
    let (lo, hi) = (lo.max(0), hi.min(last));
    (lo <= hi).then_some((lo, hi))
}

/// Largest `s` with `s * s <= n`.
fn isqrt(n: i128) -> i128 {
    let mut s = (n as f64).sqrt() as i128;
    while s * s > n {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= n {
        s += 1;
    }
    s
}

/// Cover the disc `dx² + dy² <= r²` with one horizontal span per grid row.
pub fn rasterize_circle(center: (i64, i64), radius: i64, width: usize, height: usize) -> Vec<(i64, i64)> {
    if radius < 0 {
        return Vec::new();
    }
    let (cx, cy) = center;
    let Some((y0, y1)) = clip(cy.saturating_sub(radius), cy.saturating_add(radius), height) else {
        return Vec::new();
    };
    let r2 = i128::from(radius) * i128::from(radius);
    let mut points = Vec::new();
    for y in y0..=y1 {
        let dy = i128::from(y) - i128::from(cy);
        let half = i64::try_from(isqrt(r2 - dy * dy)).unwrap_or(i64::MAX);
        if let Some((x0, x1)) = clip(cx.saturating_sub(half), cx.saturating_add(half), width) {
            points.extend((x0..=x1).map(|x| (x, y)));
        }
    }
    points
}

/// Every grid coordinate inside the rectangle spanned by two corners, inclusive.
pub fn rasterize_rectangle(
    corner: (i64, i64),
    opposite: (i64, i64),
    width: usize,
    height: usize,
) -> Vec<(i64, i64)> {
    let xs = clip(corner.0.min(opposite.0), corner.0.max(opposite.0), width);
    let ys = clip(corner.1.min(opposite.1), corner.1.max(opposite.1), height);
    let (Some((x0, x1)), Some((y0, y1))) = (xs, ys) else {
        return Vec::new();
    };
    let mut points = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
    for y in y0..=y1 {
        for x in x0..=x1 {
            points.push((x, y));
        }
    }
    points
}

/// Grid coordinates inside the polygon, tested one by one.
pub fn rasterize_polygon(vertices: &[(f64, f64)], width: usize, height: usize) -> Vec<(i64, i64)> {
    if vertices.len() < 3 {
        return Vec::new();
    }
    let mut points = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if point_in_polygon(x as f64, y as f64, vertices) {
                points.push((x as i64, y as i64));
            }
        }
    }
    points
}

/// Even-odd ray casting test.
pub fn point_in_polygon(x: f64, y: f64, vertices: &[(f64, f64)]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
