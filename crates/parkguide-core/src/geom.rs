#![forbid(unsafe_code)]

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;
pub type Box2D = euclid::Box2D<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
    euclid::rect(x, y, w, h)
}

/// Rounds to a fixed number of decimals, normalising `-0.0` to `0.0`.
pub fn round_f64(v: f64, decimals: u32) -> f64 {
    let p = 10_f64.powi(decimals as i32);
    let r = (v * p).round() / p;
    if r == 0.0 { 0.0 } else { r }
}

/// Smallest rectangle containing every point, or `None` for an empty iterator.
pub fn bounds_of_points(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut it = points.into_iter();
    let first = it.next()?;
    let mut min = first;
    let mut max = first;
    for p in it {
        min = min.min(p);
        max = max.max(p);
    }
    Some(Box2D::new(min, max).to_rect())
}

/// Union that keeps zero-area rectangles (`euclid::Rect::union` drops empty operands,
/// which would lose lines and single points).
pub fn union_rect(a: Option<Rect>, b: Rect) -> Rect {
    match a {
        None => b,
        Some(a) => {
            let min = a.min().min(b.min());
            let max = a.max().max(b.max());
            Box2D::new(min, max).to_rect()
        }
    }
}
