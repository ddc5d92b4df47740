//! Affine transform engine.
//!
//! Only `matrix(a,b,c,d,e,f)` and `translate(tx[,ty])` are understood. `rotate`, `scale` and
//! `skew*` are treated as identity, which matches what common floor-plan exports emit on their
//! group hierarchy. Parsing never fails: malformed input degrades to identity.

use crate::document::{NodeId, SvgDocument};
use crate::geom::{Point, Rect, Transform, bounds_of_points, point};
use regex::Regex;
use std::sync::OnceLock;

/// Builds a transform from SVG `matrix(a, b, c, d, e, f)` components.
pub fn matrix(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Transform {
    Transform::new(a, b, c, d, e, f)
}

/// `mul(parent, child)`: a point is transformed by `child` first, then by `parent`.
pub fn mul(parent: &Transform, child: &Transform) -> Transform {
    child.then(parent)
}

/// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
pub fn apply(m: &Transform, x: f64, y: f64) -> Point {
    m.transform_point(point(x, y))
}

/// Axis-aligned bounds of a rectangle after mapping its corners through `m`.
pub fn apply_rect(m: &Transform, r: &Rect) -> Rect {
    let corners = [
        point(r.min_x(), r.min_y()),
        point(r.max_x(), r.min_y()),
        point(r.min_x(), r.max_y()),
        point(r.max_x(), r.max_y()),
    ];
    bounds_of_points(corners.into_iter().map(|p| m.transform_point(p))).unwrap_or(*r)
}

fn re_transform_fn() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(matrix|translate)\s*\(([^)]*)\)").unwrap())
}

fn parse_args(raw: &str) -> Vec<f64> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().unwrap_or(f64::NAN))
        .collect()
}

/// Parses a `transform` attribute value. Functions compose left to right in textual order.
pub fn parse_transform(raw: Option<&str>) -> Transform {
    let Some(raw) = raw else {
        return Transform::identity();
    };
    let mut cur = Transform::identity();
    for caps in re_transform_fn().captures_iter(raw) {
        let kind = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let args = parse_args(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
        if args.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let t = match (kind, args.as_slice()) {
            ("matrix", [a, b, c, d, e, f, ..]) => matrix(*a, *b, *c, *d, *e, *f),
            ("translate", [tx]) => Transform::translation(*tx, 0.0),
            ("translate", [tx, ty, ..]) => Transform::translation(*tx, *ty),
            _ => Transform::identity(),
        };
        cur = mul(&cur, &t);
    }
    cur
}

/// The element's own `transform` attribute.
pub fn own_transform(doc: &SvgDocument, node: NodeId) -> Transform {
    parse_transform(doc.attr(node, "transform"))
}

/// Cumulative matrix from the document root down to `node`, `node` included.
pub fn accumulated(doc: &SvgDocument, node: NodeId) -> Transform {
    accumulated_within(doc, node, None)
}

/// Like [`accumulated`], but the `transparent` node's own transform is skipped.
///
/// The viewport wrapper group carries the pan/zoom transform; skipping it yields coordinates in
/// the plan's own space regardless of the current view.
pub fn accumulated_within(doc: &SvgDocument, node: NodeId, transparent: Option<NodeId>) -> Transform {
    doc.path_from_root(node)
        .into_iter()
        .filter(|n| Some(*n) != transparent)
        .fold(Transform::identity(), |acc, n| mul(&acc, &own_transform(doc, n)))
}

/// Cumulative matrix of `node`'s parent chain, excluding `node`'s own transform. This is the
/// matrix that maps a node's local bounding box (which already includes its own transform's
/// effect on its children, but not on itself) into document space once combined with
/// [`own_transform`].
pub fn parent_accumulated_within(
    doc: &SvgDocument,
    node: NodeId,
    transparent: Option<NodeId>,
) -> Transform {
    match doc.parent(node) {
        Some(p) => accumulated_within(doc, p, transparent),
        None => Transform::identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, x: f64, y: f64) {
        assert!((a.x - x).abs() < 1e-9 && (a.y - y).abs() < 1e-9, "{a:?} != ({x}, {y})");
    }

    #[test]
    fn matrix_apply_matches_the_affine_formula_exactly() {
        let (a, b, c, d, e, f) = (1.5, -0.25, 0.75, 2.0, 10.0, -4.0);
        let m = parse_transform(Some("matrix(1.5,-0.25 0.75 2 10,-4)"));
        let (x, y) = (3.0, 7.0);
        let p = apply(&m, x, y);
        assert_eq!(p.x, a * x + c * y + e);
        assert_eq!(p.y, b * x + d * y + f);
    }

    #[test]
    fn translate_defaults_missing_ty_to_zero() {
        approx(apply(&parse_transform(Some("translate(7)")), 1.0, 1.0), 8.0, 1.0);
        approx(apply(&parse_transform(Some("translate( 2 , 3 )")), 0.0, 0.0), 2.0, 3.0);
    }

    #[test]
    fn functions_compose_left_to_right() {
        // translate is applied after the matrix when it appears first in the attribute.
        let m = parse_transform(Some("translate(10,0) matrix(2,0,0,2,0,0)"));
        approx(apply(&m, 1.0, 1.0), 12.0, 2.0);
        let m = parse_transform(Some("matrix(2,0,0,2,0,0) translate(10,0)"));
        approx(apply(&m, 1.0, 1.0), 22.0, 2.0);
    }

    #[test]
    fn unsupported_or_broken_input_is_identity() {
        for raw in [
            None,
            Some(""),
            Some("rotate(45)"),
            Some("scale(2)"),
            Some("skewX(10)"),
            Some("matrix(1,2,3)"),
            Some("translate(a,b)"),
            Some("garbage"),
        ] {
            assert_eq!(parse_transform(raw), Transform::identity(), "{raw:?}");
        }
        let m = parse_transform(Some("rotate(30) translate(4,5) scale(3)"));
        approx(apply(&m, 0.0, 0.0), 4.0, 5.0);
    }

    #[test]
    fn nested_translates_sum() {
        let doc = SvgDocument::parse(
            r#"<svg><g transform="translate(1,2)"><g transform="translate(10,20)"><g transform="translate(100,200)"><circle id="c" cx="0" cy="0" r="1" transform="translate(0.5,0.25)"/></g></g></g></svg>"#,
        )
        .unwrap();
        let c = doc.find_by_id("c").unwrap();
        approx(apply(&accumulated(&doc, c), 3.0, 4.0), 114.5, 226.25);
        approx(
            apply(&parent_accumulated_within(&doc, c, None), 0.0, 0.0),
            111.0,
            222.0,
        );
    }

    #[test]
    fn transparent_node_is_skipped() {
        let doc = SvgDocument::parse(
            r#"<svg><g id="wrap" transform="translate(300,300) scale(2)"><g transform="translate(5,5)"><rect id="r"/></g></g></svg>"#,
        )
        .unwrap();
        let wrap = doc.find_by_id("wrap");
        let r = doc.find_by_id("r").unwrap();
        approx(apply(&accumulated_within(&doc, r, wrap), 0.0, 0.0), 5.0, 5.0);
        approx(apply(&accumulated(&doc, r), 0.0, 0.0), 305.0, 305.0);
    }

    #[test]
    fn apply_rect_bounds_transformed_corners() {
        let m = matrix(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let r = apply_rect(&m, &crate::geom::rect(0.0, 0.0, 10.0, 5.0));
        assert_eq!(r, crate::geom::rect(-5.0, 0.0, 5.0, 10.0));
    }
}
