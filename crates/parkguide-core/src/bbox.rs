//! Local bounding boxes, the headless counterpart of `SVGGraphicsElement.getBBox()`.
//!
//! A box is expressed in the element's own user space: its own `transform` is not applied,
//! while the transforms of its descendants are. Text has no font metrics here; its box is
//! estimated from the font size and character count.

use crate::document::{NodeId, SvgDocument, parse_number_list};
use crate::geom::{Point, Rect, bounds_of_points, point, rect, union_rect};
use crate::transform::{apply_rect, own_transform};
use svgtypes::{PathParser, PathSegment};

const DEFAULT_FONT_SIZE: f64 = 16.0;
const AVG_CHAR_WIDTH_EM: f64 = 0.6;

/// Containers whose box is the union of their children.
fn is_container(tag: &str) -> bool {
    matches!(tag, "svg" | "g" | "a" | "switch")
}

/// Elements that never contribute geometry.
fn is_non_rendering(tag: &str) -> bool {
    matches!(
        tag,
        "defs"
            | "title"
            | "desc"
            | "metadata"
            | "style"
            | "script"
            | "clipPath"
            | "mask"
            | "marker"
            | "pattern"
            | "linearGradient"
            | "radialGradient"
            | "symbol"
            | "filter"
    )
}

pub fn local_bbox(doc: &SvgDocument, node: NodeId) -> Option<Rect> {
    local_bbox_filtered(doc, node, &|_, _| false)
}

/// Like [`local_bbox`], skipping every descendant subtree for which `skip` returns `true`.
pub fn local_bbox_filtered(
    doc: &SvgDocument,
    node: NodeId,
    skip: &dyn Fn(&SvgDocument, NodeId) -> bool,
) -> Option<Rect> {
    let tag = doc.tag(node)?;
    if is_container(tag) {
        let mut acc: Option<Rect> = None;
        for c in doc.element_children(node) {
            let Some(ctag) = doc.tag(c) else { continue };
            if is_non_rendering(ctag) || skip(doc, c) {
                continue;
            }
            if let Some(b) = local_bbox_filtered(doc, c, skip) {
                acc = Some(union_rect(acc, apply_rect(&own_transform(doc, c), &b)));
            }
        }
        return acc;
    }
    shape_bbox(doc, node, tag)
}

fn attr_or_zero(doc: &SvgDocument, node: NodeId, name: &str) -> f64 {
    doc.attr_f64(node, name).unwrap_or(0.0)
}

fn shape_bbox(doc: &SvgDocument, node: NodeId, tag: &str) -> Option<Rect> {
    let a = |name: &str| attr_or_zero(doc, node, name);
    match tag {
        "rect" | "image" | "use" | "foreignObject" => {
            Some(rect(a("x"), a("y"), a("width").max(0.0), a("height").max(0.0)))
        }
        "circle" => {
            let r = a("r").max(0.0);
            Some(rect(a("cx") - r, a("cy") - r, 2.0 * r, 2.0 * r))
        }
        "ellipse" => {
            let (rx, ry) = (a("rx").max(0.0), a("ry").max(0.0));
            Some(rect(a("cx") - rx, a("cy") - ry, 2.0 * rx, 2.0 * ry))
        }
        "line" => bounds_of_points([point(a("x1"), a("y1")), point(a("x2"), a("y2"))]),
        "polyline" | "polygon" => {
            bounds_of_points(points_attr(doc.attr(node, "points").unwrap_or_default()))
        }
        "path" => bounds_of_points(path_hull_points(doc.attr(node, "d").unwrap_or_default())),
        "text" => text_bbox(doc, node),
        _ => None,
    }
}

/// Pairs from a `points` attribute; a trailing odd coordinate is dropped.
pub fn points_attr(raw: &str) -> Vec<Point> {
    parse_number_list(raw)
        .chunks_exact(2)
        .map(|c| point(c[0], c[1]))
        .collect()
}

/// Absolute on-path vertices (segment end points) of a path.
pub fn path_vertices(d: &str) -> Vec<Point> {
    walk_path(d, false)
}

/// Segment end points plus curve control points.
///
/// Curves are bounded by their control polygon, which is a superset of the curve itself; arcs
/// contribute only their end points.
pub fn path_hull_points(d: &str) -> Vec<Point> {
    walk_path(d, true)
}

fn walk_path(d: &str, with_controls: bool) -> Vec<Point> {
    let mut out = Vec::new();
    let mut cur = point(0.0, 0.0);
    let mut start = cur;

    for seg in PathParser::from(d).flatten() {
        let base = cur;
        let abs_pt = move |abs: bool, x: f64, y: f64| {
            if abs { point(x, y) } else { point(base.x + x, base.y + y) }
        };
        match seg {
            PathSegment::MoveTo { abs, x, y } => {
                cur = abs_pt(abs, x, y);
                start = cur;
                out.push(cur);
            }
            PathSegment::LineTo { abs, x, y }
            | PathSegment::SmoothQuadratic { abs, x, y }
            | PathSegment::EllipticalArc { abs, x, y, .. } => {
                cur = abs_pt(abs, x, y);
                out.push(cur);
            }
            PathSegment::HorizontalLineTo { abs, x } => {
                cur = if abs { point(x, cur.y) } else { point(cur.x + x, cur.y) };
                out.push(cur);
            }
            PathSegment::VerticalLineTo { abs, y } => {
                cur = if abs { point(cur.x, y) } else { point(cur.x, cur.y + y) };
                out.push(cur);
            }
            PathSegment::CurveTo {
                abs,
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                if with_controls {
                    out.push(abs_pt(abs, x1, y1));
                    out.push(abs_pt(abs, x2, y2));
                }
                cur = abs_pt(abs, x, y);
                out.push(cur);
            }
            PathSegment::SmoothCurveTo { abs, x2, y2, x, y }
            | PathSegment::Quadratic {
                abs,
                x1: x2,
                y1: y2,
                x,
                y,
            } => {
                if with_controls {
                    out.push(abs_pt(abs, x2, y2));
                }
                cur = abs_pt(abs, x, y);
                out.push(cur);
            }
            PathSegment::ClosePath { .. } => {
                cur = start;
            }
        }
    }
    out
}

fn font_size(doc: &SvgDocument, node: NodeId) -> f64 {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if let Some(v) = doc.attr_f64(n, "font-size").filter(|v| *v > 0.0) {
            return v;
        }
        cur = doc.parent(n);
    }
    DEFAULT_FONT_SIZE
}

fn text_bbox(doc: &SvgDocument, node: NodeId) -> Option<Rect> {
    let content = doc.text_content(node);
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    let anchor_el = doc.child_with_tag(node, "tspan").unwrap_or(node);
    let x = attr_or_zero(doc, anchor_el, "x");
    let baseline = attr_or_zero(doc, anchor_el, "y");
    let size = font_size(doc, node);
    let width = content.chars().count() as f64 * size * AVG_CHAR_WIDTH_EM;
    let left = match doc.attr(node, "text-anchor") {
        Some("middle") => x - width / 2.0,
        Some("end") => x - width,
        _ => x,
    };
    Some(rect(left, baseline - size * 0.8, width, size))
}
