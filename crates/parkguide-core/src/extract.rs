//! Station and lane detection over a floor-plan document.
//!
//! Inclusion and classification are two independent rules. A label is *station-like* if it
//! starts with a sensor code (`P12`, `s 7`) or mentions one of the station keywords in English
//! or Arabic; its *type* is decided only by the code prefix. `"Station Alpha"` is therefore
//! extracted, but as [`StationType::Unknown`].

use crate::bbox::{path_vertices, points_attr};
use crate::document::{NodeId, SvgDocument, parse_leading_number};
use crate::geom::{Point, round_f64};
use crate::model::{Coord, ExtractResult, Lane, Station, StationTag, StationType};
use crate::transform::{accumulated_within, apply};
use regex::Regex;
use std::sync::OnceLock;

const EN_KEYWORDS: [&str; 3] = ["station", "sensor", "detector"];
const AR_KEYWORDS: [&str; 4] = ["حساس", "محطة", "مستشعر", "ستيشن"];

const STATION_TAGS: [&str; 4] = ["text", "rect", "circle", "ellipse"];
const LANE_TAGS: [&str; 3] = ["polyline", "path", "line"];

const COORD_DECIMALS: u32 = 2;

fn re_station_code() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)^(?:S|P)\s*\d+\b").unwrap())
}

fn re_type_prefix() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"(?i)^([SP])\s*\d").unwrap())
}

fn re_lane() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(r"lane|مسار|ممر").unwrap())
}

pub fn is_station_like(label: &str) -> bool {
    if label.is_empty() {
        return false;
    }
    if re_station_code().is_match(label) {
        return true;
    }
    let low = label.to_lowercase();
    EN_KEYWORDS.iter().any(|w| low.contains(w)) || AR_KEYWORDS.iter().any(|w| label.contains(w))
}

/// `P<digits>` → parking sensor, `S<digits>` → sensor, anything else → unknown.
pub fn classify(label: &str) -> StationType {
    let Some(caps) = re_type_prefix().captures(label) else {
        return StationType::Unknown;
    };
    match caps.get(1).map(|m| m.as_str()) {
        Some("P" | "p") => StationType::ParkingSensor,
        Some("S" | "s") => StationType::Sensor,
        _ => StationType::Unknown,
    }
}

pub fn is_lane_label(id: &str, class: &str) -> bool {
    re_lane().is_match(&format!("{id} {class}").to_lowercase())
}

/// Shape of a synthetic marker group: a `g` with `class` whose parent carries `owner_attr`.
///
/// Only that exact shape is treated as overlay. Plan-authored elements that merely share the
/// class are ordinary candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayMarker {
    pub class: &'static str,
    pub owner_attr: &'static str,
}

impl OverlayMarker {
    pub fn matches(&self, doc: &SvgDocument, node: NodeId) -> bool {
        doc.tag(node) == Some("g")
            && doc.has_class(node, self.class)
            && doc
                .parent(node)
                .is_some_and(|p| doc.attr(p, self.owner_attr).is_some())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Node whose own transform is ignored (the viewport wrapper group).
    pub transparent: Option<NodeId>,
    /// Marker subtrees matching this shape are not scanned.
    pub overlay: Option<OverlayMarker>,
    /// Read lane geometry from matching `path` elements. Off by default: `path` lanes pass the
    /// keyword filter but contribute no points, so they are not emitted.
    pub parse_path_lanes: bool,
}

pub fn extract(doc: &SvgDocument, floor: &str) -> ExtractResult {
    extract_with(doc, floor, &ExtractOptions::default())
}

pub fn extract_with(doc: &SvgDocument, floor: &str, options: &ExtractOptions) -> ExtractResult {
    let ex = Extractor { doc, floor, options };
    let stations = ex.stations();
    let lanes = ex.lanes();
    tracing::debug!(
        floor,
        stations = stations.len(),
        lanes = lanes.len(),
        "extracted floor plan entities"
    );
    ExtractResult {
        floor: floor.to_string(),
        stations,
        lanes,
        view_box: doc.attr(doc.root(), "viewBox").map(str::to_string),
    }
}

struct Extractor<'a> {
    doc: &'a SvgDocument,
    floor: &'a str,
    options: &'a ExtractOptions,
}

fn rounded(p: Point) -> Coord {
    Coord {
        x: round_f64(p.x, COORD_DECIMALS),
        y: round_f64(p.y, COORD_DECIMALS),
    }
}

impl Extractor<'_> {
    fn candidates(&self, tags: &[&str]) -> Vec<NodeId> {
        let doc = self.doc;
        let mut out = doc.elements_by_tag(tags);
        if let Some(marker) = self.options.overlay {
            out.retain(|n| !doc.path_from_root(*n).iter().any(|a| marker.matches(doc, *a)));
        }
        out
    }

    fn to_document(&self, node: NodeId, x: f64, y: f64) -> Coord {
        let m = accumulated_within(self.doc, node, self.options.transparent);
        rounded(apply(&m, x, y))
    }

    fn num(&self, node: NodeId, name: &str) -> f64 {
        self.doc.attr_f64(node, name).unwrap_or(0.0)
    }

    fn stations(&self) -> Vec<Station> {
        let doc = self.doc;
        let mut out = Vec::new();
        for el in self.candidates(&STATION_TAGS) {
            let Some(tag) = doc.tag(el).and_then(StationTag::from_tag_name) else {
                continue;
            };

            let (label, local) = if tag == StationTag::Text {
                let label = doc.text_content(el).trim().to_string();
                if !is_station_like(&label) {
                    continue;
                }
                let tspan = doc
                    .descendants(el)
                    .into_iter()
                    .find(|n| doc.tag(*n) == Some("tspan"));
                let first = |name: &str| {
                    tspan
                        .and_then(|t| doc.attr(t, name))
                        .and_then(parse_leading_number)
                        .unwrap_or(0.0)
                };
                (label, (first("x"), first("y")))
            } else {
                let id = doc.attr(el, "id").unwrap_or_default();
                let class = doc.attr(el, "class").unwrap_or_default();
                let label = if id.is_empty() { class } else { id };
                if !is_station_like(label) {
                    continue;
                }
                let center = match tag {
                    StationTag::Rect => (
                        self.num(el, "x") + self.num(el, "width") / 2.0,
                        self.num(el, "y") + self.num(el, "height") / 2.0,
                    ),
                    _ => (self.num(el, "cx"), self.num(el, "cy")),
                };
                (label.to_string(), center)
            };

            let p = self.to_document(el, local.0, local.1);
            out.push(Station {
                kind: classify(&label),
                id: label,
                x: p.x,
                y: p.y,
                tag,
                floor: self.floor.to_string(),
            });
        }
        out
    }

    fn lanes(&self) -> Vec<Lane> {
        let doc = self.doc;
        let mut out = Vec::new();
        for (i, el) in self.candidates(&LANE_TAGS).into_iter().enumerate() {
            let id = doc.attr(el, "id").unwrap_or_default();
            let class = doc.attr(el, "class").unwrap_or_default();
            if !is_lane_label(id, class) {
                continue;
            }
            let label = match (id.is_empty(), class.is_empty()) {
                (false, _) => id.to_string(),
                (true, false) => class.to_string(),
                (true, true) => format!("Lane_{}", i + 1),
            };

            let local: Vec<Point> = match doc.tag(el) {
                Some("polyline") => points_attr(doc.attr(el, "points").unwrap_or_default()),
                Some("line") => vec![
                    Point::new(self.num(el, "x1"), self.num(el, "y1")),
                    Point::new(self.num(el, "x2"), self.num(el, "y2")),
                ],
                Some("path") if self.options.parse_path_lanes => {
                    path_vertices(doc.attr(el, "d").unwrap_or_default())
                }
                _ => Vec::new(),
            };
            if local.len() < 2 {
                continue;
            }

            let m = accumulated_within(doc, el, self.options.transparent);
            out.push(Lane {
                id: label,
                points: local.into_iter().map(|p| rounded(apply(&m, p.x, p.y))).collect(),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_like_accepts_codes_and_keywords() {
        for s in ["P12", "p 3", "S7 north", "Station Alpha", "SENSOR-4", "detector", "حساس ١", "محطة"] {
            assert!(is_station_like(s), "{s}");
        }
        for s in ["", "Pillar", "L1-A1", "P12abc", "exit"] {
            assert!(!is_station_like(s), "{s}");
        }
    }

    #[test]
    fn classification_uses_the_code_prefix_only() {
        assert_eq!(classify("P12"), StationType::ParkingSensor);
        assert_eq!(classify("p 4"), StationType::ParkingSensor);
        assert_eq!(classify("S7"), StationType::Sensor);
        assert_eq!(classify("Station Alpha"), StationType::Unknown);
        assert_eq!(classify("sensor"), StationType::Unknown);
        assert_eq!(classify("detector 2"), StationType::Unknown);
    }

    #[test]
    fn lane_keywords_are_case_insensitive_and_bilingual() {
        assert!(is_lane_label("Lane-1", ""));
        assert!(is_lane_label("", "route LANE"));
        assert!(is_lane_label("مسار-٢", ""));
        assert!(is_lane_label("", "ممر"));
        assert!(!is_lane_label("wall", "outline"));
    }

    #[test]
    fn text_position_defaults_to_origin_without_tspan() {
        let doc = SvgDocument::parse(
            r#"<svg><g transform="translate(3,4)"><text x="50" y="50">S9</text></g></svg>"#,
        )
        .unwrap();
        let r = extract(&doc, "B2");
        assert_eq!(r.stations.len(), 1);
        assert_eq!((r.stations[0].x, r.stations[0].y), (3.0, 4.0));
        assert_eq!(r.stations[0].kind, StationType::Sensor);
        assert_eq!(r.floor, "B2");
        assert_eq!(r.view_box, None);
    }

    #[test]
    fn shapes_prefer_id_over_class() {
        let doc = SvgDocument::parse(
            r#"<svg viewBox="0 0 10 10">
                <rect id="P3" class="sensor" x="2" y="2" width="4" height="2"/>
                <circle class="sensor-node" cx="1" cy="1" r="1"/>
                <ellipse id="E1" cx="1" cy="1" rx="1" ry="1"/>
            </svg>"#,
        )
        .unwrap();
        let r = extract(&doc, "B1");
        let ids: Vec<_> = r.stations.iter().map(|s| (s.id.as_str(), s.tag)).collect();
        assert_eq!(ids, vec![("P3", StationTag::Rect), ("sensor-node", StationTag::Circle)]);
        assert_eq!((r.stations[0].x, r.stations[0].y), (4.0, 3.0));
        assert_eq!(r.view_box.as_deref(), Some("0 0 10 10"));
    }

    #[test]
    fn coordinates_are_rounded_to_two_decimals() {
        let doc = SvgDocument::parse(
            r#"<svg><g transform="matrix(1,0,0,1,0.005,1.23456)"><circle id="S1" cx="0.3333" cy="0"/></g></svg>"#,
        )
        .unwrap();
        let s = &extract(&doc, "B1").stations[0];
        assert_eq!((s.x, s.y), (0.34, 1.23));
    }

    #[test]
    fn path_lanes_are_filtered_but_not_emitted_by_default() {
        let doc = SvgDocument::parse(
            r#"<svg>
                <path id="lane-ramp" d="M0 0 L10 0 L10 10"/>
                <line class="lane" x1="0" y1="0" x2="5" y2="0"/>
                <polyline id="single-lane" points="1,1"/>
            </svg>"#,
        )
        .unwrap();
        let r = extract(&doc, "B1");
        assert_eq!(r.lanes.len(), 1);
        assert_eq!(r.lanes[0].id, "lane");

        let opts = ExtractOptions {
            parse_path_lanes: true,
            ..ExtractOptions::default()
        };
        let r = extract_with(&doc, "B1", &opts);
        assert_eq!(r.lanes.len(), 2);
        assert_eq!(r.lanes[0].id, "lane-ramp");
        assert_eq!(r.lanes[0].points.len(), 3);
    }

    const MARKER: OverlayMarker = OverlayMarker {
        class: "sensor",
        owner_attr: "data-slot-id",
    };

    #[test]
    fn overlay_markers_and_transparent_node() {
        let doc = SvgDocument::parse(
            r#"<svg><g id="wrap" transform="translate(100,100) scale(3)">
                <g transform="translate(1,1)"><text><tspan x="1" y="1">P1</tspan></text></g>
                <rect data-slot-id="L1-A1" x="0" y="0" width="10" height="10">
                    <g class="sensor"><circle class="sensor-dot" cx="0" cy="0" r="5"/></g>
                </rect>
            </g></svg>"#,
        )
        .unwrap();
        let opts = ExtractOptions {
            transparent: doc.find_by_id("wrap"),
            overlay: Some(MARKER),
            parse_path_lanes: false,
        };
        let r = extract_with(&doc, "B1", &opts);
        assert_eq!(r.stations.len(), 1);
        assert_eq!((r.stations[0].x, r.stations[0].y), (2.0, 2.0));
    }

    #[test]
    fn plan_elements_sharing_the_marker_class_are_still_candidates() {
        let doc = SvgDocument::parse(
            r#"<svg>
                <circle class="sensor" cx="20" cy="30" r="4"/>
                <g class="sensor"><text><tspan x="5" y="6">S12</tspan></text></g>
            </svg>"#,
        )
        .unwrap();
        let opts = ExtractOptions {
            overlay: Some(MARKER),
            ..ExtractOptions::default()
        };
        let r = extract_with(&doc, "B1", &opts);
        let ids: Vec<_> = r.stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sensor", "S12"]);
        assert_eq!(r, extract(&doc, "B1"));
    }
}
