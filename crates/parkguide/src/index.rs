//! Slot id → element lookup.
//!
//! The index is the only owner of the id → element table; everything else reads through it.
//! Element references and boxes go stale whenever the document is replaced, so
//! [`SlotIndex::reindex`] must run after every load.

use crate::overlay::is_overlay;
use parkguide_core::bbox::local_bbox_filtered;
use parkguide_core::geom::{Point, Rect};
use parkguide_core::transform::{accumulated_within, apply_rect};
use parkguide_core::{NodeId, SvgDocument};
use rustc_hash::FxHashMap;

pub const SLOT_ID_ATTR: &str = "data-slot-id";

#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    pub node: NodeId,
    /// Box in the element's own user space (what `getBBox()` reports).
    pub bbox: Option<Rect>,
    /// Box mapped into content space (all ancestor transforms except the viewport wrapper).
    pub content_bbox: Option<Rect>,
}

impl SlotEntry {
    /// Centre of the slot in content space.
    pub fn center(&self) -> Option<Point> {
        self.content_bbox.map(|b| b.center())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotIndex {
    entries: FxHashMap<String, SlotEntry>,
    /// Every element carrying a slot id, duplicates included, in document order.
    elements: Vec<NodeId>,
}

impl SlotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.elements.clear();
    }

    /// Rebuilds the tables from every `[data-slot-id]` element. `wrapper` is the viewport
    /// group whose own transform is excluded from content-space boxes.
    pub fn reindex(&mut self, doc: &SvgDocument, wrapper: Option<NodeId>) {
        self.clear();
        for node in doc.descendants(doc.root()) {
            let Some(id) = doc.attr(node, SLOT_ID_ATTR) else {
                continue;
            };
            if id.is_empty() || is_inside_overlay(doc, node) {
                continue;
            }
            self.elements.push(node);
            if self.entries.contains_key(id) {
                tracing::warn!(slot = id, "duplicate data-slot-id; keeping the first element");
                continue;
            }
            let bbox = local_bbox_filtered(doc, node, &is_overlay);
            let content_bbox = bbox.map(|b| {
                let m = accumulated_within(doc, node, wrapper);
                apply_rect(&m, &b)
            });
            self.entries.insert(
                id.to_string(),
                SlotEntry {
                    node,
                    bbox,
                    content_bbox,
                },
            );
        }
        tracing::debug!(slots = self.entries.len(), "indexed slot elements");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SlotEntry> {
        self.entries.get(id)
    }

    pub fn node(&self, id: &str) -> Option<NodeId> {
        self.entries.get(id).map(|e| e.node)
    }

    pub fn bbox(&self, id: &str) -> Option<Rect> {
        self.entries.get(id).and_then(|e| e.bbox)
    }

    pub fn content_bbox(&self, id: &str) -> Option<Rect> {
        self.entries.get(id).and_then(|e| e.content_bbox)
    }

    /// All slot elements, including duplicates that lost the id lookup.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// Sorted ids of the indexed slots.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Slot id owning `node`, resolved through the nearest `[data-slot-id]` ancestor.
    pub fn slot_of<'d>(&self, doc: &'d SvgDocument, node: NodeId) -> Option<&'d str> {
        let el = doc.closest_with_attr(node, SLOT_ID_ATTR)?;
        doc.attr(el, SLOT_ID_ATTR).filter(|id| self.contains(id))
    }

    /// Slot whose content-space box contains `p`. When boxes overlap, the smallest wins.
    pub fn hit_test(&self, p: Point) -> Option<&str> {
        self.entries
            .iter()
            .filter_map(|(id, e)| e.content_bbox.map(|b| (id, b)))
            .filter(|(_, b)| {
                p.x >= b.min_x() && p.x <= b.max_x() && p.y >= b.min_y() && p.y <= b.max_y()
            })
            .min_by(|(ida, a), (idb, b)| {
                a.area()
                    .total_cmp(&b.area())
                    .then_with(|| ida.cmp(idb))
            })
            .map(|(id, _)| id.as_str())
    }
}

fn is_inside_overlay(doc: &SvgDocument, node: NodeId) -> bool {
    doc.path_from_root(node)
        .into_iter()
        .any(|n| is_overlay(doc, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkguide_core::geom::{point, rect};

    const PLAN: &str = r#"<svg viewBox="0 0 100 100">
        <g transform="translate(5,5)">
            <rect data-slot-id="L1-A1" x="0" y="0" width="10" height="10"/>
            <g data-slot-id="L1-A2" transform="translate(20,0)">
                <rect x="0" y="0" width="10" height="10"/>
                <rect x="2" y="2" width="2" height="2"/>
            </g>
            <rect data-slot-id="L1-A1" x="50" y="50" width="10" height="10"/>
        </g>
    </svg>"#;

    #[test]
    fn content_box_applies_ancestor_transforms() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        let mut index = SlotIndex::new();
        index.reindex(&doc, None);

        assert_eq!(index.len(), 2);
        assert_eq!(index.elements().len(), 3);
        assert_eq!(index.bbox("L1-A1"), Some(rect(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(index.get("L1-A1").unwrap().center(), Some(point(10.0, 10.0)));
        assert_eq!(index.content_bbox("L1-A2"), Some(rect(25.0, 5.0, 10.0, 10.0)));
        assert_eq!(index.ids(), vec!["L1-A1", "L1-A2"]);
    }

    #[test]
    fn slot_of_walks_up_to_the_slot_element() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        let mut index = SlotIndex::new();
        index.reindex(&doc, None);

        let a2 = index.node("L1-A2").unwrap();
        let inner = doc.element_children(a2).nth(1).unwrap();
        assert_eq!(index.slot_of(&doc, inner), Some("L1-A2"));
        assert_eq!(index.slot_of(&doc, doc.root()), None);
    }

    #[test]
    fn hit_test_prefers_the_smallest_box() {
        let doc = SvgDocument::parse(
            r#"<svg><g data-slot-id="zone"><rect x="0" y="0" width="100" height="100"/></g>
               <rect data-slot-id="bay" x="10" y="10" width="10" height="10"/></svg>"#,
        )
        .unwrap();
        let mut index = SlotIndex::new();
        index.reindex(&doc, None);
        assert_eq!(index.hit_test(point(15.0, 15.0)), Some("bay"));
        assert_eq!(index.hit_test(point(50.0, 50.0)), Some("zone"));
        assert_eq!(index.hit_test(point(500.0, 50.0)), None);
    }

    #[test]
    fn reindex_replaces_stale_entries() {
        let mut index = SlotIndex::new();
        index.reindex(&SvgDocument::parse(PLAN).unwrap(), None);
        index.reindex(
            &SvgDocument::parse(r#"<svg><rect data-slot-id="B2-1" width="1" height="1"/></svg>"#)
                .unwrap(),
            None,
        );
        assert_eq!(index.ids(), vec!["B2-1"]);
        assert!(!index.contains("L1-A1"));
    }
}
