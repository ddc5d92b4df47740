//! Status classes and sensor markers painted onto indexed slot elements.

use crate::config::OverlayConfig;
use crate::index::{SLOT_ID_ATTR, SlotIndex};
use crate::slot::{Slot, SlotStatus, search_ids};
use parkguide_core::bbox::local_bbox_filtered;
use parkguide_core::{NodeId, OverlayMarker, SvgDocument};

pub const SENSOR_CLASS: &str = "sensor";
pub const DOT_CLASS: &str = "sensor-dot";
pub const LABEL_CLASS: &str = "sensor-label";
pub const HIGHLIGHT_CLASS: &str = "slot--highlight";
pub const SELECTED_CLASS: &str = "slot--selected";

const STATE_CLASSES: [&str; 6] = [
    "slot--free",
    "slot--occupied",
    "slot--reserved",
    "slot--disabled",
    HIGHLIGHT_CLASS,
    SELECTED_CLASS,
];

/// The marker group the overlay appends to each slot: `g.sensor` directly under a slot element.
pub const SENSOR_MARKER: OverlayMarker = OverlayMarker {
    class: SENSOR_CLASS,
    owner_attr: SLOT_ID_ATTR,
};

pub fn is_overlay(doc: &SvgDocument, node: NodeId) -> bool {
    SENSOR_MARKER.matches(doc, node)
}

/// Tooltip text of a slot's sensor marker.
pub fn tooltip(slot: &Slot) -> String {
    let mut text = format!("ID: {} | Status: {}", slot.id, slot.status);
    if let Some(b) = slot.sensor_battery {
        text.push_str(&format!(" | Battery: {b}%"));
    }
    if let Some(plate) = slot.plate.as_deref().filter(|_| slot.status == SlotStatus::Occupied) {
        text.push_str(&format!(" | Plate: {plate}"));
    }
    text
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayReport {
    pub highlighted: Vec<String>,
    pub painted: usize,
    /// Slots in the table with no element on the current floor.
    pub skipped: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusOverlay {
    config: OverlayConfig,
}

impl StatusOverlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Repaints every indexed slot from `slots`. Classes from the previous pass are cleared
    /// first, so calling this repeatedly with the same input is stable.
    pub fn apply_status(
        &self,
        doc: &mut SvgDocument,
        index: &SlotIndex,
        slots: &[Slot],
        search_term: &str,
        selected: Option<&str>,
    ) -> OverlayReport {
        let mut report = OverlayReport::default();

        for &node in index.elements() {
            doc.remove_classes(node, &STATE_CLASSES);
        }

        for id in search_ids(slots, search_term) {
            if let Some(node) = index.node(id) {
                doc.add_class(node, HIGHLIGHT_CLASS);
                report.highlighted.push(id.to_string());
            }
        }

        for slot in slots {
            let Some(node) = index.node(&slot.id) else {
                report.skipped.push(slot.id.clone());
                continue;
            };
            doc.add_class(node, slot.status.class_name());
            self.upsert_sensor(doc, node, slot);
            report.painted += 1;
        }

        if let Some(node) = selected.and_then(|id| index.node(id)) {
            doc.add_class(node, SELECTED_CLASS);
            report.selected = selected.map(str::to_string);
        }

        tracing::trace!(
            painted = report.painted,
            highlighted = report.highlighted.len(),
            "applied slot status"
        );
        report
    }

    /// Creates (once) or refreshes the sensor marker of `slot_node`.
    pub fn upsert_sensor(&self, doc: &mut SvgDocument, slot_node: NodeId, slot: &Slot) {
        let group = match doc.child_with_class(slot_node, "g", SENSOR_CLASS) {
            Some(g) => g,
            None => {
                let g = doc.create_element("g");
                doc.set_attr(g, "class", SENSOR_CLASS);
                doc.append_child(slot_node, g);
                g
            }
        };

        let dot = match doc.child_with_class(group, "circle", DOT_CLASS) {
            Some(d) => d,
            None => {
                let d = doc.create_element("circle");
                doc.set_attr(d, "class", DOT_CLASS);
                doc.append_child(group, d);
                d
            }
        };
        doc.set_attr(dot, "r", self.config.dot_radius.to_string());
        doc.set_attr(dot, "stroke", "#000");
        doc.set_attr(dot, "stroke-width", "0.75");
        doc.set_attr(dot, "data-status", slot.status.as_str());
        match slot.sensor_battery {
            Some(b) => doc.set_attr(dot, "data-battery", b.to_string()),
            None => {
                doc.remove_attr(dot, "data-battery");
            }
        }

        let label = doc.child_with_class(group, "text", LABEL_CLASS);
        let label = match (self.config.show_labels, label) {
            (true, Some(l)) => Some(l),
            (true, None) => {
                let l = doc.create_element("text");
                doc.set_attr(l, "class", LABEL_CLASS);
                doc.set_attr(l, "font-size", "9");
                doc.set_attr(l, "text-anchor", "end");
                doc.append_child(group, l);
                Some(l)
            }
            (false, Some(l)) => {
                doc.detach(l);
                None
            }
            (false, None) => None,
        };

        // Measured without the marker so the dot does not push its own anchor outwards.
        if let Some(bb) = local_bbox_filtered(doc, slot_node, &is_overlay) {
            let inset = self.config.sensor_inset;
            let cx = bb.max_x() - inset;
            let cy = bb.min_y() + inset;
            doc.set_attr(dot, "cx", cx.to_string());
            doc.set_attr(dot, "cy", cy.to_string());
            if let Some(l) = label {
                doc.set_attr(l, "x", (cx - 2.0).to_string());
                doc.set_attr(l, "y", (cy + 10.0).to_string());
            }
        }
        if let Some(l) = label {
            doc.set_text_content(l, &slot.id);
        }

        let title = match doc.child_with_tag(group, "title") {
            Some(t) => t,
            None => {
                let t = doc.create_element("title");
                doc.append_child(group, t);
                t
            }
        };
        doc.set_text_content(title, &tooltip(slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(svg: &str) -> (SvgDocument, SlotIndex) {
        let doc = SvgDocument::parse(svg).unwrap();
        let mut index = SlotIndex::new();
        index.reindex(&doc, None);
        (doc, index)
    }

    const PLAN: &str = r#"<svg viewBox="0 0 100 100">
        <rect data-slot-id="L1-A1" x="0" y="0" width="40" height="20"/>
        <rect data-slot-id="L1-A2" class="bay" x="50" y="0" width="40" height="20"/>
    </svg>"#;

    #[test]
    fn sensor_marker_sits_inside_the_top_right_corner() {
        let (mut doc, index) = indexed(PLAN);
        let overlay = StatusOverlay::default();
        let slots = [Slot::new("L1-A1", SlotStatus::Occupied).with_battery(80)];
        overlay.apply_status(&mut doc, &index, &slots, "", None);

        let node = index.node("L1-A1").unwrap();
        assert!(doc.has_class(node, "slot--occupied"));
        let group = doc.child_with_class(node, "g", SENSOR_CLASS).unwrap();
        let dot = doc.child_with_class(group, "circle", DOT_CLASS).unwrap();
        assert_eq!(doc.attr(dot, "cx"), Some("34"));
        assert_eq!(doc.attr(dot, "cy"), Some("6"));
        assert_eq!(doc.attr(dot, "data-battery"), Some("80"));
        let title = doc.child_with_tag(group, "title").unwrap();
        assert_eq!(
            doc.text_content(title),
            "ID: L1-A1 | Status: occupied | Battery: 80%"
        );
    }

    #[test]
    fn repeated_application_reuses_the_marker() {
        let (mut doc, index) = indexed(PLAN);
        let overlay = StatusOverlay::default();
        let node = index.node("L1-A2").unwrap();

        overlay.apply_status(&mut doc, &index, &[Slot::new("L1-A2", SlotStatus::Free)], "", None);
        overlay.apply_status(
            &mut doc,
            &index,
            &[Slot::new("L1-A2", SlotStatus::Reserved)],
            "",
            None,
        );

        let groups = doc
            .element_children(node)
            .filter(|c| is_overlay(&doc, *c))
            .count();
        assert_eq!(groups, 1);
        assert_eq!(doc.attr(node, "class"), Some("bay slot--reserved"));
    }

    #[test]
    fn highlight_and_selection_are_cleared_between_passes() {
        let (mut doc, index) = indexed(PLAN);
        let overlay = StatusOverlay::default();
        let slots = [
            Slot::new("L1-A1", SlotStatus::Free),
            Slot::new("L1-A2", SlotStatus::Free),
            Slot::new("L9-Z9", SlotStatus::Free),
        ];

        let report = overlay.apply_status(&mut doc, &index, &slots, "a2", Some("L1-A1"));
        assert_eq!(report.highlighted, vec!["L1-A2"]);
        assert_eq!(report.skipped, vec!["L9-Z9"]);
        assert_eq!(report.selected.as_deref(), Some("L1-A1"));

        overlay.apply_status(&mut doc, &index, &slots, "", None);
        let a1 = index.node("L1-A1").unwrap();
        let a2 = index.node("L1-A2").unwrap();
        assert!(!doc.has_class(a1, SELECTED_CLASS));
        assert!(!doc.has_class(a2, HIGHLIGHT_CLASS));
    }

    #[test]
    fn labels_follow_the_config_toggle() {
        let (mut doc, index) = indexed(PLAN);
        let node = index.node("L1-A1").unwrap();
        let slot = Slot::new("L1-A1", SlotStatus::Free);

        let labelled = StatusOverlay::new(OverlayConfig {
            show_labels: true,
            ..OverlayConfig::default()
        });
        labelled.upsert_sensor(&mut doc, node, &slot);
        let group = doc.child_with_class(node, "g", SENSOR_CLASS).unwrap();
        let label = doc.child_with_class(group, "text", LABEL_CLASS).unwrap();
        assert_eq!(doc.text_content(label), "L1-A1");

        StatusOverlay::default().upsert_sensor(&mut doc, node, &slot);
        assert!(doc.child_with_class(group, "text", LABEL_CLASS).is_none());
    }

    #[test]
    fn tooltip_lists_the_plate_only_while_occupied() {
        let slot = Slot::new("L1-A2", SlotStatus::Occupied)
            .with_plate("X 1")
            .with_battery(72);
        assert_eq!(
            tooltip(&slot),
            "ID: L1-A2 | Status: occupied | Battery: 72% | Plate: X 1"
        );
        assert_eq!(
            tooltip(&Slot::new("L1-A2", SlotStatus::Free)),
            "ID: L1-A2 | Status: free"
        );
    }
}
