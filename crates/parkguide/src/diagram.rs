//! The interactive diagram controller.
//!
//! [`GuidanceDiagram`] owns the loaded document and wires the slot index, the status
//! overlay, the viewport and the live feed together. Every mutation is a synchronous
//! write into the document; the host re-renders from [`GuidanceDiagram::svg_markup`]
//! (or from [`GuidanceDiagram::document`]) and collects [`DiagramEvent`]s with
//! [`GuidanceDiagram::drain_events`].

use crate::config::GuidanceConfig;
use crate::feed::{LiveFeed, RandomSource, RngSource, Transition};
use crate::gesture::{GestureState, GestureTracker, InputEvent};
use crate::index::{SLOT_ID_ATTR, SlotIndex};
use crate::overlay::{OverlayReport, SENSOR_MARKER, StatusOverlay, is_overlay};
use crate::slot::{Slot, SlotStatus, SlotTable, StatusCounts};
use crate::source::{DirectorySource, FloorPlanSource};
use crate::viewport::Viewport;
use crate::{Error, Result};
use parkguide_core::bbox::local_bbox_filtered;
use parkguide_core::document::parse_number_list;
use parkguide_core::geom::point;
use parkguide_core::{ExtractOptions, ExtractResult, NodeId, SvgDocument, extract_with};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Id of the group that carries the pan/zoom transform.
pub const WRAPPER_ID: &str = "pz-wrap";

#[derive(Debug, Clone, PartialEq)]
pub enum DiagramEvent {
    FloorLoaded { floor: String, slots: usize },
    EntitiesDetected(ExtractResult),
    SlotSelected { id: String },
    SearchChanged { term: String },
}

/// Which input handlers are live for the current document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bindings {
    pan_zoom: bool,
    click: bool,
}

pub struct GuidanceDiagram {
    config: GuidanceConfig,
    source: Box<dyn FloorPlanSource>,
    floor: String,
    doc: Option<SvgDocument>,
    wrapper: Option<NodeId>,
    index: SlotIndex,
    overlay: StatusOverlay,
    viewport: Viewport,
    gestures: GestureTracker,
    bindings: Bindings,
    feed: LiveFeed,
    slots: SlotTable,
    search: String,
    selected: Option<String>,
    events: Vec<DiagramEvent>,
}

impl std::fmt::Debug for GuidanceDiagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidanceDiagram")
            .field("floor", &self.floor)
            .field("loaded", &self.doc.is_some())
            .field("slots", &self.slots.len())
            .field("selected", &self.selected)
            .field("viewport", &self.viewport.state())
            .finish_non_exhaustive()
    }
}

impl GuidanceDiagram {
    pub fn new(config: GuidanceConfig, source: impl FloorPlanSource + 'static) -> Self {
        Self::with_random_source(config, source, RngSource::from_entropy())
    }

    /// Reads floor plans from `dir` using the config's floor → file map.
    pub fn from_dir(config: GuidanceConfig, dir: impl Into<PathBuf>) -> Self {
        let source = DirectorySource::new(dir, config.floor_plans.clone());
        Self::new(config, source)
    }

    pub fn with_random_source(
        config: GuidanceConfig,
        source: impl FloorPlanSource + 'static,
        random: impl RandomSource + 'static,
    ) -> Self {
        Self {
            floor: config.default_floor.clone(),
            source: Box::new(source),
            doc: None,
            wrapper: None,
            index: SlotIndex::new(),
            overlay: StatusOverlay::new(config.overlay.clone()),
            viewport: Viewport::new(config.viewport.clone()),
            gestures: GestureTracker::new(),
            bindings: Bindings::default(),
            feed: LiveFeed::new(config.feed.clone(), random),
            slots: SlotTable::seeded(),
            search: String::new(),
            selected: None,
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    pub fn floor(&self) -> &str {
        &self.floor
    }

    pub fn floors(&self) -> Vec<String> {
        self.source.floors()
    }

    pub fn is_loaded(&self) -> bool {
        self.doc.is_some()
    }

    pub fn document(&self) -> Option<&SvgDocument> {
        self.doc.as_ref()
    }

    pub fn wrapper(&self) -> Option<NodeId> {
        self.wrapper
    }

    pub fn index(&self) -> &SlotIndex {
        &self.index
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn counts(&self) -> StatusCounts {
        self.slots.counts()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_simulating(&self) -> bool {
        self.feed.is_running()
    }

    pub fn drain_events(&mut self) -> Vec<DiagramEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current document as SVG markup, wrapper, classes and markers included.
    pub fn svg_markup(&self) -> Option<String> {
        self.doc.as_ref().map(SvgDocument::to_svg_string)
    }

    // ---- loading ----

    /// Loads the configured default floor.
    pub fn load_default(&mut self) -> Result<()> {
        let floor = self.config.default_floor.clone();
        self.switch_floor(&floor)
    }

    /// Clears the selection and loads the plan for `floor`. On error the current document
    /// stays in place.
    pub fn switch_floor(&mut self, floor: &str) -> Result<()> {
        let markup = self.source.load(floor)?;
        self.selected = None;
        self.load_svg_text(floor, &markup)
    }

    /// Replaces the document with `markup` and runs the whole load sequence:
    /// wrap, size, index, fit, paint.
    pub fn load_svg_text(&mut self, floor: &str, markup: &str) -> Result<()> {
        let mut doc = SvgDocument::parse(markup)?;
        self.detach_bindings();
        tracing::debug!(floor, nodes = doc.len(), "loading floor plan");

        let wrapper = ensure_wrapper(&mut doc);
        let (view_w, view_h) = self.resolve_view_box(&mut doc);
        self.viewport.set_view_size(view_w, view_h);

        self.index.reindex(&doc, Some(wrapper));
        self.floor = floor.to_string();
        self.doc = Some(doc);
        self.wrapper = Some(wrapper);
        self.bindings.pan_zoom = true;

        self.viewport.fit_view();
        self.write_transform();
        self.repaint();

        self.events.push(DiagramEvent::FloorLoaded {
            floor: self.floor.clone(),
            slots: self.index.len(),
        });
        Ok(())
    }

    /// Intrinsic size from `viewBox`; without a usable one, from the content box, the host,
    /// then the configured fallback. A synthesized `viewBox` is written back.
    fn resolve_view_box(&self, doc: &mut SvgDocument) -> (f64, f64) {
        let root = doc.root();
        let vb = doc
            .attr(root, "viewBox")
            .map(parse_number_list)
            .unwrap_or_default();
        if vb.len() == 4 && vb.iter().all(|n| n.is_finite()) {
            return (vb[2], vb[3]);
        }

        let st = self.viewport.state();
        let cfg = self.viewport.config();
        let content = local_bbox_filtered(doc, root, &is_overlay);
        let pick = |measured: Option<f64>, host: f64, fallback: f64| {
            measured
                .filter(|v| *v > 0.0)
                .or((host > 0.0).then_some(host))
                .unwrap_or(fallback)
        };
        let w = pick(content.map(|b| b.width()), st.host_w, cfg.fallback_width);
        let h = pick(content.map(|b| b.height()), st.host_h, cfg.fallback_height);
        doc.set_attr(root, "viewBox", format!("0 0 {w} {h}"));
        tracing::debug!(width = w, height = h, "synthesized viewBox");
        (w, h)
    }

    fn detach_bindings(&mut self) {
        self.bindings = Bindings::default();
        self.gestures.release();
    }

    fn write_transform(&mut self) {
        if let (Some(doc), Some(wrapper)) = (self.doc.as_mut(), self.wrapper) {
            doc.set_attr(wrapper, "transform", self.viewport.transform_attr());
        }
    }

    /// Reflects the slot table, search and selection onto the document.
    fn repaint(&mut self) -> OverlayReport {
        let Some(doc) = self.doc.as_mut() else {
            return OverlayReport::default();
        };
        let report = self.overlay.apply_status(
            doc,
            &self.index,
            self.slots.as_slice(),
            &self.search,
            self.selected.as_deref(),
        );
        self.bindings.click = true;
        report
    }

    // ---- slot state ----

    /// Sets the search term and returns the ids that were highlighted.
    pub fn set_search(&mut self, term: &str) -> Vec<String> {
        self.search = term.to_string();
        self.events.push(DiagramEvent::SearchChanged {
            term: self.search.clone(),
        });
        self.repaint().highlighted
    }

    /// Replaces the slot table with a host-supplied batch.
    pub fn set_slots(&mut self, slots: Vec<Slot>) {
        self.slots = SlotTable::new(slots);
        self.repaint();
    }

    /// Upserts a host-supplied batch into the slot table.
    pub fn merge_slots(&mut self, slots: Vec<Slot>) {
        self.slots.merge(slots);
        self.repaint();
    }

    /// Sets `id`'s status (creating the slot when unknown), selects it and centres on it.
    pub fn apply_status_by_label(&mut self, id: &str, status: SlotStatus) {
        let id = id.trim();
        if id.is_empty() {
            return;
        }
        let default_battery = self.overlay.config().default_battery;
        if self.slots.apply_status_by_label(id, status, default_battery) {
            tracing::debug!(slot = id, %status, "added slot from status update");
        }
        self.set_selected(id);
        self.repaint();
        let scale = self.config.viewport.status_focus_scale;
        self.zoom_to_slot(id, Some(scale));
    }

    /// Selects an indexed slot. Unknown ids are ignored.
    pub fn select_slot(&mut self, id: &str) -> bool {
        if !self.index.contains(id) {
            return false;
        }
        self.set_selected(id);
        self.repaint();
        true
    }

    /// Centres the viewport on an indexed slot (default scale: the configured focus scale)
    /// and selects it.
    pub fn zoom_to_slot(&mut self, id: &str, target_scale: Option<f64>) -> bool {
        let Some(bb) = self.index.content_bbox(id) else {
            return false;
        };
        let scale = target_scale.unwrap_or(self.config.viewport.focus_scale);
        self.viewport.center_on_box(&bb, Some(scale));
        self.write_transform();
        self.set_selected(id);
        self.repaint();
        true
    }

    /// Records a new selection; [`DiagramEvent::SlotSelected`] fires only when it changes.
    fn set_selected(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            return;
        }
        self.selected = Some(id.to_string());
        self.events.push(DiagramEvent::SlotSelected { id: id.to_string() });
    }

    // ---- viewport ----

    pub fn set_host_size(&mut self, width: f64, height: f64) {
        self.viewport.set_host_size(width, height);
        if self.bindings.pan_zoom {
            self.viewport.fit_view();
            self.write_transform();
        }
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.config.viewport.button_step);
        self.write_transform();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(self.config.viewport.button_step);
        self.write_transform();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset_view();
        self.write_transform();
    }

    /// Routes one host input event. Returns `true` when the document changed.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if !self.bindings.pan_zoom {
            return false;
        }
        let moved = match event {
            InputEvent::PointerDown { x, y, target } => {
                let on_slot = match target {
                    Some(t) => self
                        .doc
                        .as_ref()
                        .is_some_and(|d| d.closest_with_attr(t, SLOT_ID_ATTR).is_some()),
                    None => self.slot_at(x, y).is_some(),
                };
                self.gestures.pointer_down(point(x, y), on_slot);
                false
            }
            InputEvent::PointerMove { x, y } => {
                self.gestures.pointer_move(point(x, y), &mut self.viewport)
            }
            InputEvent::PointerUp | InputEvent::PointerLeave | InputEvent::TouchEnd => {
                self.gestures.release();
                false
            }
            InputEvent::Wheel { x, y, delta_y } => {
                let factor = 1.0 + (-delta_y * self.config.viewport.wheel_sensitivity);
                self.viewport.zoom_at(factor, x, y);
                true
            }
            InputEvent::DoubleClick { x, y } => {
                self.viewport
                    .zoom_at(self.config.viewport.double_click_step, x, y);
                true
            }
            InputEvent::TouchStart { touches } => {
                self.gestures.touch_start(&touches, &self.viewport);
                false
            }
            InputEvent::TouchMove { touches } => {
                self.gestures.touch_move(&touches, &mut self.viewport)
            }
            InputEvent::Click { x, y, target } => return self.click(x, y, target),
            InputEvent::Resize { width, height } => {
                self.set_host_size(width, height);
                return true;
            }
        };
        if moved {
            self.write_transform();
        }
        moved
    }

    fn click(&mut self, x: f64, y: f64, target: Option<NodeId>) -> bool {
        if !self.bindings.click {
            return false;
        }
        let id = match (target, self.doc.as_ref()) {
            (Some(t), Some(doc)) => self.index.slot_of(doc, t).map(str::to_string),
            _ => self.slot_at(x, y),
        };
        match id {
            Some(id) => self.select_slot(&id),
            None => false,
        }
    }

    /// Slot under a host-relative screen point.
    pub fn slot_at(&self, x: f64, y: f64) -> Option<String> {
        let p = self.viewport.screen_to_content(x, y);
        self.index.hit_test(p).map(str::to_string)
    }

    // ---- live feed ----

    pub fn start_simulation(&mut self) {
        self.feed.start();
    }

    pub fn stop_simulation(&mut self) {
        self.feed.stop();
    }

    /// Flips the live feed and returns whether it is now running.
    pub fn toggle_simulation(&mut self) -> bool {
        self.feed.toggle()
    }

    /// Lets `elapsed` pass for the live feed and repaints when any slot was touched.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Transition> {
        let transitions = self.feed.advance(elapsed, &mut self.slots);
        if !transitions.is_empty() {
            self.repaint();
        }
        transitions
    }

    // ---- extraction ----

    /// Extracts stations and lanes from the current plan in content space. Without a loaded
    /// document this does nothing.
    pub fn extract(&mut self) -> Option<ExtractResult> {
        let doc = self.doc.as_ref()?;
        let options = ExtractOptions {
            transparent: self.wrapper,
            overlay: Some(SENSOR_MARKER),
            parse_path_lanes: self.config.parse_path_lanes,
        };
        let result = extract_with(doc, &self.floor, &options);
        self.events
            .push(DiagramEvent::EntitiesDetected(result.clone()));
        Some(result)
    }

    /// Pretty JSON of [`Self::extract`].
    pub fn export_json(&mut self) -> Result<Option<String>> {
        match self.extract() {
            Some(result) => Ok(Some(result.to_json_pretty()?)),
            None => Ok(None),
        }
    }

    /// Writes `garage-<floor>.json` into `dir` and returns its path.
    pub fn write_export(&mut self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(result) = self.extract() else {
            return Ok(None);
        };
        let path = dir.as_ref().join(result.export_file_name());
        let json = result.to_json_pretty()?;
        std::fs::write(&path, json).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote floor export");
        Ok(Some(path))
    }

    // ---- teardown ----

    /// Stops the feed and drops every input binding. The document stays readable.
    pub fn teardown(&mut self) {
        self.feed.stop();
        self.detach_bindings();
    }
}

impl Drop for GuidanceDiagram {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Returns the wrapper group, creating it around all root children when absent.
fn ensure_wrapper(doc: &mut SvgDocument) -> NodeId {
    let root = doc.root();
    if let Some(existing) = doc.find_by_id(WRAPPER_ID) {
        return existing;
    }
    let wrapper = doc.create_element("g");
    doc.set_attr(wrapper, "id", WRAPPER_ID);
    let kids: Vec<NodeId> = doc.children(root).to_vec();
    for k in kids {
        doc.append_child(wrapper, k);
    }
    doc.append_child(root, wrapper);
    wrapper
}
