//! Pointer and touch input, reduced to viewport updates.
//!
//! The host translates its native events into [`InputEvent`]s with host-relative pixel
//! coordinates. Dragging and pinching are tracked by [`GestureTracker`]:
//! `Idle -> Panning -> Idle` for a mouse drag or a one-finger touch, and
//! `Idle -> Pinching -> Idle` for a two-finger touch.

use crate::viewport::Viewport;
use parkguide_core::NodeId;
use parkguide_core::geom::{Point, point};

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// `target` is the element under the pointer, if the host resolved one.
    PointerDown { x: f64, y: f64, target: Option<NodeId> },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    PointerLeave,
    Wheel { x: f64, y: f64, delta_y: f64 },
    DoubleClick { x: f64, y: f64 },
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd,
    Click { x: f64, y: f64, target: Option<NodeId> },
    Resize { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    Panning {
        last: Point,
    },
    Pinching {
        start_dist: f64,
        start_scale: f64,
        mid: Point,
    },
}

#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    state: GestureState,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Starts a drag unless the press landed on a slot (slots are for selection).
    pub fn pointer_down(&mut self, at: Point, on_slot: bool) {
        if on_slot {
            return;
        }
        self.state = GestureState::Panning { last: at };
    }

    /// Returns `true` when the viewport moved.
    pub fn pointer_move(&mut self, at: Point, viewport: &mut Viewport) -> bool {
        let GestureState::Panning { last } = self.state else {
            return false;
        };
        viewport.pan_by(at.x - last.x, at.y - last.y);
        self.state = GestureState::Panning { last: at };
        true
    }

    pub fn release(&mut self) {
        self.state = GestureState::Idle;
    }

    pub fn touch_start(&mut self, touches: &[Point], viewport: &Viewport) {
        match touches {
            [one] => self.state = GestureState::Panning { last: *one },
            [p1, p2, ..] => {
                self.state = GestureState::Pinching {
                    start_dist: p1.distance_to(*p2),
                    start_scale: viewport.scale(),
                    mid: midpoint(*p1, *p2),
                }
            }
            [] => {}
        }
    }

    /// Returns `true` when the viewport moved.
    pub fn touch_move(&mut self, touches: &[Point], viewport: &mut Viewport) -> bool {
        match (touches, self.state) {
            ([one], GestureState::Panning { .. }) => self.pointer_move(*one, viewport),
            (
                [p1, p2, ..],
                GestureState::Pinching {
                    start_dist,
                    start_scale,
                    mid,
                },
            ) => {
                let dist = p1.distance_to(*p2);
                let ratio = if start_dist > 0.0 { dist / start_dist } else { 1.0 };
                let target = viewport.clamp_scale(start_scale * ratio);
                viewport.zoom_to_scale_at(target, mid.x, mid.y);
                true
            }
            _ => false,
        }
    }

    pub fn touch_end(&mut self) {
        self.release();
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    point((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
