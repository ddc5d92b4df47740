//! Pan/zoom math for the wrapper group.
//!
//! Screen coordinates are host-relative pixels. Content coordinates are the plan's own
//! user space (inside the wrapper). The two are related by
//! `screen = content * scale + pan`, rendered as `translate(pan_x, pan_y) scale(scale)`.

use crate::config::ViewportConfig;
use parkguide_core::geom::{Point, Rect, point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub view_w: f64,
    pub view_h: f64,
    pub host_w: f64,
    pub host_h: f64,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    state: ViewportState,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

fn clamp(v: f64, min: f64, max: f64) -> f64 {
    // `f64::clamp` panics when min > max, which a tiny host can produce for the pan range.
    min.max(max.min(v))
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        let state = ViewportState {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            view_w: config.fallback_width,
            view_h: config.fallback_height,
            host_w: config.fallback_width,
            host_h: config.fallback_height,
        };
        Self { config, state }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn pan(&self) -> (f64, f64) {
        (self.state.pan_x, self.state.pan_y)
    }

    /// Intrinsic content size. Non-positive or non-finite values fall back to the configured size.
    pub fn set_view_size(&mut self, w: f64, h: f64) {
        self.state.view_w = positive_or(w, self.config.fallback_width);
        self.state.view_h = positive_or(h, self.config.fallback_height);
    }

    /// Host size in pixels. Unlike the view size, a zero-sized host is allowed (hidden container).
    pub fn set_host_size(&mut self, w: f64, h: f64) {
        self.state.host_w = if w.is_finite() { w.max(0.0) } else { 0.0 };
        self.state.host_h = if h.is_finite() { h.max(0.0) } else { 0.0 };
    }

    pub fn clamp_scale(&self, s: f64) -> f64 {
        if s.is_nan() {
            return self.state.scale;
        }
        clamp(s, self.config.min_scale, self.config.max_scale)
    }

    /// Keeps the content from being dragged entirely out of the host.
    fn clamp_pan(&mut self) {
        let st = &mut self.state;
        let margin = self.config.pan_margin;
        let min_x = -st.view_w * st.scale - margin * st.host_w;
        let min_y = -st.view_h * st.scale - margin * st.host_h;
        st.pan_x = clamp(st.pan_x, min_x, margin * st.host_w);
        st.pan_y = clamp(st.pan_y, min_y, margin * st.host_h);
        tracing::trace!(
            scale = st.scale,
            pan_x = st.pan_x,
            pan_y = st.pan_y,
            "viewport updated"
        );
    }

    /// Scales the whole view box into the host (with padding) and centres it.
    pub fn fit_view(&mut self) {
        let st = self.state;
        let fit = (st.host_w / st.view_w).min(st.host_h / st.view_h) * self.config.fit_padding;
        let scale = self.clamp_scale(fit);
        self.state.scale = scale;
        self.state.pan_x = (st.host_w - st.view_w * scale) / 2.0;
        self.state.pan_y = (st.host_h - st.view_h * scale) / 2.0;
        self.clamp_pan();
    }

    /// Multiplies the scale by `factor`, keeping the content point under `(mx, my)` in place.
    /// A non-positive factor saturates at the minimum scale.
    pub fn zoom_at(&mut self, factor: f64, mx: f64, my: f64) {
        if !(factor.is_finite() && mx.is_finite() && my.is_finite()) {
            return;
        }
        let old = self.state.scale;
        let new = self.clamp_scale(old * factor);
        let sx = (mx - self.state.pan_x) / old;
        let sy = (my - self.state.pan_y) / old;
        self.state.scale = new;
        self.state.pan_x = mx - sx * new;
        self.state.pan_y = my - sy * new;
        self.clamp_pan();
    }

    /// Sets an absolute scale anchored at `(mx, my)`; used by pinch gestures.
    pub fn zoom_to_scale_at(&mut self, scale: f64, mx: f64, my: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            return;
        }
        self.zoom_at(scale / self.state.scale, mx, my);
    }

    pub fn zoom_in(&mut self, step: f64) {
        let (mx, my) = self.host_center();
        self.zoom_at(step, mx, my);
    }

    pub fn zoom_out(&mut self, step: f64) {
        if step > 0.0 {
            let (mx, my) = self.host_center();
            self.zoom_at(1.0 / step, mx, my);
        }
    }

    pub fn reset_view(&mut self) {
        self.fit_view();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.state.pan_x += dx;
        self.state.pan_y += dy;
        self.clamp_pan();
    }

    /// Puts the centre of `content_box` in the middle of the host, optionally at a new scale.
    pub fn center_on_box(&mut self, content_box: &Rect, target_scale: Option<f64>) {
        if let Some(s) = target_scale {
            self.state.scale = self.clamp_scale(s);
        }
        let c = content_box.center();
        let (hx, hy) = self.host_center();
        self.state.pan_x = hx - c.x * self.state.scale;
        self.state.pan_y = hy - c.y * self.state.scale;
        self.clamp_pan();
    }

    /// Host centre, falling back to the view size for an unmeasured host.
    fn host_center(&self) -> (f64, f64) {
        let st = &self.state;
        let w = if st.host_w > 0.0 { st.host_w } else { st.view_w };
        let h = if st.host_h > 0.0 { st.host_h } else { st.view_h };
        (w / 2.0, h / 2.0)
    }

    pub fn screen_to_content(&self, x: f64, y: f64) -> Point {
        let st = &self.state;
        point((x - st.pan_x) / st.scale, (y - st.pan_y) / st.scale)
    }

    pub fn content_to_screen(&self, p: Point) -> Point {
        let st = &self.state;
        point(p.x * st.scale + st.pan_x, p.y * st.scale + st.pan_y)
    }

    /// Value of the wrapper group's `transform` attribute.
    pub fn transform_attr(&self) -> String {
        let st = &self.state;
        format!("translate({}, {}) scale({})", st.pan_x, st.pan_y, st.scale)
    }
}

fn positive_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { fallback }
}
