//! Diagram configuration.
//!
//! Every field has a default, so a config file only needs to list what it overrides:
//!
//! ```
//! use parkguide::GuidanceConfig;
//!
//! let cfg = GuidanceConfig::from_json_str(r#"{ "viewport": { "maxScale": 8 } }"#)?;
//! assert_eq!(cfg.viewport.max_scale, 8.0);
//! assert_eq!(cfg.viewport.min_scale, 0.4);
//! # Ok::<(), parkguide::Error>(())
//! ```

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuidanceConfig {
    pub viewport: ViewportConfig,
    pub overlay: OverlayConfig,
    pub feed: FeedConfig,
    /// Floor key → floor-plan file, relative to the plan directory.
    pub floor_plans: IndexMap<String, String>,
    pub default_floor: String,
    /// Also read lane geometry from `path` elements when extracting.
    pub parse_path_lanes: bool,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        let mut floor_plans = IndexMap::new();
        floor_plans.insert("B1".to_string(), "B1.svg".to_string());
        floor_plans.insert("B2".to_string(), "B2.svg".to_string());
        Self {
            viewport: ViewportConfig::default(),
            overlay: OverlayConfig::default(),
            feed: FeedConfig::default(),
            floor_plans,
            default_floor: "B1".to_string(),
            parse_path_lanes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Fraction of the host filled by `fit_view`.
    pub fit_padding: f64,
    pub wheel_sensitivity: f64,
    pub double_click_step: f64,
    pub button_step: f64,
    /// How far (as a fraction of the host size) content may be dragged past the host edges.
    pub pan_margin: f64,
    /// Scale used by `zoom_to_slot`.
    pub focus_scale: f64,
    /// Scale used when re-centring after a status-by-label update.
    pub status_focus_scale: f64,
    /// Intrinsic size used when a plan has neither a `viewBox` nor measurable content.
    pub fallback_width: f64,
    pub fallback_height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.4,
            max_scale: 6.0,
            fit_padding: 0.95,
            wheel_sensitivity: 0.0015,
            double_click_step: 1.25,
            button_step: 1.2,
            pan_margin: 0.2,
            focus_scale: 2.5,
            status_focus_scale: 2.2,
            fallback_width: 1000.0,
            fallback_height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Distance of the sensor dot from the slot's top-right corner.
    pub sensor_inset: f64,
    pub dot_radius: f64,
    pub show_labels: bool,
    /// Battery assigned to slots created by status-by-label.
    pub default_battery: u8,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            sensor_inset: 6.0,
            dot_radius: 5.0,
            show_labels: false,
            default_battery: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedConfig {
    pub period_ms: u64,
    pub battery_floor: u8,
    pub battery_decay_probability: f64,
    pub placeholder_plate: String,
    pub policy: TransitionPolicy,
}

impl FeedConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            period_ms: 1300,
            battery_floor: 15,
            battery_decay_probability: 0.2,
            placeholder_plate: "ع س ص ٤٥٦٧".to_string(),
            policy: TransitionPolicy::default(),
        }
    }
}

/// Per-state probabilities of leaving the current status on a feed tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionPolicy {
    pub free_to_occupied: f64,
    pub occupied_to_free: f64,
    pub reserved_to_free: f64,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            free_to_occupied: 0.7,
            occupied_to_free: 0.5,
            reserved_to_free: 0.2,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

impl GuidanceConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).inspect_err(|err| {
            tracing::warn!(path = %path.display(), %err, "failed to load guidance config");
        })
    }

    pub fn validate(&self) -> Result<()> {
        let v = &self.viewport;
        if !(v.min_scale > 0.0 && v.min_scale <= v.max_scale) {
            return Err(invalid(format!(
                "scale bounds must satisfy 0 < minScale <= maxScale (got {} / {})",
                v.min_scale, v.max_scale
            )));
        }
        if !(v.fit_padding > 0.0 && v.fallback_width > 0.0 && v.fallback_height > 0.0) {
            return Err(invalid("fitPadding and fallback sizes must be positive"));
        }
        if self.feed.period_ms == 0 {
            return Err(invalid("feed.periodMs must be positive"));
        }
        let p = &self.feed.policy;
        for (name, value) in [
            ("feed.batteryDecayProbability", self.feed.battery_decay_probability),
            ("feed.policy.freeToOccupied", p.free_to_occupied),
            ("feed.policy.occupiedToFree", p.occupied_to_free),
            ("feed.policy.reservedToFree", p.reserved_to_free),
        ] {
            if !is_probability(value) {
                return Err(invalid(format!("{name} must be within [0, 1] (got {value})")));
            }
        }
        if self.feed.battery_floor > 100 || self.overlay.default_battery > 100 {
            return Err(invalid("battery percentages must be within [0, 100]"));
        }
        Ok(())
    }
}
