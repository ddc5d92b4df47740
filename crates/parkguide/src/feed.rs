//! Simulated live status feed.
//!
//! The feed owns no timer thread: the host calls [`LiveFeed::advance`] with the time that
//! passed, and one slot is updated per elapsed period. Stopping (or dropping) the feed
//! discards any partial period.

use crate::config::{FeedConfig, TransitionPolicy};
use crate::slot::{SlotStatus, SlotTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Battery assumed for a slot that never reported one.
const UNKNOWN_BATTERY: u8 = 80;

/// Most ticks a single [`LiveFeed::advance`] call runs; any longer backlog is dropped.
pub const MAX_TICKS_PER_ADVANCE: usize = 32;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize {
        let i = (self.next_unit() * len as f64).floor() as usize;
        i.min(len.saturating_sub(1))
    }
}

/// [`RandomSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Replays a fixed list of draws, then repeats `fallback`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedSource {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback: 0.0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        self.draws.pop_front().unwrap_or(self.fallback)
    }
}

/// Next status for a slot currently in `current`, given a uniform draw `r`.
pub fn next_status(current: SlotStatus, policy: &TransitionPolicy, r: f64) -> SlotStatus {
    match current {
        SlotStatus::Free if r < policy.free_to_occupied => SlotStatus::Occupied,
        SlotStatus::Occupied if r < policy.occupied_to_free => SlotStatus::Free,
        SlotStatus::Reserved if r < policy.reserved_to_free => SlotStatus::Free,
        other => other,
    }
}

/// One feed tick applied to the slot table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub from: SlotStatus,
    pub to: SlotStatus,
    pub battery: u8,
}

impl Transition {
    pub fn changed_status(&self) -> bool {
        self.from != self.to
    }
}

pub struct LiveFeed {
    config: FeedConfig,
    source: Box<dyn RandomSource>,
    running: bool,
    pending: Duration,
}

impl fmt::Debug for LiveFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveFeed")
            .field("config", &self.config)
            .field("running", &self.running)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl LiveFeed {
    pub fn new(config: FeedConfig, source: impl RandomSource + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
            running: false,
            pending: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if !self.running {
            tracing::debug!(period_ms = self.config.period_ms, "live feed started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!("live feed stopped");
        }
        self.running = false;
        self.pending = Duration::ZERO;
    }

    /// Flips the running state and returns the new one.
    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
        self.running
    }

    /// Runs one tick per full period contained in `elapsed` (plus any carried remainder), at
    /// most [`MAX_TICKS_PER_ADVANCE`] of them.
    pub fn advance(&mut self, elapsed: Duration, table: &mut SlotTable) -> Vec<Transition> {
        if !self.running {
            return Vec::new();
        }
        let period = self.config.period();
        if period.is_zero() {
            return Vec::new();
        }
        self.pending = self.pending.saturating_add(elapsed);
        let mut out = Vec::new();
        let mut ticks = 0;
        while self.pending >= period {
            if ticks == MAX_TICKS_PER_ADVANCE {
                tracing::debug!(backlog = ?self.pending, "live feed dropped its backlog");
                self.pending = Duration::ZERO;
                break;
            }
            self.pending -= period;
            ticks += 1;
            out.extend(self.tick(table));
        }
        out
    }

    /// Updates one uniformly chosen slot. Draw order: slot index, status, battery.
    pub fn tick(&mut self, table: &mut SlotTable) -> Option<Transition> {
        if table.is_empty() {
            return None;
        }
        let i = self.source.pick(table.len());
        let status_draw = self.source.next_unit();
        let battery_draw = self.source.next_unit();

        let cfg = &self.config;
        let slot = table.get_index_mut(i)?;
        let from = slot.status;
        let to = next_status(from, &cfg.policy, status_draw);

        slot.status = to;
        match (from, to) {
            (SlotStatus::Occupied, SlotStatus::Occupied) if slot.plate.is_some() => {}
            (_, SlotStatus::Occupied) => slot.plate = Some(cfg.placeholder_plate.clone()),
            _ => slot.plate = None,
        }

        let battery = slot.sensor_battery.unwrap_or(UNKNOWN_BATTERY);
        let drained = if battery_draw < cfg.battery_decay_probability {
            battery.saturating_sub(1)
        } else {
            battery
        };
        let battery = drained.max(cfg.battery_floor);
        slot.sensor_battery = Some(battery);

        tracing::trace!(slot = %slot.id, %from, %to, battery, "feed tick");
        Some(Transition {
            id: slot.id.clone(),
            from,
            to,
            battery,
        })
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Slot;

    fn feed(draws: impl IntoIterator<Item = f64>) -> LiveFeed {
        let mut f = LiveFeed::new(FeedConfig::default(), ScriptedSource::new(draws));
        f.start();
        f
    }

    #[test]
    fn free_slot_becomes_occupied_below_the_threshold() {
        let mut table = SlotTable::new(vec![Slot::new("L1-A1", SlotStatus::Free)]);
        let t = feed([0.0, 0.69, 0.9]).tick(&mut table).unwrap();
        assert_eq!((t.from, t.to), (SlotStatus::Free, SlotStatus::Occupied));
        let slot = table.get("L1-A1").unwrap();
        assert_eq!(slot.plate.as_deref(), Some("ع س ص ٤٥٦٧"));
        assert_eq!(slot.sensor_battery, Some(80));
    }

    #[test]
    fn free_slot_stays_free_at_or_above_the_threshold() {
        let mut table = SlotTable::new(vec![Slot::new("L1-A1", SlotStatus::Free).with_plate("stale")]);
        let t = feed([0.0, 0.7, 0.9]).tick(&mut table).unwrap();
        assert!(!t.changed_status());
        assert_eq!(table.get("L1-A1").unwrap().plate, None);
    }

    #[test]
    fn transition_table() {
        let p = TransitionPolicy::default();
        assert_eq!(next_status(SlotStatus::Occupied, &p, 0.49), SlotStatus::Free);
        assert_eq!(next_status(SlotStatus::Occupied, &p, 0.5), SlotStatus::Occupied);
        assert_eq!(next_status(SlotStatus::Reserved, &p, 0.19), SlotStatus::Free);
        assert_eq!(next_status(SlotStatus::Reserved, &p, 0.2), SlotStatus::Reserved);
        assert_eq!(next_status(SlotStatus::Disabled, &p, 0.0), SlotStatus::Disabled);
    }

    #[test]
    fn battery_decays_but_never_below_the_floor() {
        let mut table = SlotTable::new(vec![Slot::new("L1-A1", SlotStatus::Disabled).with_battery(16)]);
        let mut f = feed([0.0, 0.0, 0.1, 0.0, 0.0, 0.1, 0.0, 0.0, 0.5]);
        assert_eq!(f.tick(&mut table).unwrap().battery, 15);
        assert_eq!(f.tick(&mut table).unwrap().battery, 15);
        assert_eq!(f.tick(&mut table).unwrap().battery, 15);
    }

    #[test]
    fn advance_ticks_once_per_period_and_only_while_running() {
        let mut table = SlotTable::seeded();
        let mut f = LiveFeed::new(FeedConfig::default(), RngSource::seeded(7));

        assert!(f.advance(Duration::from_secs(10), &mut table).is_empty());

        assert!(f.toggle());
        assert_eq!(f.advance(Duration::from_millis(1299), &mut table).len(), 0);
        assert_eq!(f.advance(Duration::from_millis(1), &mut table).len(), 1);
        assert_eq!(f.advance(Duration::from_millis(2600), &mut table).len(), 2);

        assert!(!f.toggle());
        assert!(f.advance(Duration::from_secs(10), &mut table).is_empty());
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn huge_gaps_are_capped_instead_of_caught_up() {
        let mut table = SlotTable::seeded();
        let mut f = LiveFeed::new(FeedConfig::default(), RngSource::seeded(3));
        f.start();

        assert_eq!(f.advance(Duration::MAX, &mut table).len(), MAX_TICKS_PER_ADVANCE);
        assert_eq!(f.advance(Duration::MAX, &mut table).len(), MAX_TICKS_PER_ADVANCE);
        assert_eq!(f.advance(Duration::from_millis(1299), &mut table).len(), 0);
        assert_eq!(f.advance(Duration::from_millis(1), &mut table).len(), 1);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |seed| {
            let mut table = SlotTable::seeded();
            let mut f = LiveFeed::new(FeedConfig::default(), RngSource::seeded(seed));
            f.start();
            f.advance(Duration::from_millis(1300 * 20), &mut table);
            table
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn pick_stays_in_range() {
        let mut s = ScriptedSource::new([0.0, 0.999_999, 1.0]);
        assert_eq!(s.pick(5), 0);
        assert_eq!(s.pick(5), 4);
        assert_eq!(s.pick(5), 4);
        assert_eq!(s.remaining(), 0);
    }
}
