use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Free,
    Occupied,
    Reserved,
    Disabled,
}

impl SlotStatus {
    pub const ALL: [SlotStatus; 4] = [
        SlotStatus::Free,
        SlotStatus::Occupied,
        SlotStatus::Reserved,
        SlotStatus::Disabled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotStatus::Free => "free",
            SlotStatus::Occupied => "occupied",
            SlotStatus::Reserved => "reserved",
            SlotStatus::Disabled => "disabled",
        }
    }

    /// CSS class applied to a slot element in this state.
    pub fn class_name(self) -> &'static str {
        match self {
            SlotStatus::Free => "slot--free",
            SlotStatus::Occupied => "slot--occupied",
            SlotStatus::Reserved => "slot--reserved",
            SlotStatus::Disabled => "slot--disabled",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub status: SlotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_battery: Option<u8>,
}

impl Slot {
    pub fn new(id: impl Into<String>, status: SlotStatus) -> Self {
        Self {
            id: id.into(),
            status,
            plate: None,
            sensor_battery: None,
        }
    }

    pub fn with_plate(mut self, plate: impl Into<String>) -> Self {
        self.plate = Some(plate.into());
        self
    }

    pub fn with_battery(mut self, battery: u8) -> Self {
        self.sensor_battery = Some(battery);
        self
    }
}

/// Case-insensitive substring search over slot ids. An empty term matches nothing.
pub fn search_ids<'a>(slots: &'a [Slot], term: &str) -> Vec<&'a str> {
    let q = term.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }
    slots
        .iter()
        .map(|s| s.id.as_str())
        .filter(|id| id.to_lowercase().contains(&q))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub free: usize,
    pub occupied: usize,
    pub reserved: usize,
    pub disabled: usize,
}

/// Ordered slot-status table. Slots are only ever added or updated, never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    pub fn new(slots: Vec<Slot>) -> Self {
        let mut table = Self::default();
        table.merge(slots);
        table
    }

    /// Demo set shown before any live data arrives.
    pub fn seeded() -> Self {
        Self::new(vec![
            Slot::new("L1-A1", SlotStatus::Free).with_battery(88),
            Slot::new("L1-A2", SlotStatus::Occupied)
                .with_plate("س م ن ١٢٣٤")
                .with_battery(72),
            Slot::new("L1-A6", SlotStatus::Occupied)
                .with_plate("م ر ك ٢٣٤٥")
                .with_battery(65),
            Slot::new("L1-B3", SlotStatus::Reserved).with_battery(90),
            Slot::new("L1-B7", SlotStatus::Disabled).with_battery(100),
        ])
    }

    pub fn as_slice(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub(crate) fn get_index_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Updates the status of `id` in place, or appends a new slot carrying `default_battery`.
    /// Returns `true` when a slot was created.
    pub fn apply_status_by_label(
        &mut self,
        id: &str,
        status: SlotStatus,
        default_battery: u8,
    ) -> bool {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                slot.status = status;
                if status != SlotStatus::Occupied {
                    slot.plate = None;
                }
                false
            }
            None => {
                self.slots
                    .push(Slot::new(id, status).with_battery(default_battery));
                true
            }
        }
    }

    /// Upserts a batch of slots by id, keeping the table order for known ids.
    pub fn merge(&mut self, slots: impl IntoIterator<Item = Slot>) {
        for slot in slots {
            match self.slots.iter_mut().find(|s| s.id == slot.id) {
                Some(existing) => *existing = slot,
                None => self.slots.push(slot),
            }
        }
    }

    pub fn search(&self, term: &str) -> Vec<&str> {
        search_ids(&self.slots, term)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut c = StatusCounts::default();
        for s in &self.slots {
            match s.status {
                SlotStatus::Free => c.free += 1,
                SlotStatus::Occupied => c.occupied += 1,
                SlotStatus::Reserved => c.reserved += 1,
                SlotStatus::Disabled => c.disabled += 1,
            }
        }
        c
    }
}
