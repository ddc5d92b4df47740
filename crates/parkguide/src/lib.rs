#![forbid(unsafe_code)]

//! Interactive parking-guidance diagram (headless).
//!
//! A floor-plan SVG is loaded into a [`GuidanceDiagram`], which wraps the content in a
//! pan/zoom group, indexes the `data-slot-id` elements and paints slot status onto them.
//! The host feeds input through [`InputEvent`], drives the simulated feed with
//! [`GuidanceDiagram::advance`] and renders the document it gets back.
//!
//! Geometry and extraction live in [`parkguide_core`].

pub mod config;
pub mod diagram;
pub mod error;
pub mod feed;
pub mod gesture;
pub mod index;
pub mod overlay;
pub mod slot;
pub mod source;
pub mod viewport;

pub use config::{FeedConfig, GuidanceConfig, OverlayConfig, TransitionPolicy, ViewportConfig};
pub use diagram::{DiagramEvent, GuidanceDiagram, WRAPPER_ID};
pub use error::{Error, Result};
pub use feed::{
    LiveFeed, MAX_TICKS_PER_ADVANCE, RandomSource, RngSource, ScriptedSource, Transition,
    next_status,
};
pub use gesture::{GestureState, GestureTracker, InputEvent};
pub use index::{SLOT_ID_ATTR, SlotEntry, SlotIndex};
pub use overlay::{OverlayReport, StatusOverlay};
pub use slot::{Slot, SlotStatus, SlotTable, StatusCounts};
pub use source::{DirectorySource, FloorPlanSource, InMemorySource};
pub use viewport::{Viewport, ViewportState};

pub use parkguide_core::{ExtractResult, Lane, Station, StationTag, StationType};
