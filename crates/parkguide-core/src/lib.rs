#![forbid(unsafe_code)]

//! Floor-plan SVG tree + geometry (headless).
//!
//! This crate holds the engine-agnostic half of the parking-guidance diagram:
//! - [`document`]: an owned, mutable SVG element tree with parent links
//! - [`transform`]: 2×3 affine matrices accumulated along the ancestor chain
//! - [`bbox`]: local bounding boxes (`getBBox` without a browser)
//! - [`extract`]: station/lane detection, exported as [`ExtractResult`]

pub mod bbox;
pub mod document;
pub mod error;
pub mod extract;
pub mod geom;
pub mod model;
pub mod transform;

pub use document::{NodeId, SvgDocument};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, OverlayMarker, extract, extract_with};
pub use model::{Coord, ExtractResult, Lane, Station, StationTag, StationType};
