#![forbid(unsafe_code)]

//! Core primitives for FeatureTour: geometry, popup placement, and window
//! identity.
//!
//! Nothing in this crate holds state. The navigation engine in the
//! `featuretour` crate builds on these types.

pub mod geometry;
pub mod placement;
pub mod window;

pub use geometry::{Point, Rect, Size};
pub use placement::{ARROW_MARGIN, Axis, Placement, PlacementOffset};
pub use window::{WindowId, WindowTransition};
