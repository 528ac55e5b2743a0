#![forbid(unsafe_code)]

//! FeatureTour
//!
//! Guided in-application tours: an ordered list of steps, each anchored to a
//! named UI element, walked forward and backward by the user or by the host.
//!
//! # Key Components
//!
//! - [`FeatureTour`] - Session facade: hook registration, at most one active run
//! - [`TourRun`] - One walk through a [`Tour`], driving popup and view
//! - [`TourViewModel`] - Default view: button labels, step counter, placement
//! - [`ElementRegistry`] - Reference element locator keyed by element id
//! - [`WindowTracker`] - Reference window source; relays focus changes
//! - [`ActionRepository`] - Keyed hooks with revocable registrations
//!
//! # How it fits together
//! The host implements (or reuses) the collaborators in [`env`]: a locator for
//! anchors, a window source, and a popup presenter. A run looks anchors up
//! lazily on every move, fires the step hooks registered on the session, and
//! reacts to window changes through the policy in [`transition`].
//!
//! Everything is single-threaded. Hooks may close the run or start another;
//! the run notices after each hook and stops.
//!
//! # Example
//!
//! ```
//! use featuretour::{FeatureTour, Step, Tour};
//!
//! let tour = Tour::new(
//!     "intro",
//!     vec![
//!         Step::new("SearchBox", "Search", "Type here to search."),
//!         Step::new("Settings", "Settings", "Tweak things here."),
//!     ],
//! );
//! assert!(tour.validate().is_ok());
//!
//! let session = FeatureTour::new();
//! let _token = session.on_step_entered("Settings").execute(|_| {});
//! assert!(!session.is_running());
//! ```

pub mod actions;
pub mod chain;
pub mod elements;
pub mod env;
pub mod error;
pub mod logging;
pub mod model;
pub mod navigator;
pub mod run;
pub mod transition;
pub mod view;
pub mod windows;

pub use actions::{ActionCategory, ActionKey, ActionRepository, Release};
pub use elements::ElementRegistry;
pub use env::{
    Anchor, ElementLocator, ImmediateLayout, LayoutPump, Liveness, PopupPresenter,
    SubscriptionId, TourEnv, TransitionOutcome, Visual, WindowEvent, WindowListener, WindowSource,
};
pub use error::{Result, TourError};
pub use model::{Step, Tour};
pub use navigator::{FeatureTour, TourDoable, TourExecution, TourNavigator};
pub use run::{Phase, RunHandle, TourRun};
pub use transition::TransitionPlan;
pub use view::{StepPresentation, TourTexts, TourView, TourViewModel};
pub use windows::WindowTracker;

pub use featuretour_core::{
    ARROW_MARGIN, Placement, Point, Rect, Size, WindowId, WindowTransition,
};
