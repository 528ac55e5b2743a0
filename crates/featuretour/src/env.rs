#![forbid(unsafe_code)]

//! Collaborators a run talks to: element lookup, window activation, the
//! popup, and the layout pump.
//!
//! All of them are host-provided. Methods take `&self`; implementations
//! that keep state use interior mutability, because the engine and the
//! host's own event handlers share the same collaborator instances.

use std::fmt;
use std::rc::{Rc, Weak};

use featuretour_core::geometry::{Rect, Size};
use featuretour_core::placement::{self, Placement, PlacementOffset};
use featuretour_core::window::{WindowId, WindowTransition};
use serde_json::Value;
use tracing::warn;

use crate::view::TourView;

/// Whether the live visual behind an anchor still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The visual is alive.
    Present,
    /// The visual was dropped or never attached.
    Gone,
}

/// The host's live UI element behind an anchor.
pub trait Visual {
    /// Whether the element is currently loaded (e.g. not on a hidden tab).
    fn is_loaded(&self) -> bool;

    /// Screen bounds, if the element has been laid out.
    fn bounds(&self) -> Option<Rect> {
        None
    }

    /// Look up a named template relative to the element.
    fn template(&self, _key: &str) -> Option<Value> {
        None
    }
}

/// A resolved anchor: where a step's popup attaches.
#[derive(Clone)]
pub struct Anchor {
    /// Anchor key.
    pub element_id: String,
    /// Window the element lives on.
    pub window: WindowId,
    /// Desired popup placement.
    pub placement: Placement,
    /// Window-transition policy for steps anchored here.
    pub transition: WindowTransition,
    visual: Option<Rc<dyn Visual>>,
}

impl Anchor {
    /// Anchor on `window` with default placement and transition policy.
    pub fn new(element_id: impl Into<String>, window: WindowId) -> Self {
        Self {
            element_id: element_id.into(),
            window,
            placement: Placement::default(),
            transition: WindowTransition::default(),
            visual: None,
        }
    }

    /// Set the desired placement.
    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Set the transition policy.
    #[must_use]
    pub fn with_transition(mut self, transition: WindowTransition) -> Self {
        self.transition = transition;
        self
    }

    /// Attach the live visual.
    #[must_use]
    pub fn with_visual(mut self, visual: Rc<dyn Visual>) -> Self {
        self.visual = Some(visual);
        self
    }

    /// The live visual, if still attached.
    pub fn visual(&self) -> Option<&Rc<dyn Visual>> {
        self.visual.as_ref()
    }

    /// Whether the live visual is still attached.
    pub fn liveness(&self) -> Liveness {
        if self.visual.is_some() {
            Liveness::Present
        } else {
            Liveness::Gone
        }
    }

    /// Screen bounds of the live visual, once laid out.
    pub fn bounds(&self) -> Option<Rect> {
        self.visual.as_ref().and_then(|v| v.bounds())
    }

    /// Where a popup of size `popup` goes inside `viewport`, falling back
    /// from the desired placement when it does not fit. `None` until the
    /// element has bounds.
    pub fn popup_offset(&self, popup: Size, viewport: Rect) -> Option<PlacementOffset> {
        let target = self.bounds()?;
        Some(placement::choose(target, popup, viewport, self.placement))
    }

    /// Resolve a template key against the visual.
    ///
    /// A blank key resolves to nothing without a warning; a key that cannot
    /// be found, or a visual that is gone, logs a warning.
    pub fn template(&self, key: Option<&str>) -> Option<Value> {
        let key = key.filter(|k| !k.trim().is_empty())?;
        let Some(visual) = &self.visual else {
            warn!(
                element_id = %self.element_id,
                template = key,
                "element is gone; template cannot be applied"
            );
            return None;
        };
        let template = visual.template(key);
        if template.is_none() {
            warn!(
                element_id = %self.element_id,
                template = key,
                "template not found for element"
            );
        }
        template
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anchor")
            .field("element_id", &self.element_id)
            .field("window", &self.window)
            .field("placement", &self.placement)
            .field("transition", &self.transition)
            .field("liveness", &self.liveness())
            .finish()
    }
}

/// Finds anchors by key.
pub trait ElementLocator {
    /// Resolve `element_id`. Unloaded elements are skipped unless
    /// `include_unloaded` is set.
    fn locate(&self, element_id: &str, include_unloaded: bool) -> Option<Anchor>;

    /// Every known anchor, filtered the same way as [`locate`](Self::locate).
    fn anchors(&self, include_unloaded: bool) -> Vec<Anchor>;
}

/// A window lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window became the foreground window.
    Activated(WindowId),
    /// The window lost the foreground.
    Deactivated(WindowId),
    /// The window was closed and forgotten.
    Removed(WindowId),
}

/// A listener's verdict on popup visibility after a window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Show the popup.
    Show,
    /// Hide the popup.
    Hide,
    /// Keep whatever the window source would do by default.
    Unchanged,
}

/// Receives window events.
pub trait WindowListener {
    /// Handle one event.
    fn on_window_event(&self, event: &WindowEvent) -> TransitionOutcome;

    /// Whether activation and deactivation are delivered. Listeners that
    /// answer `false` only see [`WindowEvent::Removed`] and take no part in
    /// popup visibility.
    fn follows_focus(&self) -> bool {
        true
    }
}

/// Handle returned by [`WindowSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Source of window activation events.
pub trait WindowSource {
    /// The foreground window, or [`WindowId::MAIN`] when none is known.
    fn active_window(&self) -> WindowId;

    /// Whether `parent` is considered an ancestor of `child`.
    fn is_ancestor(&self, parent: &WindowId, child: &WindowId) -> bool;

    /// Start delivering events to `listener`. The source holds it weakly.
    fn subscribe(&self, listener: Weak<dyn WindowListener>) -> SubscriptionId;

    /// Stop delivering events for `id`.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// The on-screen callout.
pub trait PopupPresenter {
    /// A tour is starting; bind the popup to its presentation object.
    fn start_tour(&self, view: Rc<dyn TourView>);

    /// Attach the popup to `anchor`. The popup stays hidden until
    /// [`show`](Self::show) is called.
    fn move_to(&self, anchor: &Anchor);

    /// Make the popup visible.
    fn show(&self);

    /// Hide the popup.
    fn hide(&self);

    /// The tour ended; release the popup.
    fn exit_tour(&self);

    /// Recompute the popup's position (window moved or resized).
    fn refresh_position(&self);
}

/// Scoped popup move: attaches the popup on creation and shows it on drop.
pub struct PopupMove<'a> {
    popup: &'a dyn PopupPresenter,
    show_on_drop: bool,
}

impl<'a> PopupMove<'a> {
    /// Move `popup` to `anchor`.
    pub fn begin(popup: &'a dyn PopupPresenter, anchor: &Anchor) -> Self {
        popup.move_to(anchor);
        Self {
            popup,
            show_on_drop: true,
        }
    }

    /// Finish the move without showing the popup.
    pub fn cancel(mut self) {
        self.show_on_drop = false;
    }
}

impl Drop for PopupMove<'_> {
    fn drop(&mut self) {
        if self.show_on_drop {
            self.popup.show();
        }
    }
}

/// Lets pending UI layout settle before the engine trusts element state.
pub trait LayoutPump {
    /// Run one pending layout cycle. Must return once it completes.
    fn pump(&self);
}

/// A pump for hosts without deferred layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateLayout;

impl LayoutPump for ImmediateLayout {
    fn pump(&self) {}
}

/// The collaborators a run needs, bundled.
#[derive(Clone)]
pub struct TourEnv {
    /// Anchor lookup.
    pub locator: Rc<dyn ElementLocator>,
    /// Window activation source.
    pub windows: Rc<dyn WindowSource>,
    /// Popup presenter.
    pub popup: Rc<dyn PopupPresenter>,
    /// Layout pump.
    pub layout: Rc<dyn LayoutPump>,
}

impl TourEnv {
    /// Bundle collaborators, with [`ImmediateLayout`] as the pump.
    pub fn new(
        locator: Rc<dyn ElementLocator>,
        windows: Rc<dyn WindowSource>,
        popup: Rc<dyn PopupPresenter>,
    ) -> Self {
        Self {
            locator,
            windows,
            popup,
            layout: Rc::new(ImmediateLayout),
        }
    }

    /// Replace the layout pump.
    #[must_use]
    pub fn with_layout(mut self, layout: Rc<dyn LayoutPump>) -> Self {
        self.layout = layout;
        self
    }
}

impl fmt::Debug for TourEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TourEnv").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Element {
        templates: Vec<(&'static str, Value)>,
        bounds: Option<Rect>,
    }

    impl Visual for Element {
        fn is_loaded(&self) -> bool {
            true
        }

        fn bounds(&self) -> Option<Rect> {
            self.bounds
        }

        fn template(&self, key: &str) -> Option<Value> {
            self.templates
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[derive(Default)]
    struct Log(RefCell<Vec<&'static str>>);

    impl PopupPresenter for Log {
        fn start_tour(&self, _view: Rc<dyn TourView>) {}
        fn move_to(&self, _anchor: &Anchor) {
            self.0.borrow_mut().push("move");
        }
        fn show(&self) {
            self.0.borrow_mut().push("show");
        }
        fn hide(&self) {}
        fn exit_tour(&self) {}
        fn refresh_position(&self) {}
    }

    #[test]
    fn anchor_defaults() {
        let anchor = Anchor::new("A", WindowId::MAIN);
        assert_eq!(anchor.placement, Placement::TopLeft);
        assert_eq!(anchor.transition, WindowTransition::Automatic);
        assert_eq!(anchor.liveness(), Liveness::Gone);
    }

    #[test]
    fn template_lookup() {
        let visual: Rc<dyn Visual> = Rc::new(Element {
            templates: vec![("Tpl", Value::from("body"))],
            bounds: None,
        });
        let anchor = Anchor::new("A", WindowId::MAIN).with_visual(visual);
        assert_eq!(anchor.liveness(), Liveness::Present);
        assert_eq!(anchor.template(Some("Tpl")), Some(Value::from("body")));
        assert_eq!(anchor.template(Some("Missing")), None);
        assert_eq!(anchor.template(Some("  ")), None);
        assert_eq!(anchor.template(None), None);
    }

    #[test]
    fn popup_offset_needs_bounds() {
        let popup = Size::new(200.0, 80.0);
        let viewport = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let unplaced: Rc<dyn Visual> = Rc::new(Element {
            templates: Vec::new(),
            bounds: None,
        });
        let anchor = Anchor::new("A", WindowId::MAIN).with_visual(unplaced);
        assert!(anchor.popup_offset(popup, viewport).is_none());

        let near_top: Rc<dyn Visual> = Rc::new(Element {
            templates: Vec::new(),
            bounds: Some(Rect::new(300.0, 20.0, 100.0, 40.0)),
        });
        let anchor = Anchor::new("A", WindowId::MAIN).with_visual(near_top);
        let chosen = anchor.popup_offset(popup, viewport).unwrap();
        assert_eq!(chosen.placement, Placement::BottomLeft);
        assert_eq!(anchor.bounds(), Some(Rect::new(300.0, 20.0, 100.0, 40.0)));
    }

    #[test]
    fn template_on_gone_visual_is_none() {
        let anchor = Anchor::new("A", WindowId::MAIN);
        assert_eq!(anchor.template(Some("Tpl")), None);
    }

    #[test]
    fn popup_move_shows_on_drop() {
        let popup = Log::default();
        {
            let _guard = PopupMove::begin(&popup, &Anchor::new("A", WindowId::MAIN));
            assert_eq!(*popup.0.borrow(), vec!["move"]);
        }
        assert_eq!(*popup.0.borrow(), vec!["move", "show"]);
    }

    #[test]
    fn cancelled_popup_move_stays_hidden() {
        let popup = Log::default();
        PopupMove::begin(&popup, &Anchor::new("A", WindowId::MAIN)).cancel();
        assert_eq!(*popup.0.borrow(), vec!["move"]);
    }
}
