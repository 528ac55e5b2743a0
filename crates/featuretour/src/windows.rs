#![forbid(unsafe_code)]

//! Reference [`WindowSource`]: windows reported by the host, tracked in
//! registration order.
//!
//! The tracker also owns popup visibility on focus changes. Activation shows
//! the popup and deactivation hides it unless a listener answers otherwise;
//! with no listener following focus the popup is hidden.
//!
//! A window registered earlier counts as an ancestor of any window
//! registered later. This approximates owner/modal relationships and can be
//! wrong when registration order does not follow ownership.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use featuretour_core::window::WindowId;
use tracing::debug;

use crate::env::{
    PopupPresenter, SubscriptionId, TransitionOutcome, WindowEvent, WindowListener, WindowSource,
};

#[derive(Default)]
struct TrackerState {
    windows: Vec<WindowId>,
    active: Option<WindowId>,
    listeners: Vec<(SubscriptionId, Weak<dyn WindowListener>)>,
    next_subscription: u64,
}

/// Tracks host windows and relays their activation to listeners.
pub struct WindowTracker {
    popup: Rc<dyn PopupPresenter>,
    state: RefCell<TrackerState>,
}

impl fmt::Debug for WindowTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WindowTracker")
            .field("windows", &state.windows)
            .field("active", &state.active)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl WindowTracker {
    /// Create a tracker driving `popup`.
    pub fn new(popup: Rc<dyn PopupPresenter>) -> Self {
        Self {
            popup,
            state: RefCell::new(TrackerState::default()),
        }
    }

    /// Start tracking `window`. Returns `false` if it is already tracked.
    pub fn register(&self, window: WindowId) -> bool {
        let mut state = self.state.borrow_mut();
        if state.windows.contains(&window) {
            return false;
        }
        debug!(%window, "window registered");
        state.windows.push(window);
        true
    }

    /// Tracked windows in registration order.
    pub fn windows(&self) -> Vec<WindowId> {
        self.state.borrow().windows.clone()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|(_, l)| l.strong_count() > 0)
            .count()
    }

    fn is_tracked(&self, window: &WindowId) -> bool {
        self.state.borrow().windows.contains(window)
    }

    /// Listeners due to receive `event`, pruning dropped ones.
    fn recipients(&self, event: &WindowEvent) -> Vec<Rc<dyn WindowListener>> {
        let mut state = self.state.borrow_mut();
        state.listeners.retain(|(_, l)| l.strong_count() > 0);
        state
            .listeners
            .iter()
            .filter_map(|(_, l)| l.upgrade())
            .filter(|l| matches!(event, WindowEvent::Removed(_)) || l.follows_focus())
            .collect()
    }

    /// Deliver `event` and fold the answers onto `default` visibility.
    /// With no recipients the popup is hidden.
    fn dispatch(&self, event: &WindowEvent, default: bool) -> bool {
        let listeners = self.recipients(event);
        if listeners.is_empty() {
            return false;
        }
        listeners
            .iter()
            .fold(default, |visible, l| match l.on_window_event(event) {
                TransitionOutcome::Show => true,
                TransitionOutcome::Hide => false,
                TransitionOutcome::Unchanged => visible,
            })
    }

    fn apply(&self, visible: bool) {
        if visible {
            self.popup.show();
        } else {
            self.popup.hide();
        }
    }

    fn activation_changed(&self, window: &WindowId, activated: bool) {
        let visible = if self.is_tracked(window) {
            let event = if activated {
                WindowEvent::Activated(window.clone())
            } else {
                WindowEvent::Deactivated(window.clone())
            };
            self.dispatch(&event, activated)
        } else {
            activated && !self.recipients(&WindowEvent::Activated(window.clone())).is_empty()
        };
        self.apply(visible);
    }

    /// The host activated `window`.
    pub fn activate(&self, window: &WindowId) {
        {
            let mut state = self.state.borrow_mut();
            state.active = state.windows.contains(window).then(|| window.clone());
        }
        debug!(%window, "window activated");
        self.activation_changed(window, true);
    }

    /// The host deactivated `window`.
    pub fn deactivate(&self, window: &WindowId) {
        {
            let mut state = self.state.borrow_mut();
            if state.active.as_ref() == Some(window) {
                state.active = None;
            }
        }
        debug!(%window, "window deactivated");
        self.activation_changed(window, false);
    }

    /// The host closed `window`.
    pub fn remove(&self, window: &WindowId) {
        {
            let mut state = self.state.borrow_mut();
            let before = state.windows.len();
            state.windows.retain(|w| w != window);
            if state.windows.len() == before {
                return;
            }
            if state.active.as_ref() == Some(window) {
                state.active = None;
            }
        }
        debug!(%window, "window removed");
        self.dispatch(&WindowEvent::Removed(window.clone()), false);
    }

    /// A tracked window moved or resized.
    pub fn moved(&self) {
        self.popup.refresh_position();
    }
}

impl WindowSource for WindowTracker {
    fn active_window(&self) -> WindowId {
        self.state.borrow().active.clone().unwrap_or(WindowId::MAIN)
    }

    fn is_ancestor(&self, parent: &WindowId, child: &WindowId) -> bool {
        let state = self.state.borrow();
        let position = |w: &WindowId| state.windows.iter().position(|x| x == w);
        match (position(parent), position(child)) {
            (Some(p), Some(c)) => p < c,
            _ => false,
        }
    }

    fn subscribe(&self, listener: Weak<dyn WindowListener>) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.borrow_mut().listeners.retain(|(s, _)| *s != id);
    }
}
