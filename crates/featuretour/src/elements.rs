#![forbid(unsafe_code)]

//! Reference [`ElementLocator`]: anchors registered by the host.
//!
//! The registry holds visuals weakly. An anchor whose visual was dropped is
//! reported [`Liveness::Gone`], never returned by lookups, and pruned on
//! the next registration. Unloaded visuals (e.g. on an inactive tab) stay
//! registered and are only returned when `include_unloaded` is set.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use featuretour_core::placement::Placement;
use featuretour_core::window::{WindowId, WindowTransition};
use tracing::{debug, warn};

use crate::env::{
    Anchor, ElementLocator, Liveness, SubscriptionId, TransitionOutcome, Visual, WindowEvent,
    WindowListener, WindowSource,
};

struct Entry {
    element_id: String,
    window: WindowId,
    placement: Placement,
    transition: WindowTransition,
    visual: Option<Weak<dyn Visual>>,
}

impl Entry {
    fn visual(&self) -> Option<Rc<dyn Visual>> {
        self.visual.as_ref().and_then(Weak::upgrade)
    }

    fn liveness(&self) -> Liveness {
        if self.visual().is_some() {
            Liveness::Present
        } else {
            Liveness::Gone
        }
    }

    fn anchor(&self, include_unloaded: bool) -> Option<Anchor> {
        let visual = self.visual()?;
        if !include_unloaded && !visual.is_loaded() {
            return None;
        }
        Some(
            Anchor::new(self.element_id.clone(), self.window.clone())
                .with_placement(self.placement)
                .with_transition(self.transition)
                .with_visual(visual),
        )
    }
}

/// Anchors registered by the host, keyed by element id.
#[derive(Default)]
pub struct ElementRegistry {
    entries: RefCell<Vec<Entry>>,
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        f.debug_list()
            .entries(entries.iter().map(|e| (&e.element_id, &e.window, e.liveness())))
            .finish()
    }
}

impl ElementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `windows` so anchors of removed windows are dropped.
    pub fn attach(self: &Rc<Self>, windows: &dyn WindowSource) -> SubscriptionId {
        let weak = Rc::downgrade(self);
        let listener: Weak<dyn WindowListener> = weak;
        windows.subscribe(listener)
    }

    /// Register `anchor`, replacing any anchor with the same id and pruning
    /// anchors whose visual is gone.
    ///
    /// An anchor without a visual is registered as already gone.
    pub fn register(&self, anchor: &Anchor) {
        if anchor.visual().is_none() {
            warn!(element_id = %anchor.element_id, "registering anchor without a visual");
        }
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.element_id != anchor.element_id && e.liveness() == Liveness::Present);
        entries.push(Entry {
            element_id: anchor.element_id.clone(),
            window: anchor.window.clone(),
            placement: anchor.placement,
            transition: anchor.transition,
            visual: anchor.visual().map(Rc::downgrade),
        });
        debug!(element_id = %anchor.element_id, window = %anchor.window, "anchor registered");
    }

    fn update(&self, element_id: &str, apply: impl FnOnce(&mut Entry)) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|e| e.element_id == element_id) {
            Some(entry) => {
                apply(entry);
                true
            }
            None => false,
        }
    }

    /// Change the placement of a registered anchor.
    pub fn set_placement(&self, element_id: &str, placement: Placement) -> bool {
        self.update(element_id, |e| e.placement = placement)
    }

    /// Change the transition policy of a registered anchor.
    pub fn set_transition(&self, element_id: &str, transition: WindowTransition) -> bool {
        self.update(element_id, |e| e.transition = transition)
    }

    /// Remove the anchor registered under `element_id`.
    pub fn remove(&self, element_id: &str) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.element_id != element_id);
        entries.len() != before
    }

    /// Drop every anchor on `window`. Returns how many were dropped.
    pub fn remove_window(&self, window: &WindowId) -> usize {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.window != *window);
        let removed = before - entries.len();
        debug!(%window, removed, "anchors of removed window dropped");
        removed
    }

    /// Liveness of the anchor registered under `element_id`.
    pub fn liveness(&self, element_id: &str) -> Option<Liveness> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.element_id == element_id)
            .map(Entry::liveness)
    }

    /// Number of registered anchors, gone ones included.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ElementLocator for ElementRegistry {
    fn locate(&self, element_id: &str, include_unloaded: bool) -> Option<Anchor> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.element_id == element_id)
            .find_map(|e| e.anchor(include_unloaded))
    }

    fn anchors(&self, include_unloaded: bool) -> Vec<Anchor> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| e.anchor(include_unloaded))
            .collect()
    }
}

impl WindowListener for ElementRegistry {
    fn on_window_event(&self, event: &WindowEvent) -> TransitionOutcome {
        if let WindowEvent::Removed(window) = event {
            self.remove_window(window);
        }
        TransitionOutcome::Unchanged
    }

    fn follows_focus(&self) -> bool {
        false
    }
}
