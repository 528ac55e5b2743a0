#![forbid(unsafe_code)]

//! What a run does when the foreground window changes.
//!
//! [`plan`] only decides; the run carries the decision out. The search is
//! greedy: the immediate next step, then a nearest-first walk backwards.
//! Nothing beyond those two directions is considered.

use featuretour_core::window::{WindowId, WindowTransition};
use tracing::{debug, warn};

use crate::chain::{NodeId, StepChain};
use crate::env::{ElementLocator, TransitionOutcome, WindowSource};

/// Decision for one window change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// The current anchor is on the new window; keep the popup up.
    Show,
    /// Nothing to show on the new window.
    Hide,
    /// The current anchor cannot be found; leave visibility alone.
    Unchanged,
    /// Silently advance to the next step, then show.
    Advance,
    /// Silently return to an earlier step, then show.
    Retreat(NodeId),
}

impl TransitionPlan {
    /// Popup visibility once the plan has run.
    pub fn outcome(self) -> TransitionOutcome {
        match self {
            Self::Show | Self::Advance | Self::Retreat(_) => TransitionOutcome::Show,
            Self::Hide => TransitionOutcome::Hide,
            Self::Unchanged => TransitionOutcome::Unchanged,
        }
    }
}

/// Decide how to react to `new_window` becoming active while the run sits at
/// `current`.
pub fn plan(
    chain: &StepChain,
    current: NodeId,
    previous_window: &WindowId,
    new_window: &WindowId,
    locator: &dyn ElementLocator,
    windows: &dyn WindowSource,
) -> TransitionPlan {
    let node = chain.node(current);
    let Some(anchor) = locator.locate(node.step().element_id(), false) else {
        warn!(
            element_id = node.step().element_id(),
            "current anchor not found; popup visibility unchanged"
        );
        return TransitionPlan::Unchanged;
    };
    if anchor.window == *new_window {
        return TransitionPlan::Show;
    }

    let on_new_window = |id: NodeId| {
        locator
            .locate(chain.node(id).step().element_id(), true)
            .is_some_and(|a| a.window == *new_window)
    };

    let entering_child = matches!(anchor.transition, WindowTransition::Automatic)
        && windows.is_ancestor(previous_window, new_window);
    let behavior = anchor.transition.resolve(entering_child);
    debug!(?behavior, from = %previous_window, to = %new_window, "window transition");

    if behavior.allows_next() && node.next().is_some_and(on_new_window) {
        return TransitionPlan::Advance;
    }
    if behavior.allows_previous()
        && let Some(earlier) = chain.walk_back(current).find(|id| on_new_window(*id))
    {
        return TransitionPlan::Retreat(earlier);
    }
    TransitionPlan::Hide
}
