#![forbid(unsafe_code)]

//! The host-facing session: hook registration, the current run, and
//! step-gated navigation.
//!
//! A [`FeatureTour`] holds at most one active run. Starting another run
//! closes the previous one first. All hook builders derive an [`ActionKey`]
//! from a step identity and register into the session's single
//! [`ActionRepository`].
//!
//! # Example
//!
//! ```
//! use featuretour::navigator::FeatureTour;
//!
//! let session = FeatureTour::new();
//! let token = session
//!     .on_step_entering("Settings")
//!     .execute(|step| println!("opening the tab for {}", step.id()));
//!
//! // Nothing is running, so step-gated navigation is inert.
//! assert!(!session.if_current_step_equals("Settings").go_next());
//! assert!(!session.close());
//! token.release();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::actions::{ActionCategory, ActionKey, ActionRepository, Release};
use crate::env::TourEnv;
use crate::error::Result;
use crate::model::{Step, Tour};
use crate::run::{RunHandle, TourRun};
use crate::view::{TourTexts, TourView, ViewFactory};

/// Shared state behind a [`FeatureTour`].
#[derive(Default)]
pub(crate) struct Session {
    actions: ActionRepository,
    current: RefCell<Option<Rc<TourRun>>>,
    view_factory: RefCell<Option<ViewFactory>>,
    texts: RefCell<TourTexts>,
}

impl Session {
    pub(crate) fn view_factory(&self) -> Option<ViewFactory> {
        self.view_factory.borrow().clone()
    }

    pub(crate) fn texts(&self) -> TourTexts {
        self.texts.borrow().clone()
    }

    /// Clear the current-run slot if it still holds `run`.
    pub(crate) fn release_run(&self, run: &TourRun) {
        let released = {
            let mut slot = self.current.borrow_mut();
            if slot.as_ref().is_some_and(|r| std::ptr::eq(Rc::as_ptr(r), run)) {
                slot.take()
            } else {
                None
            }
        };
        drop(released);
    }
}

/// A feature-tour session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone, Default)]
pub struct FeatureTour {
    inner: Rc<Session>,
}

impl fmt::Debug for FeatureTour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureTour")
            .field("running", &self.is_running())
            .field("actions", &self.inner.actions)
            .finish()
    }
}

impl FeatureTour {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `texts` for the built-in presentation object.
    #[must_use]
    pub fn with_texts(self, texts: TourTexts) -> Self {
        self.set_texts(texts);
        self
    }

    /// Replace the captions used by runs started from now on.
    pub fn set_texts(&self, texts: TourTexts) {
        *self.inner.texts.borrow_mut() = texts;
    }

    /// Captions in use.
    pub fn texts(&self) -> TourTexts {
        self.inner.texts()
    }

    /// Build presentation objects with `factory` instead of
    /// [`TourViewModel`](crate::view::TourViewModel).
    pub fn set_view_factory(&self, factory: impl Fn(RunHandle) -> Rc<dyn TourView> + 'static) {
        *self.inner.view_factory.borrow_mut() = Some(Rc::new(factory));
    }

    /// Go back to the built-in presentation object.
    pub fn clear_view_factory(&self) {
        self.inner.view_factory.borrow_mut().take();
    }

    /// The session's action registry.
    pub fn actions(&self) -> &ActionRepository {
        &self.inner.actions
    }

    pub(crate) fn downgrade(&self) -> Weak<Session> {
        Rc::downgrade(&self.inner)
    }

    // ── Runs ─────────────────────────────────────────────────────────────

    /// Validate `tour`, make it the current run, and start it.
    ///
    /// `Ok(false)` means the tour was valid but its first anchor could not
    /// be found; the run has already closed itself.
    pub fn start(&self, tour: &Tour, env: TourEnv) -> Result<bool> {
        let run = TourRun::new(tour, env, self)?;
        debug!(tour = tour.name(), "starting tour");
        self.set_tour_run(Rc::clone(&run));
        Ok(run.start())
    }

    /// Make `run` current, closing any previous run first.
    ///
    /// A closed hook may start another run; that one is closed as well
    /// before `run` takes the slot.
    pub fn set_tour_run(&self, run: Rc<TourRun>) {
        while let Some(previous) = self.take_current() {
            previous.close();
        }
        *self.inner.current.borrow_mut() = Some(run);
    }

    fn take_current(&self) -> Option<Rc<TourRun>> {
        self.inner.current.borrow_mut().take()
    }

    /// Close the current run. Returns whether there was one.
    pub fn close(&self) -> bool {
        let current = self.inner.current.borrow().clone();
        match current {
            Some(run) => {
                run.close();
                true
            }
            None => false,
        }
    }

    /// Whether a run is current.
    pub fn is_running(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// Handle to the current run.
    pub fn current_run(&self) -> Option<RunHandle> {
        self.inner.current.borrow().as_ref().map(|r| r.handle())
    }

    /// The current run's current step.
    pub fn current_step(&self) -> Option<Step> {
        let current = self.inner.current.borrow().clone();
        current.map(|r| r.current_step())
    }

    /// Forget the current run without closing it, drop the view factory,
    /// and remove every registered action.
    pub fn reset(&self) {
        let dropped = self.inner.current.borrow_mut().take();
        drop(dropped);
        self.clear_view_factory();
        self.inner.actions.clear();
    }

    // ── Hooks ────────────────────────────────────────────────────────────

    fn execution(&self, category: ActionCategory, step_id: &str) -> TourExecution {
        if step_id.is_empty() {
            return TourExecution::inert();
        }
        TourExecution::new(
            self.inner.actions.clone(),
            ActionKey::step(category, step_id),
        )
    }

    /// Hook run before a step's anchor is resolved. Use it to make the
    /// anchor available, e.g. by switching tabs.
    pub fn on_step_entering(&self, step_id: &str) -> TourExecution {
        self.execution(ActionCategory::StepEntering, step_id)
    }

    /// Hook run once the popup sits at a step.
    pub fn on_step_entered(&self, step_id: &str) -> TourExecution {
        self.execution(ActionCategory::StepEntered, step_id)
    }

    /// Hook run when a step stops being current.
    pub fn on_step_left(&self, step_id: &str) -> TourExecution {
        self.execution(ActionCategory::StepLeft, step_id)
    }

    /// Hook run when the tour closes.
    pub fn on_closed(&self) -> TourExecution {
        TourExecution::new(self.inner.actions.clone(), ActionKey::closed())
    }

    /// Attach a doable to a step.
    pub fn for_step(&self, step_id: &str) -> TourDoable {
        if step_id.is_empty() {
            return TourDoable { target: None };
        }
        TourDoable {
            target: Some((
                self.inner.actions.clone(),
                ActionKey::step(ActionCategory::Doable, step_id),
            )),
        }
    }

    /// Navigation that only acts while `step_id` is the current step.
    ///
    /// Comparison is case-sensitive and is repeated when the navigator is
    /// used, so a navigator kept around after the step changed is inert.
    pub fn if_current_step_equals(&self, step_id: &str) -> TourNavigator {
        let current = self.inner.current.borrow().clone();
        match current {
            Some(run) if run.current_step().id() == step_id => TourNavigator {
                target: Some((run.handle(), step_id.to_owned())),
            },
            _ => TourNavigator { target: None },
        }
    }
}

/// Registers a bare hook under one key.
#[derive(Debug)]
pub struct TourExecution {
    target: Option<(ActionRepository, ActionKey)>,
}

impl TourExecution {
    fn new(actions: ActionRepository, key: ActionKey) -> Self {
        Self {
            target: Some((actions, key)),
        }
    }

    fn inert() -> Self {
        Self { target: None }
    }

    /// Register `action`. Inert builders register nothing and return an
    /// empty token.
    pub fn execute(self, action: impl Fn(&Step) + 'static) -> Release {
        match self.target {
            Some((actions, key)) => actions.add_action(key, action),
            None => Release::empty(),
        }
    }
}

/// Attaches a doable to a step.
#[derive(Debug)]
pub struct TourDoable {
    target: Option<(ActionRepository, ActionKey)>,
}

impl TourDoable {
    /// Attach an always-enabled doable.
    pub fn attach_doable(self, action: impl Fn(&Step) + 'static) -> Release {
        self.attach_doable_with(action, |_| true)
    }

    /// Attach a doable with an enablement predicate.
    pub fn attach_doable_with(
        self,
        action: impl Fn(&Step) + 'static,
        can_do: impl Fn(&Step) -> bool + 'static,
    ) -> Release {
        match self.target {
            Some((actions, key)) => actions.add_action_with(key, action, can_do),
            None => Release::empty(),
        }
    }
}

/// Step-gated navigation.
#[derive(Debug)]
pub struct TourNavigator {
    target: Option<(RunHandle, String)>,
}

impl TourNavigator {
    fn run(&self) -> Option<Rc<TourRun>> {
        let (handle, step_id) = self.target.as_ref()?;
        let run = handle.upgrade()?;
        if run.is_closed() || run.current_step().id() != step_id {
            debug!(expected = %step_id, "stale navigation ignored");
            return None;
        }
        Some(run)
    }

    /// Whether the gate matched when the navigator was created.
    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    /// Advance. `false` when the gate no longer matches.
    pub fn go_next(&self) -> bool {
        self.run().is_some_and(|r| r.next_step(false))
    }

    /// Go back. `false` when the gate no longer matches.
    pub fn go_previous(&self) -> bool {
        self.run().is_some_and(|r| r.previous_step())
    }

    /// Close the run if the gate still matches.
    pub fn close(&self) {
        if let Some(run) = self.run() {
            run.close();
        }
    }
}
