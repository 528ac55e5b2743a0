#![forbid(unsafe_code)]

//! A live tour: the step pointer, hook dispatch, and window reactions.
//!
//! # State machine
//!
//! ```text
//! NotStarted ──start()──▶ Active ──close()──▶ Closed
//!      │                                        ▲
//!      └──────────────close()───────────────────┘
//! ```
//!
//! Every arrival at a step goes through one transition routine:
//!
//! 1. If the target differs from the current node, fire *left* for the old
//!    step and move the pointer.
//! 2. Fire *entering* for the new step.
//! 3. Let layout settle, then resolve the anchor. If it is missing, warn and
//!    report failure; the pointer stays where it moved.
//! 4. Move the popup, refresh the view, let layout settle, fire *entered*,
//!    and show the popup.
//!
//! No `RefCell` borrow is held while host code runs, so hooks may call back
//! into the run. A hook that closes the run stops the transition.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use featuretour_core::window::WindowId;
use tracing::{debug, debug_span, warn};

use crate::actions::{ActionCategory, ActionKey, ActionRepository};
use crate::chain::{NodeId, StepChain};
use crate::env::{
    Anchor, PopupMove, SubscriptionId, TourEnv, TransitionOutcome, WindowEvent, WindowListener,
};
use crate::error::{Result, TourError};
use crate::model::{Step, Tour};
use crate::navigator::{FeatureTour, Session};
use crate::transition::{self, TransitionPlan};
use crate::view::{StepPresentation, TourView, TourViewModel};

/// Lifecycle phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built but not started.
    NotStarted,
    /// Started and not yet closed.
    Active,
    /// Closed; all further navigation is refused.
    Closed,
}

struct RunState {
    current: NodeId,
    window: WindowId,
    view: Option<Rc<dyn TourView>>,
    subscription: Option<SubscriptionId>,
    phase: Phase,
}

/// One execution of a [`Tour`].
pub struct TourRun {
    me: Weak<TourRun>,
    session: Weak<Session>,
    actions: ActionRepository,
    name: String,
    show_next_default: bool,
    enable_next_always: bool,
    chain: StepChain,
    env: TourEnv,
    state: RefCell<RunState>,
}

impl fmt::Debug for TourRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TourRun")
            .field("name", &self.name)
            .field("phase", &state.phase)
            .field("step_no", &self.chain.node(state.current).step_no())
            .field("steps", &self.chain.len())
            .field("window", &state.window)
            .finish()
    }
}

impl TourRun {
    /// Validate `tour` and build a run over it.
    ///
    /// Fails with a configuration error before any collaborator is touched,
    /// except for reading the active window.
    pub fn new(tour: &Tour, env: TourEnv, session: &FeatureTour) -> Result<Rc<Self>> {
        tour.validate()?;
        let chain = StepChain::build(tour.steps()).ok_or(TourError::EmptySteps)?;
        let window = env.windows.active_window();
        let current = chain.first();
        Ok(Rc::new_cyclic(|me| Self {
            me: me.clone(),
            session: session.downgrade(),
            actions: session.actions().clone(),
            name: tour.name().to_owned(),
            show_next_default: tour.next_button_default(),
            enable_next_always: tour.next_button_always_enabled(),
            chain,
            env,
            state: RefCell::new(RunState {
                current,
                window,
                view: None,
                subscription: None,
                phase: Phase::NotStarted,
            }),
        }))
    }

    /// A weak handle to this run.
    pub fn handle(&self) -> RunHandle {
        RunHandle(self.me.clone())
    }

    /// Tour name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// Whether the run has been closed.
    pub fn is_closed(&self) -> bool {
        self.phase() == Phase::Closed
    }

    /// The current step.
    pub fn current_step(&self) -> Step {
        self.chain.node(self.current()).step().clone()
    }

    /// 1-based position of the current step.
    pub fn current_step_no(&self) -> usize {
        self.chain.node(self.current()).step_no()
    }

    /// Number of steps.
    pub fn total_steps(&self) -> usize {
        self.chain.len()
    }

    /// Whether the current step is the last one.
    pub fn has_finished(&self) -> bool {
        self.current_step_no() == self.total_steps()
    }

    /// The window the run considers active.
    pub fn window(&self) -> WindowId {
        self.state.borrow().window.clone()
    }

    /// The presentation object, once started.
    pub fn view(&self) -> Option<Rc<dyn TourView>> {
        self.state.borrow().view.clone()
    }

    fn current(&self) -> NodeId {
        self.state.borrow().current
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Start the run at its first step.
    ///
    /// Returns `false` (and closes the run) when the first anchor cannot be
    /// resolved.
    pub fn start(&self) -> bool {
        if self.phase() != Phase::NotStarted {
            warn!(tour = %self.name, phase = ?self.phase(), "run already started");
            return false;
        }
        debug!(tour = %self.name, steps = self.chain.len(), "starting tour");

        let view = self.build_view();
        let listener: Weak<dyn WindowListener> = self.me.clone();
        let subscription = self.env.windows.subscribe(listener);
        {
            let mut state = self.state.borrow_mut();
            state.view = Some(Rc::clone(&view));
            state.subscription = Some(subscription);
            state.phase = Phase::Active;
        }
        self.env.popup.start_tour(view);

        let first = self.chain.first();
        let arrived = self.set_step(first, false);
        if !arrived && !self.is_closed() {
            self.close();
        }
        arrived
    }

    fn build_view(&self) -> Rc<dyn TourView> {
        let session = self.session.upgrade();
        let factory = session.as_ref().and_then(|s| s.view_factory());
        match factory {
            Some(factory) => factory(self.handle()),
            None => {
                let texts = session.map(|s| s.texts()).unwrap_or_default();
                Rc::new(TourViewModel::new(self.handle(), texts))
            }
        }
    }

    /// End the run.
    ///
    /// Exits the popup, stops listening to window events, fires *left* for
    /// the current step and then *closed*, and clears the session's current
    /// run. Closing an already closed run only logs a warning.
    pub fn close(&self) {
        let subscription = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Closed {
                drop(state);
                warn!(tour = %self.name, "run already closed");
                return;
            }
            state.phase = Phase::Closed;
            state.subscription.take()
        };
        debug!(tour = %self.name, "closing tour");

        self.env.popup.exit_tour();
        if let Some(id) = subscription {
            self.env.windows.unsubscribe(id);
        }

        let step = self.current_step();
        self.fire(ActionCategory::StepLeft, &step);
        debug!(step = step.id(), "closed hook");
        self.actions.execute(&ActionKey::closed(), &step);

        if let Some(session) = self.session.upgrade() {
            session.release_run(self);
        }
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Move to the next step.
    ///
    /// `false` when already at the end, when the run is not active, or when
    /// the next anchor cannot be resolved.
    pub fn next_step(&self, include_unloaded: bool) -> bool {
        if self.phase() != Phase::Active {
            return false;
        }
        match self.chain.node(self.current()).next() {
            Some(next) => self.set_step(next, include_unloaded),
            None => {
                debug!(tour = %self.name, "no next step");
                false
            }
        }
    }

    /// Move to the previous step.
    pub fn previous_step(&self) -> bool {
        if self.phase() != Phase::Active {
            return false;
        }
        match self.chain.node(self.current()).previous() {
            Some(previous) => self.set_step(previous, false),
            None => {
                debug!(tour = %self.name, "no previous step");
                false
            }
        }
    }

    /// Whether [`next_step`](Self::next_step) is worth offering.
    pub fn can_next_step(&self) -> bool {
        self.can_go_to(self.chain.node(self.current()).next())
    }

    /// Whether [`previous_step`](Self::previous_step) is worth offering.
    pub fn can_previous_step(&self) -> bool {
        self.can_go_to(self.chain.node(self.current()).previous())
    }

    fn can_go_to(&self, target: Option<NodeId>) -> bool {
        let Some(target) = target else {
            return false;
        };
        if self.is_closed() {
            return false;
        }
        if self.enable_next_always {
            return true;
        }
        let step = self.chain.node(target).step();
        // An entering hook is expected to make the anchor available.
        if self
            .actions
            .contains(&ActionKey::step(ActionCategory::StepEntering, step.id()))
        {
            return true;
        }
        let window = self.window();
        self.env
            .locator
            .locate(step.element_id(), true)
            .is_some_and(|anchor| anchor.window == window)
    }

    // ── Doable ───────────────────────────────────────────────────────────

    fn doable_key(&self) -> (ActionKey, Step) {
        let step = self.current_step();
        (ActionKey::step(ActionCategory::Doable, step.id()), step)
    }

    /// Run the current step's doable.
    pub fn do_it(&self) {
        let (key, step) = self.doable_key();
        debug!(action = %key, "do it");
        self.actions.execute(&key, &step);
    }

    /// Whether the current step's doable may run.
    pub fn can_do_it(&self) -> bool {
        let (key, step) = self.doable_key();
        self.actions.can_execute(&key, &step)
    }

    /// Whether the current step has a doable attached, enabled or not.
    pub fn show_do_it(&self) -> bool {
        self.actions.contains(&self.doable_key().0)
    }

    // ── Transition ───────────────────────────────────────────────────────

    fn fire(&self, category: ActionCategory, step: &Step) {
        debug!(hook = ?category, step = step.id(), "step hook");
        self.actions
            .execute(&ActionKey::step(category, step.id()), step);
    }

    fn set_step(&self, target: NodeId, include_unloaded: bool) -> bool {
        let node = self.chain.node(target);
        let step = node.step();
        let _span = debug_span!(
            "tour.transition",
            tour = %self.name,
            step = step.id(),
            step_no = node.step_no()
        )
        .entered();

        let current = self.current();
        if current != target {
            let leaving = self.chain.node(current).step().clone();
            self.fire(ActionCategory::StepLeft, &leaving);
            if self.is_closed() {
                return false;
            }
            self.state.borrow_mut().current = target;
        }

        self.fire(ActionCategory::StepEntering, step);
        if self.is_closed() {
            return false;
        }

        self.env.layout.pump();
        let Some(anchor) = self.env.locator.locate(step.element_id(), include_unloaded) else {
            warn!(
                element_id = step.element_id(),
                "could not find anchor element; popup may not appear"
            );
            return false;
        };

        let popup_move = PopupMove::begin(&*self.env.popup, &anchor);
        let presentation = self.presentation(target, &anchor);
        if let Some(view) = self.view() {
            view.present(&presentation);
        }
        self.env.layout.pump();
        self.fire(ActionCategory::StepEntered, step);
        if self.is_closed() {
            popup_move.cancel();
            return false;
        }
        true
    }

    fn presentation(&self, target: NodeId, anchor: &Anchor) -> StepPresentation {
        let node = self.chain.node(target);
        let step = node.step();
        StepPresentation {
            step_id: step.id().to_owned(),
            header: step.header().clone(),
            content: step.content().clone(),
            header_template: anchor.template(step.header_template_key()),
            content_template: anchor.template(step.content_template_key()),
            step_no: node.step_no(),
            total_steps: self.chain.len(),
            show_do_it: self.show_do_it(),
            show_next: step.next_button().unwrap_or(self.show_next_default),
            is_last: node.next().is_none(),
            placement: anchor.placement,
        }
    }

    fn window_activated(&self, window: &WindowId) -> TransitionOutcome {
        if self.phase() != Phase::Active {
            return TransitionOutcome::Unchanged;
        }
        let previous = {
            let mut state = self.state.borrow_mut();
            if state.window == *window {
                return TransitionOutcome::Unchanged;
            }
            std::mem::replace(&mut state.window, window.clone())
        };

        let plan = transition::plan(
            &self.chain,
            self.current(),
            &previous,
            window,
            &*self.env.locator,
            &*self.env.windows,
        );
        debug!(?plan, tour = %self.name, "window activated");
        match plan {
            TransitionPlan::Advance => {
                self.next_step(true);
            }
            TransitionPlan::Retreat(node) => {
                self.set_step(node, false);
            }
            TransitionPlan::Show | TransitionPlan::Hide | TransitionPlan::Unchanged => {}
        }
        plan.outcome()
    }
}

impl WindowListener for TourRun {
    fn on_window_event(&self, event: &WindowEvent) -> TransitionOutcome {
        match event {
            WindowEvent::Activated(window) => self.window_activated(window),
            WindowEvent::Deactivated(_) | WindowEvent::Removed(_) => TransitionOutcome::Unchanged,
        }
    }
}

/// Weak handle to a run, for presentation objects and deferred callers.
///
/// Every method is a harmless no-op once the run is gone.
#[derive(Clone, Default)]
pub struct RunHandle(Weak<TourRun>);

impl fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RunHandle")
            .field(&self.0.upgrade().map(|r| r.name.clone()))
            .finish()
    }
}

impl RunHandle {
    /// A handle bound to no run.
    pub fn detached() -> Self {
        Self(Weak::new())
    }

    /// The run, if it is still alive.
    pub fn upgrade(&self) -> Option<Rc<TourRun>> {
        self.0.upgrade()
    }

    /// Whether the run is alive and not closed.
    pub fn is_active(&self) -> bool {
        self.upgrade().is_some_and(|r| r.phase() == Phase::Active)
    }

    /// See [`TourRun::next_step`].
    pub fn next_step(&self, include_unloaded: bool) -> bool {
        self.upgrade().is_some_and(|r| r.next_step(include_unloaded))
    }

    /// See [`TourRun::previous_step`].
    pub fn previous_step(&self) -> bool {
        self.upgrade().is_some_and(|r| r.previous_step())
    }

    /// See [`TourRun::can_next_step`].
    pub fn can_next_step(&self) -> bool {
        self.upgrade().is_some_and(|r| r.can_next_step())
    }

    /// See [`TourRun::can_previous_step`].
    pub fn can_previous_step(&self) -> bool {
        self.upgrade().is_some_and(|r| r.can_previous_step())
    }

    /// See [`TourRun::close`].
    pub fn close(&self) {
        if let Some(run) = self.upgrade() {
            run.close();
        }
    }

    /// See [`TourRun::do_it`].
    pub fn do_it(&self) {
        if let Some(run) = self.upgrade() {
            run.do_it();
        }
    }

    /// See [`TourRun::can_do_it`].
    pub fn can_do_it(&self) -> bool {
        self.upgrade().is_some_and(|r| r.can_do_it())
    }

    /// See [`TourRun::current_step`].
    pub fn current_step(&self) -> Option<Step> {
        self.upgrade().map(|r| r.current_step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{ElementLocator, PopupPresenter, WindowSource};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Anchors(RefCell<HashMap<String, WindowId>>);

    impl Anchors {
        fn add(&self, id: &str, window: &str) {
            self.0.borrow_mut().insert(id.into(), WindowId::new(window));
        }
    }

    impl ElementLocator for Anchors {
        fn locate(&self, element_id: &str, _include_unloaded: bool) -> Option<Anchor> {
            self.0
                .borrow()
                .get(element_id)
                .map(|w| Anchor::new(element_id, w.clone()))
        }
        fn anchors(&self, _include_unloaded: bool) -> Vec<Anchor> {
            Vec::new()
        }
    }

    #[derive(Default)]
    struct Windows {
        listener: RefCell<Option<Weak<dyn WindowListener>>>,
        unsubscribed: Cell<bool>,
    }

    impl WindowSource for Windows {
        fn active_window(&self) -> WindowId {
            WindowId::new("w1")
        }
        fn is_ancestor(&self, _parent: &WindowId, _child: &WindowId) -> bool {
            false
        }
        fn subscribe(&self, listener: Weak<dyn WindowListener>) -> SubscriptionId {
            *self.listener.borrow_mut() = Some(listener);
            SubscriptionId(1)
        }
        fn unsubscribe(&self, _id: SubscriptionId) {
            self.unsubscribed.set(true);
            self.listener.borrow_mut().take();
        }
    }

    #[derive(Default)]
    struct Popup(RefCell<Vec<String>>);

    impl PopupPresenter for Popup {
        fn start_tour(&self, _view: Rc<dyn TourView>) {
            self.0.borrow_mut().push("start".into());
        }
        fn move_to(&self, anchor: &Anchor) {
            self.0.borrow_mut().push(format!("move {}", anchor.element_id));
        }
        fn show(&self) {
            self.0.borrow_mut().push("show".into());
        }
        fn hide(&self) {
            self.0.borrow_mut().push("hide".into());
        }
        fn exit_tour(&self) {
            self.0.borrow_mut().push("exit".into());
        }
        fn refresh_position(&self) {}
    }

    struct Fixture {
        session: FeatureTour,
        anchors: Rc<Anchors>,
        windows: Rc<Windows>,
        popup: Rc<Popup>,
        env: TourEnv,
    }

    fn fixture(anchors: &[(&str, &str)]) -> Fixture {
        let a = Rc::new(Anchors::default());
        for (id, w) in anchors {
            a.add(id, w);
        }
        let windows = Rc::new(Windows::default());
        let popup = Rc::new(Popup::default());
        let env = TourEnv::new(a.clone(), windows.clone(), popup.clone());
        Fixture {
            session: FeatureTour::new(),
            anchors: a,
            windows,
            popup,
            env,
        }
    }

    fn tour(ids: &[&str]) -> Tour {
        Tour::new("test", ids.iter().map(|id| Step::new(*id, "", "")).collect())
    }

    // ── Construction ─────────────────────────────────────────────────────

    #[test]
    fn construction_rejects_empty_tour() {
        let f = fixture(&[]);
        let err = TourRun::new(&tour(&[]), f.env.clone(), &f.session).unwrap_err();
        assert!(matches!(err, TourError::EmptySteps));
        assert!(f.popup.0.borrow().is_empty());
    }

    #[test]
    fn new_run_is_not_started() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a"]), f.env.clone(), &f.session).unwrap();
        assert_eq!(run.phase(), Phase::NotStarted);
        assert_eq!(run.window(), WindowId::new("w1"));
        assert!(!run.next_step(false));
        assert!(run.view().is_none());
    }

    // ── Start / navigate ─────────────────────────────────────────────────

    #[test]
    fn start_moves_and_shows_popup() {
        let f = fixture(&[("a", "w1"), ("b", "w1")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        assert_eq!(run.phase(), Phase::Active);
        assert_eq!(run.current_step_no(), 1);
        assert_eq!(*f.popup.0.borrow(), vec!["start", "move a", "show"]);
        assert!(run.view().is_some());
    }

    #[test]
    fn start_twice_is_refused() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        assert!(!run.start());
    }

    #[test]
    fn start_without_first_anchor_closes() {
        let f = fixture(&[]);
        let run = TourRun::new(&tour(&["a"]), f.env.clone(), &f.session).unwrap();
        assert!(!run.start());
        assert!(run.is_closed());
        assert!(f.windows.unsubscribed.get());
        assert_eq!(f.popup.0.borrow().last().map(String::as_str), Some("exit"));
    }

    #[test]
    fn failed_arrival_keeps_moved_pointer() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        assert!(!run.next_step(false));
        assert_eq!(run.current_step().id(), "b");
        assert!(run.has_finished());
    }

    #[test]
    fn can_next_follows_anchor_window() {
        let f = fixture(&[("a", "w1"), ("b", "w2")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        assert!(!run.can_next_step());
        assert!(!run.can_previous_step());

        f.anchors.add("b", "w1");
        assert!(run.can_next_step());
    }

    #[test]
    fn entering_hook_enables_next() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        assert!(!run.can_next_step());
        let _token = f.session.on_step_entering("B").execute(|_| {});
        assert!(run.can_next_step());
    }

    #[test]
    fn enable_next_always_overrides_lookup() {
        let f = fixture(&[("a", "w1")]);
        let t = tour(&["a", "b"]).enable_next_button_always(true);
        let run = TourRun::new(&t, f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        assert!(run.can_next_step());
    }

    // ── Close ────────────────────────────────────────────────────────────

    #[test]
    fn close_is_idempotent_and_unsubscribes() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        let closed = Rc::new(Cell::new(0));
        let c = Rc::clone(&closed);
        let _token = f.session.on_closed().execute(move |_| c.set(c.get() + 1));
        run.close();
        run.close();
        assert_eq!(closed.get(), 1);
        assert!(f.windows.unsubscribed.get());
        assert!(f.windows.listener.borrow().is_none());
    }

    #[test]
    fn hook_closing_the_run_stops_the_transition() {
        let f = fixture(&[("a", "w1"), ("b", "w1")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        let handle = run.handle();
        let _token = f.session.on_step_entering("b").execute(move |_| handle.close());
        assert!(run.start());
        assert!(!run.next_step(false));
        assert!(run.is_closed());
        let log = f.popup.0.borrow();
        assert!(!log.contains(&"move b".to_string()));
    }

    // ── Window events ────────────────────────────────────────────────────

    #[test]
    fn activation_of_same_window_is_unchanged() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        let outcome = run.on_window_event(&WindowEvent::Activated(WindowId::new("w1")));
        assert_eq!(outcome, TransitionOutcome::Unchanged);
    }

    #[test]
    fn activation_advances_to_step_on_new_window() {
        let f = fixture(&[("a", "w1"), ("b", "w2")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        let outcome = run.on_window_event(&WindowEvent::Activated(WindowId::new("w2")));
        assert_eq!(outcome, TransitionOutcome::Show);
        assert_eq!(run.current_step().id(), "b");
        assert_eq!(run.window(), WindowId::new("w2"));
    }

    #[test]
    fn closed_run_ignores_window_events() {
        let f = fixture(&[("a", "w1"), ("b", "w2")]);
        let run = TourRun::new(&tour(&["a", "b"]), f.env.clone(), &f.session).unwrap();
        assert!(run.start());
        run.close();
        let outcome = run.on_window_event(&WindowEvent::Activated(WindowId::new("w2")));
        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert_eq!(run.current_step().id(), "a");
    }

    // ── Handle ───────────────────────────────────────────────────────────

    #[test]
    fn handle_outlives_run_harmlessly() {
        let f = fixture(&[("a", "w1")]);
        let run = TourRun::new(&tour(&["a"]), f.env.clone(), &f.session).unwrap();
        let handle = run.handle();
        assert!(!handle.is_active());
        assert!(run.start());
        assert!(handle.is_active());
        drop(run);
        assert!(handle.upgrade().is_none());
        assert!(!handle.next_step(false));
        assert!(handle.current_step().is_none());
        handle.close();
    }
}
