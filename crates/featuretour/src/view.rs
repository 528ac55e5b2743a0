#![forbid(unsafe_code)]

//! Presentation side of a run: what the popup shows and the commands its
//! buttons invoke.
//!
//! A run pushes a [`StepPresentation`] into its [`TourView`] every time it
//! arrives at a step. [`TourViewModel`] is the built-in view; hosts can
//! supply their own through [`FeatureTour::set_view_factory`].
//!
//! [`FeatureTour::set_view_factory`]: crate::navigator::FeatureTour::set_view_factory

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use featuretour_core::placement::Placement;
use serde_json::Value;

use crate::run::RunHandle;

/// Environment variable overriding the next-button text.
pub const ENV_TEXT_NEXT: &str = "FEATURETOUR_TEXT_NEXT";
/// Environment variable overriding the close-button text.
pub const ENV_TEXT_CLOSE: &str = "FEATURETOUR_TEXT_CLOSE";
/// Environment variable overriding the do-it-button text.
pub const ENV_TEXT_DO_IT: &str = "FEATURETOUR_TEXT_DO_IT";

/// Button captions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourTexts {
    /// Next button.
    pub next: String,
    /// Close button (the next button on the last step).
    pub close: String,
    /// Do-it button.
    pub do_it: String,
}

impl Default for TourTexts {
    fn default() -> Self {
        Self {
            next: "Next >>".into(),
            close: "Close".into(),
            do_it: "Do it!".into(),
        }
    }
}

impl TourTexts {
    /// Defaults overridden by `FEATURETOUR_TEXT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `FEATURETOUR_TEXT_*` keys. Empty values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut texts = Self::default();
        let get = |key| lookup(key).filter(|v: &String| !v.is_empty());

        if let Some(next) = get(ENV_TEXT_NEXT) {
            texts.next = next;
        }
        if let Some(close) = get(ENV_TEXT_CLOSE) {
            texts.close = close;
        }
        if let Some(do_it) = get(ENV_TEXT_DO_IT) {
            texts.do_it = do_it;
        }
        texts
    }

    /// Set the next caption.
    #[must_use]
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = next.into();
        self
    }

    /// Set the close caption.
    #[must_use]
    pub fn with_close(mut self, close: impl Into<String>) -> Self {
        self.close = close.into();
        self
    }

    /// Set the do-it caption.
    #[must_use]
    pub fn with_do_it(mut self, do_it: impl Into<String>) -> Self {
        self.do_it = do_it.into();
        self
    }

    /// Restore the default captions.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything a view needs to render one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPresentation {
    /// Identity of the step.
    pub step_id: String,
    /// Header payload.
    pub header: Value,
    /// Content payload.
    pub content: Value,
    /// Resolved header template.
    pub header_template: Option<Value>,
    /// Resolved content template.
    pub content_template: Option<Value>,
    /// 1-based position.
    pub step_no: usize,
    /// Number of steps in the tour.
    pub total_steps: usize,
    /// Whether a doable is attached to the step.
    pub show_do_it: bool,
    /// Whether the step (or the tour default) asks for a next button.
    pub show_next: bool,
    /// Whether this is the final step.
    pub is_last: bool,
    /// Desired popup placement from the anchor.
    pub placement: Placement,
}

impl StepPresentation {
    /// True on the final step.
    pub fn has_tour_finished(&self) -> bool {
        self.step_no == self.total_steps
    }

    /// The `"Step n/N"` caption.
    pub fn steps_text(&self) -> String {
        format!("Step {}/{}", self.step_no, self.total_steps)
    }
}

/// A presentation object bound to a run.
pub trait TourView {
    /// The run arrived at a step.
    fn present(&self, step: &StepPresentation);

    /// The presenter had to flip the popup to `placement`.
    fn set_actual_placement(&self, _placement: Placement) {}
}

/// Builds the presentation object for a starting run.
pub type ViewFactory = Rc<dyn Fn(RunHandle) -> Rc<dyn TourView>>;

/// Observable state of a [`TourViewModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Header payload.
    pub header: Value,
    /// Content payload.
    pub content: Value,
    /// Resolved header template.
    pub header_template: Option<Value>,
    /// Resolved content template.
    pub content_template: Option<Value>,
    /// `"Step n/N"`.
    pub steps_text: String,
    /// 1-based current step.
    pub current_step_no: usize,
    /// Number of steps.
    pub total_steps_count: usize,
    /// Current step is the last one.
    pub has_tour_finished: bool,
    /// Render the do-it button.
    pub show_do_it: bool,
    /// Requested next-button visibility (before the close override).
    pub show_next: bool,
    /// Desired placement.
    pub placement: Placement,
    /// Placement the presenter actually used.
    pub actual_placement: Placement,
    /// Caption of the next button.
    pub button_text: String,
    /// The next button closes the tour.
    pub closes_on_next: bool,
}

/// The built-in presentation object.
pub struct TourViewModel {
    run: RunHandle,
    texts: TourTexts,
    state: RefCell<ViewState>,
}

impl fmt::Debug for TourViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TourViewModel")
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl TourViewModel {
    /// Create a view model driving `run`.
    pub fn new(run: RunHandle, texts: TourTexts) -> Self {
        let state = ViewState {
            header: Value::Null,
            content: Value::Null,
            header_template: None,
            content_template: None,
            steps_text: String::new(),
            current_step_no: 1,
            total_steps_count: 1,
            has_tour_finished: false,
            show_do_it: false,
            show_next: false,
            placement: Placement::default(),
            actual_placement: Placement::default(),
            button_text: texts.next.clone(),
            closes_on_next: false,
        };
        Self {
            run,
            texts,
            state: RefCell::new(state),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Captions in use.
    pub fn texts(&self) -> &TourTexts {
        &self.texts
    }

    /// Header payload.
    pub fn header(&self) -> Value {
        self.state.borrow().header.clone()
    }

    /// Content payload.
    pub fn content(&self) -> Value {
        self.state.borrow().content.clone()
    }

    /// `"Step n/N"`.
    pub fn steps_text(&self) -> String {
        self.state.borrow().steps_text.clone()
    }

    /// 1-based current step.
    pub fn current_step_no(&self) -> usize {
        self.state.borrow().current_step_no
    }

    /// Number of steps.
    pub fn total_steps_count(&self) -> usize {
        self.state.borrow().total_steps_count
    }

    /// Current step is the last one.
    pub fn has_tour_finished(&self) -> bool {
        self.state.borrow().has_tour_finished
    }

    /// Render the do-it button.
    pub fn show_do_it(&self) -> bool {
        self.state.borrow().show_do_it
    }

    /// Render the next button. Always true while it reads "close".
    pub fn show_next(&self) -> bool {
        let state = self.state.borrow();
        state.show_next || state.closes_on_next
    }

    /// Caption of the next button.
    pub fn button_text(&self) -> String {
        self.state.borrow().button_text.clone()
    }

    /// Desired placement.
    pub fn placement(&self) -> Placement {
        self.state.borrow().placement
    }

    /// Placement the presenter actually used.
    pub fn actual_placement(&self) -> Placement {
        self.state.borrow().actual_placement
    }

    /// Change the desired placement. The actual placement follows.
    pub fn set_placement(&self, placement: Placement) {
        let mut state = self.state.borrow_mut();
        if state.placement != placement {
            state.placement = placement;
            state.actual_placement = placement;
        }
    }

    /// Next-button command: closes on the last step, advances otherwise.
    pub fn next(&self) {
        let closes = self.state.borrow().closes_on_next;
        if closes {
            self.run.close();
        } else {
            self.run.next_step(false);
        }
    }

    /// Whether the next button is enabled.
    pub fn can_next(&self) -> bool {
        let closes = self.state.borrow().closes_on_next;
        closes || self.run.can_next_step()
    }

    /// Close command.
    pub fn close(&self) {
        self.run.close();
    }

    /// Do-it command.
    pub fn do_it(&self) {
        self.run.do_it();
    }

    /// Whether the do-it button is enabled.
    pub fn can_do_it(&self) -> bool {
        self.run.can_do_it()
    }
}

impl TourView for TourViewModel {
    fn present(&self, step: &StepPresentation) {
        {
            let mut state = self.state.borrow_mut();
            state.header = step.header.clone();
            state.content = step.content.clone();
            state.header_template = step.header_template.clone();
            state.content_template = step.content_template.clone();
            state.steps_text = step.steps_text();
            state.current_step_no = step.step_no;
            state.total_steps_count = step.total_steps;
            state.has_tour_finished = step.has_tour_finished();
            state.show_do_it = step.show_do_it;
            state.show_next = step.show_next;
            state.closes_on_next = step.is_last;
            state.button_text = if step.is_last {
                self.texts.close.clone()
            } else {
                self.texts.next.clone()
            };
        }
        self.set_placement(step.placement);
    }

    fn set_actual_placement(&self, placement: Placement) {
        self.state.borrow_mut().actual_placement = placement;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presentation(step_no: usize, total: usize) -> StepPresentation {
        StepPresentation {
            step_id: format!("s{step_no}"),
            header: Value::from("h"),
            content: Value::from("c"),
            header_template: None,
            content_template: None,
            step_no,
            total_steps: total,
            show_do_it: false,
            show_next: false,
            is_last: step_no == total,
            placement: Placement::BottomLeft,
        }
    }

    // ── Texts ────────────────────────────────────────────────────────────

    #[test]
    fn default_texts() {
        let texts = TourTexts::default();
        assert_eq!(texts.next, "Next >>");
        assert_eq!(texts.close, "Close");
        assert_eq!(texts.do_it, "Do it!");
    }

    #[test]
    fn texts_from_lookup_override_non_empty_values() {
        let texts = TourTexts::from_lookup(|key| match key {
            ENV_TEXT_NEXT => Some("Weiter".into()),
            ENV_TEXT_CLOSE => Some(String::new()),
            _ => None,
        });
        assert_eq!(texts.next, "Weiter");
        assert_eq!(texts.close, "Close");
        assert_eq!(texts.do_it, "Do it!");
    }

    #[test]
    fn texts_reset_restores_defaults() {
        let mut texts = TourTexts::default().with_next("n").with_close("c").with_do_it("d");
        assert_eq!(texts.do_it, "d");
        texts.reset();
        assert_eq!(texts, TourTexts::default());
    }

    // ── Presentation ─────────────────────────────────────────────────────

    #[test]
    fn presentation_derives_counters() {
        let p = presentation(2, 3);
        assert_eq!(p.steps_text(), "Step 2/3");
        assert!(!p.has_tour_finished());
        assert!(presentation(3, 3).has_tour_finished());
    }

    // ── View model ───────────────────────────────────────────────────────

    #[test]
    fn present_copies_fields() {
        let vm = TourViewModel::new(RunHandle::detached(), TourTexts::default());
        vm.present(&presentation(1, 3));
        let state = vm.snapshot();
        assert_eq!(state.header, Value::from("h"));
        assert_eq!(state.steps_text, "Step 1/3");
        assert_eq!(state.current_step_no, 1);
        assert_eq!(state.total_steps_count, 3);
        assert!(!state.has_tour_finished);
        assert_eq!(state.button_text, "Next >>");
        assert_eq!(vm.placement(), Placement::BottomLeft);
        assert_eq!(vm.actual_placement(), Placement::BottomLeft);
    }

    #[test]
    fn last_step_switches_to_close_text_and_back() {
        let vm = TourViewModel::new(RunHandle::detached(), TourTexts::default());
        vm.present(&presentation(3, 3));
        assert_eq!(vm.button_text(), "Close");
        assert!(vm.show_next(), "close button is always shown");
        assert!(vm.has_tour_finished());
        assert!(vm.can_next());

        vm.present(&presentation(2, 3));
        assert_eq!(vm.button_text(), "Next >>");
        assert!(!vm.show_next());
    }

    #[test]
    fn placement_change_resets_actual_placement() {
        let vm = TourViewModel::new(RunHandle::detached(), TourTexts::default());
        vm.set_placement(Placement::BottomCenter);
        vm.set_actual_placement(Placement::TopCenter);
        assert_eq!(vm.actual_placement(), Placement::TopCenter);

        vm.set_placement(Placement::BottomCenter);
        assert_eq!(vm.actual_placement(), Placement::TopCenter);

        vm.set_placement(Placement::RightTop);
        assert_eq!(vm.actual_placement(), Placement::RightTop);
    }

    #[test]
    fn commands_on_detached_run_are_inert() {
        let vm = TourViewModel::new(RunHandle::detached(), TourTexts::default());
        vm.present(&presentation(1, 2));
        assert!(!vm.can_next());
        assert!(!vm.can_do_it());
        vm.next();
        vm.do_it();
        vm.close();
    }

    #[test]
    fn close_detection_ignores_captions() {
        let texts = TourTexts::default().with_next("OK").with_close("OK");
        let vm = TourViewModel::new(RunHandle::detached(), texts);
        vm.present(&presentation(1, 2));
        assert!(!vm.snapshot().closes_on_next);
        assert!(!vm.show_next());
        vm.present(&presentation(2, 2));
        assert!(vm.snapshot().closes_on_next);
        assert!(vm.show_next());
    }

    #[test]
    fn custom_close_text_is_shown_on_last_step() {
        let texts = TourTexts::default().with_close("Done");
        let vm = TourViewModel::new(RunHandle::detached(), texts);
        vm.present(&presentation(1, 1));
        assert_eq!(vm.button_text(), "Done");
        assert!(vm.show_next());
    }
}
