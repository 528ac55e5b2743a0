#![forbid(unsafe_code)]

//! Test fixtures for FeatureTour.
//!
//! [`TestHost`] wires a session to the reference collaborators
//! ([`ElementRegistry`], [`WindowTracker`]) plus a [`RecordingPopup`] so
//! integration tests can drive whole tours without a UI toolkit.
//! [`with_captured_events`] collects `tracing` events for assertions on
//! warnings.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use featuretour::{
    Anchor, ElementRegistry, FeatureTour, LayoutPump, PopupPresenter, Release, Step, Tour,
    TourEnv, TourError, TourView, TourViewModel, Visual, WindowTracker,
};
use featuretour_core::{Placement, Rect, Size, WindowId, WindowTransition};
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ── Popup ───────────────────────────────────────────────────────────────

/// Calls received by a [`RecordingPopup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupCall {
    StartTour,
    MoveTo(String),
    Show,
    Hide,
    ExitTour,
    RefreshPosition,
}

/// Popup presenter that logs every call and tracks visibility.
#[derive(Debug, Default)]
pub struct RecordingPopup {
    calls: RefCell<Vec<PopupCall>>,
    visible: Cell<bool>,
    target: RefCell<Option<String>>,
    viewport: Cell<Option<(Size, Rect)>>,
    placed: Cell<Option<Placement>>,
}

impl RecordingPopup {
    /// Calls so far, oldest first.
    pub fn calls(&self) -> Vec<PopupCall> {
        self.calls.borrow().clone()
    }

    /// Forget recorded calls. Visibility and target are kept.
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Whether the last show/hide left the popup visible.
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Element id the popup was last moved to.
    pub fn target(&self) -> Option<String> {
        self.target.borrow().clone()
    }

    /// Lay the popup out as `popup` inside `viewport` on every move.
    pub fn set_viewport(&self, popup: Size, viewport: Rect) {
        self.viewport.set(Some((popup, viewport)));
    }

    /// Placement chosen on the last move, if a viewport is set and the
    /// target had bounds.
    pub fn placement(&self) -> Option<Placement> {
        self.placed.get()
    }

    fn record(&self, call: PopupCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl PopupPresenter for RecordingPopup {
    fn start_tour(&self, _view: Rc<dyn TourView>) {
        self.record(PopupCall::StartTour);
    }

    fn move_to(&self, anchor: &Anchor) {
        let chosen = self
            .viewport
            .get()
            .and_then(|(popup, viewport)| anchor.popup_offset(popup, viewport));
        self.placed.set(chosen.map(|c| c.placement));
        *self.target.borrow_mut() = Some(anchor.element_id.clone());
        self.record(PopupCall::MoveTo(anchor.element_id.clone()));
    }

    fn show(&self) {
        self.visible.set(true);
        self.record(PopupCall::Show);
    }

    fn hide(&self) {
        self.visible.set(false);
        self.record(PopupCall::Hide);
    }

    fn exit_tour(&self) {
        self.visible.set(false);
        *self.target.borrow_mut() = None;
        self.record(PopupCall::ExitTour);
    }

    fn refresh_position(&self) {
        self.record(PopupCall::RefreshPosition);
    }
}

// ── Visuals ─────────────────────────────────────────────────────────────

/// A fake UI element.
#[derive(Debug, Default)]
pub struct TestVisual {
    loaded: Cell<bool>,
    bounds: Cell<Option<Rect>>,
    templates: RefCell<HashMap<String, Value>>,
}

impl TestVisual {
    /// A loaded element.
    pub fn loaded() -> Self {
        Self {
            loaded: Cell::new(true),
            ..Self::default()
        }
    }

    /// An element that exists but is not loaded (e.g. on a hidden tab).
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.set(loaded);
    }

    pub fn set_bounds(&self, bounds: Rect) {
        self.bounds.set(Some(bounds));
    }

    /// Make `key` resolve to `template`.
    pub fn add_template(&self, key: &str, template: impl Into<Value>) {
        self.templates
            .borrow_mut()
            .insert(key.to_owned(), template.into());
    }
}

impl Visual for TestVisual {
    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds.get()
    }

    fn template(&self, key: &str) -> Option<Value> {
        self.templates.borrow().get(key).cloned()
    }
}

// ── Layout ──────────────────────────────────────────────────────────────

/// Layout pump that counts how often it ran.
#[derive(Debug, Default)]
pub struct CountingLayout {
    pumps: Cell<usize>,
}

impl CountingLayout {
    pub fn pumps(&self) -> usize {
        self.pumps.get()
    }
}

impl LayoutPump for CountingLayout {
    fn pump(&self) {
        self.pumps.set(self.pumps.get() + 1);
    }
}

// ── Hooks ───────────────────────────────────────────────────────────────

/// Shared log of hook invocations as `"<hook>:<step id>"` strings.
#[derive(Debug, Clone, Default)]
pub struct HookLog(Rc<RefCell<Vec<String>>>);

impl HookLog {
    /// Entries so far.
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    /// Record entering, entered and left for each of `step_ids`, and the
    /// closed hook. Returns the registration tokens.
    pub fn attach(&self, session: &FeatureTour, step_ids: &[&str]) -> Vec<Release> {
        let mut tokens = Vec::new();
        for id in step_ids {
            let log = self.clone();
            tokens.push(
                session
                    .on_step_entering(id)
                    .execute(move |s| log.push(format!("entering:{}", s.id()))),
            );
            let log = self.clone();
            tokens.push(
                session
                    .on_step_entered(id)
                    .execute(move |s| log.push(format!("entered:{}", s.id()))),
            );
            let log = self.clone();
            tokens.push(
                session
                    .on_step_left(id)
                    .execute(move |s| log.push(format!("left:{}", s.id()))),
            );
        }
        let log = self.clone();
        tokens.push(
            session
                .on_closed()
                .execute(move |s| log.push(format!("closed:{}", s.id()))),
        );
        tokens
    }
}

// ── Host ────────────────────────────────────────────────────────────────

/// Slot filled with the view model of the most recently started run.
pub type ViewSlot = Rc<RefCell<Option<Rc<TourViewModel>>>>;

/// A session wired to reference collaborators.
pub struct TestHost {
    pub session: FeatureTour,
    pub registry: Rc<ElementRegistry>,
    pub windows: Rc<WindowTracker>,
    pub popup: Rc<RecordingPopup>,
    pub layout: Rc<CountingLayout>,
    visuals: RefCell<HashMap<String, Rc<TestVisual>>>,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    /// A host with only the main window registered and active.
    pub fn new() -> Self {
        let popup = Rc::new(RecordingPopup::default());
        let presenter: Rc<dyn PopupPresenter> = popup.clone();
        let windows = Rc::new(WindowTracker::new(presenter));
        windows.register(WindowId::MAIN);
        let registry = Rc::new(ElementRegistry::new());
        registry.attach(&*windows);
        Self {
            session: FeatureTour::new(),
            registry,
            windows,
            popup,
            layout: Rc::new(CountingLayout::default()),
            visuals: RefCell::new(HashMap::new()),
        }
    }

    /// Register a window after those already known.
    pub fn add_window(&self, name: &str) -> WindowId {
        let id = WindowId::new(name);
        self.windows.register(id.clone());
        id
    }

    /// Register a loaded anchor on `window`.
    pub fn anchor(&self, element_id: &str, window: &WindowId) -> Rc<TestVisual> {
        self.anchor_with(element_id, window, Placement::default(), WindowTransition::default())
    }

    /// Register a loaded anchor with explicit placement and policy.
    pub fn anchor_with(
        &self,
        element_id: &str,
        window: &WindowId,
        placement: Placement,
        transition: WindowTransition,
    ) -> Rc<TestVisual> {
        let visual = Rc::new(TestVisual::loaded());
        let live: Rc<dyn Visual> = visual.clone();
        self.registry.register(
            &Anchor::new(element_id, window.clone())
                .with_placement(placement)
                .with_transition(transition)
                .with_visual(live),
        );
        self.visuals
            .borrow_mut()
            .insert(element_id.to_owned(), Rc::clone(&visual));
        visual
    }

    /// Drop the host's strong reference to an anchor's visual.
    pub fn drop_visual(&self, element_id: &str) {
        self.visuals.borrow_mut().remove(element_id);
    }

    /// Collaborators for a run.
    pub fn env(&self) -> TourEnv {
        TourEnv::new(
            self.registry.clone(),
            self.windows.clone(),
            self.popup.clone(),
        )
        .with_layout(self.layout.clone())
    }

    /// Start `tour` on the session.
    pub fn start(&self, tour: &Tour) -> Result<bool, TourError> {
        self.session.start(tour, self.env())
    }

    /// Install a view factory that keeps the built view model reachable.
    pub fn capture_view(&self) -> ViewSlot {
        let slot: ViewSlot = Rc::default();
        let sink = Rc::clone(&slot);
        let texts = self.session.texts();
        self.session.set_view_factory(move |run| {
            let model = Rc::new(TourViewModel::new(run, texts.clone()));
            *sink.borrow_mut() = Some(Rc::clone(&model));
            let view: Rc<dyn TourView> = model;
            view
        });
        slot
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────

/// A tour whose steps are anchored at `element_ids`, in order.
pub fn linear_tour(name: &str, element_ids: &[&str]) -> Tour {
    let steps = element_ids
        .iter()
        .map(|id| Step::new(*id, format!("{id} header"), format!("{id} content")))
        .collect();
    Tour::new(name, steps)
}

// ── Tracing capture ─────────────────────────────────────────────────────

/// One captured `tracing` event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub target: String,
    /// Name of the innermost span the event was emitted in.
    pub span: Option<String>,
    pub message: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn is_warn(&self) -> bool {
        self.level == tracing::Level::WARN
    }

    /// Whether the message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.as_deref().is_some_and(|m| m.contains(needle))
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_owned(),
                span: ctx.event_span(event).map(|span| span.name().to_owned()),
                message,
                fields,
            });
    }
}

/// Run `f` with a capturing subscriber and return every event it emitted.
pub fn with_captured_events(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), f);
    events.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Warnings among `events`.
pub fn warnings(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events.iter().filter(|e| e.is_warn()).collect()
}
