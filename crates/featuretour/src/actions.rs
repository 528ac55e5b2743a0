#![forbid(unsafe_code)]

//! Keyed registry of host callbacks.
//!
//! Every hook a host can attach (step entering, step entered, step left,
//! tour closed, doable) is stored here under an [`ActionKey`]: a category
//! tag plus a case-folded scope, usually a step identity. Each registration
//! returns a [`Release`] that undoes exactly that registration.
//!
//! # Invariants
//!
//! 1. Scopes compare case-insensitively.
//! 2. A later registration under the same key replaces the earlier execute
//!    action (last writer wins) and logs a warning.
//! 3. A [`Release`] removes its entry only while that entry is still the one
//!    stored; a stale token never removes a newer registration.
//! 4. No internal borrow is held while a callback runs, so callbacks may
//!    register, release, or execute other actions.
//!
//! # Example
//!
//! ```
//! use featuretour::actions::{ActionKey, ActionRepository};
//! use featuretour::model::Step;
//!
//! let repo = ActionRepository::new();
//! let key = ActionKey::named("Greet");
//! let token = repo.add_action(key.clone(), |step| println!("hello {}", step.id()));
//!
//! assert!(repo.contains(&ActionKey::named("greet")));
//! token.release();
//! assert!(!repo.contains(&key));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::model::Step;

/// Callback run with the step it concerns.
pub type ExecuteFn = Rc<dyn Fn(&Step)>;

/// Predicate deciding whether the matching execute action may run.
pub type CanExecuteFn = Rc<dyn Fn(&Step) -> bool>;

/// What a registered action is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    /// Before a step's anchor is resolved.
    StepEntering,
    /// After the popup moved to a step.
    StepEntered,
    /// When a step stops being current.
    StepLeft,
    /// When the tour closes. Not scoped to a step.
    Closed,
    /// The optional "do it" action of a step.
    Doable,
    /// Free-form host actions.
    Named,
}

impl ActionCategory {
    fn label(self) -> &'static str {
        match self {
            Self::StepEntering => "step_entering",
            Self::StepEntered => "step_entered",
            Self::StepLeft => "step_left",
            Self::Closed => "closed",
            Self::Doable => "doable",
            Self::Named => "named",
        }
    }
}

/// Structured registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    category: ActionCategory,
    scope: String,
}

impl ActionKey {
    /// Key for `category` scoped to `scope`. The scope is case-folded.
    pub fn new(category: ActionCategory, scope: &str) -> Self {
        Self {
            category,
            scope: scope.to_lowercase(),
        }
    }

    /// Step-scoped key.
    pub fn step(category: ActionCategory, step_id: &str) -> Self {
        Self::new(category, step_id)
    }

    /// The tour-wide closed hook.
    pub fn closed() -> Self {
        Self::new(ActionCategory::Closed, "")
    }

    /// A free-form named action.
    pub fn named(name: &str) -> Self {
        Self::new(ActionCategory::Named, name)
    }

    /// Category tag.
    pub fn category(&self) -> ActionCategory {
        self.category
    }

    /// Case-folded scope.
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            f.write_str(self.category.label())
        } else {
            write!(f, "{}:{}", self.category.label(), self.scope)
        }
    }
}

struct Slot<F> {
    id: u64,
    action: F,
}

#[derive(Default)]
struct Registry {
    execute: HashMap<ActionKey, Slot<ExecuteFn>>,
    can_execute: HashMap<ActionKey, Slot<CanExecuteFn>>,
    next_id: u64,
}

impl Registry {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared, case-insensitive callback registry.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ActionRepository {
    inner: Rc<RefCell<Registry>>,
}

impl fmt::Debug for ActionRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.inner.borrow();
        f.debug_struct("ActionRepository")
            .field("execute", &reg.execute.len())
            .field("can_execute", &reg.can_execute.len())
            .finish()
    }
}

impl ActionRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an execute-only action.
    pub fn add_action(&self, key: ActionKey, execute: impl Fn(&Step) + 'static) -> Release {
        let mut reg = self.inner.borrow_mut();
        if reg.execute.contains_key(&key) {
            warn!(action = %key, "action already exists and will be overwritten");
        }
        let id = reg.next_id();
        reg.execute.insert(
            key.clone(),
            Slot {
                id,
                action: Rc::new(execute),
            },
        );
        debug!(action = %key, "action added");
        Release::new(Rc::downgrade(&self.inner), key, id, None)
    }

    /// Register an execute action together with its predicate.
    ///
    /// The returned token removes both.
    pub fn add_action_with(
        &self,
        key: ActionKey,
        execute: impl Fn(&Step) + 'static,
        can_execute: impl Fn(&Step) -> bool + 'static,
    ) -> Release {
        let mut reg = self.inner.borrow_mut();
        if reg.execute.contains_key(&key) {
            warn!(action = %key, "action already exists and will be overwritten");
        }
        let execute_id = reg.next_id();
        let can_execute_id = reg.next_id();
        reg.execute.insert(
            key.clone(),
            Slot {
                id: execute_id,
                action: Rc::new(execute),
            },
        );
        reg.can_execute.insert(
            key.clone(),
            Slot {
                id: can_execute_id,
                action: Rc::new(can_execute),
            },
        );
        debug!(action = %key, "action added with predicate");
        Release::new(
            Rc::downgrade(&self.inner),
            key,
            execute_id,
            Some(can_execute_id),
        )
    }

    /// Whether an execute action is registered under `key`.
    pub fn contains(&self, key: &ActionKey) -> bool {
        self.inner.borrow().execute.contains_key(key)
    }

    /// Run the execute action for `key`. Does nothing if none is registered.
    pub fn execute(&self, key: &ActionKey, step: &Step) {
        let action = self
            .inner
            .borrow()
            .execute
            .get(key)
            .map(|slot| Rc::clone(&slot.action));
        match action {
            Some(action) => action(step),
            None => debug!(action = %key, "action not available"),
        }
    }

    /// Evaluate the predicate for `key`. `false` if none is registered.
    pub fn can_execute(&self, key: &ActionKey, step: &Step) -> bool {
        let predicate = self
            .inner
            .borrow()
            .can_execute
            .get(key)
            .map(|slot| Rc::clone(&slot.action));
        predicate.is_some_and(|p| p(step))
    }

    /// Remove every registration.
    pub fn clear(&self) {
        let mut reg = self.inner.borrow_mut();
        reg.execute.clear();
        reg.can_execute.clear();
    }

    /// Number of registered execute actions.
    pub fn len(&self) -> usize {
        self.inner.borrow().execute.len()
    }

    /// Whether no execute action is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability that undoes one registration.
///
/// Dropping a `Release` keeps the registration in place; call
/// [`release`](Self::release) to remove it.
pub struct Release {
    target: Option<ReleaseTarget>,
}

struct ReleaseTarget {
    registry: Weak<RefCell<Registry>>,
    key: ActionKey,
    execute_id: u64,
    can_execute_id: Option<u64>,
}

impl Release {
    fn new(
        registry: Weak<RefCell<Registry>>,
        key: ActionKey,
        execute_id: u64,
        can_execute_id: Option<u64>,
    ) -> Self {
        Self {
            target: Some(ReleaseTarget {
                registry,
                key,
                execute_id,
                can_execute_id,
            }),
        }
    }

    /// A token that releases nothing.
    pub fn empty() -> Self {
        Self { target: None }
    }

    /// Whether this token is bound to a registration.
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }

    /// Remove the registration this token was issued for, if it is still
    /// the stored one.
    pub fn release(self) {
        let Some(target) = self.target else {
            return;
        };
        let Some(registry) = target.registry.upgrade() else {
            return;
        };
        let mut reg = registry.borrow_mut();
        if reg
            .execute
            .get(&target.key)
            .is_some_and(|slot| slot.id == target.execute_id)
        {
            reg.execute.remove(&target.key);
        }
        if let Some(id) = target.can_execute_id
            && reg
                .can_execute
                .get(&target.key)
                .is_some_and(|slot| slot.id == id)
        {
            reg.can_execute.remove(&target.key);
        }
        debug!(action = %target.key, "action released");
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(t) => f.debug_tuple("Release").field(&t.key.to_string()).finish(),
            None => f.write_str("Release(empty)"),
        }
    }
}
