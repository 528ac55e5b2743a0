#![forbid(unsafe_code)]

//! Window identity and window-transition policies.

use std::fmt;

/// Identifier of a host window.
///
/// The application's main window uses [`WindowId::MAIN`], the empty id.
/// Other windows carry whatever id the host assigns them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WindowId(String);

impl WindowId {
    /// The main window.
    pub const MAIN: WindowId = WindowId(String::new());

    /// Create a window id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the main window.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            f.write_str("<main>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for WindowId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WindowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What a tour may do when the active window changes while a step's target
/// lives elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowTransition {
    /// Derive the policy from the window relationship: moving into a child
    /// window behaves like [`NextHide`](Self::NextHide), anything else like
    /// [`NextPreviousHide`](Self::NextPreviousHide).
    #[default]
    Automatic,
    /// Advance if the next step is on the new window, else walk back to an
    /// earlier step on it, else hide.
    NextPreviousHide,
    /// Advance if the next step is on the new window, else hide.
    NextHide,
    /// Walk back to an earlier step on the new window, else hide.
    PreviousHide,
    /// Always hide.
    None,
}

impl WindowTransition {
    /// Replace `Automatic` by a concrete policy.
    ///
    /// `entering_child` is true when the previously active window is an
    /// ancestor of the newly active one.
    #[must_use]
    pub const fn resolve(self, entering_child: bool) -> Self {
        match self {
            Self::Automatic if entering_child => Self::NextHide,
            Self::Automatic => Self::NextPreviousHide,
            other => other,
        }
    }

    /// Whether the policy may advance to the next step.
    #[must_use]
    pub const fn allows_next(self) -> bool {
        matches!(self, Self::NextPreviousHide | Self::NextHide)
    }

    /// Whether the policy may walk back to an earlier step.
    #[must_use]
    pub const fn allows_previous(self) -> bool {
        matches!(self, Self::NextPreviousHide | Self::PreviousHide)
    }
}
