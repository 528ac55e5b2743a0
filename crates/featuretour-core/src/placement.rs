//! Popup placement geometry.
//!
//! Maps a desired [`Placement`] plus the measured popup and target sizes to
//! an offset relative to the target's top-left corner. When the desired side
//! does not fit, presenters fall back to the mirrored side; [`candidates`]
//! yields the ordered list of offsets to try and [`choose`] picks the first
//! one that fits a viewport.
//!
//! # Invariants
//!
//! 1. The first candidate is always the desired placement.
//! 2. [`Placement::flip`] is an involution (`p.flip().flip() == p`).
//! 3. Every function here is pure; no popup or window state is touched.
//!
//! # Example
//!
//! ```
//! use featuretour_core::geometry::{Point, Size};
//! use featuretour_core::placement::{popup_offset, Placement};
//!
//! let offset = popup_offset(Size::new(200.0, 80.0), Size::new(100.0, 40.0), Placement::BottomLeft);
//! assert_eq!(offset.offset, Point::new(0.0, 40.0));
//! ```

#![forbid(unsafe_code)]

use crate::geometry::{Point, Rect, Size};

/// Distance from a popup corner to the center of its arrow.
///
/// Side placements on targets shorter than twice this margin shift the popup
/// so the arrow still points at the target's middle.
pub const ARROW_MARGIN: f64 = 30.0;

/// Where the popup sits relative to its target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Placement {
    /// Centered over the target.
    Center,
    /// Above the target, left-aligned.
    #[default]
    TopLeft,
    /// Above the target, centered.
    TopCenter,
    /// Above the target, right-aligned.
    TopRight,
    /// Left of the target, top-aligned.
    LeftTop,
    /// Left of the target, centered.
    LeftCenter,
    /// Left of the target, bottom-aligned.
    LeftBottom,
    /// Below the target, left-aligned.
    BottomLeft,
    /// Below the target, centered.
    BottomCenter,
    /// Below the target, right-aligned.
    BottomRight,
    /// Right of the target, top-aligned.
    RightTop,
    /// Right of the target, centered.
    RightCenter,
    /// Right of the target, bottom-aligned.
    RightBottom,
}

/// The axis along which the popup is pushed away from its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Left/right of the target (also used for `Center`).
    Horizontal,
    /// Above/below the target.
    Vertical,
}

impl Placement {
    /// Every placement, in declaration order.
    pub const ALL: [Placement; 13] = [
        Self::Center,
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::LeftTop,
        Self::LeftCenter,
        Self::LeftBottom,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
        Self::RightTop,
        Self::RightCenter,
        Self::RightBottom,
    ];

    /// The mirrored placement on the opposite side of the target.
    ///
    /// `Center` has no opposite side and maps to itself.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Center => Self::Center,
            Self::TopLeft => Self::BottomLeft,
            Self::TopCenter => Self::BottomCenter,
            Self::TopRight => Self::BottomRight,
            Self::BottomLeft => Self::TopLeft,
            Self::BottomCenter => Self::TopCenter,
            Self::BottomRight => Self::TopRight,
            Self::LeftTop => Self::RightTop,
            Self::LeftCenter => Self::RightCenter,
            Self::LeftBottom => Self::RightBottom,
            Self::RightTop => Self::LeftTop,
            Self::RightCenter => Self::LeftCenter,
            Self::RightBottom => Self::LeftBottom,
        }
    }

    /// Primary axis of the placement.
    #[must_use]
    pub const fn axis(self) -> Axis {
        match self {
            Self::TopLeft
            | Self::TopCenter
            | Self::TopRight
            | Self::BottomLeft
            | Self::BottomCenter
            | Self::BottomRight => Axis::Vertical,
            _ => Axis::Horizontal,
        }
    }

    fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopCenter | Self::TopRight)
    }

    fn is_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomCenter | Self::BottomRight)
    }

    fn is_left(self) -> bool {
        matches!(self, Self::LeftTop | Self::LeftCenter | Self::LeftBottom)
    }

    fn is_right(self) -> bool {
        matches!(self, Self::RightTop | Self::RightCenter | Self::RightBottom)
    }

    /// Placements to try, in order, when positioning a popup.
    ///
    /// The desired placement comes first, then its mirror. `Center` falls
    /// back to the four centered side placements.
    #[must_use]
    pub fn fallbacks(self) -> Vec<Placement> {
        match self {
            Self::Center => vec![
                Self::Center,
                Self::LeftCenter,
                Self::TopCenter,
                Self::RightCenter,
                Self::BottomCenter,
            ],
            other => vec![other, other.flip()],
        }
    }
}

/// A computed popup position relative to the target's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementOffset {
    /// Placement this offset was computed for.
    pub placement: Placement,
    /// Offset of the popup's top-left corner from the target's top-left corner.
    pub offset: Point,
    /// Axis the presenter should flip along when the popup does not fit.
    pub primary_axis: Axis,
}

/// Vertical offset for side placements aligned to the target's top edge.
fn side_top(target: Size) -> f64 {
    if target.height < 2.0 * ARROW_MARGIN {
        -ARROW_MARGIN + target.height / 2.0
    } else {
        0.0
    }
}

/// Vertical offset for side placements aligned to the target's bottom edge.
fn side_bottom(popup: Size, target: Size) -> f64 {
    if target.height < 2.0 * ARROW_MARGIN {
        target.height - (popup.height - ARROW_MARGIN + target.height / 2.0)
    } else {
        target.height - popup.height
    }
}

/// Offset of the popup for a single placement.
#[must_use]
pub fn popup_offset(popup: Size, target: Size, placement: Placement) -> PlacementOffset {
    let centered_x = (target.width - popup.width) / 2.0;
    let centered_y = (target.height - popup.height) / 2.0;
    let right_aligned_x = target.width - popup.width;

    let offset = match placement {
        Placement::BottomCenter => Point::new(centered_x, target.height),
        Placement::BottomLeft => Point::new(0.0, target.height),
        Placement::BottomRight => Point::new(right_aligned_x, target.height),

        Placement::TopCenter => Point::new(centered_x, -popup.height),
        Placement::TopLeft => Point::new(0.0, -popup.height),
        Placement::TopRight => Point::new(right_aligned_x, -popup.height),

        Placement::LeftTop => Point::new(-popup.width, side_top(target)),
        Placement::LeftCenter => Point::new(-popup.width, centered_y),
        Placement::LeftBottom => Point::new(-popup.width, side_bottom(popup, target)),

        Placement::RightTop => Point::new(target.width, side_top(target)),
        Placement::RightCenter => Point::new(target.width, centered_y),
        Placement::RightBottom => Point::new(target.width, side_bottom(popup, target)),

        Placement::Center => Point::new(centered_x, centered_y),
    };

    PlacementOffset {
        placement,
        offset,
        primary_axis: placement.axis(),
    }
}

/// Ordered offsets for the desired placement and its fallbacks.
#[must_use]
pub fn candidates(popup: Size, target: Size, desired: Placement) -> Vec<PlacementOffset> {
    desired
        .fallbacks()
        .into_iter()
        .map(|placement| popup_offset(popup, target, placement))
        .collect()
}

/// Pick the first candidate whose popup rectangle lies inside `viewport`.
///
/// If none fits, the candidate with the largest visible area wins; ties go
/// to the earlier candidate so the desired placement is preferred.
#[must_use]
pub fn choose(target: Rect, popup: Size, viewport: Rect, desired: Placement) -> PlacementOffset {
    let all = candidates(popup, target.size(), desired);
    let popup_rect =
        |c: &PlacementOffset| Rect::from_origin(target.origin().offset(c.offset), popup);

    if let Some(fit) = all.iter().find(|c| viewport.contains_rect(&popup_rect(c))) {
        return *fit;
    }

    let mut best = all[0];
    let mut best_area = viewport.overlap_area(&popup_rect(&best));
    for candidate in &all[1..] {
        let area = viewport.overlap_area(&popup_rect(candidate));
        if area > best_area {
            best = *candidate;
            best_area = area;
        }
    }
    best
}

/// Detect the placement a presenter actually ended up using.
///
/// `target_origin` is the target's top-left corner and `popup_origin` the
/// popup's top-left corner, both in screen coordinates. A popup requested
/// below its target that ended up above it reports the mirrored placement,
/// and likewise for the other sides. `Center` never flips.
#[must_use]
pub fn actual_placement(desired: Placement, target_origin: Point, popup_origin: Point) -> Placement {
    let dx = target_origin.x - popup_origin.x;
    let dy = popup_origin.y - target_origin.y;

    let flipped = (desired.is_bottom() && dy < 0.0)
        || (desired.is_top() && dy > 0.0)
        || (desired.is_left() && dx < 0.0)
        || (desired.is_right() && dx > 0.0);

    if flipped { desired.flip() } else { desired }
}
