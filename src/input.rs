//! Input model: resolved gesture events and the active-gesture state machine.
//!
//! Gesture recognition itself happens in the host. By the time an event
//! reaches the core it carries a resolved value: a tap target, a cumulative
//! drag translation in screen pixels, or a cumulative pinch factor. `InputState`
//! remembers which branch an in-flight pinch was routed to so that a selection
//! change mid-gesture cannot reroute it.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use reqwest::Url;

use crate::camera::{Offset, Point, Size};
use crate::doc::ItemId;

/// What a tap landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapTarget {
    /// A placed item.
    Item(ItemId),
    /// Empty canvas or background image.
    Background,
}

/// Which recognizer produced a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureScope {
    /// Drag on the canvas background; pans the whole canvas.
    Canvas,
    /// Drag starting on a selected item; moves the selection.
    Selection,
}

/// Something dropped onto the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum DropPayload {
    /// Glyph text, e.g. dragged from the palette.
    Text(String),
    /// An image URL to use as background.
    Url(Url),
}

/// A resolved gesture event from the host.
///
/// Drag translations and pinch factors are cumulative from the start of the
/// gesture, not per-frame increments.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    Tap(TapTarget),
    LongPress(ItemId),
    /// Double-tap on the background; the canvas size is the current view.
    DoubleTap { canvas: Size },
    DragUpdate { scope: GestureScope, translation: Offset },
    DragEnd { scope: GestureScope, translation: Offset },
    PinchUpdate { factor: f64 },
    PinchEnd { factor: f64 },
    /// Drop at a screen location on a canvas of the given size.
    Drop { payload: DropPayload, location: Point, canvas: Size },
    /// The host abandoned all in-flight gestures.
    Cancel,
}

/// Target of a pinch gesture, fixed when the pinch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomBranch {
    /// Nothing selected: the pinch zooms the document.
    Document,
    /// Something selected: the pinch resizes the selected items.
    Selection,
}

/// Active-gesture tracking between update and end events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A pinch is in progress, routed to `branch`.
    Pinching { branch: ZoomBranch },
}

impl InputState {
    /// Branch of the in-flight pinch, if any.
    #[must_use]
    pub fn zoom_branch(self) -> Option<ZoomBranch> {
        match self {
            Self::Idle => None,
            Self::Pinching { branch } => Some(branch),
        }
    }
}
