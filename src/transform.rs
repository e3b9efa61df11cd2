//! Transform engine: steady pan/zoom composed with live gesture deltas.
//!
//! Two kinds of state feed every frame:
//!
//! - [`SteadyTransform`] is the committed pan/zoom. It survives gestures and
//!   may be persisted with the document.
//! - [`GestureState`] holds the uncommitted contribution of whatever gesture is
//!   active. It is the identity when nothing is in flight and is folded into
//!   the steady state (or into item mutations) when a gesture ends.
//!
//! The composition is
//!
//! ```text
//! effective_zoom = steady.zoom * live_doc_zoom
//! effective_pan  = (steady.pan + live_pan) * effective_zoom     // screen px
//! screen(p)      = p * steady.zoom + canvas / 2 + effective_pan
//! ```
//!
//! Item positions scale by the *steady* zoom only; a live document pinch shows
//! up through `render_scale`, which uses the effective zoom.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::camera::{Offset, Point, Size};
use crate::doc::Item;
use crate::error::EditorError;

/// Opacity applied to selected items.
pub const SELECTED_OPACITY: f64 = 0.5;

/// Committed pan/zoom. `pan` is in document units; `zoom > 0` always.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyTransform {
    pub pan: Offset,
    pub zoom: f64,
}

impl Default for SteadyTransform {
    fn default() -> Self {
        Self { pan: Offset::ZERO, zoom: 1.0 }
    }
}

/// Uncommitted contribution of in-flight gestures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    /// Whole-canvas drag, in document units.
    pub live_pan: Offset,
    /// Document pinch factor (empty selection).
    pub live_doc_zoom: f64,
    /// Drag of the selected items, in document units.
    pub live_item_pan: Offset,
    /// Pinch factor applied to selected items only.
    pub live_selection_zoom: f64,
}

impl Default for GestureState {
    fn default() -> Self {
        Self { live_pan: Offset::ZERO, live_doc_zoom: 1.0, live_item_pan: Offset::ZERO, live_selection_zoom: 1.0 }
    }
}

impl GestureState {
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

fn valid_factor(factor: f64) -> Result<f64, EditorError> {
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err(EditorError::InvalidGeometry(format!("zoom factor {factor}")))
    }
}

/// Steady and live transform state for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformEngine {
    steady: SteadyTransform,
    gesture: GestureState,
}

impl TransformEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a persisted steady transform. A non-positive or non-finite
    /// zoom is replaced by 1.
    #[must_use]
    pub fn with_steady(steady: SteadyTransform) -> Self {
        let mut steady = steady;
        if valid_factor(steady.zoom).is_err() {
            warn!(zoom = steady.zoom, "ignoring invalid persisted zoom");
            steady.zoom = 1.0;
        }
        if !steady.pan.dx.is_finite() || !steady.pan.dy.is_finite() {
            warn!(dx = steady.pan.dx, dy = steady.pan.dy, "ignoring invalid persisted pan");
            steady.pan = Offset::ZERO;
        }
        Self { steady, gesture: GestureState::default() }
    }

    #[must_use]
    pub fn steady(&self) -> SteadyTransform {
        self.steady
    }

    #[must_use]
    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    // --- Composition ---

    #[must_use]
    pub fn effective_zoom(&self) -> f64 {
        self.steady.zoom * self.gesture.live_doc_zoom
    }

    /// Pan in screen pixels, pre-scaled by the effective zoom.
    #[must_use]
    pub fn effective_pan(&self) -> Offset {
        (self.steady.pan + self.gesture.live_pan) * self.effective_zoom()
    }

    /// Convert a screen-space translation into document units at the current
    /// effective zoom.
    #[must_use]
    pub fn screen_delta_to_document(&self, translation: Offset) -> Offset {
        translation / self.effective_zoom()
    }

    /// Item location in document space, including the live drag preview for
    /// selected items.
    #[must_use]
    pub fn item_location(&self, item: &Item, selected: bool) -> Point {
        if selected {
            item.location() + self.gesture.live_item_pan
        } else {
            item.location()
        }
    }

    #[must_use]
    pub fn document_to_screen(&self, point: Point, canvas: Size) -> Point {
        point * self.steady.zoom + canvas.half() + self.effective_pan()
    }

    /// Exact inverse of [`Self::document_to_screen`].
    #[must_use]
    pub fn screen_to_document(&self, point: Point, canvas: Size) -> Point {
        (point - canvas.half() - self.effective_pan()) / self.steady.zoom
    }

    #[must_use]
    pub fn screen_position(&self, item: &Item, selected: bool, canvas: Size) -> Point {
        self.document_to_screen(self.item_location(item, selected), canvas)
    }

    #[must_use]
    pub fn render_scale(&self, item: &Item, selected: bool) -> f64 {
        let selection_zoom = if selected { self.gesture.live_selection_zoom } else { 1.0 };
        item.font_size() * self.effective_zoom() * selection_zoom
    }

    #[must_use]
    pub fn render_opacity(&self, selected: bool) -> f64 {
        if selected { SELECTED_OPACITY } else { 1.0 }
    }

    // --- Steady mutations ---

    /// Zoom so the whole image fits the canvas. Returns the new zoom.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if either size has a non-positive dimension; the
    /// zoom is left unchanged.
    pub fn fit_to_canvas(&mut self, image: Size, canvas: Size) -> Result<f64, EditorError> {
        if !image.is_positive() || !canvas.is_positive() {
            return Err(EditorError::InvalidGeometry(format!(
                "fit {}x{} into {}x{}",
                image.width, image.height, canvas.width, canvas.height
            )));
        }
        let zoom = (canvas.width / image.width).min(canvas.height / image.height);
        self.steady.zoom = valid_factor(zoom)?;
        Ok(zoom)
    }

    // --- Canvas pan ---

    /// Live whole-canvas drag, in document units.
    pub fn set_live_pan(&mut self, delta: Offset) {
        self.gesture.live_pan = delta;
    }

    /// Fold a finished canvas drag into the steady pan.
    pub fn commit_pan(&mut self, delta: Offset) {
        self.steady.pan = self.steady.pan + delta;
        self.gesture.live_pan = Offset::ZERO;
    }

    // --- Document zoom ---

    /// # Errors
    ///
    /// `InvalidGeometry` for a non-positive factor; the live factor is kept.
    pub fn set_live_doc_zoom(&mut self, factor: f64) -> Result<(), EditorError> {
        self.gesture.live_doc_zoom = valid_factor(factor)?;
        Ok(())
    }

    /// Fold a finished document pinch into the steady zoom. The live factor
    /// resets to 1 whether or not the factor was valid.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if the factor or resulting zoom is not positive.
    pub fn commit_doc_zoom(&mut self, factor: f64) -> Result<f64, EditorError> {
        self.gesture.live_doc_zoom = 1.0;
        let zoom = valid_factor(self.steady.zoom * valid_factor(factor)?)?;
        self.steady.zoom = zoom;
        Ok(zoom)
    }

    // --- Selection gestures ---

    /// Live drag of the selected items, in document units.
    pub fn set_live_item_pan(&mut self, delta: Offset) {
        self.gesture.live_item_pan = delta;
    }

    pub fn end_item_pan(&mut self) {
        self.gesture.live_item_pan = Offset::ZERO;
    }

    /// # Errors
    ///
    /// `InvalidGeometry` for a non-positive factor; the live factor is kept.
    pub fn set_live_selection_zoom(&mut self, factor: f64) -> Result<(), EditorError> {
        self.gesture.live_selection_zoom = valid_factor(factor)?;
        Ok(())
    }

    pub fn end_selection_zoom(&mut self) {
        self.gesture.live_selection_zoom = 1.0;
    }

    /// Drop every uncommitted gesture contribution.
    pub fn reset_gestures(&mut self) {
        self.gesture = GestureState::default();
    }
}
