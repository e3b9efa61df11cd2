//! Selection router: maps a resolved gesture to a single mutation command.
//!
//! [`route`] is a pure function of the event and a read-only view of the
//! session. It never mutates anything; the session applies the returned
//! [`Command`] atomically. This keeps every routing rule testable without a
//! UI harness.
//!
//! Routing rules:
//!
//! - Pinch: the branch is fixed when the pinch starts. With an empty selection
//!   the pinch zooms the document; otherwise it resizes the selected items.
//! - Canvas drag always pans the whole canvas. Selection drag previews and
//!   then moves every selected item by the same delta.
//! - Tap on an item toggles it; tap on the background clears the selection.
//! - Long-press removes an item. Double-tap fits the background to the canvas.
//! - Dropped text becomes a new item under the drop point; a dropped URL
//!   becomes the background.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use reqwest::Url;

use crate::camera::{Offset, Point, Size};
use crate::doc::ItemId;
use crate::input::{DropPayload, GestureEvent, GestureScope, InputState, TapTarget, ZoomBranch};
use crate::selection::Selection;
use crate::transform::TransformEngine;

/// A mutation for the session to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Nothing to do.
    None,
    ToggleSelection(ItemId),
    ClearSelection,
    RemoveItem(ItemId),
    FitToCanvas { canvas: Size },
    /// Live whole-canvas pan, document units.
    PreviewPan(Offset),
    /// Finished whole-canvas pan, document units.
    CommitPan(Offset),
    /// Live drag of the selected items, document units.
    PreviewMove(Offset),
    /// Finished drag: move every listed item by `delta` (document units).
    MoveItems { ids: Vec<ItemId>, delta: Offset },
    /// Live pinch on the given branch.
    PreviewZoom { branch: ZoomBranch, factor: f64 },
    /// Finished document pinch.
    CommitDocumentZoom(f64),
    /// Finished selection pinch: scale every listed item.
    ScaleItems { ids: Vec<ItemId>, factor: f64 },
    /// New item at a document-space point with a real-valued size.
    AddItem { content: String, at: Point, size: f64 },
    SetBackground(Option<Url>),
    /// Discard all live gesture state.
    CancelGestures,
}

/// Read-only view of the session that routing depends on.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    pub selection: &'a Selection,
    pub input: InputState,
    pub transform: &'a TransformEngine,
    /// On-screen size for newly dropped glyphs.
    pub default_item_size: f64,
}

impl RouteContext<'_> {
    /// Branch for a pinch: the in-flight one, or a fresh decision.
    #[must_use]
    pub fn zoom_branch(&self) -> ZoomBranch {
        self.input.zoom_branch().unwrap_or(if self.selection.is_empty() {
            ZoomBranch::Document
        } else {
            ZoomBranch::Selection
        })
    }
}

/// Decide what a gesture event does.
#[must_use]
pub fn route(event: &GestureEvent, ctx: &RouteContext<'_>) -> Command {
    match event {
        GestureEvent::Tap(TapTarget::Item(id)) => Command::ToggleSelection(*id),
        GestureEvent::Tap(TapTarget::Background) => Command::ClearSelection,
        GestureEvent::LongPress(id) => Command::RemoveItem(*id),
        GestureEvent::DoubleTap { canvas } => Command::FitToCanvas { canvas: *canvas },

        GestureEvent::DragUpdate { scope, translation } => {
            let delta = ctx.transform.screen_delta_to_document(*translation);
            match scope {
                GestureScope::Canvas => Command::PreviewPan(delta),
                GestureScope::Selection => Command::PreviewMove(delta),
            }
        }
        GestureEvent::DragEnd { scope, translation } => {
            let delta = ctx.transform.screen_delta_to_document(*translation);
            match scope {
                GestureScope::Canvas => Command::CommitPan(delta),
                GestureScope::Selection => Command::MoveItems { ids: ctx.selection.ids(), delta },
            }
        }

        GestureEvent::PinchUpdate { factor } => Command::PreviewZoom { branch: ctx.zoom_branch(), factor: *factor },
        GestureEvent::PinchEnd { factor } => match ctx.zoom_branch() {
            ZoomBranch::Document => Command::CommitDocumentZoom(*factor),
            ZoomBranch::Selection => Command::ScaleItems { ids: ctx.selection.ids(), factor: *factor },
        },

        GestureEvent::Drop { payload: DropPayload::Url(url), .. } => Command::SetBackground(Some(url.clone())),
        GestureEvent::Drop { payload: DropPayload::Text(text), location, canvas } => {
            if text.is_empty() {
                return Command::None;
            }
            Command::AddItem {
                content: text.clone(),
                at: ctx.transform.screen_to_document(*location, *canvas),
                size: ctx.default_item_size / ctx.transform.effective_zoom(),
            }
        }

        GestureEvent::Cancel => Command::CancelGestures,
    }
}
