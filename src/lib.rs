//! Core of the EmojiArt canvas editor.
//!
//! A document is a background image plus emoji glyphs placed in a
//! center-origin coordinate space. This crate owns everything behind the
//! view: the item store, selection, the pan/zoom transform with its live
//! gesture overlays, routing of resolved gestures to mutations, and the
//! asynchronous background fetch. Hosts feed it [`input::GestureEvent`]s and
//! read back screen positions, scales and the decoded background.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | [`session::EditorSession`], the single owner of editor state |
//! | [`doc`] | Items, ids and the document value type |
//! | [`selection`] | Set of selected item ids |
//! | [`transform`] | Steady pan/zoom, live gesture state and coordinate maps |
//! | [`camera`] | Point, offset and size primitives |
//! | [`input`] | Gesture events and the pinch state machine |
//! | [`router`] | Pure gesture-to-command routing |
//! | [`fetch`] | Background transport, decoding and the generation-checked loader |
//! | [`image_url`] | Background URL normalization |
//! | [`store`] | Snapshots and the document store trait |
//! | [`config`] | Environment-driven configuration |
//! | [`error`] | Error enums |

pub mod camera;
pub mod config;
pub mod doc;
pub mod error;
pub mod fetch;
pub mod image_url;
pub mod input;
pub mod router;
pub mod selection;
pub mod session;
pub mod store;
pub mod transform;

#[cfg(test)]
mod test_helpers;

/// Glyphs offered for dragging onto the canvas.
pub const PALETTE: &str = "⭐️🌨🍎🌏🥨⚾️";
