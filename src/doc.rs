//! Document model: placed glyphs, the background reference, and id allocation.
//!
//! The `Document` is pure data. It holds no transform or selection state and
//! knows nothing about fetching; the session layers those on top. Every
//! id-based mutation reports `EditorError::NotFound` and leaves the document
//! untouched when the id is absent.
//!
//! Item coordinates and sizes are integers. Real-valued gesture deltas and
//! scale factors are rounded exactly once, half-to-even, when they are applied.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashSet;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::camera::Point;
use crate::error::EditorError;

/// Identifier of a placed item. Stable for the lifetime of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A placed glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within the document.
    pub id: ItemId,
    /// The glyph text, usually a single emoji.
    pub content: String,
    /// Horizontal offset from the canvas center, in document units.
    pub x: i64,
    /// Vertical offset from the canvas center, in document units.
    pub y: i64,
    /// Nominal font/box size in document units.
    pub size: i64,
}

impl Item {
    /// Document-space location as a point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn location(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Nominal size as a float, for render math.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn font_size(&self) -> f64 {
        self.size as f64
    }
}

/// Round to the nearest integer, ties to even.
///
/// Non-finite input maps to 0; out-of-range input saturates.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_half_even(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    value.round_ties_even() as i64
}

/// The canonical document: ordered items plus the background reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    items: Vec<Item>,
    background_url: Option<Url>,
    next_id: u64,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a document from persisted parts.
    ///
    /// Items with a duplicate id are dropped (first one wins), as are items
    /// whose id leaves no room for a successor. The id counter is raised past
    /// every id in use so no id is ever handed out twice.
    #[must_use]
    pub fn from_parts(items: Vec<Item>, background_url: Option<Url>, next_id: u64) -> Self {
        let mut seen = HashSet::with_capacity(items.len());
        let mut kept = Vec::with_capacity(items.len());
        let mut floor = 0;
        for item in items {
            let Some(successor) = item.id.0.checked_add(1) else {
                warn!(id = %item.id, "dropping item with exhausted id from snapshot");
                continue;
            };
            if seen.insert(item.id) {
                floor = floor.max(successor);
                kept.push(item);
            } else {
                warn!(id = %item.id, "dropping item with duplicate id from snapshot");
            }
        }
        Self { items: kept, background_url, next_id: next_id.max(floor) }
    }

    // --- Queries ---

    /// Items in z-order (first drawn first, hit-tested last).
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.item(id).is_some()
    }

    #[must_use]
    pub fn background_url(&self) -> Option<&Url> {
        self.background_url.as_ref()
    }

    /// The id the next `add_item` will allocate.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // --- Mutations ---

    /// Append a new item and return its freshly allocated id.
    ///
    /// # Errors
    ///
    /// `IdsExhausted` once the counter has no successor left; the document is
    /// unchanged.
    pub fn add_item(&mut self, content: impl Into<String>, x: i64, y: i64, size: i64) -> Result<ItemId, EditorError> {
        let id = ItemId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(EditorError::IdsExhausted)?;
        self.items.push(Item { id, content: content.into(), x, y, size });
        Ok(id)
    }

    /// Translate an item by a document-space delta, rounded half-to-even.
    ///
    /// # Errors
    ///
    /// `NotFound` if no item has this id.
    pub fn move_item(&mut self, id: ItemId, dx: f64, dy: f64) -> Result<(), EditorError> {
        let item = self.item_mut(id)?;
        item.x = item.x.saturating_add(round_half_even(dx));
        item.y = item.y.saturating_add(round_half_even(dy));
        Ok(())
    }

    /// Multiply an item's size by `factor`, rounded half-to-even. No clamping.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if `factor` is not finite and positive, `NotFound` if
    /// no item has this id.
    pub fn scale_item(&mut self, id: ItemId, factor: f64) -> Result<(), EditorError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(EditorError::InvalidGeometry(format!("scale factor {factor}")));
        }
        let item = self.item_mut(id)?;
        item.size = round_half_even(item.font_size() * factor);
        Ok(())
    }

    /// Remove an item, returning it.
    ///
    /// # Errors
    ///
    /// `NotFound` if no item has this id.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Item, EditorError> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(EditorError::NotFound { id })?;
        Ok(self.items.remove(index))
    }

    /// Replace the background reference. The caller is responsible for
    /// kicking off (or cancelling) the fetch.
    pub fn set_background_url(&mut self, url: Option<Url>) {
        self.background_url = url;
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, EditorError> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(EditorError::NotFound { id })
    }
}
