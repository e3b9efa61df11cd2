//! Editor session: the single owner of document, transform, selection and
//! background state.
//!
//! DESIGN
//! ======
//! Everything here runs on one control task. Gesture events go through the
//! pure [`router::route`] and the resulting [`Command`] is applied in one
//! step, so no caller ever sees a half-applied mutation. Background fetches
//! run elsewhere; their completions re-enter through [`EditorSession::pump`]
//! (or `drain_completions`) and are checked against the current fetch before
//! anything is touched.
//!
//! ERROR HANDLING
//! ==============
//! Mutations never fail outward. `NotFound`, `InvalidGeometry` and
//! `IdsExhausted` are logged and leave state untouched; fetch failures land in [`FetchStatus`].
//!
//! NOTIFICATION
//! ============
//! Each applied mutation bumps a revision on a `watch` channel. Hosts either
//! await changes on a receiver from [`EditorSession::subscribe`] or poll
//! [`EditorSession::revision`].

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::camera::{Point, Size};
use crate::config::{DEFAULT_EMOJI_SIZE, EditorConfig};
use crate::doc::{Document, Item, ItemId, round_half_even};
use crate::error::{EditorError, StoreError};
use crate::fetch::{BackgroundAsset, BackgroundLoader, DecodedImage, FetchCompletion, FetchStatus, Transport};
use crate::image_url::image_url;
use crate::input::{GestureEvent, InputState, ZoomBranch};
use crate::router::{self, Command, RouteContext};
use crate::selection::Selection;
use crate::store::{DocumentId, DocumentSnapshot, DocumentStore};
use crate::transform::TransformEngine;

/// Opaque handle identifying one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    /// Include steady pan/zoom in snapshots and restore it on open.
    pub persist_view: bool,
    /// On-screen size of newly dropped glyphs.
    pub default_emoji_size: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { persist_view: false, default_emoji_size: DEFAULT_EMOJI_SIZE }
    }
}

impl From<&EditorConfig> for SessionOptions {
    fn from(config: &EditorConfig) -> Self {
        Self { persist_view: config.persist_view, default_emoji_size: config.default_emoji_size }
    }
}

fn absorb<T>(op: &'static str, result: Result<T, EditorError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(op, code = e.error_code(), error = %e, "mutation ignored");
            None
        }
    }
}

pub struct EditorSession {
    id: SessionId,
    document_id: DocumentId,
    options: SessionOptions,
    document: Document,
    transform: TransformEngine,
    selection: Selection,
    input: InputState,
    canvas: Size,
    asset: BackgroundAsset,
    status: FetchStatus,
    loader: BackgroundLoader,
    revision: watch::Sender<u64>,
}

impl EditorSession {
    /// Start a session on an empty document.
    #[must_use]
    pub fn new(document_id: DocumentId, transport: Arc<dyn Transport>, options: SessionOptions) -> Self {
        Self::from_snapshot(document_id, None, transport, options)
    }

    /// Start a session from a stored snapshot (or none). If the document has a
    /// background URL its fetch starts immediately.
    #[must_use]
    pub fn from_snapshot(
        document_id: DocumentId,
        snapshot: Option<DocumentSnapshot>,
        transport: Arc<dyn Transport>,
        options: SessionOptions,
    ) -> Self {
        let (document, transform) = match &snapshot {
            Some(snapshot) => {
                let view = snapshot.view.filter(|_| options.persist_view);
                (snapshot.to_document(), view.map_or_else(TransformEngine::new, TransformEngine::with_steady))
            }
            None => (Document::new(), TransformEngine::new()),
        };
        let (revision, _) = watch::channel(0);
        let mut session = Self {
            id: SessionId::new(),
            document_id,
            options,
            document,
            transform,
            selection: Selection::new(),
            input: InputState::Idle,
            canvas: Size::default(),
            asset: BackgroundAsset::empty(),
            status: FetchStatus::Idle,
            loader: BackgroundLoader::new(transport),
            revision,
        };
        info!(
            session = %session.id,
            document = %document_id,
            items = session.document.len(),
            "editor session opened"
        );
        if let Some(url) = session.document.background_url().cloned() {
            session.start_fetch(url);
        }
        session
    }

    /// Load `document_id` from `store` and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored snapshot exists but cannot be read.
    pub fn open(
        document_id: DocumentId,
        store: &dyn DocumentStore,
        transport: Arc<dyn Transport>,
        options: SessionOptions,
    ) -> Result<Self, StoreError> {
        let snapshot = store.load(document_id)?;
        Ok(Self::from_snapshot(document_id, snapshot, transport, options))
    }

    // --- Identity / persistence ---

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        let view = self.options.persist_view.then(|| self.transform.steady());
        DocumentSnapshot::capture(&self.document, view)
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot write the snapshot.
    pub fn save(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        store.save(self.document_id, &self.snapshot())
    }

    // --- Notification ---

    /// Receiver that observes the revision counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    // --- Queries ---

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn transform(&self) -> &TransformEngine {
        &self.transform
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn input_state(&self) -> InputState {
        self.input
    }

    #[must_use]
    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    #[must_use]
    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(id)
    }

    #[must_use]
    pub fn screen_position(&self, item: &Item, canvas: Size) -> Point {
        self.transform.screen_position(item, self.is_selected(item.id), canvas)
    }

    #[must_use]
    pub fn screen_to_document(&self, point: Point, canvas: Size) -> Point {
        self.transform.screen_to_document(point, canvas)
    }

    #[must_use]
    pub fn render_scale(&self, item: &Item) -> f64 {
        self.transform.render_scale(item, self.is_selected(item.id))
    }

    #[must_use]
    pub fn render_opacity(&self, item: &Item) -> f64 {
        self.transform.render_opacity(self.is_selected(item.id))
    }

    #[must_use]
    pub fn background_asset(&self) -> &BackgroundAsset {
        &self.asset
    }

    #[must_use]
    pub fn background_image(&self) -> Option<&DecodedImage> {
        self.asset.image.as_ref()
    }

    #[must_use]
    pub fn fetch_status(&self) -> &FetchStatus {
        &self.status
    }

    /// A background is set, its image is not here, and the latest attempt
    /// has not failed.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.document.background_url().is_some() && self.asset.image.is_none() && !self.status.is_failed()
    }

    // --- View ---

    /// Record the current canvas size. Used to fit newly decoded backgrounds.
    pub fn set_canvas_size(&mut self, canvas: Size) {
        self.canvas = canvas;
        self.notify();
    }

    /// Zoom so the current background fills `canvas`. No-op without an image
    /// or with degenerate sizes.
    pub fn fit_to_canvas(&mut self, canvas: Size) {
        if canvas.is_positive() {
            self.canvas = canvas;
        }
        if self.fit_background() {
            self.notify();
        }
    }

    fn fit_background(&mut self) -> bool {
        let Some(image) = &self.asset.image else {
            debug!("fit requested without a background image");
            return false;
        };
        if !self.canvas.is_positive() {
            debug!("no canvas size recorded; fit skipped");
            return false;
        }
        match absorb("fit_to_canvas", self.transform.fit_to_canvas(image.size(), self.canvas)) {
            Some(zoom) => {
                debug!(zoom, "background fitted to canvas");
                true
            }
            None => false,
        }
    }

    // --- Document mutations ---

    /// Returns the new id, or `None` once the document has run out of ids.
    pub fn add_item(&mut self, content: impl Into<String>, x: i64, y: i64, size: i64) -> Option<ItemId> {
        let id = absorb("add_item", self.document.add_item(content, x, y, size))?;
        debug!(%id, x, y, size, "item added");
        self.notify();
        Some(id)
    }

    /// Returns whether the item existed.
    pub fn move_item(&mut self, id: ItemId, dx: f64, dy: f64) -> bool {
        let moved = absorb("move_item", self.document.move_item(id, dx, dy)).is_some();
        if moved {
            self.notify();
        }
        moved
    }

    /// Returns whether the item existed and the factor was valid.
    pub fn scale_item(&mut self, id: ItemId, factor: f64) -> bool {
        let scaled = absorb("scale_item", self.document.scale_item(id, factor)).is_some();
        if scaled {
            self.notify();
        }
        scaled
    }

    /// Returns whether the item existed. Removal also deselects it.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let removed = absorb("remove_item", self.document.remove_item(id)).is_some();
        if removed {
            self.selection.remove(id);
            debug!(%id, "item removed");
            self.notify();
        }
        removed
    }

    /// Replace the background URL and (re)start the fetch, even when the URL
    /// is unchanged. `None` cancels any fetch and clears the image.
    pub fn set_background_url(&mut self, url: Option<Url>) {
        let url = url.map(|u| image_url(&u));
        self.document.set_background_url(url.clone());
        match url {
            Some(url) => self.start_fetch(url),
            None => {
                self.loader.cancel();
                self.asset = BackgroundAsset::empty();
                self.status = FetchStatus::Idle;
                info!("background cleared");
            }
        }
        self.notify();
    }

    /// Set the background from a pasted URL unless it is already the current
    /// one. Returns whether anything changed.
    pub fn paste_background(&mut self, url: Url) -> bool {
        if self.document.background_url() == Some(&image_url(&url)) {
            debug!(%url, "pasted background matches current");
            return false;
        }
        self.set_background_url(Some(url));
        true
    }

    fn start_fetch(&mut self, url: Url) {
        self.asset = BackgroundAsset::pending(url.clone());
        self.loader.start(url.clone());
        self.status = FetchStatus::Fetching { url };
    }

    // --- Gestures ---

    /// Route a gesture event and apply the resulting command. Returns the
    /// command that was applied.
    pub fn handle(&mut self, event: &GestureEvent) -> Command {
        let ctx = RouteContext {
            selection: &self.selection,
            input: self.input,
            transform: &self.transform,
            default_item_size: self.options.default_emoji_size,
        };
        let command = router::route(event, &ctx);
        self.apply(&command);
        command
    }

    /// Apply one command atomically.
    pub fn apply(&mut self, command: &Command) {
        match command {
            Command::None => return,
            Command::ToggleSelection(id) => {
                if !self.document.contains(*id) {
                    let error = EditorError::NotFound { id: *id };
                    warn!(op = "toggle_selection", code = error.error_code(), error = %error, "mutation ignored");
                    return;
                }
                self.selection.toggle(*id);
            }
            Command::ClearSelection => self.selection.clear(),
            Command::RemoveItem(id) => {
                self.remove_item(*id);
                return;
            }
            Command::FitToCanvas { canvas } => {
                self.fit_to_canvas(*canvas);
                return;
            }
            Command::PreviewPan(delta) => self.transform.set_live_pan(*delta),
            Command::CommitPan(delta) => self.transform.commit_pan(*delta),
            Command::PreviewMove(delta) => self.transform.set_live_item_pan(*delta),
            Command::MoveItems { ids, delta } => {
                for id in ids {
                    absorb("move_item", self.document.move_item(*id, delta.dx, delta.dy));
                }
                self.transform.end_item_pan();
            }
            Command::PreviewZoom { branch, factor } => {
                self.input = InputState::Pinching { branch: *branch };
                let result = match branch {
                    ZoomBranch::Document => self.transform.set_live_doc_zoom(*factor),
                    ZoomBranch::Selection => self.transform.set_live_selection_zoom(*factor),
                };
                absorb("preview_zoom", result);
            }
            Command::CommitDocumentZoom(factor) => {
                self.input = InputState::Idle;
                if let Some(zoom) = absorb("commit_zoom", self.transform.commit_doc_zoom(*factor)) {
                    debug!(zoom, "document zoom committed");
                }
            }
            Command::ScaleItems { ids, factor } => {
                self.input = InputState::Idle;
                for id in ids {
                    absorb("scale_item", self.document.scale_item(*id, *factor));
                }
                self.transform.end_selection_zoom();
            }
            Command::AddItem { content, at, size } => {
                self.add_item(content.clone(), round_half_even(at.x), round_half_even(at.y), round_half_even(*size));
                return;
            }
            Command::SetBackground(url) => {
                self.set_background_url(url.clone());
                return;
            }
            Command::CancelGestures => {
                self.input = InputState::Idle;
                self.transform.reset_gestures();
            }
        }
        self.notify();
    }

    // --- Background completions ---

    /// Apply a fetch completion if it belongs to the current background.
    /// Returns whether it was accepted.
    pub fn apply_completion(&mut self, completion: FetchCompletion) -> bool {
        let current = self.document.background_url() == Some(&completion.url);
        if !(current && self.loader.accept(&completion)) {
            debug!(url = %completion.url, generation = completion.generation, "stale background completion discarded");
            return false;
        }

        let url = completion.url;
        match completion.outcome {
            Ok(image) => {
                info!(%url, width = image.width(), height = image.height(), "background loaded");
                self.asset = BackgroundAsset::loaded(url.clone(), image);
                self.status = FetchStatus::Succeeded { url };
                self.fit_background();
            }
            Err(error) => {
                warn!(%url, code = error.error_code(), error = %error, "background fetch failed");
                self.asset = BackgroundAsset::pending(url.clone());
                self.status = FetchStatus::Failed { url, error };
            }
        }
        self.notify();
        true
    }

    /// Wait for the next completion and apply it. Returns whether it was
    /// accepted.
    pub async fn pump(&mut self) -> bool {
        match self.loader.recv().await {
            Some(completion) => self.apply_completion(completion),
            None => false,
        }
    }

    /// Apply every completion that has already arrived. Returns how many were
    /// accepted.
    pub fn drain_completions(&mut self) -> usize {
        let mut accepted = 0;
        while let Some(completion) = self.loader.try_recv() {
            if self.apply_completion(completion) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Wait until no fetch is in flight.
    pub async fn wait_for_background(&mut self) {
        while self.loader.is_fetching() {
            self.pump().await;
        }
    }
}
