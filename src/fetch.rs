//! Background fetch pipeline: retrieve, decode, and deliver the background image.
//!
//! DESIGN
//! ======
//! Each call to [`BackgroundLoader::start`] bumps a generation counter and
//! spawns one tokio task that fetches the bytes through the [`Transport`]
//! collaborator and decodes them on the blocking pool. A second task joins it
//! and sends a [`FetchCompletion`] over an mpsc channel, so a fetch that panics
//! still reports a failure. Neither task touches session state; the session
//! applies completions on its own control task.
//!
//! CANCELLATION
//! ============
//! Starting a new fetch aborts the previous task (best effort) and forgets its
//! generation. A completion is accepted only if its generation and URL match
//! the fetch currently in flight, so a late result from a superseded URL is
//! always discarded even if it was sent before the abort landed.

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::camera::Size;
use crate::config::FetchTimeouts;
use crate::error::{ConfigError, EditorError};

// =============================================================================
// DECODED IMAGE
// =============================================================================

/// A decoded background bitmap. Cheap to clone.
#[derive(Clone)]
pub struct DecodedImage {
    image: Arc<DynamicImage>,
}

impl DecodedImage {
    /// Decode PNG or JPEG bytes.
    ///
    /// # Errors
    ///
    /// `DecodeFailure` if the bytes are not a supported image.
    pub fn decode(bytes: &[u8]) -> Result<Self, EditorError> {
        let image = image::load_from_memory(bytes).map_err(|e| EditorError::DecodeFailure(e.to_string()))?;
        Ok(Self { image: Arc::new(image) })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel dimensions as a [`Size`], for fit-to-canvas.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

// =============================================================================
// ASSET + STATUS
// =============================================================================

/// The background as the render layer sees it. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default)]
pub struct BackgroundAsset {
    pub source_url: Option<Url>,
    pub image: Option<DecodedImage>,
}

impl BackgroundAsset {
    /// No background at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A URL whose image has not arrived (yet).
    #[must_use]
    pub fn pending(url: Url) -> Self {
        Self { source_url: Some(url), image: None }
    }

    #[must_use]
    pub fn loaded(url: Url, image: DecodedImage) -> Self {
        Self { source_url: Some(url), image: Some(image) }
    }
}

/// Where the pipeline is. `Succeeded` and `Failed` are resting states that
/// record the outcome of the most recent attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching { url: Url },
    Succeeded { url: Url },
    Failed { url: Url, error: EditorError },
}

impl FetchStatus {
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Retrieves raw bytes for a URL. Timeouts are the transport's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// `TransportFailure` for any network, status or I/O problem.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, EditorError>;
}

/// HTTP(S) transport backed by `reqwest`, with `file://` read from disk.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeouts: FetchTimeouts) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, EditorError> {
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|()| EditorError::TransportFailure(format!("not a local path: {url}")))?;
            return tokio::fs::read(&path)
                .await
                .map_err(|e| EditorError::TransportFailure(e.to_string()));
        }

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| EditorError::TransportFailure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EditorError::TransportFailure(format!("status {}", status.as_u16())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| EditorError::TransportFailure(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// =============================================================================
// LOADER
// =============================================================================

/// Result of one fetch attempt, delivered to the control task.
#[derive(Debug, Clone)]
pub struct FetchCompletion {
    pub generation: u64,
    pub url: Url,
    pub outcome: Result<DecodedImage, EditorError>,
}

struct InFlight {
    generation: u64,
    url: Url,
    handle: Option<AbortHandle>,
}

/// Owns the single in-flight fetch and the completion channel.
pub struct BackgroundLoader {
    transport: Arc<dyn Transport>,
    tx: mpsc::UnboundedSender<FetchCompletion>,
    rx: mpsc::UnboundedReceiver<FetchCompletion>,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl BackgroundLoader {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { transport, tx, rx, generation: 0, in_flight: None }
    }

    /// Cancel whatever is in flight and start fetching `url`. Returns the new
    /// generation.
    ///
    /// Without a tokio runtime the attempt fails immediately (delivered as a
    /// `TransportFailure` completion) instead of panicking.
    pub fn start(&mut self, url: Url) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let handle = match Handle::try_current() {
            Ok(runtime) => {
                let transport = Arc::clone(&self.transport);
                let fetch_url = url.clone();
                let fetch = runtime.spawn(async move { fetch_and_decode(transport.as_ref(), &fetch_url).await });
                let abort = fetch.abort_handle();

                // The watcher reports every outcome, including a fetch that panicked.
                let tx = self.tx.clone();
                let task_url = url.clone();
                runtime.spawn(async move {
                    let outcome = match fetch.await {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_cancelled() => {
                            debug!(generation, "background fetch aborted");
                            return;
                        }
                        Err(e) => {
                            warn!(generation, error = %e, "background fetch task panicked");
                            Err(EditorError::TransportFailure(e.to_string()))
                        }
                    };
                    if tx.send(FetchCompletion { generation, url: task_url, outcome }).is_err() {
                        debug!(generation, "loader dropped; background completion discarded");
                    }
                });
                Some(abort)
            }
            Err(e) => {
                warn!(error = %e, %url, "no async runtime; background fetch failed");
                let outcome = Err(EditorError::TransportFailure(e.to_string()));
                if self.tx.send(FetchCompletion { generation, url: url.clone(), outcome }).is_err() {
                    debug!(generation, "completion channel closed");
                }
                None
            }
        };

        info!(%url, generation, "background fetch started");
        self.in_flight = Some(InFlight { generation, url, handle });
        generation
    }

    /// Abort the in-flight fetch, if any. Returns whether one was cancelled.
    pub fn cancel(&mut self) -> bool {
        let Some(flight) = self.in_flight.take() else {
            return false;
        };
        if let Some(handle) = flight.handle {
            handle.abort();
        }
        info!(url = %flight.url, generation = flight.generation, "background fetch cancelled");
        true
    }

    /// Whether `completion` belongs to the fetch currently in flight. Accepting
    /// it clears the in-flight slot.
    pub fn accept(&mut self, completion: &FetchCompletion) -> bool {
        match &self.in_flight {
            Some(flight) if flight.generation == completion.generation && flight.url == completion.url => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Generation of the most recently started fetch (0 before the first).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the next completion, current or stale.
    pub async fn recv(&mut self) -> Option<FetchCompletion> {
        self.rx.recv().await
    }

    /// Next completion if one is already waiting.
    pub fn try_recv(&mut self) -> Option<FetchCompletion> {
        match self.rx.try_recv() {
            Ok(completion) => Some(completion),
            Err(_) => None,
        }
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            if let Some(handle) = flight.handle {
                handle.abort();
            }
        }
    }
}

async fn fetch_and_decode(transport: &dyn Transport, url: &Url) -> Result<DecodedImage, EditorError> {
    let bytes = transport.fetch(url).await?;
    debug!(%url, len = bytes.len(), "background bytes received");
    tokio::task::spawn_blocking(move || DecodedImage::decode(&bytes))
        .await
        .map_err(|e| EditorError::DecodeFailure(e.to_string()))?
}
