//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};
use reqwest::Url;
use tokio::sync::oneshot;

use crate::error::EditorError;
use crate::fetch::Transport;

pub type ScriptedResponse = Result<Vec<u8>, EditorError>;

/// Transport whose responses are handed in by the test. A fetch for a URL
/// with no scripted response fails immediately.
#[derive(Default)]
pub struct ScriptedTransport {
    pending: Mutex<HashMap<Url, oneshot::Receiver<ScriptedResponse>>>,
    calls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Park the next fetch of `url` until the returned sender fires.
    pub fn respond_later(&self, url: &Url) -> oneshot::Sender<ScriptedResponse> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).insert(url.clone(), rx);
        tx
    }

    /// Answer the next fetch of `url` straight away.
    pub fn respond_now(&self, url: &Url, response: ScriptedResponse) {
        let tx = self.respond_later(url);
        assert!(tx.send(response).is_ok(), "receiver is held by the transport");
    }

    pub fn calls(&self) -> Vec<Url> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, EditorError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(url.clone());
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(url);
        let Some(rx) = pending else {
            return Err(EditorError::TransportFailure(format!("no scripted response for {url}")));
        };
        match rx.await {
            Ok(response) => response,
            Err(e) => Err(EditorError::TransportFailure(e.to_string())),
        }
    }
}

/// A blank PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoded = DynamicImage::ImageRgba8(RgbaImage::new(width, height)).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png);
    assert!(encoded.is_ok(), "png encoding failed: {encoded:?}");
    buf
}

pub fn url(raw: &str) -> Url {
    match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => panic!("bad test url {raw}: {e}"),
    }
}

/// Transport whose fetch panics, standing in for a buggy collaborator.
pub struct PanickingTransport;

#[async_trait]
impl Transport for PanickingTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, EditorError> {
        panic!("transport blew up fetching {url}");
    }
}
