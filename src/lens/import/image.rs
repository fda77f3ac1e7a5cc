//! Card image acquisition
//!
//! For each newly imported card the acquirer looks for the image on disk
//! first and only falls back to a network fetch when nothing is cached.
//! Fetches are spaced by an [`IntervalGate`]; cache hits never touch it.
//! Every failure degrades to [`ImageOutcome::Unavailable`].

use crate::database::{checked_component, ImageCache};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Default spacing between downloads (10 per second)
pub const DEFAULT_DOWNLOAD_INTERVAL: Duration = Duration::from_millis(100);

/// Default timeout for one image fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can fetch image bytes by URL
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP image source backed by a `ureq` agent
///
/// Non-success statuses are errors. No retries.
pub struct HttpImageSource {
    agent: ureq::Agent,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpImageSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| anyhow!("Failed to fetch {}: {}", url, e))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| anyhow!("Failed to read body of {}: {}", url, e))
    }
}

/// Waits a fixed interval before every acquisition after the first
///
/// The wait does not count time spent since the previous acquisition, so a
/// slow download is still followed by the full pause. The gate is shared
/// through `&self`, so one gate can pace several callers.
#[derive(Debug)]
pub struct IntervalGate {
    interval: Duration,
    primed: Mutex<bool>,
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            primed: Mutex::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next acquisition is allowed, returning the time waited
    pub fn acquire(&self) -> Duration {
        let mut primed = self.primed.lock().unwrap_or_else(|e| e.into_inner());
        if !*primed {
            *primed = true;
            return Duration::ZERO;
        }
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.interval
    }
}

/// What happened when looking for a card's image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOutcome {
    /// The image was already on disk; nothing was fetched
    Cached(PathBuf),
    /// The image was fetched and written to disk
    Downloaded(PathBuf),
    /// No image is available for this card
    Unavailable { reason: String },
}

impl ImageOutcome {
    /// Local path of the image, if there is one
    pub fn image_path(&self) -> Option<&Path> {
        match self {
            ImageOutcome::Cached(path) | ImageOutcome::Downloaded(path) => Some(path),
            ImageOutcome::Unavailable { .. } => None,
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        ImageOutcome::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Remote location of the image of `(set, card_number)`
pub fn image_url(base_url: &str, set: &str, card_number: &str) -> Result<String> {
    let set = checked_component("set", set)?;
    let card_number = checked_component("card number", card_number)?;
    Ok(format!(
        "{}/{}/{}.png",
        base_url.trim_end_matches('/'),
        set,
        card_number
    ))
}

/// Finds or fetches card images for one import
pub struct ImageAcquirer<'a> {
    cache: &'a ImageCache,
    remote: Option<(&'a str, Arc<dyn ImageSource>)>,
    gate: IntervalGate,
}

impl<'a> ImageAcquirer<'a> {
    /// Create an acquirer; without a remote only cached images are found
    pub fn new(
        cache: &'a ImageCache,
        remote: Option<(&'a str, Arc<dyn ImageSource>)>,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            remote,
            gate: IntervalGate::new(interval),
        }
    }

    pub fn acquire(&self, set: &str, card_number: &str) -> ImageOutcome {
        let path = match self.cache.path_for(set, card_number) {
            Ok(path) => path,
            Err(e) => return ImageOutcome::unavailable(e.to_string()),
        };

        if self.cache.contains(&path) {
            debug!("Image cache hit at {:?}", path);
            return ImageOutcome::Cached(path);
        }

        let Some((base_url, source)) = &self.remote else {
            return ImageOutcome::unavailable("no image source configured");
        };

        let url = match image_url(base_url, set, card_number) {
            Ok(url) => url,
            Err(e) => return ImageOutcome::unavailable(e.to_string()),
        };

        self.gate.acquire();
        let bytes = match source.fetch(&url) {
            Ok(bytes) if bytes.is_empty() => {
                warn!("Image download from {} returned no data", url);
                return ImageOutcome::unavailable(format!("empty response from {}", url));
            }
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Image download failed: {}", e);
                return ImageOutcome::unavailable(e.to_string());
            }
        };

        match self.cache.store(&path, &bytes) {
            Ok(()) => ImageOutcome::Downloaded(path),
            Err(e) => {
                warn!("Could not save downloaded image: {}", e);
                ImageOutcome::unavailable(e.to_string())
            }
        }
    }
}
