//! Import lens
//!
//! Brings a collection export into the collection database. Each logical
//! card (keyed by its display name) is inserted at most once: repeats inside
//! one batch keep the first occurrence, and names already stored are never
//! touched. New cards get an image from the disk cache or, failing that, one
//! rate-limited download.
//!
//! # Example
//!
//! ```rust,ignore
//! use cardledger::database::CollectionDatabase;
//! use cardledger::lens::import::{normalize_reader, ImportLens};
//!
//! let db = CollectionDatabase::open_in_dir("~/.cardledger")?;
//! let rows = normalize_reader(std::fs::File::open("collection.csv")?)?;
//! let summary = ImportLens::new(&db, "~/.cardledger/images").import(&rows)?;
//! println!("{} new cards", summary.inserted);
//! ```

mod csv;
mod image;

pub use self::csv::{
    normalize, normalize_reader, strip_bom, ImportRow, EXPECTED_COLUMNS, HEADER_FINGERPRINT,
};
pub use self::image::{
    image_url, HttpImageSource, ImageAcquirer, ImageOutcome, ImageSource, IntervalGate,
    DEFAULT_DOWNLOAD_INTERVAL, DEFAULT_FETCH_TIMEOUT,
};

use crate::database::{CollectionDatabase, ImageCache, InsertOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Metadata key holding the time of the last completed import (RFC 3339)
pub const LAST_IMPORT_META_KEY: &str = "last_import_at";

/// Card types that are not part of the mainboard by default
pub const DEFAULT_NON_MAINBOARD_TYPES: &[&str] = &["Leader", "Base"];

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by the import path
///
/// Image problems never show up here; they only leave the card without an
/// image.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The input is not a usable collection export
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// The export has a valid header but no data rows
    #[error("input has a header but no data rows")]
    EmptyInput,

    /// The collection database failed; cards inserted before the failure remain
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl ImportError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ImportError::MalformedInput {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Mainboard classification
// =============================================================================

/// Decides whether an imported card counts toward the mainboard
pub trait MainboardClassifier: Send + Sync {
    fn is_mainboard(&self, row: &ImportRow) -> bool;
}

/// Classifies by card type: listed types are non-mainboard, everything else is
#[derive(Debug, Clone)]
pub struct CardTypeClassifier {
    non_mainboard_types: Vec<String>,
}

impl CardTypeClassifier {
    pub fn new<I, S>(non_mainboard_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            non_mainboard_types: non_mainboard_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

impl Default for CardTypeClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_NON_MAINBOARD_TYPES)
    }
}

impl MainboardClassifier for CardTypeClassifier {
    fn is_mainboard(&self, row: &ImportRow) -> bool {
        let card_type = row.card_type.trim().to_lowercase();
        !self.non_mainboard_types.contains(&card_type)
    }
}

// =============================================================================
// Progress and results
// =============================================================================

/// What happened to one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Inserted,
    DuplicateInBatch,
    AlreadyInStore,
}

/// Progress information for import operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ImportProgress {
    /// Import has started
    Started { total_rows: usize },
    /// One row has been handled
    Row {
        /// 1-based position of the row in the batch
        index: usize,
        name: String,
        outcome: RowOutcome,
    },
    /// Import has finished (also sent after cancellation)
    Completed {
        summary: ImportSummary,
        duration_secs: f64,
    },
}

/// Type alias for progress callback function
pub type ImportProgressCallback = Arc<dyn Fn(ImportProgress) + Send + Sync>;

/// Counts reported by an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped_duplicate_in_batch: usize,
    pub skipped_already_in_store: usize,
    pub images_cached: usize,
    pub images_downloaded: usize,
    pub images_unavailable: usize,
    /// True if the import stopped early on request
    pub cancelled: bool,
}

impl ImportSummary {
    /// Number of rows handled
    pub fn rows_processed(&self) -> usize {
        self.inserted + self.skipped_duplicate_in_batch + self.skipped_already_in_store
    }

    fn record_image(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::Cached(_) => self.images_cached += 1,
            ImageOutcome::Downloaded(_) => self.images_downloaded += 1,
            ImageOutcome::Unavailable { .. } => self.images_unavailable += 1,
        }
    }
}

/// Per-call import options
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Checked between rows; when set, the import stops and reports what it did
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ImportOptions {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

// =============================================================================
// Lens
// =============================================================================

/// Import lens
pub struct ImportLens<'a> {
    db: &'a CollectionDatabase,
    images: ImageCache,
    image_base_url: Option<String>,
    image_source: Option<Arc<dyn ImageSource>>,
    classifier: Box<dyn MainboardClassifier>,
    download_interval: Duration,
}

impl<'a> ImportLens<'a> {
    /// Create an import lens storing images under `images_dir`
    ///
    /// Without [`with_image_source`](Self::with_image_source) only images
    /// already on disk are used.
    pub fn new(db: &'a CollectionDatabase, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            images: ImageCache::new(images_dir),
            image_base_url: None,
            image_source: None,
            classifier: Box::new(CardTypeClassifier::default()),
            download_interval: DEFAULT_DOWNLOAD_INTERVAL,
        }
    }

    /// Download missing images from `base_url` through `source`
    pub fn with_image_source(
        mut self,
        base_url: impl Into<String>,
        source: Arc<dyn ImageSource>,
    ) -> Self {
        self.image_base_url = Some(base_url.into());
        self.image_source = Some(source);
        self
    }

    pub fn with_classifier(mut self, classifier: impl MainboardClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Minimum spacing between image downloads
    pub fn with_download_interval(mut self, interval: Duration) -> Self {
        self.download_interval = interval;
        self
    }

    /// Normalize an export and import it
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<ImportSummary, ImportError> {
        let rows = normalize(bytes)?;
        self.import(&rows)
    }

    /// Import normalized rows
    pub fn import(&self, rows: &[ImportRow]) -> Result<ImportSummary, ImportError> {
        self.import_with_progress(rows, &ImportOptions::default(), None)
    }

    /// Import normalized rows, reporting progress and honoring cancellation
    pub fn import_with_progress(
        &self,
        rows: &[ImportRow],
        options: &ImportOptions,
        progress_callback: Option<ImportProgressCallback>,
    ) -> Result<ImportSummary, ImportError> {
        if rows.is_empty() {
            return Err(ImportError::EmptyInput);
        }
        if let Some(index) = rows.iter().position(|r| r.card_name.trim().is_empty()) {
            return Err(ImportError::malformed(format!(
                "row {}: card name is blank",
                index + 1
            )));
        }

        info!("Importing {} rows", rows.len());
        if let Some(ref cb) = progress_callback {
            cb(ImportProgress::Started {
                total_rows: rows.len(),
            });
        }

        let start_time = Instant::now();
        let remote = match (&self.image_base_url, &self.image_source) {
            (Some(url), Some(source)) => Some((url.as_str(), source.clone())),
            _ => None,
        };
        let acquirer = ImageAcquirer::new(&self.images, remote, self.download_interval);
        let cards = self.db.cards();

        let mut seen: HashSet<String> = HashSet::new();
        let mut summary = ImportSummary::default();

        for (i, row) in rows.iter().enumerate() {
            if options.is_cancelled() {
                info!("Import cancelled after {} rows", i);
                summary.cancelled = true;
                break;
            }

            let name = row.display_name();
            let outcome = if !seen.insert(name.clone()) {
                debug!("Skipping '{}': repeated in this batch", name);
                summary.skipped_duplicate_in_batch += 1;
                RowOutcome::DuplicateInBatch
            } else if cards.exists_by_name(&name).map_err(ImportError::Store)? {
                debug!("Skipping '{}': already in collection", name);
                summary.skipped_already_in_store += 1;
                RowOutcome::AlreadyInStore
            } else {
                let mainboard = self.classifier.is_mainboard(row);
                let image = acquirer.acquire(&row.set, &row.card_number);
                summary.record_image(&image);
                let image_path = image.image_path().map(|p| p.to_string_lossy().into_owned());

                match cards
                    .insert(&name, image_path.as_deref(), mainboard)
                    .map_err(ImportError::Store)?
                {
                    InsertOutcome::Inserted(id) => {
                        debug!("Inserted '{}' as card {}", name, id);
                        summary.inserted += 1;
                        RowOutcome::Inserted
                    }
                    InsertOutcome::AlreadyExists => {
                        summary.skipped_already_in_store += 1;
                        RowOutcome::AlreadyInStore
                    }
                }
            };

            if let Some(ref cb) = progress_callback {
                cb(ImportProgress::Row {
                    index: i + 1,
                    name,
                    outcome,
                });
            }
        }

        if let Err(e) = self
            .db
            .set_meta(LAST_IMPORT_META_KEY, &chrono::Utc::now().to_rfc3339())
        {
            warn!("Failed to record import time: {}", e);
        }

        info!(
            "Import finished: {} inserted, {} repeated in batch, {} already stored",
            summary.inserted, summary.skipped_duplicate_in_batch, summary.skipped_already_in_store
        );
        if let Some(ref cb) = progress_callback {
            cb(ImportProgress::Completed {
                summary: summary.clone(),
                duration_secs: start_time.elapsed().as_secs_f64(),
            });
        }

        Ok(summary)
    }
}
