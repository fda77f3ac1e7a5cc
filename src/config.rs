use crate::database::{ImageCache, SchemaStatus, DATABASE_FILE_NAME};
use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default spacing between image downloads in milliseconds (10 per second)
pub const DEFAULT_IMAGE_DOWNLOAD_INTERVAL_MS: u64 = 100;

/// Default timeout for a single image fetch in seconds
pub const DEFAULT_IMAGE_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default card types that do not count toward the mainboard
pub const DEFAULT_NON_MAINBOARD_TYPES: &str = "Leader,Base";

pub struct LedgerConfig {
    /// Path to the directory holding the collection database
    pub data_dir: String,

    /// Directory holding card images
    pub images_dir: String,

    /// Base URL card images are downloaded from; no downloads when unset
    pub image_base_url: Option<String>,

    /// Minimum spacing between image downloads in milliseconds
    pub image_download_interval_ms: u64,

    /// Timeout for a single image fetch in seconds
    pub image_fetch_timeout_secs: u64,

    /// Card types imported as non-mainboard
    pub non_mainboard_types: Vec<String>,
}

const EMPTY_CONFIG: &str = r#"### cardledger configuration file

### directory holding the collection database
# data_dir = "~/.cardledger"

### directory holding card images (default: {data_dir}/images)
# images_dir = "~/.cardledger/images"

### where missing card images are downloaded from: {image_base_url}/{set}/{number}.png
### leave unset to only use images already on disk
# image_base_url = "https://example.com/cards"

### image download pacing and timeout
# image_download_interval_ms = 100   # at most 10 downloads per second
# image_fetch_timeout_secs = 30

### card types that count toward the smaller (3 copy) target
# non_mainboard_types = "Leader,Base"
"#;

fn home_dir_string() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from_map(
            &HashMap::new(),
            &format!("{}/.cardledger", home_dir_string()),
        )
    }
}

impl LedgerConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Reads `path` (or `$HOME/.cardledger/cardledger.toml`), writing a
    /// commented template there if the file does not exist, then applies
    /// `CARDLEDGER_*` environment variables on top.
    pub fn new(path: &Option<String>) -> Result<LedgerConfig> {
        let mut builder = Config::builder();

        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();
        let ledger_dir = format!("{}/.cardledger", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(ledger_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create cardledger directory: {}", e))?;
                let p = Self::config_file_path();
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // E.g., `CARDLEDGER_DATA_DIR=/srv/cards cardledger wishlist`
        builder = builder.add_source(config::Environment::with_prefix("CARDLEDGER"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_map(&config, &ledger_dir))
    }

    /// Build a configuration from flat key/value settings
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_map(config: &HashMap<String, String>, default_data_dir: &str) -> LedgerConfig {
        let non_empty = |key: &str| {
            config
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };

        let data_dir = non_empty("data_dir").unwrap_or_else(|| default_data_dir.to_string());
        let images_dir = non_empty("images_dir")
            .unwrap_or_else(|| format!("{}/images", data_dir.trim_end_matches('/')));
        let image_base_url = non_empty("image_base_url");

        let image_download_interval_ms = config
            .get("image_download_interval_ms")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_IMAGE_DOWNLOAD_INTERVAL_MS);

        let image_fetch_timeout_secs = config
            .get("image_fetch_timeout_secs")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_IMAGE_FETCH_TIMEOUT_SECS);

        let non_mainboard_types = config
            .get("non_mainboard_types")
            .map(String::as_str)
            .unwrap_or(DEFAULT_NON_MAINBOARD_TYPES)
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        LedgerConfig {
            data_dir,
            images_dir,
            image_base_url,
            image_download_interval_ms,
            image_fetch_timeout_secs,
            non_mainboard_types,
        }
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, DATABASE_FILE_NAME)
    }

    pub fn image_download_interval(&self) -> Duration {
        Duration::from_millis(self.image_download_interval_ms)
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.image_fetch_timeout_secs)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Images Directory:   {}", self.images_dir),
            format!(
                "Image Source:       {}",
                self.image_base_url
                    .as_deref()
                    .unwrap_or("(none, disk only)")
            ),
            format!("Download Interval:  {} ms", self.image_download_interval_ms),
            format!(
                "Fetch Timeout:      {} seconds",
                self.image_fetch_timeout_secs
            ),
            format!(
                "Non-mainboard:      {}",
                self.non_mainboard_types.join(", ")
            ),
        ]
        .join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        format!("{}/.cardledger/cardledger.toml", home_dir_string())
    }
}

// =============================================================================
// Collection status (used by the config command)
// =============================================================================

/// Information about the collection database and image store
#[derive(Debug, Serialize, Clone)]
pub struct CollectionInfo {
    pub database_path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_migrations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_import_at: Option<String>,
    pub images_dir: String,
    pub image_count: usize,
    pub image_bytes: u64,
}

/// Gather collection information without running migrations
pub fn get_collection_info(config: &LedgerConfig) -> CollectionInfo {
    use crate::database::{DatabaseConn, SchemaMigrator};

    let database_path = config.sqlite_path();
    let exists = Path::new(&database_path).exists();
    let size_bytes = if exists {
        std::fs::metadata(&database_path).ok().map(|m| m.len())
    } else {
        None
    };

    let (schema_version, pending_migrations, card_count, last_import_at) = if exists {
        match DatabaseConn::open_path(&database_path) {
            Ok(db) => {
                let migrator = SchemaMigrator::new(&db.conn);
                let pending = match migrator.check_status() {
                    Ok(SchemaStatus::NeedsMigration { pending }) => {
                        Some(pending.iter().map(|s| s.to_string()).collect())
                    }
                    _ => None,
                };
                let card_count = if db.table_exists("cards").unwrap_or(false) {
                    db.table_count("cards").ok()
                } else {
                    None
                };
                (
                    migrator.get_schema_version().ok().flatten(),
                    pending,
                    card_count,
                    migrator.get_meta("last_import_at").ok().flatten(),
                )
            }
            Err(_) => (None, None, None, None),
        }
    } else {
        (None, None, None, None)
    };

    let (image_count, image_bytes) = ImageCache::new(&config.images_dir)
        .usage()
        .unwrap_or((0, 0));

    CollectionInfo {
        database_path,
        exists,
        size_bytes,
        schema_version,
        pending_migrations,
        card_count,
        last_import_at,
        images_dir: config.images_dir.clone(),
        image_count,
        image_bytes,
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
