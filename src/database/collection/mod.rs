//! Collection database storage
//!
//! This module provides the persistent database holding the card collection.
//! The collection database stores:
//! - Cards (name, image reference, owned count, mainboard flag) - SQLite
//! - Collection metadata (schema version, last import time) - SQLite
//!
//! Card images are kept on disk next to the database, see [`ImageCache`].

mod cards;
mod image_cache;

pub use cards::{name_matches, CardRecord, CardRepository, InsertOutcome};
pub use image_cache::{checked_component, ImageCache};

use crate::database::core::{DatabaseConn, SchemaMigrator, SchemaReport, SchemaStatus};
use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

/// File name of the collection database inside the data directory
pub const DATABASE_FILE_NAME: &str = "cardledger-data.sqlite3";

/// Main collection database (SQLite backend)
///
/// Opening the database always brings the schema up to date first. A schema
/// step that fails aborts the open; there is no fallback to an older schema.
pub struct CollectionDatabase {
    db: DatabaseConn,
}

impl CollectionDatabase {
    /// Open the collection database at the specified path
    ///
    /// If the database doesn't exist, it will be created and initialized.
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        Self::with_schema(db)
    }

    /// Open the collection database from a data directory
    ///
    /// Creates the standard database file path: `{data_dir}/cardledger-data.sqlite3`
    pub fn open_in_dir(data_dir: &str) -> Result<Self> {
        ensure_data_dir(data_dir)?;
        let path = Path::new(data_dir).join(DATABASE_FILE_NAME);
        let path = path
            .to_str()
            .ok_or_else(|| anyhow!("Database path under '{}' is not valid UTF-8", data_dir))?;
        Self::open(path)
    }

    /// Create an in-memory collection database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        Self::with_schema(db)
    }

    fn with_schema(db: DatabaseConn) -> Result<Self> {
        let report = SchemaMigrator::new(&db.conn).ensure_schema()?;
        if report.is_noop() {
            info!("Collection database schema is current");
        } else {
            info!(
                "Collection database schema updated ({} applied, {} deferred)",
                report.applied.len(),
                report.deferred.len()
            );
        }
        Ok(Self { db })
    }

    /// Get a reference to the card repository
    pub fn cards(&self) -> CardRepository<'_> {
        CardRepository::new(&self.db.conn)
    }

    /// Get the underlying database connection (for advanced queries)
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }

    /// Re-run the schema steps, returning what changed
    pub fn ensure_schema(&self) -> Result<SchemaReport> {
        SchemaMigrator::new(&self.db.conn).ensure_schema()
    }

    /// Report the schema state without changing anything
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        SchemaMigrator::new(&self.db.conn).check_status()
    }

    /// Get metadata value from the database
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        SchemaMigrator::new(&self.db.conn).get_meta(key)
    }

    /// Set metadata value in the database
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        SchemaMigrator::new(&self.db.conn).set_meta(key, value)
    }
}

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
