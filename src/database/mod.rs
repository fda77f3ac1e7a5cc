//! Database module
//!
//! This module provides all database functionality for cardledger, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connections, schema migrations)
//! - **collection**: The persistent card collection and its image store
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # SQLite DatabaseConn wrapper
//! │   └── schema       # Ordered, check-guarded migration steps
//! │
//! └── collection/      # Persistent storage
//!     ├── cards        # Card records (SQLite)
//!     └── image_cache  # Card images (files)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use cardledger::database::CollectionDatabase;
//!
//! // Opening brings the schema up to date
//! let db = CollectionDatabase::open_in_dir("~/.cardledger")?;
//!
//! let results = db.cards().search("vader")?;
//! if let Some(card) = results.first() {
//!     db.cards().increment_owned(card.id)?;
//! }
//! ```

pub mod collection;
pub mod core;

pub use collection::{
    checked_component, ensure_data_dir, name_matches, CardRecord, CardRepository,
    CollectionDatabase, ImageCache, InsertOutcome, DATABASE_FILE_NAME,
};
pub use core::{
    column_exists, index_exists, table_exists, DatabaseConn, MigrationStep, SchemaDefinitions,
    SchemaMigrator, SchemaReport, SchemaStatus, StepOutcome, MIGRATION_STEPS, SCHEMA_VERSION,
};
