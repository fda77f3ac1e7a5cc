#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Cardledger - a local trading-card collection tracker
//!
//! Cardledger keeps a personal card collection in SQLite: it imports
//! collection exports, stores card art on disk, tracks owned counts, and
//! lists the cards still short of a playset. It can be used as both a
//! command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `database` | SQLite collection, wishlist and search lenses | `rusqlite` |
//! | `lens-import` | CSV import with image download | `csv`, `ureq` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | Full CLI binary | All above + `clap`, `indicatif` |
//!
//! ```toml
//! # Library use without the CLI
//! cardledger = { version = "0.3", default-features = false, features = ["lens-import"] }
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: SQLite connection, schema migrations, card repository, image store
//! - **[`lens`]**: Import, wishlist and collection operations with output formatting
//! - **[`config`]**: Configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cardledger::database::CollectionDatabase;
//! use cardledger::lens::import::ImportLens;
//! use cardledger::lens::wishlist::WishlistLens;
//!
//! // Opening the database brings the schema up to date
//! let db = CollectionDatabase::open_in_dir("/home/me/.cardledger")?;
//!
//! let csv = std::fs::read("collection.csv")?;
//! let summary = ImportLens::new(&db, "/home/me/.cardledger/images").import_bytes(&csv)?;
//! println!("{} new cards", summary.inserted);
//!
//! for entry in WishlistLens::new(&db).wishlist("")? {
//!     println!("{} (missing {})", entry.card.name, entry.deficit);
//! }
//! ```

pub mod config;
pub mod database;
pub mod lens;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, get_collection_info, CollectionInfo, LedgerConfig};

// =============================================================================
// Database
// =============================================================================

pub use database::{
    CardRecord, CardRepository, CollectionDatabase, DatabaseConn, ImageCache, InsertOutcome,
    SchemaMigrator, SchemaReport, SchemaStatus, SCHEMA_VERSION,
};

// =============================================================================
// Lenses
// =============================================================================

pub use lens::utils::OutputFormat;

#[cfg(feature = "database")]
pub use lens::wishlist::{WishlistEntry, MAINBOARD_MINIMUM, NON_MAINBOARD_MINIMUM};

#[cfg(feature = "lens-import")]
pub use lens::import::{ImportError, ImportRow, ImportSummary};
