//! Lens module
//!
//! Lenses combine collection logic with output formatting so the same
//! operations can back any front end.
//!
//! # Feature Requirements
//!
//! | Lens | Feature Required | Dependencies |
//! |------|-----------------|--------------|
//! | `CollectionLens` | `database` | rusqlite |
//! | `WishlistLens` | `database` | rusqlite |
//! | `ImportLens` | `lens-import` | csv, ureq |
//!
//! Table output additionally needs the `display` feature (tabled).
//!
//! # Usage
//!
//! ```rust,ignore
//! use cardledger::database::CollectionDatabase;
//! use cardledger::lens::wishlist::WishlistLens;
//! use cardledger::lens::utils::OutputFormat;
//!
//! let db = CollectionDatabase::open_in_dir("~/.cardledger")?;
//! let lens = WishlistLens::new(&db);
//! let entries = lens.wishlist("")?;
//! println!("{}", lens.format_results(&entries, OutputFormat::Table));
//! ```

pub mod utils;

// CollectionLens - search and owned-count adjustments
#[cfg(feature = "database")]
pub mod collection;

// WishlistLens - cards below their target owned count
#[cfg(feature = "database")]
pub mod wishlist;

// ImportLens - collection export import with image acquisition
#[cfg(feature = "lens-import")]
pub mod import;
