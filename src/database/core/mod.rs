//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: Core SQLite connection wrapper with configuration
//! - `SchemaMigrator`: Check-guarded, additive schema migrations
//! - `SchemaStatus`: Schema state enumeration

mod connection;
mod schema;

pub use connection::{column_exists, index_exists, table_exists, DatabaseConn};
pub use schema::{
    MigrationStep, SchemaDefinitions, SchemaMigrator, SchemaReport, SchemaStatus, StepOutcome,
    MIGRATION_STEPS, SCHEMA_VERSION,
};
