//! Database schema management
//!
//! The collection schema evolves through an ordered list of additive
//! migration steps. Every step is guarded by a check against `sqlite_master`
//! or `pragma_table_info`, so running the list again is a no-op and a run
//! that stopped halfway resumes where it left off. No step drops or rewrites
//! existing rows.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use super::connection::{column_exists, index_exists, table_exists};

/// Schema definitions for the collection database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    pub const META_TABLE_NAME: &'static str = "cardledger_meta";
    pub const CARDS_TABLE_NAME: &'static str = "cards";
    pub const CARDS_NAME_INDEX: &'static str = "idx_cards_name_unique";

    /// SQL for creating the meta table (tracks schema version and global metadata)
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE cardledger_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for the original cards table, before any column was added
    pub const CARDS_TABLE: &'static str = r#"
        CREATE TABLE cards (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT    NOT NULL,
            image TEXT,
            owned INTEGER NOT NULL DEFAULT 0
        );
    "#;

    /// Rows that predate the column are treated as mainboard cards
    pub const CARDS_ADD_MAINBOARD: &'static str =
        "ALTER TABLE cards ADD COLUMN mainboard INTEGER NOT NULL DEFAULT 1";

    pub const CARDS_NAME_UNIQUE_INDEX: &'static str =
        "CREATE UNIQUE INDEX idx_cards_name_unique ON cards(name)";

    pub const CARDS_DUPLICATE_NAMES: &'static str = r#"
        SELECT COUNT(*) FROM (
            SELECT name FROM cards GROUP BY name HAVING COUNT(*) > 1
        )
    "#;
}

/// Result of applying a single migration step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step's DDL ran
    Applied,
    /// The step could not run against the current data and stays pending
    Deferred(String),
}

/// One additive, check-guarded schema change
pub struct MigrationStep {
    /// Stable identifier, used in logs and status reports
    pub name: &'static str,
    is_applied: fn(&Connection) -> Result<bool>,
    apply: fn(&Connection) -> Result<StepOutcome>,
}

impl MigrationStep {
    /// Whether the schema already contains this step's change
    pub fn is_applied(&self, conn: &Connection) -> Result<bool> {
        (self.is_applied)(conn)
    }
}

/// All schema steps, oldest first. New steps are only ever appended.
pub const MIGRATION_STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "create_meta_table",
        is_applied: meta_table_exists,
        apply: create_meta_table,
    },
    MigrationStep {
        name: "create_cards_table",
        is_applied: cards_table_exists,
        apply: create_cards_table,
    },
    MigrationStep {
        name: "add_cards_mainboard",
        is_applied: mainboard_column_exists,
        apply: add_mainboard_column,
    },
    MigrationStep {
        name: "create_cards_name_unique_index",
        is_applied: name_index_exists,
        apply: create_name_unique_index,
    },
];

/// Current schema version: the number of known migration steps
pub const SCHEMA_VERSION: u32 = MIGRATION_STEPS.len() as u32;

fn run_ddl(conn: &Connection, sql: &str) -> Result<StepOutcome> {
    conn.execute(sql, [])?;
    Ok(StepOutcome::Applied)
}

fn meta_table_exists(conn: &Connection) -> Result<bool> {
    table_exists(conn, SchemaDefinitions::META_TABLE_NAME)
}

fn create_meta_table(conn: &Connection) -> Result<StepOutcome> {
    run_ddl(conn, SchemaDefinitions::META_TABLE)
}

fn cards_table_exists(conn: &Connection) -> Result<bool> {
    table_exists(conn, SchemaDefinitions::CARDS_TABLE_NAME)
}

fn create_cards_table(conn: &Connection) -> Result<StepOutcome> {
    run_ddl(conn, SchemaDefinitions::CARDS_TABLE)
}

fn mainboard_column_exists(conn: &Connection) -> Result<bool> {
    column_exists(conn, SchemaDefinitions::CARDS_TABLE_NAME, "mainboard")
}

fn add_mainboard_column(conn: &Connection) -> Result<StepOutcome> {
    run_ddl(conn, SchemaDefinitions::CARDS_ADD_MAINBOARD)
}

fn name_index_exists(conn: &Connection) -> Result<bool> {
    index_exists(conn, SchemaDefinitions::CARDS_NAME_INDEX)
}

// Legacy data with repeated names keeps the step pending instead of failing startup
fn create_name_unique_index(conn: &Connection) -> Result<StepOutcome> {
    let duplicates: i64 = conn.query_row(
        SchemaDefinitions::CARDS_DUPLICATE_NAMES,
        [],
        |row| row.get(0),
    )?;
    if duplicates > 0 {
        return Ok(StepOutcome::Deferred(format!(
            "{} card names occur more than once",
            duplicates
        )));
    }
    run_ddl(conn, SchemaDefinitions::CARDS_NAME_UNIQUE_INDEX)
}

/// Summary of one `ensure_schema` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Steps whose DDL ran during this call
    pub applied: Vec<&'static str>,
    /// Steps left pending, with the reason
    pub deferred: Vec<(&'static str, String)>,
}

impl SchemaReport {
    /// True when this run changed nothing
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database is not initialized (fresh database)
    NotInitialized,

    /// Every migration step is present
    Current,

    /// Some steps have not been applied yet
    NeedsMigration { pending: Vec<&'static str> },
}

/// Schema migrator for the collection database
pub struct SchemaMigrator<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaMigrator<'a> {
    /// Create a new schema migrator for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Bring the schema up to date
    ///
    /// Checks each step and applies only those that are missing. Any DDL
    /// failure is returned immediately; steps already applied stay applied
    /// and are skipped on the next call.
    pub fn ensure_schema(&self) -> Result<SchemaReport> {
        let mut report = SchemaReport::default();

        for step in MIGRATION_STEPS {
            let applied = step
                .is_applied(self.conn)
                .map_err(|e| anyhow!("Failed to check schema step '{}': {}", step.name, e))?;
            if applied {
                continue;
            }

            let outcome = (step.apply)(self.conn)
                .map_err(|e| anyhow!("Failed to apply schema step '{}': {}", step.name, e))?;

            match outcome {
                StepOutcome::Applied => {
                    info!("applied schema step {}", step.name);
                    report.applied.push(step.name);
                }
                StepOutcome::Deferred(reason) => {
                    warn!("schema step {} deferred: {}", step.name, reason);
                    report.deferred.push((step.name, reason));
                }
            }
        }

        let version = self.applied_step_count()?;
        self.set_meta("schema_version", &version.to_string())?;

        Ok(report)
    }

    /// Check the current schema status without changing anything
    pub fn check_status(&self) -> Result<SchemaStatus> {
        let meta_exists = table_exists(self.conn, SchemaDefinitions::META_TABLE_NAME)?;
        let cards_exists = table_exists(self.conn, SchemaDefinitions::CARDS_TABLE_NAME)?;
        if !meta_exists && !cards_exists {
            return Ok(SchemaStatus::NotInitialized);
        }

        let pending = self.pending_steps()?;
        if pending.is_empty() {
            Ok(SchemaStatus::Current)
        } else {
            Ok(SchemaStatus::NeedsMigration { pending })
        }
    }

    /// Names of steps not yet present in the schema
    pub fn pending_steps(&self) -> Result<Vec<&'static str>> {
        let mut pending = Vec::new();
        for step in MIGRATION_STEPS {
            if !step.is_applied(self.conn)? {
                pending.push(step.name);
            }
        }
        Ok(pending)
    }

    fn applied_step_count(&self) -> Result<u32> {
        let pending = self.pending_steps()?.len() as u32;
        Ok(SCHEMA_VERSION - pending)
    }

    /// Schema version recorded by the last `ensure_schema` run
    pub fn get_schema_version(&self) -> Result<Option<u32>> {
        match self.get_meta("schema_version")? {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|e| anyhow!("Invalid schema version: {}", e)),
            None => Ok(None),
        }
    }

    /// Set a metadata value
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO cardledger_meta (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("Failed to set meta value: {}", e))?;
        Ok(())
    }

    /// Get a metadata value
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        if !table_exists(self.conn, SchemaDefinitions::META_TABLE_NAME)? {
            return Ok(None);
        }

        let result: Result<String, _> = self.conn.query_row(
            "SELECT value FROM cardledger_meta WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to get meta value: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn schema_sql(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT sql FROM sqlite_master WHERE sql IS NOT NULL ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_schema_not_initialized() {
        let conn = create_test_db();
        let migrator = SchemaMigrator::new(&conn);

        assert_eq!(
            migrator.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_ensure_schema_fresh() {
        let conn = create_test_db();
        let migrator = SchemaMigrator::new(&conn);

        let report = migrator.ensure_schema().unwrap();
        assert_eq!(report.applied.len(), MIGRATION_STEPS.len());
        assert!(report.deferred.is_empty());
        assert_eq!(migrator.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(migrator.get_schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_ensure_schema_twice_is_identical() {
        let conn = create_test_db();
        let migrator = SchemaMigrator::new(&conn);

        migrator.ensure_schema().unwrap();
        conn.execute(
            "INSERT INTO cards (name, image, owned, mainboard) VALUES ('Luke Skywalker, Faithful Friend', 'a.png', 4, 0)",
            [],
        )
        .unwrap();
        let before = schema_sql(&conn);

        let report = migrator.ensure_schema().unwrap();
        assert!(report.is_noop());
        assert_eq!(schema_sql(&conn), before);

        let (name, image, owned, mainboard): (String, Option<String>, i64, bool) = conn
            .query_row(
                "SELECT name, image, owned, mainboard FROM cards",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(name, "Luke Skywalker, Faithful Friend");
        assert_eq!(image.as_deref(), Some("a.png"));
        assert_eq!(owned, 4);
        assert!(!mainboard);
    }

    #[test]
    fn test_legacy_table_gets_mainboard_column() {
        let conn = create_test_db();
        conn.execute(SchemaDefinitions::CARDS_TABLE, []).unwrap();
        conn.execute(
            "INSERT INTO cards (name, image, owned) VALUES ('Darth Vader, Dark Lord of the Sith', NULL, 2)",
            [],
        )
        .unwrap();

        let migrator = SchemaMigrator::new(&conn);
        assert_eq!(
            migrator.check_status().unwrap(),
            SchemaStatus::NeedsMigration {
                pending: vec![
                    "create_meta_table",
                    "add_cards_mainboard",
                    "create_cards_name_unique_index"
                ]
            }
        );

        let report = migrator.ensure_schema().unwrap();
        assert!(!report.applied.contains(&"create_cards_table"));

        let (owned, mainboard): (i64, bool) = conn
            .query_row("SELECT owned, mainboard FROM cards", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(owned, 2);
        assert!(mainboard);
    }

    #[test]
    fn test_partial_migration_is_retryable() {
        let conn = create_test_db();
        // Simulate a run that stopped after the table was created
        conn.execute(SchemaDefinitions::META_TABLE, []).unwrap();
        conn.execute(SchemaDefinitions::CARDS_TABLE, []).unwrap();

        let migrator = SchemaMigrator::new(&conn);
        let report = migrator.ensure_schema().unwrap();
        assert_eq!(
            report.applied,
            vec!["add_cards_mainboard", "create_cards_name_unique_index"]
        );
        assert_eq!(migrator.check_status().unwrap(), SchemaStatus::Current);
    }

    #[test]
    fn test_duplicate_names_defer_unique_index() {
        let conn = create_test_db();
        conn.execute(SchemaDefinitions::CARDS_TABLE, []).unwrap();
        conn.execute(
            "INSERT INTO cards (name) VALUES ('Han Solo, Reluctant Hero'), ('Han Solo, Reluctant Hero')",
            [],
        )
        .unwrap();

        let migrator = SchemaMigrator::new(&conn);
        let report = migrator.ensure_schema().unwrap();
        assert_eq!(report.deferred.len(), 1);
        assert_eq!(report.deferred[0].0, "create_cards_name_unique_index");
        assert_eq!(
            migrator.get_schema_version().unwrap(),
            Some(SCHEMA_VERSION - 1)
        );

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);

        // Once the data is cleaned up the step goes through
        conn.execute("DELETE FROM cards WHERE id = 2", []).unwrap();
        let report = migrator.ensure_schema().unwrap();
        assert_eq!(report.applied, vec!["create_cards_name_unique_index"]);
    }

    #[test]
    fn test_ddl_failure_is_propagated() {
        let conn = create_test_db();
        // A view squatting on the table name makes CREATE TABLE fail
        conn.execute("CREATE VIEW cards AS SELECT 1 AS id", [])
            .unwrap();

        let migrator = SchemaMigrator::new(&conn);
        let err = migrator.ensure_schema().unwrap_err();
        assert!(err.to_string().contains("create_cards_table"));
    }

    #[test]
    fn test_meta_operations() {
        let conn = create_test_db();
        let migrator = SchemaMigrator::new(&conn);

        assert_eq!(migrator.get_meta("test_key").unwrap(), None);
        migrator.ensure_schema().unwrap();

        migrator.set_meta("test_key", "test_value").unwrap();
        let value = migrator.get_meta("test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        let missing = migrator.get_meta("nonexistent").unwrap();
        assert_eq!(missing, None);
    }
}
