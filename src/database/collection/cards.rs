//! Card repository for the collection database
//!
//! This module provides data access operations for the `cards` table: the
//! existence check and conditional insert used by imports, lookups, search,
//! and the owned-count adjustments made from the outside.

use anyhow::{anyhow, bail, Result};
use rusqlite::{ffi, params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

const CARD_COLUMNS: &str = "id, name, image, owned, mainboard";

/// A persisted card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Store-assigned identifier
    pub id: i64,
    /// Display name, unique across the collection
    pub name: String,
    /// Local image artifact, if one was acquired
    pub image_path: Option<String>,
    /// Number of copies owned
    pub owned: u32,
    /// Whether the card counts toward deck playsets
    pub mainboard: bool,
}

/// Result of a conditional insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created with this id
    Inserted(i64),
    /// A card with the same name was already stored; nothing was written
    AlreadyExists,
}

/// Repository for card data operations
pub struct CardRepository<'a> {
    conn: &'a Connection,
}

fn map_card_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CardRecord> {
    let image: Option<String> = row.get(2)?;
    Ok(CardRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        image_path: image.filter(|p| !p.is_empty()),
        owned: row.get(3)?,
        mainboard: row.get(4)?,
    })
}

/// Case-insensitive substring match; an empty query matches everything
pub fn name_matches(name: &str, query: &str) -> bool {
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}

fn check_id(id: i64) -> Result<()> {
    if id <= 0 {
        bail!("card id must be a positive integer, got {}", id);
    }
    Ok(())
}

impl<'a> CardRepository<'a> {
    /// Create a new card repository
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Get the number of stored cards
    pub fn count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get card count: {}", e))?;
        Ok(count)
    }

    /// Check whether a card with exactly this name is stored
    pub fn exists_by_name(&self, name: &str) -> Result<bool> {
        if name.is_empty() {
            bail!("card name must not be empty");
        }

        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM cards WHERE name = ?1 LIMIT 1",
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to check card existence for '{}': {}", name, e))?;
        Ok(found.is_some())
    }

    /// Insert a card with `owned = 0` unless one with the same name exists
    ///
    /// The existence test and the insert are a single statement, so two
    /// writers racing on the same name cannot both create a row.
    pub fn insert(
        &self,
        name: &str,
        image_path: Option<&str>,
        mainboard: bool,
    ) -> Result<InsertOutcome> {
        if name.is_empty() {
            bail!("card name must not be empty");
        }

        let result = self.conn.execute(
            r#"
            INSERT INTO cards (name, image, owned, mainboard)
            SELECT ?1, ?2, 0, ?3
            WHERE NOT EXISTS (SELECT 1 FROM cards WHERE name = ?1)
            "#,
            params![name, image_path, mainboard],
        );

        match result {
            Ok(0) => Ok(InsertOutcome::AlreadyExists),
            Ok(_) => Ok(InsertOutcome::Inserted(self.conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(anyhow!("Failed to insert card '{}': {}", name, e)),
        }
    }

    /// Look up a card by id
    pub fn get_by_id(&self, id: i64) -> Result<Option<CardRecord>> {
        check_id(id)?;

        self.conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                [id],
                map_card_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get card {}: {}", id, e))
    }

    /// Look up a card by exact name
    pub fn get_by_name(&self, name: &str) -> Result<Option<CardRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE name = ?1", CARD_COLUMNS),
                [name],
                map_card_row,
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get card '{}': {}", name, e))
    }

    /// Search cards by case-insensitive substring of the name
    ///
    /// An empty query returns every card. Results are ordered by name.
    pub fn search(&self, query: &str) -> Result<Vec<CardRecord>> {
        let cards = self.all()?;
        Ok(cards
            .into_iter()
            .filter(|c| name_matches(&c.name, query))
            .collect())
    }

    /// All cards, ordered by name
    pub fn all(&self) -> Result<Vec<CardRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cards ORDER BY name COLLATE NOCASE, id",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map([], map_card_row)
            .map_err(|e| anyhow!("Failed to list cards: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Cards whose owned count is below the threshold for their classification
    pub fn owned_below(
        &self,
        mainboard_minimum: u32,
        non_mainboard_minimum: u32,
    ) -> Result<Vec<CardRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM cards
            WHERE (mainboard = 1 AND owned < ?1)
               OR (mainboard = 0 AND owned < ?2)
            ORDER BY name COLLATE NOCASE, id
            "#,
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map(
                params![mainboard_minimum, non_mainboard_minimum],
                map_card_row,
            )
            .map_err(|e| anyhow!("Failed to query cards below threshold: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Change the owned count by `delta`
    ///
    /// With `clamp_at_zero` the count stops at zero; without it a change that
    /// would go negative is an error. A count above `u32::MAX` is always an
    /// error and leaves the stored value unchanged. Returns `Ok(None)` if no
    /// card has this id.
    pub fn adjust_owned(
        &self,
        id: i64,
        delta: i64,
        clamp_at_zero: bool,
    ) -> Result<Option<CardRecord>> {
        let Some(card) = self.get_by_id(id)? else {
            return Ok(None);
        };

        let target = i64::from(card.owned)
            .checked_add(delta)
            .filter(|t| *t <= i64::from(u32::MAX))
            .ok_or_else(|| {
                anyhow!(
                    "owned count of card {} would exceed {} ({} {:+})",
                    id,
                    u32::MAX,
                    card.owned,
                    delta
                )
            })?;
        if target < 0 && !clamp_at_zero {
            bail!(
                "owned count of card {} would become negative ({} {:+})",
                id,
                card.owned,
                delta
            );
        }
        let owned = u32::try_from(target.max(0))?;

        self.conn
            .execute(
                "UPDATE cards SET owned = ?2 WHERE id = ?1",
                params![id, owned],
            )
            .map_err(|e| anyhow!("Failed to adjust owned count of card {}: {}", id, e))?;

        self.get_by_id(id)
    }

    /// Add one owned copy
    pub fn increment_owned(&self, id: i64) -> Result<Option<CardRecord>> {
        self.adjust_owned(id, 1, false)
    }

    /// Remove one owned copy, never going below zero
    pub fn decrement_owned(&self, id: i64) -> Result<Option<CardRecord>> {
        self.adjust_owned(id, -1, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::SchemaMigrator;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        SchemaMigrator::new(&conn).ensure_schema().unwrap();
        conn
    }

    fn add_card(repo: &CardRepository<'_>, name: &str, mainboard: bool) -> i64 {
        match repo.insert(name, None, mainboard).unwrap() {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::AlreadyExists => panic!("{} was already stored", name),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);

        let outcome = repo
            .insert("Chewbacca, Hero of Kessel", Some("/img/LAW001.png"), true)
            .unwrap();
        let InsertOutcome::Inserted(id) = outcome else {
            panic!("expected insert, got {:?}", outcome);
        };

        let card = repo.get_by_id(id).unwrap().unwrap();
        assert_eq!(card.name, "Chewbacca, Hero of Kessel");
        assert_eq!(card.image_path.as_deref(), Some("/img/LAW001.png"));
        assert_eq!(card.owned, 0);
        assert!(card.mainboard);
        assert!(repo.exists_by_name("Chewbacca, Hero of Kessel").unwrap());
        assert!(!repo.exists_by_name("Chewbacca").unwrap());
    }

    #[test]
    fn test_insert_existing_name_is_detected() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);

        repo.insert("Grogu, Irresistible", None, true).unwrap();
        let second = repo
            .insert("Grogu, Irresistible", Some("x.png"), false)
            .unwrap();

        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(repo.count().unwrap(), 1);
        let card = repo.get_by_name("Grogu, Irresistible").unwrap().unwrap();
        assert_eq!(card.image_path, None);
        assert!(card.mainboard);
    }

    #[test]
    fn test_empty_name_rejected() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);

        assert!(repo.insert("", None, true).is_err());
        assert!(repo.exists_by_name("").is_err());
    }

    #[test]
    fn test_get_missing_and_invalid_id() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);

        assert_eq!(repo.get_by_id(42).unwrap(), None);
        assert!(repo.get_by_id(0).is_err());
        assert!(repo.get_by_id(-3).is_err());
    }

    #[test]
    fn test_search() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);
        repo.insert("Luke Skywalker, Faithful Friend", None, false)
            .unwrap();
        repo.insert("Darth Vader, Dark Lord of the Sith", None, false)
            .unwrap();
        repo.insert("Lothal Rebel", None, true).unwrap();

        assert_eq!(repo.search("").unwrap().len(), 3);

        let found = repo.search("LUKE").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Luke Skywalker, Faithful Friend");

        let names: Vec<String> = repo
            .search("l")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Darth Vader, Dark Lord of the Sith",
                "Lothal Rebel",
                "Luke Skywalker, Faithful Friend"
            ]
        );

        assert!(repo.search("Yoda").unwrap().is_empty());
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);
        repo.insert("100% Focus", None, true).unwrap();
        repo.insert("Fully Armed", None, true).unwrap();

        let found = repo.search("%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "100% Focus");
        assert!(repo.search("_").unwrap().is_empty());
    }

    #[test]
    fn test_adjust_owned() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);
        let id = add_card(&repo, "Boba Fett, Daimyo", false);

        assert_eq!(repo.increment_owned(id).unwrap().unwrap().owned, 1);
        assert_eq!(repo.adjust_owned(id, 4, false).unwrap().unwrap().owned, 5);
        assert_eq!(repo.decrement_owned(id).unwrap().unwrap().owned, 4);
        assert_eq!(repo.adjust_owned(id, -10, true).unwrap().unwrap().owned, 0);
        assert_eq!(repo.decrement_owned(id).unwrap().unwrap().owned, 0);

        assert!(repo.adjust_owned(id, -1, false).is_err());
        assert_eq!(repo.get_by_id(id).unwrap().unwrap().owned, 0);
    }

    #[test]
    fn test_adjust_owned_missing_card() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);

        assert_eq!(repo.increment_owned(7).unwrap(), None);
        assert_eq!(repo.decrement_owned(7).unwrap(), None);
    }

    #[test]
    fn test_owned_below() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);
        repo.insert("Main Short", None, true).unwrap();
        repo.insert("Side Short", None, false).unwrap();
        let main_full = add_card(&repo, "Main Full", true);
        let side_full = add_card(&repo, "Side Full", false);
        repo.adjust_owned(main_full, 6, false).unwrap();
        repo.adjust_owned(side_full, 3, false).unwrap();

        let names: Vec<String> = repo
            .owned_below(6, 3)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Main Short", "Side Short"]);
    }

    #[test]
    fn test_name_matches() {
        assert!(name_matches("Padmé Amidala", ""));
        assert!(name_matches("Padmé Amidala", "PADMÉ"));
        assert!(name_matches("Padmé Amidala", "é am"));
        assert!(!name_matches("Padmé Amidala", "  amid "));
        assert!(!name_matches("Padmé Amidala", " "));
        assert!(!name_matches("Padmé Amidala", "Leia"));
        assert!(name_matches("Darth Vader, Dark Lord of the Sith", " of"));
        assert!(!name_matches("Offensive Maneuver", " of"));
    }

    #[test]
    fn test_is_empty_reports_store_errors() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);
        assert!(repo.is_empty().unwrap());

        repo.insert("Cad Bane, He Who Needs No Introduction", None, false)
            .unwrap();
        assert!(!repo.is_empty().unwrap());

        conn.execute("DROP TABLE cards", []).unwrap();
        assert!(repo.is_empty().is_err());
    }

    #[test]
    fn test_adjust_owned_rejects_counts_out_of_range() {
        let conn = setup_db();
        let repo = CardRepository::new(&conn);
        let id = add_card(&repo, "Jango Fett, Concealing the Conspiracy", false);
        repo.insert("Bossk, Deadly Stalker", None, true).unwrap();

        assert!(repo.adjust_owned(id, 5_000_000_000, false).is_err());
        assert!(repo.adjust_owned(id, i64::MAX, false).is_err());
        assert_eq!(repo.get_by_id(id).unwrap().unwrap().owned, 0);

        let full = repo.adjust_owned(id, i64::from(u32::MAX), false).unwrap();
        assert_eq!(full.unwrap().owned, u32::MAX);
        assert!(repo.increment_owned(id).is_err());
        let cleared = repo.adjust_owned(id, i64::MIN, true).unwrap();
        assert_eq!(cleared.unwrap().owned, 0);

        // The rest of the collection stays readable
        assert_eq!(repo.search("").unwrap().len(), 2);
        assert_eq!(repo.all().unwrap().len(), 2);
    }
}
