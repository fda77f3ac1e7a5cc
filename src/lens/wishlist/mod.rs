//! Wishlist lens
//!
//! Lists the cards owned fewer times than their target: six copies for
//! mainboard cards, three for everything else. The lens only reads.

use crate::database::{name_matches, CardRecord, CollectionDatabase};
use crate::lens::utils::{render_json, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[cfg(feature = "display")]
use tabled::Tabled;

/// Target owned count for mainboard cards
pub const MAINBOARD_MINIMUM: u32 = 6;

/// Target owned count for non-mainboard cards
pub const NON_MAINBOARD_MINIMUM: u32 = 3;

/// Target owned count for a card of the given classification
pub fn threshold(mainboard: bool) -> u32 {
    if mainboard {
        MAINBOARD_MINIMUM
    } else {
        NON_MAINBOARD_MINIMUM
    }
}

/// A card below its target, with the number of copies still missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    #[serde(flatten)]
    pub card: CardRecord,
    pub deficit: u32,
}

impl WishlistEntry {
    /// Build an entry, or `None` if the card already meets its target
    pub fn from_card(card: CardRecord) -> Option<Self> {
        let deficit = threshold(card.mainboard).checked_sub(card.owned)?;
        if deficit == 0 {
            return None;
        }
        Some(Self { card, deficit })
    }
}

/// Totals over a wishlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistSummary {
    pub cards: usize,
    pub missing_copies: u64,
}

#[cfg_attr(feature = "display", derive(Tabled))]
struct WishlistRow {
    id: i64,
    name: String,
    owned: u32,
    target: u32,
    missing: u32,
    board: &'static str,
}

impl From<&WishlistEntry> for WishlistRow {
    fn from(entry: &WishlistEntry) -> Self {
        WishlistRow {
            id: entry.card.id,
            name: truncate_name(&entry.card.name, DEFAULT_NAME_MAX_LEN),
            owned: entry.card.owned,
            target: threshold(entry.card.mainboard),
            missing: entry.deficit,
            board: if entry.card.mainboard { "main" } else { "side" },
        }
    }
}

/// Wishlist lens
pub struct WishlistLens<'a> {
    db: &'a CollectionDatabase,
}

impl<'a> WishlistLens<'a> {
    pub fn new(db: &'a CollectionDatabase) -> Self {
        Self { db }
    }

    /// Cards below their target, optionally filtered by name
    ///
    /// The query is a case-insensitive substring; an empty query matches
    /// every card. Entries are ordered by deficit (largest first), then name,
    /// then id.
    pub fn wishlist(&self, query: &str) -> Result<Vec<WishlistEntry>> {
        let candidates = self
            .db
            .cards()
            .owned_below(MAINBOARD_MINIMUM, NON_MAINBOARD_MINIMUM)?;

        let mut entries: Vec<WishlistEntry> = candidates
            .into_iter()
            .filter(|card| name_matches(&card.name, query))
            .filter_map(WishlistEntry::from_card)
            .collect();

        entries.sort_by(|a, b| {
            b.deficit
                .cmp(&a.deficit)
                .then_with(|| a.card.name.cmp(&b.card.name))
                .then_with(|| a.card.id.cmp(&b.card.id))
        });
        Ok(entries)
    }

    /// Count the entries and the total number of missing copies
    pub fn summary(&self, entries: &[WishlistEntry]) -> WishlistSummary {
        WishlistSummary {
            cards: entries.len(),
            missing_copies: entries.iter().map(|e| u64::from(e.deficit)).sum(),
        }
    }

    /// Format entries for output
    pub fn format_results(&self, entries: &[WishlistEntry], format: OutputFormat) -> String {
        match format {
            OutputFormat::Json | OutputFormat::JsonPretty | OutputFormat::JsonLine => {
                render_json(entries, format)
            }
            OutputFormat::Psv => {
                let mut output = String::from("id|name|owned|target|missing|mainboard\n");
                for e in entries {
                    output.push_str(&format!(
                        "{}|{}|{}|{}|{}|{}\n",
                        e.card.id,
                        e.card.name,
                        e.card.owned,
                        threshold(e.card.mainboard),
                        e.deficit,
                        e.card.mainboard
                    ));
                }
                output
            }
            OutputFormat::Table | OutputFormat::Markdown => {
                let rows: Vec<WishlistRow> = entries.iter().map(WishlistRow::from).collect();
                self.render_rows(rows, format)
            }
        }
    }

    #[cfg(feature = "display")]
    fn render_rows(&self, rows: Vec<WishlistRow>, format: OutputFormat) -> String {
        crate::lens::utils::render_table(rows, format)
    }

    #[cfg(not(feature = "display"))]
    fn render_rows(&self, rows: Vec<WishlistRow>, _format: OutputFormat) -> String {
        rows.iter()
            .map(|r| {
                format!(
                    "{} {} ({}/{}, missing {})",
                    r.id, r.name, r.owned, r.target, r.missing
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InsertOutcome;

    fn add_card(db: &CollectionDatabase, name: &str, mainboard: bool, owned: i64) -> i64 {
        let InsertOutcome::Inserted(id) = db.cards().insert(name, None, mainboard).unwrap() else {
            panic!("expected insert of {}", name);
        };
        if owned > 0 {
            db.cards().adjust_owned(id, owned, false).unwrap();
        }
        id
    }

    #[test]
    fn test_non_mainboard_boundary() {
        let db = CollectionDatabase::open_in_memory().unwrap();
        let id = add_card(&db, "Sabine Wren, Galvanized Revolutionary", false, 2);
        let lens = WishlistLens::new(&db);

        let entries = lens.wishlist("").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].card.id, id);
        assert_eq!(entries[0].deficit, 1);

        db.cards().increment_owned(id).unwrap();
        assert!(lens.wishlist("").unwrap().is_empty());
    }

    #[test]
    fn test_mainboard_boundary() {
        let db = CollectionDatabase::open_in_memory().unwrap();
        add_card(&db, "Battlefield Marine", true, 5);
        add_card(&db, "Snowspeeder", true, 6);
        add_card(&db, "Wampa", true, 9);
        let lens = WishlistLens::new(&db);

        let entries = lens.wishlist("").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].card.name, "Battlefield Marine");
        assert_eq!(entries[0].deficit, 1);
    }

    #[test]
    fn test_ordering_and_filter() {
        let db = CollectionDatabase::open_in_memory().unwrap();
        add_card(&db, "Rebel Pathfinder", true, 4);
        add_card(&db, "Rebel Assault", true, 0);
        add_card(&db, "Echo Base", false, 0);
        add_card(&db, "Alliance X-Wing", true, 4);
        let lens = WishlistLens::new(&db);

        let names: Vec<String> = lens
            .wishlist("")
            .unwrap()
            .into_iter()
            .map(|e| e.card.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Rebel Assault",
                "Echo Base",
                "Alliance X-Wing",
                "Rebel Pathfinder"
            ]
        );

        let rebels = lens.wishlist("REBEL").unwrap();
        assert_eq!(rebels.len(), 2);
        assert!(rebels.iter().all(|e| e.deficit >= 1));

        assert!(lens.wishlist("Vader").unwrap().is_empty());
    }

    #[test]
    fn test_summary_and_format() {
        let db = CollectionDatabase::open_in_memory().unwrap();
        add_card(&db, "Home One", false, 1);
        add_card(&db, "Green Squadron A-Wing", true, 3);
        let lens = WishlistLens::new(&db);

        let entries = lens.wishlist("").unwrap();
        assert_eq!(
            lens.summary(&entries),
            WishlistSummary {
                cards: 2,
                missing_copies: 5
            }
        );

        let psv = lens.format_results(&entries, OutputFormat::Psv);
        assert!(psv.starts_with("id|name|owned|target|missing|mainboard\n"));
        assert!(psv.contains("|Green Squadron A-Wing|3|6|3|true"));

        let json = lens.format_results(&entries, OutputFormat::Json);
        assert!(json.contains("\"deficit\":2"));
        assert!(json.contains("\"name\":\"Home One\""));
    }

    #[test]
    fn test_entry_from_card() {
        let card = CardRecord {
            id: 1,
            name: "Admiral Ackbar".to_string(),
            image_path: None,
            owned: 7,
            mainboard: false,
        };
        assert_eq!(WishlistEntry::from_card(card), None);
    }
}
