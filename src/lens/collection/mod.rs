//! Collection lens
//!
//! Search and owned-count adjustments on stored cards, with output
//! formatting shared by the CLI commands.

use crate::database::{CardRecord, CollectionDatabase};
use crate::lens::utils::{render_json, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use anyhow::{anyhow, Result};

#[cfg(feature = "display")]
use tabled::Tabled;

#[cfg_attr(feature = "display", derive(Tabled))]
struct CardRow {
    id: i64,
    name: String,
    owned: u32,
    board: &'static str,
    image: String,
}

impl From<&CardRecord> for CardRow {
    fn from(card: &CardRecord) -> Self {
        CardRow {
            id: card.id,
            name: truncate_name(&card.name, DEFAULT_NAME_MAX_LEN),
            owned: card.owned,
            board: if card.mainboard { "main" } else { "side" },
            image: card.image_path.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Collection lens
pub struct CollectionLens<'a> {
    db: &'a CollectionDatabase,
}

impl<'a> CollectionLens<'a> {
    pub fn new(db: &'a CollectionDatabase) -> Self {
        Self { db }
    }

    /// Cards whose name contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Result<Vec<CardRecord>> {
        self.db.cards().search(query)
    }

    /// Add `count` owned copies of a card
    pub fn add_owned(&self, id: i64, count: u32) -> Result<CardRecord> {
        self.db
            .cards()
            .adjust_owned(id, i64::from(count), false)?
            .ok_or_else(|| anyhow!("No card with id {}", id))
    }

    /// Remove `count` owned copies of a card, stopping at zero
    pub fn remove_owned(&self, id: i64, count: u32) -> Result<CardRecord> {
        self.db
            .cards()
            .adjust_owned(id, -i64::from(count), true)?
            .ok_or_else(|| anyhow!("No card with id {}", id))
    }

    /// Format cards for output
    pub fn format_results(&self, cards: &[CardRecord], format: OutputFormat) -> String {
        match format {
            OutputFormat::Json | OutputFormat::JsonPretty | OutputFormat::JsonLine => {
                render_json(cards, format)
            }
            OutputFormat::Psv => {
                let mut output = String::from("id|name|owned|mainboard|image\n");
                for c in cards {
                    output.push_str(&format!(
                        "{}|{}|{}|{}|{}\n",
                        c.id,
                        c.name,
                        c.owned,
                        c.mainboard,
                        c.image_path.as_deref().unwrap_or_default()
                    ));
                }
                output
            }
            OutputFormat::Table | OutputFormat::Markdown => {
                let rows: Vec<CardRow> = cards.iter().map(CardRow::from).collect();
                self.render_rows(rows, format)
            }
        }
    }

    #[cfg(feature = "display")]
    fn render_rows(&self, rows: Vec<CardRow>, format: OutputFormat) -> String {
        crate::lens::utils::render_table(rows, format)
    }

    #[cfg(not(feature = "display"))]
    fn render_rows(&self, rows: Vec<CardRow>, _format: OutputFormat) -> String {
        rows.iter()
            .map(|r| {
                format!(
                    "{} {} x{} [{}] {}",
                    r.id, r.name, r.owned, r.board, r.image
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

    #[test]
    fn test_add_and_remove_owned() {
        let db = CollectionDatabase::open_in_memory().unwrap();
        let outcome = db
            .cards()
            .insert("R2-D2, Ignoring Protocol", None, false)
            .unwrap();
        let InsertOutcome::Inserted(id) = outcome else {
            panic!("expected insert");
        };
        let lens = CollectionLens::new(&db);

        assert_eq!(lens.add_owned(id, 3).unwrap().owned, 3);
        assert_eq!(lens.remove_owned(id, 5).unwrap().owned, 0);
        assert!(lens.add_owned(id + 1, 1).is_err());
    }

    #[test]
    fn test_search_and_format() {
        let db = CollectionDatabase::open_in_memory().unwrap();
        db.cards()
            .insert("C-3PO, Protocol Droid", Some("/img/SOR201.png"), true)
            .unwrap();
        db.cards()
            .insert("K-2SO, Cassian's Counterpart", None, false)
            .unwrap();
        let lens = CollectionLens::new(&db);

        let found = lens.search("protocol").unwrap();
        assert_eq!(found.len(), 1);

        let psv = lens.format_results(&found, OutputFormat::Psv);
        assert_eq!(
            psv,
            format!(
                "id|name|owned|mainboard|image\n{}|C-3PO, Protocol Droid|0|true|/img/SOR201.png\n",
                found[0].id
            )
        );

        let all = lens.search("").unwrap();
        let lines = lens.format_results(&all, OutputFormat::JsonLine);
        assert_eq!(lines.lines().count(), 2);
    }
}
