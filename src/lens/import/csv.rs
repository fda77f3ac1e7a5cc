//! Collection export normalizer
//!
//! Turns the bytes of a 13-column collection export into [`ImportRow`]s.
//! The whole input is validated before anything is returned: a single bad
//! row rejects the batch.

use super::ImportError;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Number of columns in a collection export
pub const EXPECTED_COLUMNS: usize = 13;

/// Literal value of the first header column
pub const HEADER_FINGERPRINT: &str = "Set";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const MISSING_HEADER: &str = "input is empty, expected a header row";

/// One data row of a collection export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub set: String,
    pub card_number: String,
    pub card_name: String,
    pub card_title: String,
    pub card_type: String,
    pub aspects: String,
    pub variant_type: String,
    pub rarity: String,
    pub foil: String,
    pub stamp: String,
    pub artist: String,
    pub owned_count: String,
    pub group_owned_count: String,
}

impl ImportRow {
    fn from_record(record: &::csv::StringRecord) -> Self {
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        ImportRow {
            set: field(0),
            card_number: field(1),
            card_name: field(2),
            card_title: field(3),
            card_type: field(4),
            aspects: field(5),
            variant_type: field(6),
            rarity: field(7),
            foil: field(8),
            stamp: field(9),
            artist: field(10),
            owned_count: field(11),
            group_owned_count: field(12),
        }
    }

    /// Name the card is stored under
    ///
    /// `card_name` alone when the title is blank, otherwise
    /// `"{card_name}, {card_title}"`.
    pub fn display_name(&self) -> String {
        if self.card_title.trim().is_empty() {
            self.card_name.clone()
        } else {
            format!("{}, {}", self.card_name, self.card_title)
        }
    }
}

/// Drop a leading UTF-8 byte-order mark, if present
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Read an export from `reader` and normalize it
pub fn normalize_reader<R: Read>(mut reader: R) -> Result<Vec<ImportRow>, ImportError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ImportError::malformed(format!("failed to read input: {}", e)))?;
    normalize(&bytes)
}

/// Normalize the bytes of an export
///
/// Fails with [`ImportError::MalformedInput`] on an empty body, a header
/// that is not 13 columns starting with `Set`, a data row with the wrong
/// number of columns or broken quoting, or a row without a card name.
/// A valid header with no data rows is [`ImportError::EmptyInput`].
pub fn normalize(bytes: &[u8]) -> Result<Vec<ImportRow>, ImportError> {
    let text = std::str::from_utf8(strip_bom(bytes))
        .map_err(|e| ImportError::malformed(format!("input is not valid UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Err(ImportError::malformed(MISSING_HEADER));
    }

    check_quoting(text)?;

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(|e| ImportError::malformed(format!("bad header: {}", e)))?,
        None => return Err(ImportError::malformed(MISSING_HEADER)),
    };
    if header.len() != EXPECTED_COLUMNS {
        return Err(ImportError::malformed(format!(
            "header has {} columns, expected {}",
            header.len(),
            EXPECTED_COLUMNS
        )));
    }
    if header.get(0) != Some(HEADER_FINGERPRINT) {
        return Err(ImportError::malformed(format!(
            "header must start with '{}', found '{}'",
            HEADER_FINGERPRINT,
            header.get(0).unwrap_or_default()
        )));
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| ImportError::malformed(format!("bad row: {}", e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() != EXPECTED_COLUMNS {
            return Err(ImportError::malformed(format!(
                "line {}: row has {} columns, expected {}",
                line,
                record.len(),
                EXPECTED_COLUMNS
            )));
        }

        let row = ImportRow::from_record(&record);
        if row.card_name.trim().is_empty() {
            return Err(ImportError::malformed(format!(
                "line {}: card name is blank",
                line
            )));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ImportError::EmptyInput);
    }
    Ok(rows)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Reject quoting the `csv` crate would otherwise accept leniently
///
/// Bare quotes inside unquoted fields, characters after a closing quote, and
/// an unterminated quoted field are all errors.
fn check_quoting(text: &str) -> Result<(), ImportError> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1u64;

    for c in text.chars() {
        state = match (state, c) {
            (QuoteState::Quoted, '"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, '"') => QuoteState::Quoted,
            (QuoteState::FieldStart, '"') => QuoteState::Quoted,
            (QuoteState::Unquoted, '"') => {
                return Err(ImportError::malformed(format!(
                    "line {}: bare quote in unquoted field",
                    line
                )));
            }
            (_, ',' | '\r' | '\n') => QuoteState::FieldStart,
            (QuoteState::QuoteInQuoted, _) => {
                return Err(ImportError::malformed(format!(
                    "line {}: unexpected character after closing quote",
                    line
                )));
            }
            (QuoteState::FieldStart | QuoteState::Unquoted, _) => QuoteState::Unquoted,
        };
        if c == '\n' {
            line += 1;
        }
    }

    if state == QuoteState::Quoted {
        return Err(ImportError::malformed(format!(
            "line {}: quoted field is never closed",
            line
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Set,Card Number,Card Name,Card Title,Card Type,Aspects,Variant Type,Rarity,Foil,Stamp,Artist,Owned Count,Group Owned Count";
    const CHEWBACCA: &str =
        "LAW,001,Chewbacca,Hero of Kessel,Character,Heroism,Normal,Rare,false,,Artist One,0,0";
    const QUOTED_VADER: &str = r#"SOR,010,"Darth Vader","Dark Lord of the Sith",Leader,"Villainy, Aggression",Normal,Rare,false,,"An ""Artist""",1,1"#;

    fn export(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out
    }

    #[test]
    fn test_normalize_single_row() {
        let rows = normalize(export(&[CHEWBACCA]).as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.set, "LAW");
        assert_eq!(row.card_number, "001");
        assert_eq!(row.card_type, "Character");
        assert_eq!(row.artist, "Artist One");
        assert_eq!(row.stamp, "");
        assert_eq!(row.group_owned_count, "0");
        assert_eq!(row.display_name(), "Chewbacca, Hero of Kessel");
    }

    #[test]
    fn test_display_name_blank_title() {
        let row = ImportRow {
            card_name: "Lothal Rebel".to_string(),
            card_title: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(row.display_name(), "Lothal Rebel");
    }

    #[test]
    fn test_quoted_fields() {
        let rows = normalize(export(&[QUOTED_VADER]).as_bytes()).unwrap();
        assert_eq!(rows[0].display_name(), "Darth Vader, Dark Lord of the Sith");
        assert_eq!(rows[0].aspects, "Villainy, Aggression");
        assert_eq!(rows[0].artist, r#"An "Artist""#);
    }

    #[test]
    fn test_bom_is_stripped() {
        let plain = export(&[CHEWBACCA]);
        let mut with_bom = UTF8_BOM.to_vec();
        with_bom.extend_from_slice(plain.as_bytes());

        assert_eq!(
            normalize(&with_bom).unwrap(),
            normalize(plain.as_bytes()).unwrap()
        );
        assert_eq!(strip_bom(b"Set"), b"Set");
    }

    #[test]
    fn test_wrong_header() {
        let short = "Set,Card Number,Card Name\nLAW,001,Chewbacca\n";
        assert!(matches!(
            normalize(short.as_bytes()),
            Err(ImportError::MalformedInput { .. })
        ));

        let renamed = export(&[CHEWBACCA]).replacen("Set", "Edition", 1);
        assert!(matches!(
            normalize(renamed.as_bytes()),
            Err(ImportError::MalformedInput { .. })
        ));

        let header_only_wrong = "Edition,a,b,c,d,e,f,g,h,i,j,k,l\n";
        assert!(matches!(
            normalize(header_only_wrong.as_bytes()),
            Err(ImportError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_header_only_is_empty_input() {
        assert!(matches!(
            normalize(export(&[]).as_bytes()),
            Err(ImportError::EmptyInput)
        ));
        assert!(matches!(
            normalize(HEADER.as_bytes()),
            Err(ImportError::EmptyInput)
        ));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        assert!(matches!(
            normalize(b""),
            Err(ImportError::MalformedInput { .. })
        ));
        assert!(matches!(
            normalize(b"\xEF\xBB\xBF\n"),
            Err(ImportError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_row_with_wrong_column_count() {
        let input = export(&[CHEWBACCA, "LAW,002,Short Row"]);
        let err = normalize(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_blank_card_name_rejected() {
        let input = export(&["LAW,002,  ,,Unit,,Normal,Common,false,,,0,0"]);
        assert!(matches!(
            normalize(input.as_bytes()),
            Err(ImportError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_bad_quoting_rejected() {
        let bare = export(&[r#"LAW,001,Chew"bacca,,Unit,,Normal,Rare,false,,,0,0"#]);
        let trailing = export(&[r#"LAW,001,"Chewbacca"x,,Unit,,Normal,Rare,false,,,0,0"#]);
        let unterminated = export(&[r#"LAW,001,"Chewbacca,,Unit,,Normal,Rare,false,,,0,0"#]);

        for input in [bare, trailing, unterminated] {
            assert!(matches!(
                normalize(input.as_bytes()),
                Err(ImportError::MalformedInput { .. })
            ));
        }
    }

    #[test]
    fn test_crlf_line_endings() {
        let input = format!("{}\r\n{}\r\n", HEADER, CHEWBACCA);
        let rows = normalize(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group_owned_count, "0");
    }

    #[test]
    fn test_normalize_reader() {
        let input = export(&[CHEWBACCA, CHEWBACCA]);
        let rows = normalize_reader(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
