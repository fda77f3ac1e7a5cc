pub mod config;
pub mod import;
pub mod owned;
pub mod search;
pub mod wishlist;

use cardledger::database::CollectionDatabase;
use cardledger::LedgerConfig;

/// Open the collection database, exiting the process on failure
pub(crate) fn open_database(config: &LedgerConfig) -> CollectionDatabase {
    match CollectionDatabase::open_in_dir(&config.data_dir) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    }
}

/// Join positional query words into one search string
pub(crate) fn join_query(query: &[String]) -> String {
    query.join(" ").trim().to_string()
}
