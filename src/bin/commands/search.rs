use cardledger::lens::collection::CollectionLens;
use cardledger::lens::utils::OutputFormat;
use cardledger::LedgerConfig;
use clap::Args;

/// Arguments for the Search command
#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for in card names (case-insensitive); empty lists every card
    pub query: Vec<String>,
}

pub fn run(config: &LedgerConfig, args: SearchArgs, output_format: OutputFormat) {
    let query = super::join_query(&args.query);

    let db = super::open_database(config);
    let lens = CollectionLens::new(&db);

    match lens.search(&query) {
        Ok(cards) if cards.is_empty() && output_format.is_table() => {
            println!("No cards matching '{}'", query);
        }
        Ok(cards) => println!("{}", lens.format_results(&cards, output_format)),
        Err(e) => {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        }
    }
}
