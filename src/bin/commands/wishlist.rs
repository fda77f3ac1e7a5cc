use cardledger::lens::utils::OutputFormat;
use cardledger::lens::wishlist::WishlistLens;
use cardledger::LedgerConfig;
use clap::Args;

/// Arguments for the Wishlist command
#[derive(Args)]
pub struct WishlistArgs {
    /// Only show cards whose name contains this text (case-insensitive)
    pub query: Vec<String>,

    /// Print only the totals
    #[clap(short, long)]
    pub summary: bool,
}

pub fn run(config: &LedgerConfig, args: WishlistArgs, output_format: OutputFormat) {
    let WishlistArgs { query, summary } = args;
    let query = super::join_query(&query);

    let db = super::open_database(config);
    let lens = WishlistLens::new(&db);

    let entries = match lens.wishlist(&query) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Failed to build wishlist: {}", e);
            std::process::exit(1);
        }
    };
    let totals = lens.summary(&entries);

    if summary {
        if output_format.is_json() {
            match serde_json::to_string(&totals) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error serializing wishlist summary: {}", e),
            }
        } else {
            println!(
                "{} cards, {} copies missing",
                totals.cards, totals.missing_copies
            );
        }
        return;
    }

    if entries.is_empty() && output_format.is_table() {
        println!("Nothing missing, every card meets its target");
        return;
    }

    println!("{}", lens.format_results(&entries, output_format));
    if output_format.is_table() {
        eprintln!(
            "{} cards, {} copies missing",
            totals.cards, totals.missing_copies
        );
    }
}
