use cardledger::{LedgerConfig, OutputFormat};
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::import::ImportArgs;
use commands::owned::OwnedArgs;
use commands::search::SearchArgs;
use commands::wishlist::WishlistArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.cardledger/cardledger.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a collection export (CSV) into the collection.
    Import(ImportArgs),

    /// List cards owned fewer times than their target.
    Wishlist(WishlistArgs),

    /// Search cards in the collection by name.
    Search(SearchArgs),

    /// Change the number of copies owned of a card.
    Owned(OwnedArgs),

    /// Show configuration and collection status.
    Config(ConfigArgs),
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match LedgerConfig::new(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Import(args) => commands::import::run(&config, args, cli.format),
        Commands::Wishlist(args) => commands::wishlist::run(&config, args, cli.format),
        Commands::Search(args) => commands::search::run(&config, args, cli.format),
        Commands::Owned(args) => commands::owned::run(&config, args, cli.format),
        Commands::Config(args) => commands::config::run(&config, args, cli.format),
    }
}
