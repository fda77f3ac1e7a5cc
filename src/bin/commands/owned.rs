use cardledger::lens::collection::CollectionLens;
use cardledger::lens::utils::OutputFormat;
use cardledger::LedgerConfig;
use clap::{Args, Subcommand};

/// Arguments for the Owned command
#[derive(Args)]
pub struct OwnedArgs {
    #[clap(subcommand)]
    pub action: OwnedAction,
}

#[derive(Subcommand)]
pub enum OwnedAction {
    /// Add owned copies of a card
    Inc {
        /// Card id, as shown by `search`
        id: i64,

        /// Number of copies to add
        #[clap(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Remove owned copies of a card (stops at zero)
    Dec {
        /// Card id, as shown by `search`
        id: i64,

        /// Number of copies to remove
        #[clap(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

pub fn run(config: &LedgerConfig, args: OwnedArgs, output_format: OutputFormat) {
    let db = super::open_database(config);
    let lens = CollectionLens::new(&db);

    let result = match args.action {
        OwnedAction::Inc { id, count } => lens.add_owned(id, count),
        OwnedAction::Dec { id, count } => lens.remove_owned(id, count),
    };

    match result {
        Ok(card) => println!("{}", lens.format_results(&[card], output_format)),
        Err(e) => {
            eprintln!("Failed to update owned count: {}", e);
            std::process::exit(1);
        }
    }
}
