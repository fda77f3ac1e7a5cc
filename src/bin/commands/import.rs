use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use cardledger::lens::import::{
    normalize, CardTypeClassifier, HttpImageSource, ImportError, ImportLens, ImportOptions,
    ImportProgress, ImportProgressCallback, ImportSummary,
};
use cardledger::lens::utils::OutputFormat;
use cardledger::LedgerConfig;
use clap::Args;

const SUMMARY_COLUMNS: [&str; 6] = [
    "inserted",
    "duplicate_in_batch",
    "already_in_store",
    "images_cached",
    "images_downloaded",
    "images_unavailable",
];

/// Arguments for the Import command
#[derive(Args)]
pub struct ImportArgs {
    /// Collection export to import, or "-" for stdin
    #[clap(name = "FILE")]
    pub file: PathBuf,

    /// Only use images already on disk, never download
    #[clap(long)]
    pub no_download: bool,

    /// Do not show a progress bar
    #[clap(long)]
    pub no_progress: bool,
}

fn read_input(file: &PathBuf) -> std::io::Result<Vec<u8>> {
    if file.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        Ok(bytes)
    } else {
        std::fs::read(file)
    }
}

fn progress_bar_callback() -> (indicatif::ProgressBar, ImportProgressCallback) {
    let pb = indicatif::ProgressBar::new(0);
    if let Ok(sty) = indicatif::ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    ) {
        pb.set_style(sty.progress_chars("##-"));
    }

    let pb_for_updates = pb.clone();
    let callback: ImportProgressCallback =
        Arc::new(move |progress: ImportProgress| update_bar(&pb_for_updates, progress));
    (pb, callback)
}

fn update_bar(pb: &indicatif::ProgressBar, progress: ImportProgress) {
    match progress {
        ImportProgress::Started { total_rows } => pb.set_length(total_rows as u64),
        ImportProgress::Row { name, .. } => {
            pb.set_message(name);
            pb.inc(1);
        }
        ImportProgress::Completed { .. } => pb.finish_and_clear(),
    }
}

pub fn run(config: &LedgerConfig, args: ImportArgs, output_format: OutputFormat) {
    let ImportArgs {
        file,
        no_download,
        no_progress,
    } = args;

    let bytes = match read_input(&file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", file.display(), e);
            std::process::exit(1);
        }
    };

    // Reject bad input before touching the database
    let rows = match normalize(&bytes) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Import failed: {}", e);
            std::process::exit(1);
        }
    };

    let db = super::open_database(config);

    let mut lens = ImportLens::new(&db, config.images_dir.as_str())
        .with_classifier(CardTypeClassifier::new(&config.non_mainboard_types))
        .with_download_interval(config.image_download_interval());
    match (&config.image_base_url, no_download) {
        (Some(base_url), false) => {
            let source = Arc::new(HttpImageSource::new(config.image_fetch_timeout()));
            lens = lens.with_image_source(base_url.as_str(), source);
        }
        (None, false) => {
            eprintln!("No image_base_url configured; only images already on disk will be used");
        }
        (_, true) => {}
    }

    let show_progress = !no_progress && output_format.is_table();
    let (pb, callback) = if show_progress {
        let (pb, callback) = progress_bar_callback();
        (Some(pb), Some(callback))
    } else {
        (None, None)
    };

    let result = lens.import_with_progress(&rows, &ImportOptions::default(), callback);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match result {
        Ok(summary) => print_summary(&summary, output_format),
        Err(ImportError::Store(e)) => {
            eprintln!("Import stopped by a database error: {:#}", e);
            eprintln!("Cards inserted before the error were kept; rerun the import to continue.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Import failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(summary: &ImportSummary, output_format: OutputFormat) {
    match output_format {
        OutputFormat::Json | OutputFormat::JsonLine => match serde_json::to_string(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing import summary: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing import summary: {}", e),
        },
        OutputFormat::Psv => {
            println!("{}", SUMMARY_COLUMNS.join("|"));
            println!(
                "{}|{}|{}|{}|{}|{}",
                summary.inserted,
                summary.skipped_duplicate_in_batch,
                summary.skipped_already_in_store,
                summary.images_cached,
                summary.images_downloaded,
                summary.images_unavailable
            );
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            println!("Imported {} new cards", summary.inserted);
            println!(
                "  Skipped:  {} repeated in file, {} already in collection",
                summary.skipped_duplicate_in_batch, summary.skipped_already_in_store
            );
            println!(
                "  Images:   {} from disk, {} downloaded, {} unavailable",
                summary.images_cached, summary.images_downloaded, summary.images_unavailable
            );
        }
    }
}
