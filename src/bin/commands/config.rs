use cardledger::lens::utils::OutputFormat;
use cardledger::{format_size, get_collection_info, CollectionInfo, LedgerConfig, SCHEMA_VERSION};
use clap::Args;
use serde::Serialize;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Also list the files in the data directory
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    images_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base_url: Option<String>,
    image_download_interval_ms: u64,
    image_fetch_timeout_secs: u64,
    non_mainboard_types: Vec<String>,
    collection: CollectionInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<FileInfo>>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

fn list_files(dir: &str) -> Vec<FileInfo> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    let modified = metadata.modified().ok().map(|t| {
                        let datetime: chrono::DateTime<chrono::Utc> = t.into();
                        datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
                    });
                    files.push(FileInfo {
                        name: entry.file_name().to_string_lossy().to_string(),
                        size_bytes: metadata.len(),
                        modified,
                    });
                }
            }
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}

pub fn run(config: &LedgerConfig, args: ConfigArgs, output_format: OutputFormat) {
    let ConfigArgs { verbose } = args;

    let config_info = ConfigInfo {
        config_file: LedgerConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        images_dir: config.images_dir.clone(),
        image_base_url: config.image_base_url.clone(),
        image_download_interval_ms: config.image_download_interval_ms,
        image_fetch_timeout_secs: config.image_fetch_timeout_secs,
        non_mainboard_types: config.non_mainboard_types.clone(),
        collection: get_collection_info(config),
        files: verbose.then(|| list_files(&config.data_dir)),
    };

    match output_format {
        OutputFormat::Json | OutputFormat::JsonLine => match serde_json::to_string(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config info: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config info: {}", e),
        },
        _ => print_config_table(config, &config_info),
    }
}

fn print_config_table(config: &LedgerConfig, info: &ConfigInfo) {
    println!("Cardledger Configuration");
    println!("========================\n");

    println!("General:");
    println!("  Config file:    {}", info.config_file);
    for line in config.summary().lines() {
        println!("  {}", line);
    }
    println!();

    let collection = &info.collection;
    println!("Collection Database:");
    println!(
        "  Status:         {}",
        if collection.exists {
            "exists"
        } else {
            "not created"
        }
    );
    if let Some(size) = collection.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    match (&collection.schema_version, &collection.pending_migrations) {
        (_, Some(pending)) => println!(
            "  Schema:         {} step(s) pending: {}",
            pending.len(),
            pending.join(", ")
        ),
        (Some(version), None) => println!("  Schema:         v{} of v{}", version, SCHEMA_VERSION),
        (None, None) => println!("  Schema:         not initialized"),
    }
    if let Some(count) = collection.card_count {
        println!("  Cards:          {}", count);
    }
    if let Some(ref at) = collection.last_import_at {
        println!("  Last import:    {}", at);
    }
    println!();

    println!("Images:");
    println!("  Directory:      {}", collection.images_dir);
    println!(
        "  Cached:         {} files, {}",
        collection.image_count,
        format_size(collection.image_bytes)
    );

    if let Some(ref files) = info.files {
        println!();
        println!("Data Directory Files:");
        println!("  {:<40} {:>12}  {}", "Name", "Size", "Modified");
        println!("  {}", "-".repeat(80));
        for file in files {
            println!(
                "  {:<40} {:>12}  {}",
                file.name,
                format_size(file.size_bytes),
                file.modified.as_deref().unwrap_or("-")
            );
        }
    }

    eprintln!();
    eprintln!("Tips:");
    eprintln!("  Use --verbose (-v) to see all files in the data directory");
    eprintln!("  Use --format json for machine-readable output");
    eprintln!("  Edit ~/.cardledger/cardledger.toml to customize settings");
}
