use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use paper_harvest::config::{find_config_file, load_config, Config};
use paper_harvest::harvest::{Harvester, MetadataAggregator};
use paper_harvest::models::Attribute;
use paper_harvest::sources::ProviderRegistry;
use paper_harvest::storage::{source_counts, DatasetStore};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paper Harvest - Keep a dump of catalog papers enriched with abstracts and metadata
#[derive(Parser, Debug)]
#[command(name = "paper-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Enrich catalog papers with abstracts and metadata from scholarly APIs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the dump and the changelog (overrides storage.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enrich papers that are new in the catalog and update the dump (default)
    #[command(alias = "u")]
    Update,

    /// Look a single paper up across all providers
    #[command(alias = "l")]
    Lookup {
        /// Digital Object Identifier
        #[arg(long, required_unless_present = "title")]
        doi: Option<String>,

        /// Paper title (at least 3 words to be looked up)
        #[arg(long)]
        title: Option<String>,

        /// Print the merged record as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Show abstract counts per source in the current dump
    Stats,

    /// Show configuration
    Config {
        /// Print the built-in defaults instead of the effective configuration
        #[arg(long)]
        default: bool,
    },
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paper_harvest={}", level)),
    );

    if config.logging.format.as_deref() == Some("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_tracing(&cli, &config);

    match cli.command.as_ref().unwrap_or(&Commands::Update) {
        Commands::Update => {
            let harvester = Harvester::from_config(&config)?
                .with_progress(!cli.quiet && std::io::stderr().is_terminal());
            let summary = harvester.run().await?;

            if !cli.quiet {
                println!(
                    "{} papers in catalog, {} new, {} enriched with an abstract ({} chunks written)",
                    summary.catalog_papers, summary.new_papers, summary.enriched, summary.chunks
                );
            }
        }

        Commands::Lookup { doi, title, json } => {
            let registry = ProviderRegistry::from_config(&config)?;
            tracing::info!("Querying providers: {}", registry.ids().join(", "));
            let aggregator = MetadataAggregator::new(registry.into_providers());

            let record = aggregator.query(doi.as_deref(), title.as_deref()).await;

            if *json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else if record.is_empty() {
                println!("No metadata found");
            } else {
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Attribute", "Value", "Source"]);

                for attribute in Attribute::ALL {
                    if let Some(field) = record.field(attribute) {
                        table.add_row(vec![
                            Cell::new(attribute.to_string())
                                .add_attribute(comfy_table::Attribute::Bold),
                            Cell::new(&field.value),
                            Cell::new(&field.source),
                        ]);
                    }
                }
                println!("{table}");
            }
        }

        Commands::Stats => {
            let store = DatasetStore::open(config.dump_path())?;
            let rows = store.load()?;

            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Source", "Papers"]);
            for (source, count) in source_counts(&rows) {
                table.add_row(vec![Cell::new(source), Cell::new(count)]);
            }

            println!("{} ({} papers)", store.path().display(), rows.len());
            println!("{table}");
        }

        Commands::Config { default } => {
            let rendered = if *default {
                Config::default().to_toml()?
            } else {
                config.to_toml()?
            };
            print!("{}", rendered);
        }
    }

    Ok(())
}
