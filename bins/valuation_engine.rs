//! Listing valuation CLI
//!
//! Usage:
//!   valuation_engine evaluate --listing listing.json
//!   valuation_engine evaluate --url https://... --title "PC gamer" --price "450 €" --part "RTX 3060" --part "16GB DDR4"
//!   valuation_engine batch --input listings.jsonl --concurrency 8
//!   valuation_engine history --url https://... --diff
//!   valuation_engine cache list
//!   valuation_engine import-legacy --file data.js
//!   valuation_engine export-legacy --out dashboard/data.js
//!   valuation_engine evaluate --mock --listing listing.json

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;

use valuation::cache::{load_cache, save_cache, FreshnessPolicy, PriceCache};
use valuation::config::Config;
use valuation::estimator::ComponentEstimator;
use valuation::history::{compare, export_legacy, import_legacy, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
use valuation::pipeline::Evaluator;
use valuation::pricing::MockPriceSource;
use valuation::reasoning::MockReasoner;
use valuation::valuation::{parse_price, RawListing};

#[derive(Parser)]
#[command(name = "valuation_engine")]
#[command(about = "Estimate secondhand PC listings and decide BUY or PASS")]
struct Cli {
    #[arg(long, global = true, default_value = "config/valuation.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single listing
    Evaluate {
        /// JSON file with {url, title, price, components}
        #[arg(long)]
        listing: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, default_value = "")]
        title: String,
        /// Asking price as scraped, e.g. "1 500 €"
        #[arg(long)]
        price: Option<String>,
        /// Component name, repeatable
        #[arg(long = "part")]
        parts: Vec<String>,
        /// Mock collaborators, nothing persisted
        #[arg(long)]
        mock: bool,
        #[arg(long)]
        skip_unchanged: bool,
    },
    /// Evaluate every listing of a JSONL file
    Batch {
        #[arg(long)]
        input: String,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        mock: bool,
        #[arg(long)]
        skip_unchanged: bool,
    },
    /// Show stored evaluations
    History {
        #[arg(long)]
        url: Option<String>,
        /// Compare the last two evaluations of --url
        #[arg(long)]
        diff: bool,
    },
    /// Inspect the price cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Import a `window.SCRAP_HISTORY = [...]` file into the history
    ImportLegacy {
        #[arg(long)]
        file: String,
    },
    /// Write the history as a `window.SCRAP_HISTORY = [...]` file
    ExportLegacy {
        #[arg(long)]
        out: String,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Every cached component, sorted by key
    List,
}

fn open_cache(config: &Config) -> Result<PriceCache> {
    load_cache(
        &config.cache_path(),
        FreshnessPolicy::from_max_age(config.cache_max_age()),
        config.cache.similarity_threshold,
    )
}

fn open_history(config: &Config) -> Result<JsonlHistoryStore> {
    JsonlHistoryStore::open(config.history_path())
}

fn build_evaluator(config: &Config, mock: bool, skip_unchanged: bool) -> Result<Arc<Evaluator>> {
    let evaluator = if mock {
        tracing::info!("Mock mode: flat prices, canned reasoning, in-memory history");
        let estimator = ComponentEstimator::new(
            Arc::new(MockPriceSource::flat(100.0)),
            config.pricing.used_ratio,
            config.pricing.timeout(),
        );
        Evaluator::new(
            Arc::new(PriceCache::default()),
            estimator,
            Arc::new(MemoryHistoryStore::new()),
        )
        .with_reasoner(
            Some(Arc::new(MockReasoner::new("Mock reasoning, verdict {verdict}."))),
            Duration::from_millis(100),
        )
    } else {
        Evaluator::from_config(
            config,
            Arc::new(open_cache(config)?),
            Arc::new(open_history(config)?),
        )
    };
    Ok(Arc::new(evaluator.skip_unchanged(skip_unchanged)))
}

fn persist_cache(config: &Config, evaluator: &Evaluator, mock: bool) -> Result<()> {
    if mock {
        return Ok(());
    }
    save_cache(evaluator.cache(), &config.cache_path())?;
    Ok(())
}

fn read_listing(path: &str) -> Result<RawListing> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read listing file: {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse listing: {}", path))
}

fn read_listings(path: &str) -> Result<Vec<RawListing>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open listings file: {}", path))?;
    let mut listings = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let listing: RawListing = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse listing on line {}", lineno + 1))?;
        listings.push(listing);
    }
    Ok(listings)
}

async fn run_evaluate(
    config: &Config,
    listing: RawListing,
    mock: bool,
    skip_unchanged: bool,
) -> Result<()> {
    let evaluator = build_evaluator(config, mock, skip_unchanged)?;
    let outcome = evaluator.evaluate(&listing).await;
    persist_cache(config, &evaluator, mock)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_batch(
    config: &Config,
    input: &str,
    concurrency: Option<usize>,
    mock: bool,
    skip_unchanged: bool,
) -> Result<()> {
    let listings = read_listings(input)?;
    tracing::info!("Loaded {} listings from {}", listings.len(), input);

    let evaluator = build_evaluator(config, mock, skip_unchanged)?;
    let concurrency = concurrency.unwrap_or(config.pipeline.concurrency);
    let results = evaluator.evaluate_batch(listings, concurrency).await;
    persist_cache(config, &evaluator, mock)?;

    for result in results {
        match result {
            Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
            Err(e) => tracing::warn!("{:#}", e),
        }
    }
    Ok(())
}

fn run_history(config: &Config, url: Option<String>, diff: bool) -> Result<()> {
    let history = open_history(config)?;
    let records = match &url {
        Some(url) => history.list_by_url(url)?,
        None => history.list_all()?,
    };

    if diff {
        if url.is_none() {
            anyhow::bail!("--diff needs --url");
        }
        match records.as_slice() {
            [.., previous, latest] => {
                println!("{}", serde_json::to_string_pretty(&compare(previous, latest))?);
            }
            _ => tracing::info!("Fewer than two evaluations, nothing to compare"),
        }
        return Ok(());
    }

    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    tracing::info!("{} evaluations", records.len());
    Ok(())
}

fn run_cache_list(config: &Config) -> Result<()> {
    let cache = open_cache(config)?;
    for entry in cache.entries() {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Evaluate { listing, url, title, price, parts, mock, skip_unchanged } => {
            let listing = match (listing, url) {
                (Some(path), _) => read_listing(&path)?,
                (None, Some(url)) => {
                    let price = price.as_deref().and_then(parse_price);
                    RawListing::new(&url, &title, price, parts)
                }
                (None, None) => anyhow::bail!("Either --listing or --url is required"),
            };
            run_evaluate(&config, listing, mock, skip_unchanged).await?;
        }
        Commands::Batch { input, concurrency, mock, skip_unchanged } => {
            run_batch(&config, &input, concurrency, mock, skip_unchanged).await?;
        }
        Commands::History { url, diff } => {
            run_history(&config, url, diff)?;
        }
        Commands::Cache { action } => match action {
            CacheAction::List => run_cache_list(&config)?,
        },
        Commands::ImportLegacy { file } => {
            let history = open_history(&config)?;
            let summary = import_legacy(std::path::Path::new(&file), &history)?;
            println!(
                "imported {}, skipped {}, repaired {}",
                summary.imported, summary.skipped, summary.repaired
            );
        }
        Commands::ExportLegacy { out } => {
            let history = open_history(&config)?;
            let count = export_legacy(&history, std::path::Path::new(&out))?;
            println!("exported {} evaluations to {}", count, out);
        }
    }

    Ok(())
}
