use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use search_ai::{EnrichOptions, Mode, SearchConfig, Searcher};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// The main entry point of the application.
///
/// Usage: `search-ai [--json] [--basic] <query> [count] [search|news]`
///
/// The configuration is read from the file named by `SEARCH_AI_CONFIG`, if set, and from
/// `SEARCH_AI_*` environment variables. Results are printed as markdown, or as JSON
/// with `--json`.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (flags, args): (Vec<String>, Vec<String>) =
        std::env::args().skip(1).partition(|arg| arg.starts_with("--"));
    let json = flags.iter().any(|flag| flag == "--json");
    let extend = !flags.iter().any(|flag| flag == "--basic");

    let query = args
        .first()
        .cloned()
        .unwrap_or_else(|| "rust programming".to_string());

    let count: usize = match args.get(1) {
        Some(count) => count
            .parse()
            .with_context(|| format!("invalid result count: {count}"))?,
        None => 5,
    };

    let mode: Mode = match args.get(2) {
        Some(mode) => mode.parse()?,
        None => Mode::Web,
    };

    // Load configuration
    let config_path = std::env::var_os("SEARCH_AI_CONFIG").map(PathBuf::from);
    let config = SearchConfig::load(config_path.as_deref())?;

    let start_time = Instant::now();
    let searcher = Searcher::new(config)?;
    let request = searcher.request(&query).mode(mode).length(count).unique(true);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid spinner template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Searching for '{}'...", query));

    let results = match searcher.search(&request).await {
        Ok(results) => results,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Search failed for '{}': {}", query, e);
            return Err(e.into());
        }
    };

    spinner.set_message(format!("Reading {} pages...", results.len()));
    let options = EnrichOptions {
        extend,
        ..EnrichOptions::default()
    };

    let output = if json {
        serde_json::to_string_pretty(&results.to_json(&options).await?)?
    } else {
        results.to_markdown(&options).await?
    };
    spinner.finish_and_clear();

    info!("Processing time: {:.2?}", start_time.elapsed());
    println!("{}", output);

    Ok(())
}
