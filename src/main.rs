//! Linkloom main entry point
//!
//! Command-line interface for the linkloom batch scraper: point it at a seed
//! page and it extracts the page's links, groups them by path, and scrapes
//! each group through the content cache, printing results as groups finish.

use anyhow::Context;
use clap::Parser;
use linkloom::cache::{CacheEntry, CacheResult, ContentCache, SqliteCache};
use linkloom::config::{load_config_with_hash, Config};
use linkloom::jobs::{JobStatus, JobStore};
use linkloom::scrape::{GroupResult, HttpFetcher, ScrapeOutcome};
use linkloom::session;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Linkloom: a cached batch scraper
///
/// Extracts every link from a seed page, groups them by first path segment,
/// and retrieves readable content for each link. Previously scraped pages
/// are served from the cache; the rest are fetched concurrently under a
/// per-group time budget.
#[derive(Parser, Debug)]
#[command(name = "linkloom")]
#[command(version)]
#[command(about = "A cached batch scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to extract links from
    #[arg(value_name = "SEED_URL")]
    seed_url: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Extract and group links without scraping content
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show cache and job statistics and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Ignore cached content (fresh fetches are still stored)
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) =
        load_config_with_hash(&cli.config).context("Failed to load configuration")?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let seed_url = cli
        .seed_url
        .context("SEED_URL is required unless --stats is given")?;

    if cli.dry_run {
        handle_dry_run(&config, &seed_url).await
    } else {
        handle_run(config, &seed_url, cli.no_cache).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkloom=info,warn"),
            1 => EnvFilter::new("linkloom=debug,info"),
            2 => EnvFilter::new("linkloom=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows cache and job statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db_path = Path::new(&config.output.database_path);
    println!("Database: {}\n", config.output.database_path);

    let cache = SqliteCache::new(db_path)?;
    let stats = cache.stats()?;

    println!("Cached pages: {}", stats.total_entries);
    let mut kinds: Vec<_> = stats.entries_by_kind.iter().collect();
    kinds.sort();
    for (kind, count) in kinds {
        println!("  {:<20} {}", kind, count);
    }

    let jobs = JobStore::new(db_path)?;
    println!("\nJobs:");
    for status in [JobStatus::Pending, JobStatus::Completed, JobStatus::Failed] {
        println!(
            "  {:<20} {}",
            status.to_db_string(),
            jobs.count_by_status(status)?
        );
    }

    Ok(())
}

/// Handles the --dry-run mode: extracts and groups links, no scraping
async fn handle_dry_run(config: &Config, seed_url: &str) -> anyhow::Result<()> {
    use linkloom::group::group_links;
    use linkloom::scrape::PageFetcher;

    println!("=== Linkloom Dry Run ===\n");

    let fetcher = HttpFetcher::from_config(config)?;
    let extraction = fetcher
        .extract_links(seed_url)
        .await
        .with_context(|| format!("Failed to extract links from {}", seed_url))?;

    println!("Seed: {} (status {})", extraction.final_url, extraction.status_code);
    println!("Links found: {}\n", extraction.links.len());

    let grouping = group_links(&extraction.links);

    println!("Groups ({}):", grouping.groups.len());
    for group in &grouping.groups {
        println!("  {} ({} links)", group.name, group.links.len());
        for link in &group.links {
            println!("    - {}", link);
        }
    }

    if !grouping.malformed.is_empty() {
        println!("\nMalformed links ({}):", grouping.malformed.len());
        for raw in &grouping.malformed {
            println!("  - {}", raw);
        }
    }

    Ok(())
}

/// Cache adapter for --no-cache: every lookup misses, stores pass through,
/// so a run refreshes the cache without ever reading stale content
struct WriteOnlyCache(SqliteCache);

#[async_trait::async_trait]
impl ContentCache for WriteOnlyCache {
    async fn lookup(&self, _link: &url::Url) -> CacheResult<Option<CacheEntry>> {
        Ok(None)
    }

    async fn store(&self, link: &url::Url, entry: &CacheEntry) -> CacheResult<()> {
        self.0.store(link, entry).await
    }
}

/// Handles the main scrape operation
async fn handle_run(config: Config, seed_url: &str, no_cache: bool) -> anyhow::Result<()> {
    let db_path = Path::new(&config.output.database_path).to_path_buf();

    let cache: Arc<dyn ContentCache> = if no_cache {
        tracing::info!("Cache lookups disabled for this run");
        Arc::new(WriteOnlyCache(SqliteCache::new(&db_path)?))
    } else {
        Arc::new(SqliteCache::new(&db_path)?)
    };

    let fetcher = Arc::new(HttpFetcher::from_config(&config)?);
    let policy = config.scrape.batch_policy();

    let jobs = JobStore::new(&db_path)?;
    let job_id = jobs.create(seed_url)?;

    let stream = session::run(seed_url, fetcher, cache, policy).await;

    let mut stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            jobs.finalize(
                &job_id,
                JobStatus::Failed,
                Some(&serde_json::json!({ "error": e.to_string() })),
            )?;
            return Err(e).context("Seed extraction failed");
        }
    };

    println!("Seed: {}", stream.seed_url);
    println!("Groups: {}", stream.group_names.join(", "));
    if !stream.malformed.is_empty() {
        println!("Malformed links ({}):", stream.malformed.len());
        for raw in &stream.malformed {
            println!("  - {}", raw);
        }
    }
    println!();

    let mut summaries = Vec::new();
    while let Some(result) = stream.next().await {
        print_group_result(&result);
        summaries.push(serde_json::json!({
            "name": result.name,
            "links": result.links.len(),
            "cached": result.cached_hits(),
            "fresh": result.fresh_hits(),
            "failed": result.failures(),
            "timed_out": result.timeouts(),
        }));
    }

    jobs.finalize(
        &job_id,
        JobStatus::Completed,
        Some(&serde_json::json!({
            "seed": stream.seed_url,
            "malformed": stream.malformed.len(),
            "groups": summaries,
        })),
    )?;

    tracing::info!("Session complete ({} groups)", stream.group_count());
    Ok(())
}

/// Prints one completed group
fn print_group_result(result: &GroupResult) {
    println!(
        "=== {} ({} links: {} cached, {} fresh, {} failed, {} timed out) ===",
        result.name,
        result.links.len(),
        result.cached_hits(),
        result.fresh_hits(),
        result.failures(),
        result.timeouts()
    );

    for (link, outcome) in result.links.iter().zip(&result.outcomes) {
        match outcome {
            ScrapeOutcome::CachedHit(entry) => {
                println!("  [cached]    {} - {}", link, entry.title)
            }
            ScrapeOutcome::FreshHit(entry) => {
                println!("  [fetched]   {} - {}", link, entry.title)
            }
            ScrapeOutcome::Failed(reason) => println!("  [failed]    {} ({})", link, reason),
            ScrapeOutcome::TimedOut => println!("  [timed out] {}", link),
        }
    }
    println!();
}
