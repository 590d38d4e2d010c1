pub mod cli;
pub mod lookup;
pub mod toml_config;

pub use toml_config::ScraperConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "amazon-scraper")]
#[command(about = "Scrape Amazon search results, product pages and reviews")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/amazon-scraper.toml")]
    pub config: String,

    /// Amazon domain to scrape (overrides payload.domains)
    #[arg(long)]
    pub domain: Option<String>,

    /// Keyword to search for (overrides payload.keywords)
    #[arg(long)]
    pub keyword: Option<String>,

    /// Scrape again even if an output folder already exists
    #[arg(long)]
    pub force: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Show what would be scraped without fetching anything
    #[arg(long)]
    pub dry_run: bool,
}
