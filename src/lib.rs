pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::HttpFetcher;
pub use app::{run_all, scrape_workflow, RunFlags, RunSummary, WorkflowOutcome};
pub use config::{cli::LocalStorage, ScraperConfig};
pub use core::{etl::EtlEngine, pipeline::ScrapePipeline};
pub use utils::error::{Result, ScrapeError};
