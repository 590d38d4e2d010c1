use crate::adapters::HttpFetcher;
use crate::config::cli::LocalStorage;
use crate::config::ScraperConfig;
use crate::core::etl::EtlEngine;
use crate::core::pipeline::{RunTarget, ScrapePipeline};
use crate::utils::error::{Result, ScrapeError};
use crate::utils::logger::run_dispatch;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::instrument::WithSubscriber;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    /// Remove earlier output for the same keyword and domain instead of skipping.
    pub force: bool,
    pub verbose: bool,
    pub json_logs: bool,
    pub monitor: bool,
}

#[derive(Debug)]
pub enum WorkflowOutcome {
    Completed { output: String },
    Skipped,
    NoResults,
    Failed(ScrapeError),
}

/// Earlier runs: every entry of `target_root` named `<keyword>_<domain>_*`.
pub fn existing_runs(target_root: &Path, keyword: &str, domain: &str) -> Result<Vec<PathBuf>> {
    if !target_root.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{}_{}_", keyword, domain);
    let mut runs = Vec::new();
    for entry in std::fs::read_dir(target_root)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            runs.push(entry.path());
        }
    }
    runs.sort();
    Ok(runs)
}

pub fn output_directory(target_root: &Path, keyword: &str, domain: &str, date: NaiveDate) -> PathBuf {
    target_root.join(format!("{}_{}_{}", keyword, domain, date.format("%Y%m%d")))
}

async fn remove_run(path: &Path) {
    let removed = if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    if let Err(e) = removed {
        tracing::warn!("⚠️ Could not remove {}: {}", path.display(), e);
    }
}

async fn scrape(
    config: &ScraperConfig,
    keyword: &str,
    domain: &str,
    monitor: bool,
    output_dir: &Path,
) -> Result<Option<String>> {
    let source = HttpFetcher::new(&config.http)?;
    let storage = LocalStorage::new(output_dir);
    let pipeline = ScrapePipeline::new(storage, source, config, RunTarget::new(config, keyword, domain));

    EtlEngine::new_with_monitoring(pipeline, monitor).run().await
}

async fn run_scrape(
    config: &ScraperConfig,
    keyword: &str,
    domain: &str,
    monitor: bool,
    output_dir: PathBuf,
) -> WorkflowOutcome {
    match scrape(config, keyword, domain, monitor, &output_dir).await {
        Ok(Some(output)) => {
            tracing::info!("✅ Finished scraping {} on {}", keyword, domain);
            WorkflowOutcome::Completed { output }
        }
        Ok(None) => {
            tracing::warn!("No results found for {} on {}", keyword, domain);
            WorkflowOutcome::NoResults
        }
        Err(e) => {
            tracing::error!("ABORTED Error scraping {} on {}: {}", keyword, domain, e);
            WorkflowOutcome::Failed(e)
        }
    }
}

/// Scrapes one keyword on one domain into `<target>/<keyword>_<domain>_<YYYYMMDD>`.
pub async fn scrape_workflow(
    config: &ScraperConfig,
    keyword: &str,
    domain: &str,
    flags: RunFlags,
) -> WorkflowOutcome {
    let target_root = Path::new(&config.payload.target_folder);

    let earlier = match existing_runs(target_root, keyword, domain) {
        Ok(earlier) => earlier,
        Err(e) => {
            tracing::error!("ABORTED Error scraping {} on {}: {}", keyword, domain, e);
            return WorkflowOutcome::Failed(e);
        }
    };
    for folder in earlier {
        if flags.force {
            tracing::info!(
                "Force scraping {} on {}: removing {}",
                keyword,
                domain,
                folder.display()
            );
            remove_run(&folder).await;
        } else {
            tracing::info!(
                "Skipping {} on {} as it has already been scraped",
                keyword,
                domain
            );
            return WorkflowOutcome::Skipped;
        }
    }

    let output_dir = output_directory(
        target_root,
        keyword,
        domain,
        chrono::Local::now().date_naive(),
    );

    // 每次執行各自的 <level>.log，結束後即關閉
    let dispatch = match run_dispatch(
        flags.verbose,
        flags.json_logs,
        &output_dir,
        &config.options.log_levels,
    ) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            tracing::error!("ABORTED Error scraping {} on {}: {}", keyword, domain, e);
            return WorkflowOutcome::Failed(e);
        }
    };

    run_scrape(config, keyword, domain, flags.monitor, output_dir)
        .with_subscriber(dispatch)
        .await
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub no_results: Vec<String>,
    pub failed: Vec<(String, ScrapeError)>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.completed.len() + self.skipped.len() + self.no_results.len() + self.failed.len()
    }

    /// The failure with the highest severity, used for the exit code.
    pub fn worst_failure(&self) -> Option<&ScrapeError> {
        self.failed
            .iter()
            .map(|(_, e)| e)
            .max_by_key(|e| e.severity())
    }
}

/// Runs every keyword on every domain, keywords first. A failed run does not
/// stop the others.
pub async fn run_all(
    config: &ScraperConfig,
    domain_override: Option<&str>,
    keyword_override: Option<&str>,
    flags: RunFlags,
) -> RunSummary {
    let domains: Vec<String> = match domain_override {
        Some(domain) => vec![domain.to_string()],
        None => config.payload.domains.clone(),
    };
    let keywords: Vec<String> = match keyword_override {
        Some(keyword) => vec![keyword.to_string()],
        None => config.payload.keywords.clone(),
    };

    let mut summary = RunSummary::default();
    for keyword in &keywords {
        for domain in &domains {
            tracing::info!("Scraping {} on {}", keyword, domain);
            let label = format!("{} on {}", keyword, domain);
            match scrape_workflow(config, keyword, domain, flags).await {
                WorkflowOutcome::Completed { output } => summary.completed.push(output),
                WorkflowOutcome::Skipped => summary.skipped.push(label),
                WorkflowOutcome::NoResults => summary.no_results.push(label),
                WorkflowOutcome::Failed(e) => summary.failed.push((label, e)),
            }
        }
    }

    tracing::info!(
        "Scraping completed: {} done, {} skipped, {} without results, {} failed",
        summary.completed.len(),
        summary.skipped.len(),
        summary.no_results.len(),
        summary.failed.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_directory_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            output_directory(Path::new("/data"), "prayer shawl", "de", date),
            PathBuf::from("/data/prayer shawl_de_20240307")
        );
    }

    #[test]
    fn test_existing_runs_match_keyword_and_domain() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["laptop_com_20240101", "laptop_de_20240101", "laptops_com_20240101"] {
            std::fs::create_dir(temp_dir.path().join(name)).unwrap();
        }

        let runs = existing_runs(temp_dir.path(), "laptop", "com").unwrap();
        assert_eq!(runs, vec![temp_dir.path().join("laptop_com_20240101")]);

        assert!(existing_runs(&temp_dir.path().join("missing"), "laptop", "com")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_worst_failure_by_severity() {
        let mut summary = RunSummary::default();
        summary.failed.push((
            "a on com".to_string(),
            ScrapeError::BlockedError {
                url: "https://www.amazon.com/s".to_string(),
            },
        ));
        summary
            .failed
            .push(("b on com".to_string(), ScrapeError::processing("boom")));

        assert!(matches!(
            summary.worst_failure(),
            Some(ScrapeError::ProcessingError { .. })
        ));
        assert_eq!(summary.total(), 2);
    }
}
