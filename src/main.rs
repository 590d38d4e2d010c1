use amazon_scraper::utils::{logger, validation::Validate};
use amazon_scraper::{run_all, CliArgs, RunFlags, ScraperConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose, args.json_logs);

    tracing::info!("Starting amazon-scraper CLI");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 載入並驗證配置
    let config = match ScraperConfig::from_file(&args.config).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code().max(1));
        }
    };

    let monitor = args.monitor.unwrap_or(config.monitoring_enabled());
    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if args.dry_run {
        let domains = args
            .domain
            .clone()
            .map(|d| vec![d])
            .unwrap_or_else(|| config.payload.domains.clone());
        let keywords = args
            .keyword
            .clone()
            .map(|k| vec![k])
            .unwrap_or_else(|| config.payload.keywords.clone());

        println!("🔎 Dry run: nothing will be fetched");
        println!("📁 Target folder: {}", config.payload.target_folder);
        for keyword in &keywords {
            for domain in &domains {
                println!("  - {} on {}", keyword, config.base_url(domain));
            }
        }
        return Ok(());
    }

    let flags = RunFlags {
        force: args.force,
        verbose: args.verbose,
        json_logs: args.json_logs,
        monitor,
    };

    let summary = run_all(
        &config,
        args.domain.as_deref(),
        args.keyword.as_deref(),
        flags,
    )
    .await;

    for output in &summary.completed {
        println!("📁 Output saved to: {}", output);
    }
    for label in &summary.skipped {
        println!("⏭️  Skipped {} (already scraped, use --force)", label);
    }
    for label in &summary.no_results {
        println!("⚠️  No results for {}", label);
    }

    if let Some(e) = summary.worst_failure() {
        for (label, error) in &summary.failed {
            tracing::error!(
                "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                label,
                error,
                error.category(),
                error.severity()
            );
            eprintln!("❌ {}: {}", label, error.user_friendly_message());
        }
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    } else {
        println!("✅ Scraping completed");
    }

    Ok(())
}
