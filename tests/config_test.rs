use amazon_scraper::config::toml_config::SelectorSpec;
use amazon_scraper::utils::validation::Validate;
use amazon_scraper::{ScrapeError, ScraperConfig};
use std::path::Path;

#[test]
fn test_sample_config_loads_and_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/amazon-scraper.toml");
    let config = ScraperConfig::from_file(&path).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.payload.domains, vec!["com", "de"]);
    assert_eq!(config.base_url("de"), "https://www.amazon.de");
    assert_eq!(config.options.concurrent_requests, 2);
    assert_eq!(
        config.selectors.get("store"),
        Some(&SelectorSpec::One("#bylineInfo".to_string()))
    );
    assert_eq!(config.resolved_selectors()["title"], vec!["#productTitle", "#title"]);
}

#[test]
fn test_unknown_sentiment_is_rejected() {
    let result = ScraperConfig::from_toml_str_with_env(
        "[payload]\ntarget_folder = \"./out\"\n\n[options]\nexport_reviews = [\"6_star\"]\n",
        None,
    );
    assert!(matches!(
        result,
        Err(ScrapeError::ConfigValidationError { .. })
    ));
}

#[test]
fn test_configuration_errors_are_critical() {
    let err = ScraperConfig::from_toml_str_with_env("[payload\n", None).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(!err.recovery_suggestion().is_empty());
}
