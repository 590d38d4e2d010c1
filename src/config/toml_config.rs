use crate::config::lookup::ConfigDocument;
use crate::core::selectors::SelectorSet;
use crate::domain::model::Sentiment;
use crate::utils::error::Result;
use crate::utils::logger::parse_level;
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

/// Environment variables named `AMAZON_SCRAPER__<SECTION>__<KEY>` override the file.
pub const ENV_PREFIX: &str = "AMAZON_SCRAPER";

pub const DEFAULT_BASE_URL_TEMPLATE: &str = "https://www.amazon.{domain}";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub payload: PayloadConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub selectors: HashMap<String, SelectorSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadConfig {
    pub target_folder: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub base_url_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub max_results: Option<usize>,
    pub max_search_result_pages: Option<usize>,
    pub save_search_pages: bool,
    pub save_images: bool,
    pub save_description_images: bool,
    pub save_full_pages: bool,
    pub export_reviews: Vec<Sentiment>,
    pub create_empty_review_files: bool,
    pub log_levels: Vec<String>,
    pub archive: bool,
    pub concurrent_requests: usize,
    pub store_name_noise: Vec<String>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            max_results: None,
            max_search_result_pages: None,
            save_search_pages: true,
            save_images: false,
            save_description_images: false,
            save_full_pages: false,
            export_reviews: Vec::new(),
            create_empty_review_files: true,
            log_levels: Vec::new(),
            archive: false,
            concurrent_requests: 1,
            store_name_noise: ["Visit the ", "Brand: ", " Store", " Brand"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_seconds: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HashMap::new(),
        }
    }
}

impl HttpConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_secs(self.retry_delay_seconds),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

/// One CSS selector or an ordered list of fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    One(String),
    Many(Vec<String>),
}

impl SelectorSpec {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(selector) => vec![selector.clone()],
            Self::Many(selectors) => selectors.clone(),
        }
    }
}

impl ScraperConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，套用 AMAZON_SCRAPER__ 環境變數
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_toml_str_with_env(content, Some(ENV_PREFIX))
    }

    pub fn from_toml_str_with_env(content: &str, env_prefix: Option<&str>) -> Result<Self> {
        let mut document = ConfigDocument::parse(content)?;
        if let Some(prefix) = env_prefix {
            document.apply_env_overrides(prefix);
        }
        Self::from_document(document)
    }

    pub fn from_document(document: ConfigDocument) -> Result<Self> {
        document.require("payload.target_folder")?;
        document.into_typed()
    }

    pub fn base_url(&self, domain: &str) -> String {
        let template = self
            .payload
            .base_url_template
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL_TEMPLATE);
        template
            .replace("{domain}", domain)
            .trim_end_matches('/')
            .to_string()
    }

    /// Built-in selectors overlaid with the `[selectors]` section.
    pub fn resolved_selectors(&self) -> BTreeMap<String, Vec<String>> {
        let mut resolved: BTreeMap<String, Vec<String>> = default_selectors()
            .into_iter()
            .map(|(key, selectors)| {
                (
                    key.to_string(),
                    selectors.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();

        for (key, spec) in &self.selectors {
            resolved.insert(key.clone(), spec.to_vec());
        }
        resolved
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.http.retry_policy()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("payload.target_folder", &self.payload.target_folder)?;

        for domain in &self.payload.domains {
            validation::validate_domain("payload.domains", domain)?;
            validation::validate_url("payload.base_url_template", &self.base_url(domain))?;
        }

        for keyword in &self.payload.keywords {
            validation::validate_non_empty_string("payload.keywords", keyword)?;
        }

        validation::validate_positive_number(
            "options.concurrent_requests",
            self.options.concurrent_requests,
            1,
        )?;
        if let Some(max_results) = self.options.max_results {
            validation::validate_positive_number("options.max_results", max_results, 1)?;
        }
        if let Some(max_pages) = self.options.max_search_result_pages {
            validation::validate_positive_number("options.max_search_result_pages", max_pages, 1)?;
        }

        validation::validate_range("http.timeout_seconds", self.http.timeout_seconds, 1, 600)?;
        validation::validate_positive_number(
            "http.retry_attempts",
            self.http.retry_attempts as usize,
            1,
        )?;

        for level in &self.options.log_levels {
            parse_level(level)?;
        }

        SelectorSet::new(self.resolved_selectors()).validate()?;

        Ok(())
    }
}

impl Validate for ScraperConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// 預設的 Amazon 頁面選擇器，可在 [selectors] 中逐項覆蓋
pub fn default_selectors() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        (
            "number_of_pages",
            vec![
                "span.s-pagination-item.s-pagination-disabled:not(.s-pagination-previous)",
                ".s-pagination-strip span.s-pagination-item:last-of-type",
            ],
        ),
        (
            "products",
            vec!["div.s-main-slot div[data-component-type='s-search-result']", "div[data-asin][data-component-type='s-search-result']"],
        ),
        ("product_title", vec!["h2 a span", "h2 span"]),
        ("product_price", vec!["span.a-price > span.a-offscreen"]),
        ("product_url", vec!["h2 a", "a.a-link-normal.s-no-outline"]),
        (
            "sponsored",
            vec!["span.puis-sponsored-label-text", "span.s-sponsored-label-text"],
        ),
        ("title", vec!["#productTitle", "#title"]),
        (
            "price",
            vec![
                "#corePrice_feature_div span.a-offscreen",
                "#corePriceDisplay_desktop_feature_div span.a-offscreen",
                "span.a-price span.a-offscreen",
            ],
        ),
        ("image", vec!["#landingImage", "#imgBlkFront"]),
        ("image_gallery", vec!["#main-image-container img", "#altImages img"]),
        ("about", vec!["#feature-bullets", "#productFactsDesktopExpander"]),
        ("description", vec!["#productDescription", "#aplus"]),
        (
            "details",
            vec![
                "#productDetails_techSpec_section_1",
                "#productDetails_detailBullets_sections1",
                "#detailBullets_feature_div",
            ],
        ),
        ("rating", vec!["#acrPopover span.a-icon-alt", "#acrPopover"]),
        ("number_of_ratings", vec!["#acrCustomerReviewText"]),
        ("store", vec!["#bylineInfo"]),
        ("captcha", vec!["form[action*='validateCaptcha']"]),
        ("review_elements", vec!["div[data-hook='review']"]),
        ("review_author", vec!["span.a-profile-name"]),
        (
            "review_rating",
            vec![
                "i[data-hook='review-star-rating'] span",
                "i[data-hook='cmps-review-star-rating'] span",
            ],
        ),
        (
            "review_title",
            vec![
                "a[data-hook='review-title'] > span:not(.a-letter-space)",
                "span[data-hook='review-title'] > span:not(.a-letter-space)",
                "[data-hook='review-title']",
            ],
        ),
        ("review_date", vec!["span[data-hook='review-date']"]),
        ("review_verified", vec!["span[data-hook='avp-badge']"]),
        ("review_text", vec!["span[data-hook='review-body']"]),
    ]
}
