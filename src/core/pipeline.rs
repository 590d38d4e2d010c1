use crate::config::toml_config::{OptionsConfig, ScraperConfig};
use crate::core::export::{
    build_archive, description_image_names, full_page_path, results_csv, results_filename,
    results_json, save_images, search_page_path, RESULTS_JSON,
};
use crate::core::page::fetch_page;
use crate::core::product::{image_names, product_info};
use crate::core::reviews::export_reviews;
use crate::core::search::{products_found_on_pages, search_result_pages, SearchPage};
use crate::core::selectors::SelectorSet;
use crate::core::{Pipeline, Storage, TransformResult};
use crate::domain::model::{Product, ScrapedProduct};
use crate::domain::ports::PageSource;
use crate::utils::error::Result;
use crate::utils::retry::RetryPolicy;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;
use url::Url;

/// One (keyword, domain) scrape.
#[derive(Debug, Clone)]
pub struct RunTarget {
    pub keyword: String,
    pub domain: String,
    pub base_url: String,
}

impl RunTarget {
    pub fn new(config: &ScraperConfig, keyword: &str, domain: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            domain: domain.to_string(),
            base_url: config.base_url(domain),
        }
    }

    /// Last label of the base URL host, e.g. `de` for `https://www.amazon.de`.
    pub fn tld(&self) -> String {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .and_then(|host| host.rsplit('.').next().map(str::to_string))
            .unwrap_or_else(|| self.domain.clone())
    }
}

pub struct ScrapePipeline<S: Storage, P: PageSource> {
    storage: S,
    source: P,
    target: RunTarget,
    options: OptionsConfig,
    selectors: SelectorSet,
    policy: RetryPolicy,
    search_pages: Mutex<Vec<SearchPage>>,
}

impl<S: Storage, P: PageSource> ScrapePipeline<S, P> {
    pub fn new(storage: S, source: P, config: &ScraperConfig, target: RunTarget) -> Self {
        Self {
            storage,
            source,
            target,
            options: config.options.clone(),
            selectors: SelectorSet::new(config.resolved_selectors()),
            policy: config.retry_policy(),
            search_pages: Mutex::new(Vec::new()),
        }
    }

    fn take_search_pages(&self) -> Vec<SearchPage> {
        match self.search_pages.lock() {
            Ok(mut pages) => std::mem::take(&mut *pages),
            Err(_) => Vec::new(),
        }
    }

    async fn save_search_pages(&self) {
        for page in self.take_search_pages() {
            let path = search_page_path(page.page);
            if let Err(e) = self.storage.write_file(&path, page.html.as_bytes()).await {
                tracing::error!("Error saving search page {}: {}", page.url, e);
            }
        }
    }

    async fn save_product_images(&self, products: &[Product]) {
        for product in products {
            let saved = save_images(
                &self.source,
                &self.storage,
                &product.info.image_urls,
                &product.image_names,
                &product.sort_id,
            )
            .await;
            tracing::debug!("Saved {} images for {}", saved, product.sort_id);
        }
    }

    async fn save_description_images(&self, products: &[Product]) {
        for product in products {
            let urls = &product.info.description_image_urls;
            if urls.is_empty() {
                continue;
            }
            let names = description_image_names(&product.sort_id, urls.len());
            save_images(&self.source, &self.storage, urls, &names, &product.sort_id).await;
        }
    }

    /// HTML snapshot of every product page.
    async fn save_full_pages(&self, products: &[Product]) {
        for product in products {
            let url = &product.candidate.url;
            let result = match fetch_page(&self.source, &self.selectors, &self.policy, url).await {
                Ok(html) => {
                    self.storage
                        .write_file(&full_page_path(&product.sort_id), html.as_bytes())
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::error!("Error saving full page for {}: {}", product.sort_id, e);
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, P: PageSource> Pipeline for ScrapePipeline<S, P> {
    async fn extract(&self) -> Result<Vec<ScrapedProduct>> {
        let target = &self.target;
        tracing::info!("Searching for {} on {}", target.keyword, target.base_url);

        let (pages, first_page) = search_result_pages(
            &self.source,
            &self.selectors,
            &self.policy,
            &target.base_url,
            &target.keyword,
            self.options.max_search_result_pages,
        )
        .await?;

        let (candidates, fetched) = products_found_on_pages(
            &self.source,
            &self.selectors,
            &self.policy,
            &target.base_url,
            &pages,
            Some(first_page),
            self.options.max_results,
        )
        .await;
        tracing::info!("Found {} product candidates", candidates.len());

        if self.options.save_search_pages {
            if let Ok(mut stored) = self.search_pages.lock() {
                *stored = fetched;
            }
        }

        // 依序保留結果，同時最多 concurrent_requests 個請求
        let requests: Vec<_> = candidates
            .iter()
            .map(|candidate| {
                product_info(
                    &self.source,
                    &self.selectors,
                    &self.policy,
                    &candidate.url,
                    &self.options.store_name_noise,
                )
            })
            .collect();
        let infos: Vec<_> = stream::iter(requests)
            .buffered(self.options.concurrent_requests.max(1))
            .collect()
            .await;

        let scraped: Vec<ScrapedProduct> = candidates
            .into_iter()
            .zip(infos)
            .filter_map(|(candidate, info)| match info {
                Some(info) => Some(ScrapedProduct { candidate, info }),
                None => {
                    tracing::warn!("Skipping {}: no product information", candidate.asin);
                    None
                }
            })
            .collect();

        Ok(scraped)
    }

    async fn transform(&self, data: Vec<ScrapedProduct>) -> Result<TransformResult> {
        let tld = self.target.tld();

        let products: Vec<Product> = data
            .into_iter()
            .enumerate()
            .map(|(index, scraped)| {
                let sort_id = format!("{:04}", index + 1);
                let sort_title = format!(
                    "{}_{}",
                    sort_id,
                    scraped.info.title_info.as_deref().unwrap_or("???")
                );
                Product {
                    sort_title,
                    image_names: image_names(&scraped.info.image_urls, &sort_id),
                    candidate: scraped.candidate,
                    info: scraped.info,
                    tld: tld.clone(),
                    keyword: self.target.keyword.clone(),
                    sort_id,
                }
            })
            .collect();

        let csv_output = results_csv(&products)?;
        let json_output = results_json(&products)?;

        Ok(TransformResult {
            products,
            csv_output,
            json_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let products = &result.products;
        let options = &self.options;

        let csv_path = results_filename(&self.target.base_url, &self.target.keyword);
        tracing::debug!("Writing CSV ({} bytes) to storage", result.csv_output.len());
        self.storage.write_file(&csv_path, &result.csv_output).await?;
        self.storage
            .write_file(RESULTS_JSON, result.json_output.as_bytes())
            .await?;

        if options.save_search_pages {
            self.save_search_pages().await;
        }
        if options.save_images {
            tracing::info!("Saving images");
            self.save_product_images(products).await;
        }
        if options.save_description_images {
            tracing::info!("Saving description images");
            self.save_description_images(products).await;
        }
        if options.save_full_pages {
            tracing::info!("Saving full pages");
            self.save_full_pages(products).await;
        }

        for sentiment in &options.export_reviews {
            tracing::info!("Exporting {} reviews", sentiment);
            let written = export_reviews(
                &self.source,
                &self.storage,
                &self.selectors,
                &self.policy,
                &self.target.base_url,
                products,
                *sentiment,
                options.create_empty_review_files,
            )
            .await;
            tracing::debug!("Wrote {} {} review files", written, sentiment);
        }

        if options.archive {
            let archive = build_archive(&self.storage).await?;
            tracing::info!("Archive saved to: {}", archive);
        }

        Ok(self.storage.location(&csv_path))
    }
}
