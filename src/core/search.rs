use crate::core::page::fetch_page;
use crate::core::selectors::{Attribute, SelectorSet};
use crate::domain::model::SearchCandidate;
use crate::domain::ports::PageSource;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::retry::RetryPolicy;
use scraper::Html;
use url::Url;

/// A fetched search result page.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// 1-based page number.
    pub page: usize,
    pub url: String,
    pub html: String,
}

fn parse_base(base_url: &str) -> Result<Url> {
    Url::parse(base_url).map_err(|e| ScrapeError::InvalidConfigValueError {
        field: "payload.base_url_template".to_string(),
        value: base_url.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })
}

pub fn search_url(base_url: &str, keyword: &str) -> Result<String> {
    page_url(base_url, keyword, 1)
}

/// 第 n 頁的搜尋網址；第一頁沿用搜尋框的 ref
pub fn page_url(base_url: &str, keyword: &str, page: usize) -> Result<String> {
    let mut url = parse_base(&format!("{}/s", base_url.trim_end_matches('/')))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("k", keyword);
        if page <= 1 {
            query.append_pair("ref", "nb_sb_noss");
        } else {
            query.append_pair("page", &page.to_string());
            query.append_pair("ref", &format!("sr_pg_{}", page - 1));
        }
    }
    Ok(url.to_string())
}

pub fn page_urls(base_url: &str, keyword: &str, count: usize) -> Result<Vec<String>> {
    (1..=count.max(1))
        .map(|page| page_url(base_url, keyword, page))
        .collect()
}

/// `None` when the pagination element is missing. Unreadable numbers count as one page.
pub fn parse_page_count(html: &str, selectors: &SelectorSet) -> Option<usize> {
    let document = Html::parse_document(html);
    let text = selectors.find_attribute(
        document.root_element(),
        "number_of_pages",
        Attribute::TextContent,
    )?;
    Some(text.trim().parse::<usize>().unwrap_or(1).max(1))
}

pub fn parse_products(
    html: &str,
    base_url: &str,
    selectors: &SelectorSet,
) -> Result<Vec<SearchCandidate>> {
    let base = parse_base(base_url)?;
    let base_url = base_url.trim_end_matches('/');
    let document = Html::parse_document(html);
    let mut products = Vec::new();

    for element in selectors.find_all(document.root_element(), "products") {
        let asin = element.value().attr("data-asin").unwrap_or("").trim();
        if asin.is_empty() {
            tracing::debug!("Skipping search result without ASIN");
            continue;
        }

        let Some(href) = selectors.find_attribute(element, "product_url", Attribute::Named("href"))
        else {
            tracing::debug!("Skipping search result {} without product URL", asin);
            continue;
        };
        let url = match base.join(&href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!("Skipping search result {}: bad URL {}: {}", asin, href, e);
                continue;
            }
        };

        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        products.push(SearchCandidate {
            title: non_empty(selectors.find_attribute(
                element,
                "product_title",
                Attribute::TextContent,
            ))
            .map(|t| t.trim().to_string()),
            price: non_empty(selectors.find_attribute(element, "product_price", Attribute::InnerText)),
            url,
            asin: asin.to_string(),
            simplified_url: format!("{}/dp/{}", base_url, asin),
            is_sponsored: non_empty(selectors.find_attribute(
                element,
                "sponsored",
                Attribute::InnerText,
            ))
            .is_some(),
        });
    }

    Ok(products)
}

/// Fetches the first search page and works out which result pages to visit.
/// The first page's HTML is returned so it does not need to be fetched twice.
pub async fn search_result_pages<P: PageSource + ?Sized>(
    source: &P,
    selectors: &SelectorSet,
    policy: &RetryPolicy,
    base_url: &str,
    keyword: &str,
    max_search_result_pages: Option<usize>,
) -> Result<(Vec<String>, SearchPage)> {
    let first_url = search_url(base_url, keyword)?;
    let html = fetch_page(source, selectors, policy, &first_url).await?;

    let pages = match parse_page_count(&html, selectors) {
        None => {
            tracing::info!("Found only one page.");
            vec![first_url.clone()]
        }
        Some(found) => {
            tracing::info!("Found {} pages", found);
            let count = match max_search_result_pages {
                Some(max) => found.min(max),
                None => found,
            };
            if max_search_result_pages.is_some() {
                tracing::info!(
                    "Max search result pages set to {:?}. Returning {} pages",
                    max_search_result_pages,
                    count
                );
            }
            page_urls(base_url, keyword, count)?
        }
    };

    Ok((
        pages,
        SearchPage {
            page: 1,
            url: first_url,
            html,
        },
    ))
}

/// Collects candidates page by page. Failing pages are skipped; collection
/// stops once `max_results` candidates are known.
pub async fn products_found_on_pages<P: PageSource + ?Sized>(
    source: &P,
    selectors: &SelectorSet,
    policy: &RetryPolicy,
    base_url: &str,
    pages: &[String],
    first_page: Option<SearchPage>,
    max_results: Option<usize>,
) -> (Vec<SearchCandidate>, Vec<SearchPage>) {
    let mut candidates: Vec<SearchCandidate> = Vec::new();
    let mut fetched: Vec<SearchPage> = Vec::new();
    let mut cached = first_page;

    for (number, page) in (1..).zip(pages) {
        let html = match cached.take().filter(|cached| &cached.url == page) {
            Some(cached) => cached.html,
            None => match fetch_page(source, selectors, policy, page).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!("skipped: error processing page {}: {}", page, e);
                    continue;
                }
            },
        };

        match parse_products(&html, base_url, selectors) {
            Ok(found) => {
                tracing::info!("Processed {} products on page {}", found.len(), page);
                candidates.extend(found);
            }
            Err(e) => {
                tracing::error!("skipped: error processing page {}: {}", page, e);
                continue;
            }
        }

        fetched.push(SearchPage {
            page: number,
            url: page.clone(),
            html,
        });

        if let Some(max) = max_results {
            if candidates.len() >= max {
                tracing::info!("Found {} results. Stopping search.", max);
                break;
            }
        }
    }

    if let Some(max) = max_results {
        candidates.truncate(max);
    }

    (candidates, fetched)
}
