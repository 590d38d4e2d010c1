use crate::core::export::reviews_csv;
use crate::core::page::fetch_page;
use crate::core::selectors::{inner_text, Attribute, SelectorSet};
use crate::domain::model::{Product, Review, Sentiment};
use crate::domain::ports::{PageSource, Storage};
use crate::utils::error::Result;
use crate::utils::retry::RetryPolicy;
use scraper::Html;

pub fn reviews_url(base_url: &str, asin: &str, sentiment: Sentiment) -> String {
    format!(
        "{}/product-reviews/{}?filterByStar={}&reviewerType=all_reviews",
        base_url.trim_end_matches('/'),
        asin,
        sentiment.filter_value()
    )
}

pub fn reviews_path(sort_id: &str, sentiment: Sentiment) -> String {
    format!("{}/{}_{}_reviews.csv", sort_id, sort_id, sentiment)
}

pub fn parse_reviews(html: &str, asin: &str, selectors: &SelectorSet) -> Vec<Review> {
    let document = Html::parse_document(html);

    selectors
        .find_all(document.root_element(), "review_elements")
        .into_iter()
        .map(|element| {
            let read = |key: &str, attribute: Attribute<'_>| {
                selectors
                    .find_attribute(element, key, attribute)
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default()
            };
            Review {
                asin: asin.to_string(),
                author: read("review_author", Attribute::TextContent),
                rating: read("review_rating", Attribute::InnerHtml),
                title: selectors
                    .find_element(element, "review_title")
                    .map(inner_text)
                    .unwrap_or_default(),
                location_and_date: read("review_date", Attribute::TextContent),
                verified: read("review_verified", Attribute::TextContent),
                text: read("review_text", Attribute::InnerText),
            }
        })
        .collect()
}

pub async fn product_reviews<P: PageSource + ?Sized>(
    source: &P,
    selectors: &SelectorSet,
    policy: &RetryPolicy,
    base_url: &str,
    asin: &str,
    sentiment: Sentiment,
) -> Result<Vec<Review>> {
    let url = reviews_url(base_url, asin, sentiment);
    let html = fetch_page(source, selectors, policy, &url).await?;
    Ok(parse_reviews(&html, asin, selectors))
}

/// Writes one review CSV per product for `sentiment`. Returns how many files were written.
#[allow(clippy::too_many_arguments)]
pub async fn export_reviews<P, S>(
    source: &P,
    storage: &S,
    selectors: &SelectorSet,
    policy: &RetryPolicy,
    base_url: &str,
    products: &[Product],
    sentiment: Sentiment,
    create_empty_files: bool,
) -> usize
where
    P: PageSource + ?Sized,
    S: Storage,
{
    let mut written = 0;

    for product in products {
        let asin = &product.candidate.asin;
        let sort_id = &product.sort_id;
        let path = reviews_path(sort_id, sentiment);

        let reviews =
            match product_reviews(source, selectors, policy, base_url, asin, sentiment).await {
                Ok(reviews) => reviews,
                Err(e) => {
                    tracing::error!("Error exporting {} reviews for {}: {}", sentiment, asin, e);
                    continue;
                }
            };

        let data = if reviews.is_empty() {
            tracing::info!("No {} reviews found for {}. ASIN: {}.", sentiment, sort_id, asin);
            if !create_empty_files {
                continue;
            }
            tracing::info!("Creating empty file: {}", storage.location(&path));
            Vec::new()
        } else {
            match reviews_csv(&reviews) {
                Ok(data) => data,
                Err(e) => {
                    tracing::error!("Error writing reviews for {}: {}", asin, e);
                    continue;
                }
            }
        };

        match storage.write_file(&path, &data).await {
            Ok(()) => written += 1,
            Err(e) => tracing::error!("Error saving {}: {}", storage.location(&path), e),
        }
    }

    written
}
