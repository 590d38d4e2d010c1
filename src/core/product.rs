use crate::core::export::url_extension;
use crate::core::page::fetch_page;
use crate::core::selectors::{inner_text, Attribute, SelectorSet};
use crate::domain::model::ProductInfo;
use crate::domain::ports::PageSource;
use crate::utils::retry::RetryPolicy;
use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

pub const IMAGE_DESCRIPTION_ONLY: &str = "IMAGE_DESCRIPTION_ONLY";

/// Parses a product detail page.
pub fn parse_product_info(
    html: &str,
    page_url: &str,
    selectors: &SelectorSet,
    store_noise: &[String],
) -> ProductInfo {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let text = |key: &str| selectors.find_attribute(root, key, Attribute::InnerText);

    let description = selectors.find_element(root, "description");
    let product_description = description
        .map(inner_text)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| IMAGE_DESCRIPTION_ONLY.to_string());
    let description_image_urls = description
        .map(|element| element_image_urls(element, page_url))
        .unwrap_or_default();

    let product_details = selectors
        .find_element(root, "details")
        .map(parse_details)
        .unwrap_or_default();

    let number_of_ratings: String = text("number_of_ratings")
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    let store = clean_store_name(&text("store").unwrap_or_default(), store_noise);
    let store_url = selectors
        .find_attribute(root, "store", Attribute::Named("href"))
        .map(|href| absolute_url(page_url, &href));

    ProductInfo {
        title_info: text("title").filter(|t| !t.is_empty()),
        price_info: text("price").filter(|p| !p.is_empty()),
        image_link: selectors.find_attribute(root, "image", Attribute::Named("src")),
        about: text("about").unwrap_or_default().trim().to_string(),
        product_description: product_description.trim().to_string(),
        product_details,
        rating: text("rating").unwrap_or_default().trim().to_string(),
        number_of_ratings,
        store,
        store_url,
        image_urls: extract_image_urls(&document, html, selectors),
        description_image_urls,
        time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Gallery images: `data-old-hires` when present, otherwise a non-gif `src`,
/// followed by every `"hiRes"` URL embedded in the page scripts.
pub fn extract_image_urls(document: &Html, html: &str, selectors: &SelectorSet) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    let mut push = |url: String| {
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    };

    for image in selectors.find_all(document.root_element(), "image_gallery") {
        let hires = image
            .value()
            .attr("data-old-hires")
            .filter(|h| !h.trim().is_empty());
        if let Some(hires) = hires {
            push(hires.to_string());
        } else if let Some(src) = image.value().attr("src") {
            if !src.ends_with("gif") && !src.starts_with("data:") {
                push(src.to_string());
            }
        }
    }

    match Regex::new(r#""hiRes"\s*:\s*"(https?://[^"]+)""#) {
        Ok(re) => {
            for caps in re.captures_iter(html) {
                push(caps[1].to_string());
            }
        }
        Err(e) => tracing::debug!("hiRes pattern failed to compile: {}", e),
    }

    urls
}

fn element_image_urls(element: ElementRef<'_>, page_url: &str) -> Vec<String> {
    let Ok(img) = Selector::parse("img") else {
        return Vec::new();
    };
    element
        .select(&img)
        .filter_map(|image| {
            image
                .value()
                .attr("src")
                .filter(|src| !src.starts_with("data:"))
                .or_else(|| image.value().attr("data-src"))
        })
        .filter(|src| !src.ends_with("gif"))
        .map(|src| absolute_url(page_url, src))
        .collect()
}

fn clean_detail(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '\u{200e}' || c == '\u{200f}')
        .to_string()
}

/// Reads the details block: table rows, `key : value` bullets or tab separated lines.
pub fn parse_details(element: ElementRef<'_>) -> IndexMap<String, String> {
    let mut details = IndexMap::new();

    if let (Ok(tr), Ok(th), Ok(td)) = (
        Selector::parse("tr"),
        Selector::parse("th"),
        Selector::parse("td"),
    ) {
        for row in element.select(&tr) {
            if let (Some(key), Some(value)) = (row.select(&th).next(), row.select(&td).next()) {
                let key = clean_detail(&key.text().collect::<String>());
                if !key.is_empty() {
                    details.insert(key, clean_detail(&value.text().collect::<String>()));
                }
            }
        }
    }
    if !details.is_empty() {
        return details;
    }

    if let Ok(li) = Selector::parse("li") {
        for item in element.select(&li) {
            let line = item.text().collect::<String>();
            if let Some((key, value)) = line.split_once(':') {
                let key = clean_detail(key);
                if !key.is_empty() {
                    details.insert(key, clean_detail(value));
                }
            }
        }
    }
    if !details.is_empty() {
        return details;
    }

    for line in element.text().collect::<String>().lines() {
        if let Some((key, value)) = line.split_once('\t') {
            details.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    details
}

pub fn clean_store_name(store: &str, noise: &[String]) -> String {
    let mut cleaned = store.to_string();
    for fragment in noise {
        if !fragment.is_empty() {
            cleaned = cleaned.replace(fragment.as_str(), "");
        }
    }
    cleaned.trim().to_string()
}

fn absolute_url(page_url: &str, href: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn image_suffix(index: usize) -> String {
    let letter = |i: usize| char::from(b'a' + (i % 26) as u8);
    if index < 26 {
        letter(index).to_string()
    } else {
        format!("{}{}", image_suffix(index / 26 - 1), letter(index))
    }
}

/// `<sort_id>a.jpg`, `<sort_id>b.jpg`, ... one per image URL.
pub fn image_names(urls: &[String], sort_id: &str) -> Vec<String> {
    urls.iter()
        .enumerate()
        .map(|(index, url)| {
            let extension = url_extension(url).unwrap_or("jpg");
            format!("{}{}.{}", sort_id, image_suffix(index), extension)
        })
        .collect()
}

/// Fetches and parses a product page. Failures are logged and yield `None`.
pub async fn product_info<P: PageSource + ?Sized>(
    source: &P,
    selectors: &SelectorSet,
    policy: &RetryPolicy,
    url: &str,
    store_noise: &[String],
) -> Option<ProductInfo> {
    match fetch_page(source, selectors, policy, url).await {
        Ok(html) => Some(parse_product_info(&html, url, selectors, store_noise)),
        Err(e) => {
            tracing::error!("Error getting product information from {}: {}", url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::{default_selectors, OptionsConfig};
    use std::collections::BTreeMap;

    fn selectors() -> SelectorSet {
        SelectorSet::new(
            default_selectors()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    const PRODUCT_PAGE: &str = r#"
<html><head>
<script>
var data = {'colorImages': { 'initial': [
  {"hiRes":"https://m.media-amazon.com/images/I/71one.jpg","thumb":"x"},
  {"hiRes":"https://m.media-amazon.com/images/I/71two.jpg","thumb":"y"}
]}};
</script>
</head><body>
<span id="productTitle">  Travel Laptop 14"  </span>
<div id="corePrice_feature_div"><span class="a-offscreen">$499.00</span></div>
<div id="main-image-container">
  <img id="landingImage" src="https://m.media-amazon.com/images/I/71one._SX300_.jpg"
       data-old-hires="https://m.media-amazon.com/images/I/71one.jpg">
  <img src="https://m.media-amazon.com/images/G/spinner.gif">
</div>
<div id="feature-bullets"><ul><li> Light </li><li> Fast </li></ul></div>
<div id="productDescription"><p>A laptop for travel.</p>
  <img src="https://m.media-amazon.com/images/S/desc1.png">
  <img src="https://m.media-amazon.com/images/S/loader.gif">
</div>
<table id="productDetails_techSpec_section_1">
  <tr><th> Brand </th><td>&lrm;Acme </td></tr>
  <tr><th>Weight</th><td> 1.2 kg</td></tr>
</table>
<span id="acrPopover"><span class="a-icon-alt"> 4.5 out of 5 stars </span></span>
<span id="acrCustomerReviewText">1,234 ratings</span>
<a id="bylineInfo" href="/stores/Acme/page/1">Visit the Acme Store</a>
</body></html>"#;

    #[test]
    fn test_parse_product_info() {
        let noise = OptionsConfig::default().store_name_noise;
        let info = parse_product_info(
            PRODUCT_PAGE,
            "https://www.amazon.com/dp/B0AAAAAAA1",
            &selectors(),
            &noise,
        );

        assert_eq!(info.title_info.as_deref(), Some("Travel Laptop 14\""));
        assert_eq!(info.price_info.as_deref(), Some("$499.00"));
        assert_eq!(
            info.image_link.as_deref(),
            Some("https://m.media-amazon.com/images/I/71one._SX300_.jpg")
        );
        assert_eq!(info.about, "Light\nFast");
        assert!(info.product_description.starts_with("A laptop for travel."));
        assert_eq!(
            info.description_image_urls,
            vec!["https://m.media-amazon.com/images/S/desc1.png"]
        );
        assert_eq!(info.product_details.get("Brand").map(String::as_str), Some("Acme"));
        assert_eq!(info.product_details.get("Weight").map(String::as_str), Some("1.2 kg"));
        assert_eq!(info.rating, "4.5 out of 5 stars");
        assert_eq!(info.number_of_ratings, "1234");
        assert_eq!(info.store, "Acme");
        assert_eq!(
            info.store_url.as_deref(),
            Some("https://www.amazon.com/stores/Acme/page/1")
        );
        assert_eq!(
            info.image_urls,
            vec![
                "https://m.media-amazon.com/images/I/71one.jpg",
                "https://m.media-amazon.com/images/I/71two.jpg"
            ]
        );
    }

    #[test]
    fn test_missing_description_defaults() {
        let info = parse_product_info(
            "<html><body><span id='productTitle'>Only title</span></body></html>",
            "https://www.amazon.de/dp/X",
            &selectors(),
            &[],
        );
        assert_eq!(info.product_description, IMAGE_DESCRIPTION_ONLY);
        assert!(info.description_image_urls.is_empty());
        assert!(info.product_details.is_empty());
        assert_eq!(info.about, "");
        assert!(info.price_info.is_none());
    }

    #[test]
    fn test_detail_bullets() {
        let html = r#"<div id="detailBullets_feature_div"><ul>
            <li><span>Manufacturer &lrm; : &lrm;</span><span>Acme GmbH</span></li>
            <li><span>ASIN : </span><span>B0AAAAAAA1</span></li>
        </ul></div>"#;
        let document = Html::parse_document(html);
        let element = selectors()
            .find_element(document.root_element(), "details")
            .unwrap();
        let details = parse_details(element);
        assert_eq!(details.get("Manufacturer").map(String::as_str), Some("Acme GmbH"));
        assert_eq!(details.get("ASIN").map(String::as_str), Some("B0AAAAAAA1"));
    }

    #[test]
    fn test_image_names() {
        let urls = vec![
            "https://m.media-amazon.com/images/I/71one.jpg".to_string(),
            "https://m.media-amazon.com/images/I/71two.png?v=2".to_string(),
        ];
        assert_eq!(image_names(&urls, "0003"), vec!["0003a.jpg", "0003b.png"]);

        // 只取最後一段路徑的副檔名，避免產生子目錄
        let odd = vec![
            "https://m.media-amazon.com/a.b/../../../escaped".to_string(),
            "https://m.media-amazon.com/images/I/71x.j-pg".to_string(),
        ];
        assert_eq!(image_names(&odd, "0001"), vec!["0001a.jpg", "0001b.jpg"]);

        let many: Vec<String> = (0..28).map(|i| format!("https://x/{}.jpg", i)).collect();
        let names = image_names(&many, "0001");
        assert_eq!(names[25], "0001z.jpg");
        assert_eq!(names[26], "0001aa.jpg");
        assert_eq!(names[27], "0001ab.jpg");
    }

    #[test]
    fn test_clean_store_name() {
        let noise = OptionsConfig::default().store_name_noise;
        assert_eq!(clean_store_name("Brand: Acme", &noise), "Acme");
        assert_eq!(clean_store_name("  Visit the Acme Store ", &noise), "Acme");
    }
}
