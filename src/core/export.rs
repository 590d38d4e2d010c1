use crate::domain::model::{Product, Review};
use crate::domain::ports::{PageSource, Storage};
use crate::utils::error::{Result, ScrapeError};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const RESULTS_JSON: &str = "results.json";
pub const ARCHIVE_NAME: &str = "archive.zip";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `https://www.amazon.com` + `laptop` -> `www.amazon.com_laptop.csv`
pub fn results_filename(base_url: &str, keyword: &str) -> String {
    let without_scheme = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url)
        .trim_end_matches('/');
    format!("{}_{}.csv", without_scheme.replace('/', "_"), keyword)
}

/// 一列 CSV，清單與對照表以 JSON 字串輸出
#[derive(Debug, Serialize)]
struct ProductRow<'a> {
    sort_title: &'a str,
    title: &'a str,
    price: &'a str,
    url: &'a str,
    asin: &'a str,
    simplified_url: &'a str,
    is_sponsored: bool,
    title_info: &'a str,
    price_info: &'a str,
    image_link: &'a str,
    about: &'a str,
    product_description: &'a str,
    product_details: String,
    rating: &'a str,
    number_of_ratings: &'a str,
    store: &'a str,
    store_url: &'a str,
    image_urls: String,
    description_image_urls: String,
    time: &'a str,
    tld: &'a str,
    keyword: &'a str,
    sort_id: &'a str,
    image_names: String,
}

impl<'a> ProductRow<'a> {
    fn from_product(product: &'a Product) -> Result<Self> {
        let candidate = &product.candidate;
        let info = &product.info;
        Ok(Self {
            sort_title: &product.sort_title,
            title: candidate.title.as_deref().unwrap_or_default(),
            price: candidate.price.as_deref().unwrap_or_default(),
            url: &candidate.url,
            asin: &candidate.asin,
            simplified_url: &candidate.simplified_url,
            is_sponsored: candidate.is_sponsored,
            title_info: info.title_info.as_deref().unwrap_or_default(),
            price_info: info.price_info.as_deref().unwrap_or_default(),
            image_link: info.image_link.as_deref().unwrap_or_default(),
            about: &info.about,
            product_description: &info.product_description,
            product_details: serde_json::to_string(&info.product_details)?,
            rating: &info.rating,
            number_of_ratings: &info.number_of_ratings,
            store: &info.store,
            store_url: info.store_url.as_deref().unwrap_or_default(),
            image_urls: serde_json::to_string(&info.image_urls)?,
            description_image_urls: serde_json::to_string(&info.description_image_urls)?,
            time: &info.time,
            tld: &product.tld,
            keyword: &product.keyword,
            sort_id: &product.sort_id,
            image_names: serde_json::to_string(&product.image_names)?,
        })
    }
}

fn semicolon_writer(buffer: Vec<u8>) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new().delimiter(b';').from_writer(buffer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ScrapeError::processing(format!("Failed to flush CSV: {}", e)))
}

/// Results table with a UTF-8 BOM so spreadsheet tools pick the right encoding.
pub fn results_csv(products: &[Product]) -> Result<Vec<u8>> {
    if products.is_empty() {
        return Err(ScrapeError::processing("No products to write"));
    }

    let mut writer = semicolon_writer(UTF8_BOM.to_vec());
    for product in products {
        writer.serialize(ProductRow::from_product(product)?)?;
    }
    finish(writer)
}

pub fn reviews_csv(reviews: &[Review]) -> Result<Vec<u8>> {
    let mut writer = semicolon_writer(Vec::new());
    for review in reviews {
        writer.serialize(review)?;
    }
    finish(writer)
}

pub fn results_json(products: &[Product]) -> Result<String> {
    Ok(serde_json::to_string_pretty(products)?)
}

/// `0003_product_image_01`, `0003_product_image_02`, ...
pub fn description_image_names(sort_id: &str, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("{}_product_image_{:02}", sort_id, i))
        .collect()
}

pub fn full_page_path(sort_id: &str) -> String {
    format!("{}/{}_full_page.html", sort_id, sort_id)
}

/// Named by the 1-based page number, so skipped pages leave a gap.
pub fn search_page_path(page: usize) -> String {
    format!("search_page_{:02}.html", page)
}

/// Extension of the last path segment, ASCII alphanumeric only.
pub fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// A name that already has an extension is kept as is.
pub fn image_file_name(name: &str, url: &str) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    match url_extension(url) {
        Some(ext) => format!("{}.{}", name, ext),
        None => name.to_string(),
    }
}

/// Downloads `urls` into `dir` under the matching `names`. Returns how many were saved.
pub async fn save_images<P, S>(
    source: &P,
    storage: &S,
    urls: &[String],
    names: &[String],
    dir: &str,
) -> usize
where
    P: PageSource + ?Sized,
    S: Storage,
{
    let mut saved = 0;
    for (url, name) in urls.iter().zip(names) {
        let path = format!("{}/{}", dir, image_file_name(name, url));
        let result = match source.fetch_bytes(url).await {
            Ok(bytes) => storage.write_file(&path, &bytes).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::debug!("Saved image {}", storage.location(&path));
                saved += 1;
            }
            Err(e) => tracing::error!("Error saving image {}: {}", url, e),
        }
    }
    saved
}

fn excluded_from_archive(path: &str) -> bool {
    path == ARCHIVE_NAME || path.ends_with(".log")
}

/// Zips every stored file except log files and the archive itself.
pub async fn build_archive<S: Storage>(storage: &S) -> Result<String> {
    let files: Vec<String> = storage
        .list_files()
        .await?
        .into_iter()
        .filter(|path| !excluded_from_archive(path))
        .collect();

    let mut contents = Vec::with_capacity(files.len());
    for path in files {
        let data = storage.read_file(&path).await?;
        contents.push((path, data));
    }

    let zip_data = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (path, data) in &contents {
            zip.start_file::<_, ()>(path.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }
        // 完成並取回底層 Vec<u8>
        let cursor = zip.finish()?;
        cursor.into_inner()
    };

    tracing::debug!(
        "Writing archive with {} files ({} bytes)",
        contents.len(),
        zip_data.len()
    );
    storage.write_file(ARCHIVE_NAME, &zip_data).await?;
    Ok(storage.location(ARCHIVE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ProductInfo, SearchCandidate};
    use indexmap::IndexMap;

    fn product(sort_id: &str, title: Option<&str>) -> Product {
        let mut details = IndexMap::new();
        details.insert("Brand".to_string(), "Acme".to_string());
        Product {
            sort_title: format!("{}_{}", sort_id, title.unwrap_or("???")),
            candidate: SearchCandidate {
                title: Some("Laptop; 14 inch".to_string()),
                price: None,
                url: "https://www.amazon.com/dp/B0AAAAAAA1/ref=sr_1_1".to_string(),
                asin: "B0AAAAAAA1".to_string(),
                simplified_url: "https://www.amazon.com/dp/B0AAAAAAA1".to_string(),
                is_sponsored: false,
            },
            info: ProductInfo {
                title_info: title.map(str::to_string),
                product_details: details,
                image_urls: vec!["https://img/1.jpg".to_string()],
                ..Default::default()
            },
            tld: "com".to_string(),
            keyword: "laptop".to_string(),
            sort_id: sort_id.to_string(),
            image_names: vec![format!("{}a.jpg", sort_id)],
        }
    }

    #[test]
    fn test_results_filename() {
        assert_eq!(
            results_filename("https://www.amazon.com", "laptop"),
            "www.amazon.com_laptop.csv"
        );
        assert_eq!(
            results_filename("http://127.0.0.1:8080/shop/", "prayer shawl"),
            "127.0.0.1:8080_shop_prayer shawl.csv"
        );
    }

    #[test]
    fn test_results_csv_layout() {
        let csv = results_csv(&[product("0001", Some("Travel Laptop")), product("0002", None)])
            .unwrap();
        assert!(csv.starts_with(UTF8_BOM));

        let text = String::from_utf8(csv[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("sort_title;title;price;url;asin"));
        assert!(header.ends_with("sort_id;image_names"));

        let first = lines.next().unwrap();
        assert!(first.starts_with("0001_Travel Laptop;\"Laptop; 14 inch\";;"));
        assert!(first.contains(r#""{""Brand"":""Acme""}""#));
        assert!(lines.next().unwrap().starts_with("0002_???;"));
    }

    #[test]
    fn test_results_csv_rejects_empty() {
        assert!(matches!(
            results_csv(&[]),
            Err(ScrapeError::ProcessingError { .. })
        ));
    }

    #[test]
    fn test_reviews_csv_has_no_bom() {
        let reviews = vec![Review {
            asin: "B0AAAAAAA1".to_string(),
            author: "Ann".to_string(),
            rating: "5.0 out of 5 stars".to_string(),
            ..Default::default()
        }];
        let csv = String::from_utf8(reviews_csv(&reviews).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("asin;author;rating;title;location_and_date;verified;text")
        );
        assert_eq!(lines.next(), Some("B0AAAAAAA1;Ann;5.0 out of 5 stars;;;;"));
    }

    #[test]
    fn test_image_file_names() {
        assert_eq!(description_image_names("0003", 2), vec![
            "0003_product_image_01",
            "0003_product_image_02"
        ]);
        assert_eq!(
            image_file_name("0003_product_image_01", "https://img/x/desc.png?v=1"),
            "0003_product_image_01.png"
        );
        assert_eq!(image_file_name("0003a.jpg", "https://img/x/71one.jpg"), "0003a.jpg");
        assert_eq!(image_file_name("0003_product_image_02", "https://img/x/noext"), "0003_product_image_02");
        assert_eq!(
            image_file_name("0003_product_image_03", "https://img/a.b/../x.p/ng"),
            "0003_product_image_03"
        );
        assert_eq!(full_page_path("0003"), "0003/0003_full_page.html");
        assert_eq!(search_page_path(1), "search_page_01.html");
        assert_eq!(search_page_path(12), "search_page_12.html");
    }

    #[test]
    fn test_archive_exclusions() {
        assert!(excluded_from_archive("archive.zip"));
        assert!(excluded_from_archive("info.log"));
        assert!(!excluded_from_archive("0001/0001a.jpg"));
    }
}
