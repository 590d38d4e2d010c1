use crate::config::toml_config::HttpConfig;
use crate::domain::ports::PageSource;
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Fetches Amazon pages and images with a browser-like client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ScrapeError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// 預設的瀏覽器標頭，再套用設定檔中的 [http.headers]
pub fn default_headers(config: &HttpConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );

    for (name, value) in &config.headers {
        let field = format!("http.headers.{}", name);
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ScrapeError::InvalidConfigValueError {
                field: field.clone(),
                value: name.clone(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(name, header_value(&field, value)?);
    }

    Ok(headers)
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .default_headers(default_headers(config)?)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        Ok(self.get(url).await?.text().await?)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.get(url).await?.bytes().await?.to_vec())
    }
}
