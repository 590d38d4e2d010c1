use crate::core::selectors::SelectorSet;
use crate::domain::ports::PageSource;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::retry::{retry, RetryPolicy};
use scraper::Html;

/// Amazon answers bots with a captcha form instead of an error status.
pub fn check_not_blocked(html: &str, url: &str, selectors: &SelectorSet) -> Result<()> {
    let document = Html::parse_document(html);
    if selectors.exists(document.root_element(), "captcha") {
        return Err(ScrapeError::BlockedError {
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Fetches a page, retrying network failures and captcha pages.
pub async fn fetch_page<P: PageSource + ?Sized>(
    source: &P,
    selectors: &SelectorSet,
    policy: &RetryPolicy,
    url: &str,
) -> Result<String> {
    retry(&format!("fetch {}", url), policy, || async move {
        let html = source.fetch_html(url).await?;
        check_not_blocked(&html, url, selectors)?;
        Ok(html)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_captcha_page_is_blocked() {
        let mut map = BTreeMap::new();
        map.insert(
            "captcha".to_string(),
            vec!["form[action*='validateCaptcha']".to_string()],
        );
        let selectors = SelectorSet::new(map);

        let captcha = r#"<html><body><form action="/errors/validateCaptcha"></form></body></html>"#;
        assert!(matches!(
            check_not_blocked(captcha, "https://www.amazon.com/dp/X", &selectors),
            Err(ScrapeError::BlockedError { .. })
        ));
        assert!(check_not_blocked("<html><body>ok</body></html>", "u", &selectors).is_ok());
    }
}
