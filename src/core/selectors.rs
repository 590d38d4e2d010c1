use crate::utils::error::{Result, ScrapeError};
use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;

/// What to read from a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// All descendant text, untouched.
    TextContent,
    /// Descendant text nodes trimmed, blank ones dropped, joined by newlines.
    InnerText,
    InnerHtml,
    Named(&'a str),
}

/// Named CSS selectors, each with ordered fallbacks.
#[derive(Debug, Clone, Default)]
pub struct SelectorSet {
    selectors: BTreeMap<String, Vec<String>>,
}

impl SelectorSet {
    pub fn new(selectors: BTreeMap<String, Vec<String>>) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self, key: &str) -> &[String] {
        self.selectors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn compiled(&self, key: &str) -> Vec<(&str, Selector)> {
        self.selectors(key)
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some((raw.as_str(), selector)),
                Err(e) => {
                    tracing::debug!("Invalid selector for {}: {}: {}", key, raw, e);
                    None
                }
            })
            .collect()
    }

    pub fn find_element<'a>(&self, scope: ElementRef<'a>, key: &str) -> Option<ElementRef<'a>> {
        for (raw, selector) in self.compiled(key) {
            if let Some(element) = scope.select(&selector).next() {
                return Some(element);
            }
            tracing::debug!("Element not found: {}: {}. Trying next selector.", key, raw);
        }

        tracing::debug!("Element not found: {}", key);
        None
    }

    /// Every match of the first selector that matches anything.
    pub fn find_all<'a>(&self, scope: ElementRef<'a>, key: &str) -> Vec<ElementRef<'a>> {
        for (_, selector) in self.compiled(key) {
            let found: Vec<ElementRef<'a>> = scope.select(&selector).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    pub fn find_attribute(
        &self,
        scope: ElementRef<'_>,
        key: &str,
        attribute: Attribute<'_>,
    ) -> Option<String> {
        self.find_element(scope, key)
            .and_then(|element| read_attribute(element, attribute))
    }

    pub fn exists(&self, scope: ElementRef<'_>, key: &str) -> bool {
        self.find_element(scope, key).is_some()
    }

    /// Every key needs at least one selector and every selector has to parse.
    pub fn validate(&self) -> Result<()> {
        for (key, selectors) in &self.selectors {
            if selectors.is_empty() {
                return Err(ScrapeError::InvalidConfigValueError {
                    field: format!("selectors.{}", key),
                    value: String::new(),
                    reason: "At least one selector is required".to_string(),
                });
            }
            for selector in selectors {
                if let Err(e) = Selector::parse(selector) {
                    return Err(ScrapeError::InvalidConfigValueError {
                        field: format!("selectors.{}", key),
                        value: selector.clone(),
                        reason: format!("Invalid CSS selector: {}", e),
                    });
                }
            }
        }
        Ok(())
    }
}

pub fn read_attribute(element: ElementRef<'_>, attribute: Attribute<'_>) -> Option<String> {
    match attribute {
        Attribute::TextContent => Some(element.text().collect()),
        Attribute::InnerText => Some(inner_text(element)),
        Attribute::InnerHtml => Some(element.inner_html()),
        Attribute::Named(name) => element.value().attr(name).map(str::to_string),
    }
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn selector_set() -> SelectorSet {
        let mut map = BTreeMap::new();
        map.insert(
            "title".to_string(),
            vec!["#missing".to_string(), "#productTitle".to_string()],
        );
        map.insert("items".to_string(), vec!["li.none".to_string(), "li.item".to_string()]);
        map.insert("broken".to_string(), vec!["div[[".to_string(), "a".to_string()]);
        SelectorSet::new(map)
    }

    const PAGE: &str = r#"
        <html><body>
          <span id="productTitle">
             Travel Laptop
          </span>
          <ul><li class="item">One</li><li class="item">Two <b>bold</b></li></ul>
          <a href="/dp/B000000001">link</a>
        </body></html>"#;

    #[test]
    fn test_find_element_uses_fallbacks() {
        let document = Html::parse_document(PAGE);
        let set = selector_set();

        let title = set
            .find_attribute(document.root_element(), "title", Attribute::InnerText)
            .unwrap();
        assert_eq!(title, "Travel Laptop");

        let raw = set
            .find_attribute(document.root_element(), "title", Attribute::TextContent)
            .unwrap();
        assert!(raw.contains("\n"));

        assert!(set.find_element(document.root_element(), "unknown").is_none());
    }

    #[test]
    fn test_find_all_and_invalid_selectors() {
        let document = Html::parse_document(PAGE);
        let set = selector_set();

        let items = set.find_all(document.root_element(), "items");
        assert_eq!(items.len(), 2);
        assert_eq!(inner_text(items[1]), "Two\nbold");

        let href = set.find_attribute(document.root_element(), "broken", Attribute::Named("href"));
        assert_eq!(href.as_deref(), Some("/dp/B000000001"));
        assert!(set
            .find_attribute(document.root_element(), "broken", Attribute::Named("title"))
            .is_none());
    }

    #[test]
    fn test_validate() {
        assert!(selector_set().validate().is_err());

        let mut map = BTreeMap::new();
        map.insert("title".to_string(), vec!["#productTitle".to_string()]);
        assert!(SelectorSet::new(map.clone()).validate().is_ok());

        map.insert("store".to_string(), Vec::new());
        assert!(matches!(
            SelectorSet::new(map).validate(),
            Err(ScrapeError::InvalidConfigValueError { ref field, .. }) if field == "selectors.store"
        ));
    }
}
