use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A product as it appears on a search result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub title: Option<String>,
    pub price: Option<String>,
    pub url: String,
    pub asin: String,
    pub simplified_url: String,
    pub is_sponsored: bool,
}

/// Information scraped from a product detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub title_info: Option<String>,
    pub price_info: Option<String>,
    pub image_link: Option<String>,
    pub about: String,
    pub product_description: String,
    pub product_details: IndexMap<String, String>,
    pub rating: String,
    pub number_of_ratings: String,
    pub store: String,
    pub store_url: Option<String>,
    pub image_urls: Vec<String>,
    pub description_image_urls: Vec<String>,
    pub time: String,
}

/// A candidate with its product information, before sort ids are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedProduct {
    pub candidate: SearchCandidate,
    pub info: ProductInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sort_title: String,
    #[serde(flatten)]
    pub candidate: SearchCandidate,
    #[serde(flatten)]
    pub info: ProductInfo,
    pub tld: String,
    pub keyword: String,
    pub sort_id: String,
    pub image_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub asin: String,
    pub author: String,
    pub rating: String,
    pub title: String,
    pub location_and_date: String,
    pub verified: String,
    pub text: String,
}

/// Review star filter as offered on the Amazon review pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "1_star")]
    OneStar,
    #[serde(rename = "2_star")]
    TwoStar,
    #[serde(rename = "3_star")]
    ThreeStar,
    #[serde(rename = "4_star")]
    FourStar,
    #[serde(rename = "5_star")]
    FiveStar,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "critical")]
    Critical,
    #[serde(rename = "all")]
    All,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneStar => "1_star",
            Self::TwoStar => "2_star",
            Self::ThreeStar => "3_star",
            Self::FourStar => "4_star",
            Self::FiveStar => "5_star",
            Self::Positive => "positive",
            Self::Critical => "critical",
            Self::All => "all",
        }
    }

    /// Value of the `filterByStar` query parameter.
    pub fn filter_value(&self) -> &'static str {
        match self {
            Self::OneStar => "one_star",
            Self::TwoStar => "two_star",
            Self::ThreeStar => "three_star",
            Self::FourStar => "four_star",
            Self::FiveStar => "five_star",
            Self::Positive => "positive",
            Self::Critical => "critical",
            Self::All => "all_stars",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Products after the transform phase, ready to be written out.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub products: Vec<Product>,
    pub csv_output: Vec<u8>,
    pub json_output: String,
}
