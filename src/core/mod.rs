pub mod etl;
pub mod export;
pub mod page;
pub mod pipeline;
pub mod product;
pub mod reviews;
pub mod search;
pub mod selectors;

pub use crate::domain::model::{Product, ScrapedProduct, TransformResult};
pub use crate::domain::ports::{PageSource, Pipeline, Storage};
pub use crate::utils::error::Result;
