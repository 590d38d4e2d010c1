use crate::domain::model::{ScrapedProduct, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Relative paths of every stored file, sorted.
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn location(&self, path: &str) -> String;
}

/// Where pages and images come from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ScrapedProduct>>;
    async fn transform(&self, data: Vec<ScrapedProduct>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
