use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs extract, transform and load. `None` when nothing was extracted,
    /// in which case nothing is written.
    pub async fn run(&self) -> Result<Option<String>> {
        tracing::info!("🚀 Starting scrape pipeline");

        // Extract
        tracing::info!("Extracting products...");
        let scraped = self.pipeline.extract().await?;
        tracing::info!("Extracted {} products", scraped.len());
        self.monitor.log_stats("Extract");

        if scraped.is_empty() {
            self.monitor.log_final_stats();
            return Ok(None);
        }

        // Transform
        tracing::info!("Transforming products...");
        let transformed = self.pipeline.transform(scraped).await?;
        tracing::info!("Transformed {} products", transformed.products.len());
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Saving results...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("✅ Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(Some(output_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ProductInfo, ScrapedProduct, SearchCandidate, TransformResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPipeline {
        products: usize,
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pipeline for FixedPipeline {
        async fn extract(&self) -> Result<Vec<ScrapedProduct>> {
            Ok((0..self.products)
                .map(|i| ScrapedProduct {
                    candidate: SearchCandidate {
                        title: None,
                        price: None,
                        url: format!("https://www.amazon.com/dp/{}", i),
                        asin: i.to_string(),
                        simplified_url: format!("https://www.amazon.com/dp/{}", i),
                        is_sponsored: false,
                    },
                    info: ProductInfo::default(),
                })
                .collect())
        }

        async fn transform(&self, data: Vec<ScrapedProduct>) -> Result<TransformResult> {
            Ok(TransformResult {
                products: Vec::new(),
                csv_output: vec![b'x'; data.len()],
                json_output: String::new(),
            })
        }

        async fn load(&self, result: TransformResult) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} bytes", result.csv_output.len()))
        }
    }

    #[tokio::test]
    async fn test_engine_runs_all_phases() {
        let engine = EtlEngine::new(FixedPipeline {
            products: 2,
            loads: AtomicUsize::new(0),
        });
        assert_eq!(engine.run().await.unwrap(), Some("2 bytes".to_string()));
        assert_eq!(engine.pipeline().loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_skips_load_without_products() {
        let engine = EtlEngine::new(FixedPipeline {
            products: 0,
            loads: AtomicUsize::new(0),
        });
        assert_eq!(engine.run().await.unwrap(), None);
        assert_eq!(engine.pipeline().loads.load(Ordering::SeqCst), 0);
    }
}
