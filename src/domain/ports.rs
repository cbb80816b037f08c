use crate::domain::model::{EnrichmentSettings, Lookup, Record, SummarySettings, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn enrichment(&self) -> EnrichmentSettings;
    fn summary(&self) -> SummarySettings;
    fn compress_output(&self) -> bool;
}

/// A single-name forward lookup. Implementations absorb their own errors
/// into a [`Lookup`] outcome; timeouts are applied by the caller.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_ipv4(&self, domain: &str) -> Lookup;

    /// Returns once no work started by earlier lookups is still running,
    /// including lookups whose futures were dropped on timeout.
    async fn drain(&self) {}

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
