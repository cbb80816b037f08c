use crate::core::enrichment::enrich;
use crate::core::flatten::{flatten, parse_notices};
use crate::core::report::{
    bundle_zip, records_to_csv, summary_to_csv, BUNDLE_FILE, ENRICHED_ROWS_FILE,
    TIME_DISTRIBUTION_FILE, TIME_DISTRIBUTION_HEADERS, TOP_DOMAINS_FILE, TOP_DOMAINS_HEADERS,
    TOP_REPORTERS_FILE, TOP_REPORTERS_HEADERS,
};
use crate::core::resolver::ResolverPool;
use crate::core::summary::build_reports;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::utils::error::{EtlError, Result};
use std::path::Path;

/// Notice dataset → enriched rows → CSV reports.
pub struct NoticePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    resolver: ResolverPool,
}

impl<S: Storage, C: ConfigProvider> NoticePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let resolver = ResolverPool::from_settings(&config.enrichment());
        Self::with_resolver(storage, config, resolver)
    }

    pub fn with_resolver(storage: S, config: C, resolver: ResolverPool) -> Self {
        Self {
            storage,
            config,
            resolver,
        }
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for NoticePipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let input = self.config.input_path();
        tracing::debug!("Reading notices from: {}", input);

        let bytes = self.storage.read_file(input).await.map_err(|e| match e {
            EtlError::IoError(io) => EtlError::input(format!("cannot read '{}': {}", input, io)),
            other => other,
        })?;

        let notices = parse_notices(&bytes)?;
        tracing::info!("📥 Loaded {} notices", notices.len());

        Ok(flatten(&notices))
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let outcome = enrich(data, &self.resolver).await;
        let reports = build_reports(&outcome.rows, &self.config.summary());

        tracing::debug!(
            "Reports: {} top domains, {} time buckets, {} reporters",
            reports.top_domains.len(),
            reports.time_distribution.len(),
            reports.top_reporters.len()
        );

        Ok(TransformResult {
            rows: outcome.rows,
            reports,
            stats: outcome.stats,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let files: Vec<(&str, Vec<u8>)> = vec![
            (ENRICHED_ROWS_FILE, records_to_csv(&result.rows)?),
            (
                TOP_DOMAINS_FILE,
                summary_to_csv(&result.reports.top_domains, TOP_DOMAINS_HEADERS)?,
            ),
            (
                TIME_DISTRIBUTION_FILE,
                summary_to_csv(&result.reports.time_distribution, TIME_DISTRIBUTION_HEADERS)?,
            ),
            (
                TOP_REPORTERS_FILE,
                summary_to_csv(&result.reports.top_reporters, TOP_REPORTERS_HEADERS)?,
            ),
        ];

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(&self.output_file(name), data).await?;
        }

        tracing::info!(
            "Top 10 domains summary shape: ({}, {})",
            result.reports.top_domains.len(),
            TOP_DOMAINS_HEADERS.len()
        );
        tracing::info!(
            "DMCA notices time distribution shape: ({}, {})",
            result.reports.time_distribution.len(),
            TIME_DISTRIBUTION_HEADERS.len()
        );
        tracing::info!(
            "Top copyright holders summary shape: ({}, {})",
            result.reports.top_reporters.len(),
            TOP_REPORTERS_HEADERS.len()
        );

        if self.config.compress_output() {
            let entries: Vec<(&str, &[u8])> = files
                .iter()
                .map(|(name, data)| (*name, data.as_slice()))
                .collect();
            let archive = bundle_zip(&entries)?;
            tracing::debug!("Writing ZIP bundle ({} bytes)", archive.len());
            self.storage
                .write_file(&self.output_file(BUNDLE_FILE), &archive)
                .await?;
        }

        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DnsLookup;
    use crate::domain::model::{EnrichmentSettings, Lookup, SummarySettings};
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_input(path: &str, data: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), data.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        compress: bool,
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "response.json"
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn enrichment(&self) -> EnrichmentSettings {
            EnrichmentSettings::default()
        }

        fn summary(&self) -> SummarySettings {
            SummarySettings::default()
        }

        fn compress_output(&self) -> bool {
            self.compress
        }
    }

    struct StaticLookup;

    #[async_trait::async_trait]
    impl DnsLookup for StaticLookup {
        async fn lookup_ipv4(&self, domain: &str) -> Lookup {
            match domain {
                "pirate.test" => Lookup::Resolved(Ipv4Addr::new(203, 0, 113, 9)),
                _ => Lookup::NotFound,
            }
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    const INPUT: &str = r#"{
        "notices": [{
            "id": 7,
            "principal_name": "Acme Records",
            "date_sent": "2024-03-01T12:00:00Z",
            "works": [{
                "copyrighted_urls": [{"url": "https://acme.test/song"}],
                "infringing_urls": [
                    {"url": "https://www.pirate.test/a"},
                    {"url": "nonsense"},
                    {"url": "http://gone.test/b"}
                ]
            }]
        }]
    }"#;

    fn pipeline(storage: MockStorage, compress: bool) -> NoticePipeline<MockStorage, MockConfig> {
        let pool = ResolverPool::new(Arc::new(StaticLookup), 4, Duration::from_millis(200));
        NoticePipeline::with_resolver(storage, MockConfig { compress }, pool)
    }

    #[tokio::test]
    async fn test_extract_flattens_notices() {
        let storage = MockStorage::with_input("response.json", INPUT);
        let rows = pipeline(storage, false).extract().await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get_str("infringing_urls"), Some("https://www.pirate.test/a"));
        assert_eq!(rows[2].get_str("principal_name"), Some("Acme Records"));
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_input_error() {
        let storage = MockStorage::with_input("other.json", INPUT);
        let err = pipeline(storage, false).extract().await.unwrap_err();

        assert!(matches!(err, EtlError::InputError { .. }));
    }

    #[tokio::test]
    async fn test_transform_enriches_every_row() {
        let storage = MockStorage::with_input("response.json", INPUT);
        let pipeline = pipeline(storage, false);
        let rows = pipeline.extract().await.unwrap();

        let result = pipeline.transform(rows).await.unwrap();

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0].domain(), "pirate.test");
        assert_eq!(result.rows[0].ip_address(), "203.0.113.9");
        assert_eq!(result.rows[1].domain(), "NA");
        assert_eq!(result.rows[1].ip_address(), "NA");
        assert_eq!(result.rows[2].domain(), "gone.test");
        assert_eq!(result.rows[2].ip_address(), "NA");
        assert_eq!(result.stats.unique_domains, 2);
        assert_eq!(result.reports.top_domains.len(), 2);
        assert_eq!(result.reports.top_reporters[0].notice_count, 3);
    }

    #[tokio::test]
    async fn test_load_writes_all_reports() {
        let storage = MockStorage::with_input("response.json", INPUT);
        let pipeline = pipeline(storage.clone(), true);
        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();

        let output = pipeline.load(result).await.unwrap();
        assert_eq!(output, "out");

        let enriched = storage
            .get_file(&pipeline.output_file(ENRICHED_ROWS_FILE))
            .await
            .unwrap();
        let enriched = String::from_utf8(enriched).unwrap();
        let header = enriched.lines().next().unwrap();
        assert!(header.ends_with("domain,ipaddress"));
        assert_eq!(enriched.lines().count(), 4);

        for name in [TOP_DOMAINS_FILE, TIME_DISTRIBUTION_FILE, TOP_REPORTERS_FILE, BUNDLE_FILE] {
            assert!(
                storage.get_file(&pipeline.output_file(name)).await.is_some(),
                "missing {}",
                name
            );
        }
    }
}
