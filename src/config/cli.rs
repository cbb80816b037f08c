use crate::config::toml_config::TomlConfig;
use crate::domain::model::{LookupBackendKind, ResolveStrategy, TimeBucket};
use crate::utils::error::Result;
use clap::Parser;

/// Command-line flags. Every flag is optional and, when given, overrides the
/// value from `--config` (or the built-in default).
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "notice-etl")]
#[command(about = "Flatten a takedown-notice dataset, enrich infringing URLs with domain and IP, and write reports")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Notice dataset (JSON with a top-level `notices` array)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory for the CSV reports
    #[arg(short, long)]
    pub output_path: Option<String>,

    /// Maximum number of DNS lookups in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Timeout of a single DNS lookup, in milliseconds
    #[arg(long)]
    pub lookup_timeout_ms: Option<u64>,

    /// Give up on lookups not started within this many seconds
    #[arg(long)]
    pub overall_deadline_seconds: Option<u64>,

    #[arg(long, value_enum)]
    pub strategy: Option<ResolveStrategy>,

    #[arg(long, value_enum)]
    pub backend: Option<LookupBackendKind>,

    #[arg(long, value_enum)]
    pub time_bucket: Option<TimeBucket>,

    /// Also bundle every report into a ZIP archive
    #[arg(long)]
    pub compress: bool,

    /// Log per-phase memory usage
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 載入設定檔並套用命令列覆蓋設定
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output.path = output_path.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.enrichment.concurrency = concurrency;
        }
        if let Some(timeout) = self.lookup_timeout_ms {
            config.enrichment.lookup_timeout_ms = timeout;
        }
        if let Some(deadline) = self.overall_deadline_seconds {
            config.enrichment.overall_deadline_seconds = Some(deadline);
        }
        if let Some(strategy) = self.strategy {
            config.enrichment.strategy = strategy;
        }
        if let Some(backend) = self.backend {
            config.enrichment.backend = backend;
        }
        if let Some(bucket) = self.time_bucket {
            config.summary.time_bucket = bucket;
        }
        config.output.compress |= self.compress;
        config.monitoring.enabled |= self.monitor;
        config.monitoring.json_logs |= self.json_logs;

        Ok(config)
    }
}
