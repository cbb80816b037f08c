use crate::core::ConfigProvider;
use crate::domain::model::{
    EnrichmentSettings, LookupBackendKind, ResolveStrategy, SummarySettings, TimeBucket,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_extension, validate_path, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

pub const MAX_LOOKUP_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub enrichment: EnrichmentConfig,
    pub summary: SummaryConfig,
    pub output: OutputConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "response.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub concurrency: usize,
    pub lookup_timeout_ms: u64,
    pub strategy: ResolveStrategy,
    pub backend: LookupBackendKind,
    pub overall_deadline_seconds: Option<u64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: EnrichmentSettings::DEFAULT_CONCURRENCY,
            lookup_timeout_ms: EnrichmentSettings::DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64,
            strategy: ResolveStrategy::default(),
            backend: LookupBackendKind::default(),
            overall_deadline_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub top_domains: usize,
    pub top_reporters: usize,
    pub time_bucket: TimeBucket,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        let defaults = SummarySettings::default();
        Self {
            top_domains: defaults.top_domains,
            top_reporters: defaults.top_reporters,
            time_bucket: defaults.time_bucket,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub compress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            compress: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| EtlError::ConfigError {
                message: format!("cannot read '{}': {}", path.as_ref().display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_extension("input.path", &self.input.path, &["json"])?;
        validate_path("output.path", &self.output.path)?;

        validate_positive_number("enrichment.concurrency", self.enrichment.concurrency, 1)?;
        validate_range(
            "enrichment.lookup_timeout_ms",
            self.enrichment.lookup_timeout_ms,
            1,
            MAX_LOOKUP_TIMEOUT_MS,
        )?;
        if let Some(deadline) = self.enrichment.overall_deadline_seconds {
            validate_range("enrichment.overall_deadline_seconds", deadline, 1, u64::MAX)?;
        }

        validate_positive_number("summary.top_domains", self.summary.top_domains, 1)?;
        validate_positive_number("summary.top_reporters", self.summary.top_reporters, 1)?;

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn enrichment(&self) -> EnrichmentSettings {
        EnrichmentSettings {
            concurrency: self.enrichment.concurrency,
            lookup_timeout: Duration::from_millis(self.enrichment.lookup_timeout_ms),
            strategy: self.enrichment.strategy,
            backend: self.enrichment.backend,
            overall_deadline: self.enrichment.overall_deadline_seconds.map(Duration::from_secs),
        }
    }

    fn summary(&self) -> SummarySettings {
        SummarySettings {
            top_domains: self.summary.top_domains,
            top_reporters: self.summary.top_reporters,
            time_bucket: self.summary.time_bucket,
        }
    }

    fn compress_output(&self) -> bool {
        self.output.compress
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.input_path(), "response.json");
        let enrichment = config.enrichment();
        assert_eq!(enrichment.concurrency, 100);
        assert_eq!(enrichment.lookup_timeout, Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[input]
path = "data/notices.json"

[enrichment]
concurrency = 25
lookup_timeout_ms = 500
strategy = "bulk_async"
backend = "hickory"
overall_deadline_seconds = 300

[summary]
top_domains = 5
time_bucket = "day"

[output]
path = "./reports"
compress = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let enrichment = config.enrichment();

        assert_eq!(enrichment.concurrency, 25);
        assert_eq!(enrichment.lookup_timeout, Duration::from_millis(500));
        assert_eq!(enrichment.strategy, ResolveStrategy::BulkAsync);
        assert_eq!(enrichment.backend, LookupBackendKind::Hickory);
        assert_eq!(enrichment.overall_deadline, Some(Duration::from_secs(300)));
        assert_eq!(config.summary().top_domains, 5);
        assert_eq!(config.summary().top_reporters, 20);
        assert_eq!(config.summary().time_bucket, TimeBucket::Day);
        assert!(config.compress_output());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("NOTICE_ETL_TEST_OUTPUT", "/tmp/notice-reports");

        let toml_content = r#"
[output]
path = "${NOTICE_ETL_TEST_OUTPUT}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.output_path(), "/tmp/notice-reports");

        std::env::remove_var("NOTICE_ETL_TEST_OUTPUT");
    }

    #[test]
    fn test_config_validation() {
        let zero_concurrency = TomlConfig::from_toml_str("[enrichment]\nconcurrency = 0\n").unwrap();
        assert!(zero_concurrency.validate().is_err());

        let huge_timeout =
            TomlConfig::from_toml_str("[enrichment]\nlookup_timeout_ms = 600000\n").unwrap();
        assert!(huge_timeout.validate().is_err());

        let wrong_input = TomlConfig::from_toml_str("[input]\npath = \"notices.csv\"\n").unwrap();
        assert!(wrong_input.validate().is_err());
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let result = TomlConfig::from_toml_str("[enrichment]\nstrategy = \"threads\"\n");
        assert!(matches!(result, Err(EtlError::ConfigValidationError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[enrichment]\nconcurrency = 8\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.enrichment.concurrency, 8);
    }

    #[test]
    fn test_unreadable_config_file_is_config_error() {
        let err = TomlConfig::from_file("/nonexistent/notice-etl.toml").unwrap_err();

        assert!(matches!(err, EtlError::ConfigError { .. }));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Configuration);
        assert!(err.to_string().contains("/nonexistent/notice-etl.toml"));
    }
}
