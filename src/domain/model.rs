use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// 無法取得網域或 IP 時寫入資料的標記值
pub const NA: &str = "NA";

pub const INFRINGING_URLS: &str = "infringing_urls";
pub const COPYRIGHTED_URLS: &str = "copyrighted_urls";
pub const DOMAIN: &str = "domain";
pub const IP_ADDRESS: &str = "ipaddress";
pub const PRINCIPAL_NAME: &str = "principal_name";
pub const DATE_SENT: &str = "date_sent";

/// One flattened row. Column order is the insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.data.insert(field.to_string(), value.into());
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn domain(&self) -> &str {
        self.get_str(DOMAIN).unwrap_or(NA)
    }

    pub fn ip_address(&self) -> &str {
        self.get_str(IP_ADDRESS).unwrap_or(NA)
    }
}

/// Outcome of a single forward lookup.
///
/// Every variant except `Resolved` is written out as `"NA"`; the distinction
/// only feeds logs and [`EnrichmentStats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Resolved(Ipv4Addr),
    NotFound,
    TimedOut,
    Failed(String),
    /// The batch deadline passed before this lookup was started.
    Skipped,
}

impl Lookup {
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            Lookup::Resolved(ip) => Some(*ip),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Lookup::Resolved(_))
    }

    pub fn as_field(&self) -> String {
        match self {
            Lookup::Resolved(ip) => ip.to_string(),
            _ => NA.to_string(),
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Resolved(ip) => write!(f, "{}", ip),
            Lookup::NotFound => f.write_str("not found"),
            Lookup::TimedOut => f.write_str("timed out"),
            Lookup::Failed(reason) => write!(f, "failed: {}", reason),
            Lookup::Skipped => f.write_str("skipped"),
        }
    }
}

/// A unique domain seen during one enrichment pass and its lookup outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub domain: String,
    pub ip: Lookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ResolveStrategy {
    /// 固定數量的 worker 從共用佇列取網域
    #[default]
    WorkerPool,
    /// 一次送出整批查詢，以串流緩衝限制同時數量
    BulkAsync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum LookupBackendKind {
    /// getaddrinfo on the blocking thread pool
    #[default]
    System,
    /// hickory async resolver using the system resolv.conf
    Hickory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSettings {
    pub concurrency: usize,
    pub lookup_timeout: Duration,
    pub strategy: ResolveStrategy,
    pub backend: LookupBackendKind,
    pub overall_deadline: Option<Duration>,
}

impl EnrichmentSettings {
    pub const DEFAULT_CONCURRENCY: usize = 100;
    pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            concurrency: Self::DEFAULT_CONCURRENCY,
            lookup_timeout: Self::DEFAULT_LOOKUP_TIMEOUT,
            strategy: ResolveStrategy::default(),
            backend: LookupBackendKind::default(),
            overall_deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    #[default]
    Exact,
    Day,
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarySettings {
    pub top_domains: usize,
    pub top_reporters: usize,
    pub time_bucket: TimeBucket,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            top_domains: 10,
            top_reporters: 20,
            time_bucket: TimeBucket::Exact,
        }
    }
}

/// Counters for one enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub rows: usize,
    pub unextractable_rows: usize,
    pub unique_domains: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cache_hits: usize,
    pub elapsed: Duration,
}

impl EnrichmentStats {
    pub fn unresolved(&self) -> usize {
        self.not_found + self.timed_out + self.failed + self.skipped
    }

    pub(crate) fn count(&mut self, outcome: &Lookup) {
        match outcome {
            Lookup::Resolved(_) => self.resolved += 1,
            Lookup::NotFound => self.not_found += 1,
            Lookup::TimedOut => self.timed_out += 1,
            Lookup::Failed(_) => self.failed += 1,
            Lookup::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    pub domain: String,
    pub notice_count: usize,
    pub unique_copyrighted_urls: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucketCount {
    pub date_sent: String,
    pub notice_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReporterSummary {
    pub principal_name: String,
    pub notice_count: usize,
    pub top_infringing_domain: String,
    pub unique_infringing_domains: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Reports {
    pub top_domains: Vec<DomainSummary>,
    pub time_distribution: Vec<TimeBucketCount>,
    pub top_reporters: Vec<ReporterSummary>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub rows: Vec<Record>,
    pub reports: Reports,
    pub stats: EnrichmentStats,
}
