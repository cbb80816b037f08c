pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, TomlConfig};

pub use core::cache::ResolutionCache;
pub use core::enrichment::{enrich, enrich_with_cache, EnrichmentOutcome};
pub use core::extractor::extract;
pub use core::resolver::{Resolution, ResolverPool};
pub use core::{etl::EtlEngine, pipeline::NoticePipeline};
pub use domain::model::{Lookup, Record, NA};
pub use utils::error::{EtlError, Result};
