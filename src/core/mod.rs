pub mod cache;
pub mod enrichment;
pub mod etl;
pub mod extractor;
pub mod flatten;
pub mod lookup;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod summary;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, DnsLookup, Pipeline, Storage};
pub use crate::utils::error::Result;
