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

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting ETL process...");

        // Extract
        let rows = self.pipeline.extract().await?;
        tracing::info!("Extracted {} rows", rows.len());
        self.monitor.log_stats("extract");

        // Transform
        let result = self.pipeline.transform(rows).await?;
        let stats = &result.stats;
        tracing::info!(
            "Enriched {} rows: {} unique domains, {} resolved, {} unresolved ({} not found, {} timed out, {} failed, {} skipped) in {:.2}s",
            stats.rows,
            stats.unique_domains,
            stats.resolved,
            stats.unresolved(),
            stats.not_found,
            stats.timed_out,
            stats.failed,
            stats.skipped,
            stats.elapsed.as_secs_f64()
        );
        self.monitor.log_stats("transform");

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
