use crate::core::cache::ResolutionCache;
use crate::core::extractor;
use crate::core::resolver::{Resolution, ResolverPool};
use crate::domain::model::{
    DomainRecord, EnrichmentStats, Record, DOMAIN, INFRINGING_URLS, IP_ADDRESS, NA,
};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    /// Input rows in input order, each with `domain` and `ipaddress` set.
    pub rows: Vec<Record>,
    /// One entry per unique domain that was looked up, sorted by domain.
    pub domains: Vec<DomainRecord>,
    pub stats: EnrichmentStats,
}

/// Attaches `domain` and `ipaddress` to every row.
///
/// Rows whose URL yields no domain are kept and marked `"NA"`; they are just
/// not sent to the resolver. Each unique domain is looked up once.
pub async fn enrich(rows: Vec<Record>, pool: &ResolverPool) -> EnrichmentOutcome {
    enrich_inner(rows, pool, None).await
}

/// [`enrich`] with a caller-owned cache consulted before the resolver.
pub async fn enrich_with_cache(
    rows: Vec<Record>,
    pool: &ResolverPool,
    cache: &ResolutionCache,
) -> EnrichmentOutcome {
    enrich_inner(rows, pool, Some(cache)).await
}

async fn enrich_inner(
    mut rows: Vec<Record>,
    pool: &ResolverPool,
    cache: Option<&ResolutionCache>,
) -> EnrichmentOutcome {
    tracing::info!("🔎 Starting domain extraction for {} rows...", rows.len());

    let row_domains: Vec<String> = rows
        .iter()
        .map(|row| {
            row.get_str(INFRINGING_URLS)
                .map(extractor::extract)
                .unwrap_or_else(|| NA.to_string())
        })
        .collect();

    let unique: HashSet<String> = row_domains
        .iter()
        .filter(|domain| domain.as_str() != NA)
        .cloned()
        .collect();

    let unextractable_rows = row_domains.iter().filter(|d| d.as_str() == NA).count();
    tracing::info!(
        "Domain extraction completed: {} unique domains, {} rows without a domain",
        unique.len(),
        unextractable_rows
    );

    let resolution: Resolution = match cache {
        Some(cache) => pool.resolve_all_cached(unique, cache).await,
        None => pool.resolve_all(unique).await,
    };

    for (row, domain) in rows.iter_mut().zip(row_domains) {
        let ip = if domain == NA {
            NA.to_string()
        } else {
            resolution
                .get(&domain)
                .map(|outcome| outcome.as_field())
                .unwrap_or_else(|| NA.to_string())
        };
        row.set(DOMAIN, domain);
        row.set(IP_ADDRESS, ip);
    }

    let mut stats = EnrichmentStats {
        rows: rows.len(),
        unextractable_rows,
        unique_domains: resolution.len(),
        cache_hits: resolution.cache_hits,
        elapsed: resolution.elapsed,
        ..EnrichmentStats::default()
    };

    let mut domains: Vec<DomainRecord> = resolution
        .outcomes
        .into_iter()
        .map(|(domain, ip)| {
            stats.count(&ip);
            DomainRecord { domain, ip }
        })
        .collect();
    domains.sort_by(|a, b| a.domain.cmp(&b.domain));

    tracing::info!(
        "Data merging completed: {} rows, {} resolved, {} unresolved domains",
        stats.rows,
        stats.resolved,
        stats.unresolved()
    );

    EnrichmentOutcome {
        rows,
        domains,
        stats,
    }
}
