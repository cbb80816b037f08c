//! Bounded-concurrency forward resolution of a unique domain set.
//!
//! [`ResolverPool::resolve_all`] is the only entry point. It never fails: every
//! domain in the input comes back in the mapping, resolved or not, and the call
//! returns only once all lookups have finished or timed out.
//!
//! Two interchangeable strategies share the same contract:
//!
//! - [`ResolveStrategy::WorkerPool`]: `concurrency` tasks drain a shared queue.
//! - [`ResolveStrategy::BulkAsync`]: one stream of lookups driven through
//!   `buffer_unordered(concurrency)`.

use crate::core::cache::ResolutionCache;
use crate::core::lookup::backend_for;
use crate::domain::model::{EnrichmentSettings, Lookup, ResolveStrategy};
use crate::domain::ports::DnsLookup;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Result of one `resolve_all` call.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub outcomes: HashMap<String, Lookup>,
    pub cache_hits: usize,
    pub elapsed: Duration,
}

impl Resolution {
    pub fn get(&self, domain: &str) -> Option<&Lookup> {
        self.outcomes.get(domain)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[derive(Clone)]
pub struct ResolverPool {
    backend: Arc<dyn DnsLookup>,
    concurrency: usize,
    lookup_timeout: Duration,
    strategy: ResolveStrategy,
    overall_deadline: Option<Duration>,
}

impl std::fmt::Debug for ResolverPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverPool")
            .field("backend", &self.backend.name())
            .field("concurrency", &self.concurrency)
            .field("lookup_timeout", &self.lookup_timeout)
            .field("strategy", &self.strategy)
            .field("overall_deadline", &self.overall_deadline)
            .finish()
    }
}

impl ResolverPool {
    pub fn new(backend: Arc<dyn DnsLookup>, concurrency: usize, lookup_timeout: Duration) -> Self {
        Self {
            backend,
            concurrency: concurrency.max(1),
            lookup_timeout,
            strategy: ResolveStrategy::default(),
            overall_deadline: None,
        }
    }

    pub fn from_settings(settings: &EnrichmentSettings) -> Self {
        let backend = backend_for(settings.backend, settings.concurrency, settings.lookup_timeout);
        let pool = Self::new(backend, settings.concurrency, settings.lookup_timeout)
            .with_strategy(settings.strategy);
        match settings.overall_deadline {
            Some(deadline) => pool.with_overall_deadline(deadline),
            None => pool,
        }
    }

    pub fn with_strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Caps the whole batch. Lookups not yet started when it expires are
    /// recorded as [`Lookup::Skipped`]; running ones get the remaining time.
    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    pub fn strategy(&self) -> ResolveStrategy {
        self.strategy
    }

    /// Resolves every domain once. The returned mapping has exactly one entry
    /// per input domain, and no backend work is left running on return.
    pub async fn resolve_all(&self, domains: HashSet<String>) -> Resolution {
        let start = Instant::now();
        let deadline = self.overall_deadline.map(|d| start + d);
        let total = domains.len();

        tracing::info!(
            "🌐 Resolving {} unique domains (strategy: {:?}, backend: {}, concurrency: {}, timeout: {:?})",
            total,
            self.strategy,
            self.backend.name(),
            self.concurrency,
            self.lookup_timeout
        );

        let domains: Vec<String> = domains.into_iter().collect();
        let mut outcomes = match self.strategy {
            ResolveStrategy::WorkerPool => self.run_worker_pool(domains.clone(), deadline).await,
            ResolveStrategy::BulkAsync => self.run_bulk(domains.clone(), deadline).await,
        };

        // 逾時被放棄的查詢也要等它真正結束
        self.backend.drain().await;

        // 確保每個網域都有結果
        for domain in domains {
            outcomes
                .entry(domain)
                .or_insert_with(|| Lookup::Failed("lookup task aborted".to_string()));
        }

        let elapsed = start.elapsed();
        let resolved = outcomes.values().filter(|o| o.is_resolved()).count();
        tracing::info!(
            "✅ IP fetching completed in {:.2} seconds ({}/{} resolved)",
            elapsed.as_secs_f64(),
            resolved,
            total
        );

        Resolution {
            outcomes,
            cache_hits: 0,
            elapsed,
        }
    }

    /// Like [`resolve_all`](Self::resolve_all), but answers from `cache`
    /// first and stores definitive outcomes of the remaining lookups.
    pub async fn resolve_all_cached(
        &self,
        domains: HashSet<String>,
        cache: &ResolutionCache,
    ) -> Resolution {
        let start = Instant::now();
        let mut cached = HashMap::new();
        let mut misses = HashSet::new();

        for domain in domains {
            match cache.get(&domain) {
                Some(outcome) => {
                    cached.insert(domain, outcome);
                }
                None => {
                    misses.insert(domain);
                }
            }
        }

        let cache_hits = cached.len();
        tracing::debug!("Resolution cache: {} hits, {} misses", cache_hits, misses.len());

        let mut resolution = if misses.is_empty() {
            Resolution::default()
        } else {
            self.resolve_all(misses).await
        };

        for (domain, outcome) in &resolution.outcomes {
            cache.insert(domain, outcome.clone());
        }

        resolution.outcomes.extend(cached);
        resolution.cache_hits = cache_hits;
        resolution.elapsed = start.elapsed();
        resolution
    }

    async fn run_worker_pool(
        &self,
        domains: Vec<String>,
        deadline: Option<Instant>,
    ) -> HashMap<String, Lookup> {
        let total = domains.len();
        let workers_count = self.concurrency.min(total);
        let queue = Arc::new(Mutex::new(domains.into_iter()));
        let mut workers = JoinSet::new();

        for _ in 0..workers_count {
            let queue = Arc::clone(&queue);
            let backend = Arc::clone(&self.backend);
            let timeout = self.lookup_timeout;

            workers.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = queue.lock().await.next();
                    let Some(domain) = next else { break };
                    let outcome = lookup_one(backend.as_ref(), &domain, timeout, deadline).await;
                    done.push((domain, outcome));
                }
                done
            });
        }

        let mut outcomes = HashMap::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(done) => outcomes.extend(done),
                Err(e) => tracing::warn!("⚠️ Resolver worker aborted: {}", e),
            }
        }
        outcomes
    }

    async fn run_bulk(
        &self,
        domains: Vec<String>,
        deadline: Option<Instant>,
    ) -> HashMap<String, Lookup> {
        let backend = self.backend.as_ref();
        let timeout = self.lookup_timeout;

        stream::iter(domains)
            .map(|domain| async move {
                let outcome = lookup_one(backend, &domain, timeout, deadline).await;
                (domain, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

async fn lookup_one(
    backend: &dyn DnsLookup,
    domain: &str,
    timeout: Duration,
    deadline: Option<Instant>,
) -> Lookup {
    let budget = match deadline {
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return Lookup::Skipped;
            }
            timeout.min(deadline - now)
        }
        None => timeout,
    };

    let outcome = match tokio::time::timeout(budget, backend.lookup_ipv4(domain)).await {
        Ok(outcome) => outcome,
        Err(_) => Lookup::TimedOut,
    };

    if !outcome.is_resolved() {
        tracing::debug!(domain = %domain, outcome = %outcome, "lookup did not resolve");
    }
    outcome
}
