use crate::domain::model::Lookup;
use moka::sync::Cache;
use std::time::Duration;

/// Caller-owned, bounded, time-expiring store of lookup outcomes.
///
/// Only definitive answers (`Resolved`, `NotFound`) are kept; timeouts and
/// transport failures are always retried on the next pass.
#[derive(Clone)]
pub struct ResolutionCache {
    capacity: u64,
    ttl: Duration,
    entries: Cache<String, Lookup>,
}

impl ResolutionCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity as u64;
        Self {
            capacity,
            ttl,
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Entry count after applying pending evictions and expirations.
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, domain: &str) -> Option<Lookup> {
        self.entries.get(domain)
    }

    pub fn insert(&self, domain: &str, outcome: Lookup) {
        if self.capacity == 0 || !matches!(outcome, Lookup::Resolved(_) | Lookup::NotFound) {
            return;
        }
        self.entries.insert(domain.to_string(), outcome);
    }

    pub fn purge_expired(&self) {
        self.entries.run_pending_tasks();
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
