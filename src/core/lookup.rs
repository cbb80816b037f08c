//! Forward-lookup backends for the resolver pool.
//!
//! - [`SystemLookup`] calls `getaddrinfo` on tokio's blocking pool, the same
//!   path `gethostbyname`-style tools take, with at most `concurrency` calls
//!   running even after their callers gave up.
//! - [`HickoryLookup`] is a fully async resolver built from the system
//!   resolv.conf, restricted to A records.
//!
//! Both answer with the first IPv4 address and never return an error: every
//! failure becomes a [`Lookup`] variant.

use crate::domain::model::{LookupBackendKind, Lookup};
use crate::domain::ports::DnsLookup;
use async_trait::async_trait;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// 將解析器錯誤訊息歸類
fn classify(message: String) -> Lookup {
    let lower = message.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        Lookup::TimedOut
    } else if lower.contains("no record")
        || lower.contains("not known")
        || lower.contains("nxdomain")
        || lower.contains("no address")
        || lower.contains("not found")
    {
        Lookup::NotFound
    } else {
        Lookup::Failed(message)
    }
}

fn first_ipv4(addrs: impl IntoIterator<Item = IpAddr>) -> Lookup {
    addrs
        .into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(Lookup::Resolved(v4)),
            IpAddr::V6(_) => None,
        })
        .unwrap_or(Lookup::NotFound)
}

type BlockingResolve = dyn Fn(&str) -> io::Result<Vec<IpAddr>> + Send + Sync;

fn getaddrinfo(host: &str) -> io::Result<Vec<IpAddr>> {
    (host, 0u16)
        .to_socket_addrs()
        .map(|addrs| addrs.map(|addr: SocketAddr| addr.ip()).collect())
}

/// `getaddrinfo` executed with `spawn_blocking`.
///
/// A blocking call cannot be interrupted. Each call holds one of
/// `max_in_flight` slots until the OS call itself returns, even when the
/// caller has already timed out and dropped the lookup, so no more than
/// `max_in_flight` resolver threads ever run at once.
#[derive(Clone)]
pub struct SystemLookup {
    resolve: Arc<BlockingResolve>,
    slots: Arc<Semaphore>,
    max_in_flight: u32,
}

impl SystemLookup {
    pub fn new(max_in_flight: usize) -> Self {
        Self::from_fn(max_in_flight, getaddrinfo)
    }

    /// Same slot accounting around any blocking resolve function.
    pub fn from_fn(
        max_in_flight: usize,
        resolve: impl Fn(&str) -> io::Result<Vec<IpAddr>> + Send + Sync + 'static,
    ) -> Self {
        let max_in_flight = max_in_flight.clamp(1, u32::MAX as usize) as u32;
        Self {
            resolve: Arc::new(resolve),
            slots: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    /// Blocking calls still running, including abandoned ones.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight as usize - self.slots.available_permits()
    }
}

impl std::fmt::Debug for SystemLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemLookup")
            .field("max_in_flight", &self.max_in_flight)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[async_trait]
impl DnsLookup for SystemLookup {
    async fn lookup_ipv4(&self, domain: &str) -> Lookup {
        let permit = match Arc::clone(&self.slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return Lookup::Failed(e.to_string()),
        };

        let resolve = Arc::clone(&self.resolve);
        let host = domain.to_string();
        let result = tokio::task::spawn_blocking(move || {
            // 呼叫結束才釋放名額
            let _permit = permit;
            resolve(&host)
        })
        .await;

        match result {
            Ok(Ok(addrs)) => first_ipv4(addrs),
            Ok(Err(e)) => {
                tracing::trace!(domain = %domain, error = %e, "getaddrinfo failed");
                classify(e.to_string())
            }
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "DNS resolution task failed");
                Lookup::Failed(e.to_string())
            }
        }
    }

    async fn drain(&self) {
        let running = self.in_flight();
        if running > 0 {
            tracing::debug!("Waiting for {} abandoned getaddrinfo calls", running);
        }
        // 取得全部名額即代表沒有進行中的呼叫
        let _all = self.slots.acquire_many(self.max_in_flight).await;
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Async resolver owned by one pool; not shared across runs.
#[derive(Clone)]
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    pub fn new(timeout: Duration) -> Self {
        let mut builder = match TokioResolver::builder_tokio() {
            Ok(builder) => {
                tracing::debug!("Using system DNS configuration");
                builder
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read system DNS config, using defaults");
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };

        let options = builder.options_mut();
        options.ip_strategy = LookupIpStrategy::Ipv4Only;
        options.timeout = timeout;
        options.attempts = 1;

        Self {
            resolver: builder.build(),
        }
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup_ipv4(&self, domain: &str) -> Lookup {
        match self.resolver.lookup_ip(domain).await {
            Ok(lookup) => first_ipv4(lookup.iter()),
            Err(e) => {
                tracing::trace!(domain = %domain, error = %e, "hickory-dns lookup failed");
                classify(e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "hickory"
    }
}

pub fn backend_for(
    kind: LookupBackendKind,
    concurrency: usize,
    timeout: Duration,
) -> Arc<dyn DnsLookup> {
    match kind {
        LookupBackendKind::System => Arc::new(SystemLookup::new(concurrency)),
        LookupBackendKind::Hickory => Arc::new(HickoryLookup::new(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_first_ipv4_skips_ipv6() {
        let addrs = vec![
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        ];
        assert_eq!(first_ipv4(addrs), Lookup::Resolved(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(first_ipv4(vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]), Lookup::NotFound);
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            classify("failed to lookup address information: Name or service not known".into()),
            Lookup::NotFound
        );
        assert_eq!(classify("request timed out".into()), Lookup::TimedOut);
        assert!(matches!(classify("connection refused".into()), Lookup::Failed(_)));
    }

    #[tokio::test]
    async fn test_system_lookup_resolves_localhost() {
        let lookup = SystemLookup::new(4);
        assert_eq!(
            lookup.lookup_ipv4("localhost").await,
            Lookup::Resolved(Ipv4Addr::LOCALHOST)
        );
    }

    #[tokio::test]
    async fn test_system_lookup_rejects_host_with_port() {
        let lookup = SystemLookup::new(4);
        assert!(!lookup.lookup_ipv4("localhost:8080").await.is_resolved());
    }

    #[tokio::test]
    async fn test_abandoned_system_lookup_keeps_its_slot() {
        let lookup = SystemLookup::from_fn(1, |_host: &str| {
            std::thread::sleep(Duration::from_millis(150));
            Ok(vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))])
        });

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), lookup.lookup_ipv4("a.test")).await;
        assert!(abandoned.is_err());
        assert_eq!(lookup.in_flight(), 1);

        lookup.drain().await;
        assert_eq!(lookup.in_flight(), 0);
        assert_eq!(
            lookup.lookup_ipv4("b.test").await,
            Lookup::Resolved(Ipv4Addr::new(192, 0, 2, 1))
        );
    }

    #[test]
    fn test_classify_hickory_messages() {
        assert_eq!(
            classify("no record found for Query { name: Name(\"name.invalid.\"), query_type: A, query_class: IN }".into()),
            Lookup::NotFound
        );
        assert_eq!(classify("request timed out".into()), Lookup::TimedOut);
    }

    #[tokio::test]
    async fn test_hickory_lookup_does_not_resolve_invalid_tld() {
        let lookup = HickoryLookup::new(Duration::from_millis(500));
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            lookup.lookup_ipv4("name.invalid"),
        )
        .await
        .unwrap_or(Lookup::TimedOut);

        assert!(!outcome.is_resolved(), "resolved to {}", outcome);
    }

    #[tokio::test]
    async fn test_backend_for_picks_backend() {
        let timeout = Duration::from_millis(500);
        assert_eq!(backend_for(LookupBackendKind::Hickory, 4, timeout).name(), "hickory");
        assert_eq!(backend_for(LookupBackendKind::System, 4, timeout).name(), "system");
    }
}
