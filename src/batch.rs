//! Many independent resolutions through a bounded pool.
//!
//! One domain failing never stops the others; each outcome carries its own result.

use crate::{errors::WhoisError, resolver::{Resolution, WhoisResolver}};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

#[derive(Debug)]
pub struct BatchOutcome {
    /// The domain as the caller supplied it.
    pub domain: String,
    pub result: Result<Resolution, WhoisError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Resolve `domains` with at most `concurrency` in flight; outcomes keep input order.
pub async fn resolve_all<I>(resolver: &WhoisResolver, domains: I, concurrency: usize) -> Vec<BatchOutcome>
where
    I: IntoIterator<Item = String>,
{
    run_batch(resolver, domains, None, concurrency).await
}

/// Like [`resolve_all`], but every chain starts at `server`.
pub async fn resolve_all_from<I>(
    resolver: &WhoisResolver,
    domains: I,
    server: &str,
    concurrency: usize,
) -> Vec<BatchOutcome>
where
    I: IntoIterator<Item = String>,
{
    run_batch(resolver, domains, Some(server), concurrency).await
}

async fn run_batch<I>(
    resolver: &WhoisResolver,
    domains: I,
    start: Option<&str>,
    concurrency: usize,
) -> Vec<BatchOutcome>
where
    I: IntoIterator<Item = String>,
{
    let outcomes: Vec<BatchOutcome> = stream::iter(domains)
        .map(|domain| async move {
            let result = match start {
                Some(server) => resolver.resolve_from(&domain, server).await,
                None => resolver.resolve(&domain).await,
            };
            if let Err(e) = &result {
                warn!("Whois resolution failed for {}: {}", domain, e);
            }
            BatchOutcome { domain, result }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!("Batch finished: {} resolved, {} failed", outcomes.len() - failed, failed);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, errors::TransportErrorKind, transport::WhoisTransport};
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    /// Refuses `whois.down.example`, answers everything else after a short delay.
    #[derive(Default)]
    struct CountingTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl WhoisTransport for CountingTransport {
        async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
            if server == "whois.iana.org" {
                let tld = query.rsplit('.').next().unwrap_or_default();
                return Ok(format!("refer: whois.{}.example\n", tld));
            }
            if server == "whois.down.example" {
                return Err(WhoisError::transport(server, TransportErrorKind::ConnectFailed, "refused"));
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("Domain Name: {}\n", query))
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_order_kept() {
        let transport = Arc::new(CountingTransport::default());
        let resolver = WhoisResolver::new(&Config::default(), transport);

        let domains = vec!["a.com".to_string(), "b.down".to_string(), "c.org".to_string()];
        let outcomes = resolve_all(&resolver, domains, 2).await;

        let names: Vec<&str> = outcomes.iter().map(|o| o.domain.as_str()).collect();
        assert_eq!(names, vec!["a.com", "b.down", "c.org"]);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());
        assert_eq!(outcomes[2].result.as_ref().unwrap().servers, vec!["whois.org.example"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let transport = Arc::new(CountingTransport::default());
        let resolver = WhoisResolver::new(&Config::default(), transport.clone());

        let domains: Vec<String> = (0..8).map(|i| format!("site{}.net", i)).collect();
        let outcomes = resolve_all(&resolver, domains, 3).await;

        assert!(outcomes.iter().all(BatchOutcome::is_ok));
        assert!(transport.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_resolve_all_from_skips_discovery_and_is_bounded() {
        let transport = Arc::new(CountingTransport::default());
        let resolver = WhoisResolver::new(&Config::default(), transport.clone());

        let domains = vec!["a.com".to_string(), "bad".to_string(), "c.net".to_string(), "d.org".to_string()];
        let outcomes = resolve_all_from(&resolver, domains, "whois.registrar.example", 2).await;

        let names: Vec<&str> = outcomes.iter().map(|o| o.domain.as_str()).collect();
        assert_eq!(names, vec!["a.com", "bad", "c.net", "d.org"]);
        assert!(matches!(outcomes[1].result, Err(WhoisError::InvalidDomain(_))));
        for outcome in [&outcomes[0], &outcomes[2], &outcomes[3]] {
            assert_eq!(outcome.result.as_ref().unwrap().servers, vec!["whois.registrar.example"]);
        }
        assert!(transport.peak.load(Ordering::SeqCst) <= 2);
    }
}
