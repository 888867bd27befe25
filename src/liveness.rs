//! Boundary with the liveness-check pipeline.
//!
//! HTTP probing and persistence live outside this crate. A [`LivenessProbe`]
//! reports which protocols answered; when none did, the checker runs a whois
//! resolution so the dead-domain report carries the registry's view.

use crate::resolver::{Resolution, WhoisResolver};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("http"),
            Protocol::Https => f.write_str("https"),
        }
    }
}

/// Stored liveness state. Codes: NULL unchecked, 0 dead, 2 alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainStatus {
    Unchecked,
    Dead,
    Alive,
}

impl DomainStatus {
    pub fn code(&self) -> Option<u8> {
        match self {
            DomainStatus::Unchecked => None,
            DomainStatus::Dead => Some(0),
            DomainStatus::Alive => Some(2),
        }
    }

    /// `None` for codes outside the vocabulary.
    pub fn from_code(code: Option<u8>) -> Option<Self> {
        match code {
            None => Some(DomainStatus::Unchecked),
            Some(0) => Some(DomainStatus::Dead),
            Some(2) => Some(DomainStatus::Alive),
            Some(_) => None,
        }
    }
}

/// Reports which protocols a domain answers on.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn alive_protocols(&self, domain: &str) -> Vec<Protocol>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessOutcome {
    pub domain: String,
    pub status: DomainStatus,
    pub protocols: Vec<Protocol>,
    pub checked_at: DateTime<Utc>,
    /// Whois chain for dead domains, when the resolution succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois: Option<Resolution>,
}

impl LivenessOutcome {
    pub fn is_dead(&self) -> bool {
        self.status == DomainStatus::Dead
    }
}

#[derive(Clone)]
pub struct LivenessChecker {
    probe: Arc<dyn LivenessProbe>,
    resolver: Arc<WhoisResolver>,
}

impl LivenessChecker {
    pub fn new(probe: Arc<dyn LivenessProbe>, resolver: Arc<WhoisResolver>) -> Self {
        Self { probe, resolver }
    }

    pub async fn check(&self, domain: &str) -> LivenessOutcome {
        let protocols = self.probe.alive_protocols(domain).await;

        if !protocols.is_empty() {
            info!("Domain {} is alive over {:?}", domain, protocols);
            return LivenessOutcome {
                domain: domain.to_string(),
                status: DomainStatus::Alive,
                protocols,
                checked_at: Utc::now(),
                whois: None,
            };
        }

        // Dead regardless of whether whois answers
        let whois = match self.resolver.resolve(domain).await {
            Ok(resolution) => {
                warn!(
                    "Domain {} is not alive, whois via {}",
                    domain,
                    resolution.servers.join(" -> ")
                );
                Some(resolution)
            }
            Err(e) => {
                warn!("Domain {} is not alive and whois failed: {}", domain, e);
                None
            }
        };

        LivenessOutcome {
            domain: domain.to_string(),
            status: DomainStatus::Dead,
            protocols,
            checked_at: Utc::now(),
            whois,
        }
    }

    /// Check a batch with a bounded number of domains in flight.
    pub async fn check_all<I>(&self, domains: I, concurrency: usize) -> Vec<LivenessOutcome>
    where
        I: IntoIterator<Item = String>,
    {
        stream::iter(domains)
            .map(|domain| async move { self.check(&domain).await })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        errors::{TransportErrorKind, WhoisError},
        transport::WhoisTransport,
    };

    struct FixedProbe;

    #[async_trait]
    impl LivenessProbe for FixedProbe {
        async fn alive_protocols(&self, domain: &str) -> Vec<Protocol> {
            if domain.starts_with("up.") {
                vec![Protocol::Https]
            } else {
                Vec::new()
            }
        }
    }

    struct RegistryOnly;

    #[async_trait]
    impl WhoisTransport for RegistryOnly {
        async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
            match server {
                "whois.iana.org" if query.ends_with(".com") => Ok("refer: whois.registry.example\n".to_string()),
                "whois.registry.example" => Ok(format!("Domain Name: {}\nDomain Status: pendingDelete\n", query)),
                _ => Err(WhoisError::transport(server, TransportErrorKind::ConnectFailed, "refused")),
            }
        }
    }

    fn checker() -> LivenessChecker {
        let resolver = WhoisResolver::new(&Config::default(), Arc::new(RegistryOnly));
        LivenessChecker::new(Arc::new(FixedProbe), Arc::new(resolver))
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DomainStatus::Unchecked.code(), None);
        assert_eq!(DomainStatus::Dead.code(), Some(0));
        assert_eq!(DomainStatus::Alive.code(), Some(2));
        assert_eq!(DomainStatus::from_code(Some(2)), Some(DomainStatus::Alive));
        assert_eq!(DomainStatus::from_code(None), Some(DomainStatus::Unchecked));
        assert_eq!(DomainStatus::from_code(Some(1)), None);
    }

    #[tokio::test]
    async fn test_alive_domain_skips_whois() {
        let outcome = checker().check("up.example.com").await;
        assert_eq!(outcome.status, DomainStatus::Alive);
        assert_eq!(outcome.protocols, vec![Protocol::Https]);
        assert!(outcome.whois.is_none());
    }

    #[tokio::test]
    async fn test_dead_domain_carries_whois_chain() {
        let outcome = checker().check("gone.com").await;
        assert!(outcome.is_dead());
        let whois = outcome.whois.expect("whois chain for dead domain");
        assert_eq!(whois.servers, vec!["whois.registry.example"]);
    }

    #[tokio::test]
    async fn test_whois_failure_keeps_dead_status() {
        let outcome = checker().check("gone.org").await;
        assert!(outcome.is_dead());
        assert!(outcome.whois.is_none());
    }

    #[tokio::test]
    async fn test_check_all_keeps_order() {
        let outcomes = checker()
            .check_all(vec!["up.a.com".to_string(), "down.com".to_string()], 2)
            .await;
        let dead: Vec<&str> = outcomes.iter().filter(|o| o.is_dead()).map(|o| o.domain.as_str()).collect();
        assert_eq!(outcomes[0].domain, "up.a.com");
        assert_eq!(dead, vec!["down.com"]);
    }
}
