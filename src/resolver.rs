//! Referral-following resolution loop.
//!
//! The first server comes from the exception table or the IANA root; every
//! response is then scanned for a referral and the next hop is queried until a
//! response stops pointing somewhere new.

use crate::{
    config::Config,
    errors::{TransportErrorKind, WhoisError},
    exceptions::{default_exceptions, ExceptionTable},
    normalize::Domain,
    referral::find_referral,
    rewrite::{default_rewriter, QueryRewriter},
    root::RootServerResolver,
    slicer::{slice_response, ThinRegistries},
    transport::{TcpTransport, WhoisTransport},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashSet, VecDeque},
    future::Future,
    pin::{pin, Pin},
    sync::Arc,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One hop: the server queried and what it answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStep {
    pub server: String,
    pub response: String,
    /// The domain's own block of a thin-registry response kept whole under `never_cut`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sliced: Option<String>,
}

impl ReferralStep {
    /// Text that fields are extracted from: the sliced block when one was kept.
    pub fn record_text(&self) -> &str {
        self.sliced.as_deref().unwrap_or(&self.response)
    }
}

/// Outcome of one top-level resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub domain: Domain,
    /// Newest-first: the last server queried is at index 0.
    pub chain: Vec<ReferralStep>,
    /// Servers in the order they were queried.
    pub servers: Vec<String>,
}

impl Resolution {
    pub fn hops(&self) -> usize {
        self.servers.len()
    }

    /// Steps in the order the servers were queried.
    pub fn steps_in_hop_order(&self) -> impl Iterator<Item = &ReferralStep> {
        self.chain.iter().rev()
    }
}

#[derive(Default)]
struct ChainAccumulator {
    chain: VecDeque<ReferralStep>,
    servers: Vec<String>,
    visited: HashSet<String>,
}

impl ChainAccumulator {
    fn record(&mut self, server: &str, response: String, sliced: Option<String>) {
        self.chain.push_front(ReferralStep {
            server: server.to_string(),
            response,
            sliced,
        });
        self.servers.push(server.to_string());
        self.visited.insert(server.to_ascii_lowercase());
    }

    fn has_visited(&self, server: &str) -> bool {
        self.visited.contains(&server.to_ascii_lowercase())
    }

    fn hops(&self) -> usize {
        self.servers.len()
    }

    fn finish(self, domain: Domain) -> Resolution {
        Resolution {
            domain,
            chain: self.chain.into(),
            servers: self.servers,
        }
    }
}

/// Runs resolutions. Tables are immutable and shared, so one resolver can serve
/// many concurrent lookups.
#[derive(Clone)]
pub struct WhoisResolver {
    transport: Arc<dyn WhoisTransport>,
    root: RootServerResolver,
    exceptions: Arc<ExceptionTable>,
    rewriter: Arc<QueryRewriter>,
    thin_registries: Arc<ThinRegistries>,
    never_cut: bool,
    max_hops: usize,
}

impl WhoisResolver {
    pub fn new(config: &Config, transport: Arc<dyn WhoisTransport>) -> Self {
        info!(
            "WhoisResolver initialized (root: {}, max hops: {}, never_cut: {})",
            config.root_server, config.max_referrals, config.never_cut
        );

        Self {
            root: RootServerResolver::with_root_server(transport.clone(), &config.root_server),
            transport,
            exceptions: Arc::new(default_exceptions()),
            rewriter: Arc::new(default_rewriter()),
            thin_registries: Arc::new(ThinRegistries::default()),
            never_cut: config.never_cut,
            max_hops: config.max_referrals.max(1),
        }
    }

    /// Resolver talking plain TCP as configured.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, Arc::new(TcpTransport::from_config(config)))
    }

    pub fn with_exceptions(mut self, exceptions: ExceptionTable) -> Self {
        self.exceptions = Arc::new(exceptions);
        self
    }

    pub fn with_rewriter(mut self, rewriter: QueryRewriter) -> Self {
        self.rewriter = Arc::new(rewriter);
        self
    }

    pub fn with_thin_registries(mut self, thin_registries: ThinRegistries) -> Self {
        self.thin_registries = Arc::new(thin_registries);
        self
    }

    /// Keep full unsliced responses in the chain.
    pub fn with_never_cut(mut self, never_cut: bool) -> Self {
        self.never_cut = never_cut;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    pub async fn resolve(&self, domain: &str) -> Result<Resolution, WhoisError> {
        let domain = Domain::parse(domain)?;
        self.run(domain, None, std::future::pending()).await
    }

    /// Start at `server` instead of consulting the exception table or the root.
    pub async fn resolve_from(&self, domain: &str, server: &str) -> Result<Resolution, WhoisError> {
        let domain = Domain::parse(domain)?;
        self.run(domain, Some(server), std::future::pending()).await
    }

    /// Abort with `Cancelled` as soon as `cancel` completes.
    pub async fn resolve_until<F>(&self, domain: &str, cancel: F) -> Result<Resolution, WhoisError>
    where
        F: Future<Output = ()>,
    {
        let domain = Domain::parse(domain)?;
        self.run(domain, None, cancel).await
    }

    pub async fn resolve_with_deadline(&self, domain: &str, deadline: Instant) -> Result<Resolution, WhoisError> {
        self.resolve_until(domain, tokio::time::sleep_until(deadline)).await
    }

    async fn run<F>(&self, domain: Domain, start: Option<&str>, cancel: F) -> Result<Resolution, WhoisError>
    where
        F: Future<Output = ()>,
    {
        let mut cancel = pin!(cancel);

        let mut server = match start {
            Some(server) => server.to_string(),
            None => {
                let root_server = self.root.root_server().to_string();
                cancellable(&mut cancel, &root_server, self.first_server(&domain)).await?
            }
        };

        let mut acc = ChainAccumulator::default();

        loop {
            if acc.hops() >= self.max_hops {
                warn!("Referral chain for {} exceeded {} hops", domain, self.max_hops);
                return Err(WhoisError::ReferralLimitExceeded(self.max_hops));
            }

            let query = self.rewriter.rewrite(&server, &domain);
            debug!("Hop {} for {}: querying {}", acc.hops() + 1, domain, server);
            let response = cancellable(&mut cancel, &server, self.transport.query(&server, &query)).await?;

            let working = if self.thin_registries.contains(&server) {
                slice_response(&response, domain.as_str())
            } else {
                response.as_str()
            };
            let referral = find_referral(working);
            if self.never_cut {
                let sliced = (working.len() != response.len()).then(|| working.to_string());
                acc.record(&server, response, sliced);
            } else {
                let stored = working.to_string();
                acc.record(&server, stored, None);
            }

            match referral {
                Some(next) if !next.eq_ignore_ascii_case(&server) => {
                    if acc.has_visited(&next) {
                        warn!("Referral cycle for {}: {} already queried", domain, next);
                        return Err(WhoisError::ReferralCycle {
                            server: next,
                            visited: acc.servers,
                        });
                    }
                    debug!("Following referral from {} to {}", server, next);
                    server = next;
                }
                _ => break,
            }
        }

        let resolution = acc.finish(domain);
        info!(
            "Resolved {} in {} hop(s): {}",
            resolution.domain,
            resolution.hops(),
            resolution.servers.join(" -> ")
        );
        Ok(resolution)
    }

    async fn first_server(&self, domain: &Domain) -> Result<String, WhoisError> {
        if let Some(server) = self.exceptions.lookup(domain) {
            debug!("Exception table maps {} to {}", domain, server);
            return Ok(server.to_string());
        }
        self.root.resolve(domain).await
    }
}

async fn cancellable<T, C, F>(cancel: &mut Pin<&mut C>, server: &str, fut: F) -> Result<T, WhoisError>
where
    C: Future<Output = ()>,
    F: Future<Output = Result<T, WhoisError>>,
{
    tokio::select! {
        biased;
        _ = cancel.as_mut() => Err(WhoisError::transport(server, TransportErrorKind::Cancelled, "resolution cancelled")),
        result = fut => result,
    }
}
