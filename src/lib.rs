//! # Whois Chain
//!
//! Recursive whois resolution for Rust.
//!
//! ## Features
//!
//! - Authoritative server discovery through the IANA root and registry referrals
//! - Exception table for registries whose referral chain is broken
//! - Per-registry query syntax (Verisign `=`, DENIC flags, JPRS `/e`)
//! - Thin-registry response slicing
//! - Referral cycle detection and a hop cap
//! - Best-effort field extraction and a CSV report of every hop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_chain::WhoisClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WhoisClient::new()?;
//!     let result = client.lookup("google.com").await?;
//!
//!     for (server, record) in result.servers.iter().zip(&result.records) {
//!         println!("{}: registrar {:?}", server, record.registrar());
//!     }
//!     if let Some(record) = result.authoritative_record() {
//!         println!("name servers: {:?}", record.name_servers());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod errors;
pub mod exceptions;
pub mod liveness;
pub mod normalize;
pub mod parser;
pub mod referral;
pub mod report;
pub mod resolver;
pub mod rewrite;
pub mod root;
pub mod slicer;
pub mod transport;

// Re-export main types for easy access
pub use config::Config;
pub use errors::{TransportErrorKind, WhoisError};
pub use normalize::{normalize_domain, Domain};
pub use parser::{Field, FieldExtractor, ParsedRecord};
pub use resolver::{ReferralStep, Resolution, WhoisResolver};
pub use transport::{TcpTransport, WhoisTransport};

use std::sync::Arc;

/// High-level whois client: resolution plus field extraction
#[derive(Clone)]
pub struct WhoisClient {
    resolver: Arc<WhoisResolver>,
    extractor: FieldExtractor,
}

impl WhoisClient {
    /// Create a client from the layered configuration
    pub fn new() -> Result<Self, WhoisError> {
        let config = Config::load()?;
        Ok(Self::new_with_config(&config))
    }

    pub fn new_with_config(config: &Config) -> Self {
        Self::from_resolver(WhoisResolver::from_config(config))
    }

    pub fn from_resolver(resolver: WhoisResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            extractor: FieldExtractor::new(),
        }
    }

    /// Resolve the referral chain and extract fields from every hop
    pub async fn lookup(&self, domain: &str) -> Result<WhoisResponse, WhoisError> {
        let start_time = std::time::Instant::now();
        let resolution = self.resolver.resolve(domain).await?;
        Ok(self.build_response(domain, resolution, start_time))
    }

    /// Same as [`lookup`](Self::lookup) but starting at a caller-chosen server
    pub async fn lookup_from(&self, domain: &str, server: &str) -> Result<WhoisResponse, WhoisError> {
        let start_time = std::time::Instant::now();
        let resolution = self.resolver.resolve_from(domain, server).await?;
        Ok(self.build_response(domain, resolution, start_time))
    }

    fn build_response(&self, domain: &str, resolution: Resolution, start_time: std::time::Instant) -> WhoisResponse {
        // Records follow hop order so they line up with `servers`
        let records = resolution
            .steps_in_hop_order()
            .map(|step| self.extractor.extract(step.record_text()))
            .collect();

        WhoisResponse {
            domain: domain.to_string(),
            normalized_domain: resolution.domain.to_string(),
            servers: resolution.servers,
            chain: resolution.chain,
            records,
            query_time_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

/// Response structure for whois lookups
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WhoisResponse {
    pub domain: String,
    pub normalized_domain: String,
    /// Servers in query order
    pub servers: Vec<String>,
    /// Raw responses, newest first
    pub chain: Vec<ReferralStep>,
    /// One record per hop, in query order
    pub records: Vec<ParsedRecord>,
    pub query_time_ms: u64,
}

impl WhoisResponse {
    /// Record from the deepest server reached
    pub fn authoritative_record(&self) -> Option<&ParsedRecord> {
        self.records.last()
    }
}
