use crate::{
    config::DEFAULT_ROOT_SERVER,
    errors::WhoisError,
    normalize::Domain,
    referral::find_root_referral,
    transport::WhoisTransport,
};
use std::sync::Arc;
use tracing::debug;

/// Asks the IANA root registry which server is authoritative for a TLD.
#[derive(Clone)]
pub struct RootServerResolver {
    transport: Arc<dyn WhoisTransport>,
    root_server: String,
}

impl RootServerResolver {
    pub fn new(transport: Arc<dyn WhoisTransport>) -> Self {
        Self::with_root_server(transport, DEFAULT_ROOT_SERVER)
    }

    pub fn with_root_server(transport: Arc<dyn WhoisTransport>, root_server: &str) -> Self {
        Self {
            transport,
            root_server: root_server.to_string(),
        }
    }

    pub fn root_server(&self) -> &str {
        &self.root_server
    }

    /// The domain is sent as-is; the first `refer:` line wins.
    pub async fn resolve(&self, domain: &Domain) -> Result<String, WhoisError> {
        debug!("Querying root server {} for {}", self.root_server, domain);
        let response = self.transport.query(&self.root_server, domain.as_str()).await?;

        match find_root_referral(&response) {
            Some(server) => {
                debug!("Root server refers {} to {}", domain, server);
                Ok(server)
            }
            None => Err(WhoisError::NoAuthorityFound(domain.to_string())),
        }
    }
}
