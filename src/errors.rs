use std::fmt;
use thiserror::Error;

/// What went wrong on the wire while talking to a whois server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectFailed,
    ReadFailed,
    Timeout,
    Cancelled,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::ConnectFailed => "connect failed",
            TransportErrorKind::ReadFailed => "read failed",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Cannot encode domain {domain} to ASCII: {reason}")]
    Encoding { domain: String, reason: String },

    #[error("No authoritative whois server found for {0}")]
    NoAuthorityFound(String),

    #[error("Transport error ({kind}) talking to {server}: {message}")]
    Transport {
        server: String,
        kind: TransportErrorKind,
        message: String,
    },

    #[error("Referral cycle detected: {server} was already queried (chain: {})", .visited.join(" -> "))]
    ReferralCycle { server: String, visited: Vec<String> },

    #[error("Referral chain exceeded {0} hops")]
    ReferralLimitExceeded(usize),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WhoisError {
    pub(crate) fn transport(server: &str, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        WhoisError::Transport {
            server: server.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Transport kind, if this is a network-level failure.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            WhoisError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
