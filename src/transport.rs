//! Whois wire protocol: one TCP connection per query, CRLF-terminated query
//! line, response read until the peer closes.

use crate::{
    config::Config,
    errors::{TransportErrorKind, WhoisError},
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

/// Sends one query line to a whois server and returns the raw response text.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError>;
}

/// Plain TCP transport with explicit connect/read deadlines.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    port: u16,
    timeout: Duration,
    max_response_size: usize,
    buffer_size: usize,
}

impl TcpTransport {
    pub fn new(port: u16, timeout: Duration) -> Self {
        let defaults = Config::default();
        Self {
            port,
            timeout,
            max_response_size: defaults.max_response_size,
            buffer_size: defaults.buffer_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.whois_port,
            timeout: Duration::from_secs(config.whois_timeout_seconds),
            max_response_size: config.max_response_size,
            buffer_size: config.buffer_size,
        }
    }
}

#[async_trait]
impl WhoisTransport for TcpTransport {
    async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
        let mut stream = match timeout(self.timeout, TcpStream::connect((server, self.port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(WhoisError::transport(server, TransportErrorKind::ConnectFailed, e.to_string()))
            }
            Err(_) => {
                return Err(WhoisError::transport(
                    server,
                    TransportErrorKind::Timeout,
                    format!("connect timed out after {:?}", self.timeout),
                ))
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        exchange(
            &mut stream,
            server,
            query,
            self.timeout,
            self.buffer_size,
            self.max_response_size,
        )
        .await
    }
}

/// Write the query line and read the whole response from an open stream.
pub(crate) async fn exchange<S>(
    stream: &mut S,
    server: &str,
    query: &str,
    read_timeout: Duration,
    buffer_size: usize,
    max_response_size: usize,
) -> Result<String, WhoisError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let query_line = format!("{}\r\n", query);
    debug!(server = %server, query = %query, "Sending whois query");

    match timeout(read_timeout, stream.write_all(query_line.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(WhoisError::transport(server, TransportErrorKind::ReadFailed, format!("write failed: {}", e))),
        Err(_) => return Err(WhoisError::transport(server, TransportErrorKind::Timeout, "write timed out")),
    }

    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut response = Vec::new();

    loop {
        match timeout(read_timeout, stream.read(&mut buffer)).await {
            Ok(Ok(0)) => break, // EOF
            Ok(Ok(n)) => {
                response.extend_from_slice(&buffer[..n]);
                if response.len() > max_response_size {
                    return Err(WhoisError::transport(
                        server,
                        TransportErrorKind::ReadFailed,
                        format!("response exceeded {} bytes", max_response_size),
                    ));
                }
            }
            Ok(Err(e)) => {
                return Err(WhoisError::transport(server, TransportErrorKind::ReadFailed, e.to_string()));
            }
            Err(_) => {
                return Err(WhoisError::transport(
                    server,
                    TransportErrorKind::Timeout,
                    format!("read timed out after {:?}", read_timeout),
                ));
            }
        }
    }

    debug!(server = %server, bytes = response.len(), "Whois response received");
    Ok(decode_response(response))
}

/// UTF-8 when valid, otherwise each byte as its Latin-1 code point.
fn decode_response(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}
