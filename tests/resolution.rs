//! End-to-end resolution over real loopback sockets.

use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use whois_chain::{
    exceptions::{ExceptionRule, ExceptionTable},
    report::ReportWriter,
    Config, TcpTransport, TransportErrorKind, WhoisError, WhoisResolver, WhoisTransport,
};

/// Serves `response` to every connection and hands back each query line received.
async fn whois_server(response: &'static str) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut queries = Vec::new();
        // One connection per query; stop after the first for these tests
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 256];
        let mut line = Vec::new();
        while !line.ends_with(b"\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            line.extend_from_slice(&buf[..n]);
        }
        queries.push(String::from_utf8(line).unwrap());
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        queries
    });

    (port, handle)
}

fn transport(port: u16) -> TcpTransport {
    TcpTransport::new(port, Duration::from_secs(2))
}

#[tokio::test]
async fn tcp_transport_sends_crlf_line_and_reads_until_close() {
    let (port, server) = whois_server("Domain Name: EXAMPLE.COM\r\nRegistrar: RESERVED\r\n").await;

    let response = transport(port).query("127.0.0.1", "=example.com").await.unwrap();

    assert_eq!(response, "Domain Name: EXAMPLE.COM\r\nRegistrar: RESERVED\r\n");
    assert_eq!(server.await.unwrap(), vec!["=example.com\r\n".to_string()]);
}

#[tokio::test]
async fn exception_mapped_domain_resolves_in_one_hop_over_tcp() {
    let (port, server) = whois_server("Domain Name: shop.example\nRegistrar: Example Registrar\n").await;

    let config = Config::default();
    let resolver = WhoisResolver::new(&config, Arc::new(transport(port)))
        .with_exceptions(ExceptionTable::empty().with_rule(ExceptionRule::suffix(".example", "127.0.0.1")));

    let resolution = resolver.resolve("shop.example").await.unwrap();

    assert_eq!(resolution.servers, vec!["127.0.0.1"]);
    assert_eq!(resolution.chain.len(), 1);
    assert_eq!(server.await.unwrap(), vec!["shop.example\r\n".to_string()]);

    let mut writer = ReportWriter::new(Vec::new()).unwrap();
    assert_eq!(writer.write_resolution("shop.example", &resolution).unwrap(), 1);
    let csv = String::from_utf8(writer.finish().unwrap()).unwrap();
    assert!(csv.contains("shop.example,127.0.0.1,shop.example,"));
    assert!(csv.contains("Example Registrar"));
}

#[tokio::test]
async fn refused_connection_is_connect_failed() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = transport(port).query("127.0.0.1", "example.com").await;

    assert_eq!(result.unwrap_err().transport_kind(), Some(TransportErrorKind::ConnectFailed));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let holder = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });

    let result = TcpTransport::new(port, Duration::from_millis(200))
        .query("127.0.0.1", "example.com")
        .await;

    match result {
        Err(WhoisError::Transport { kind, server, .. }) => {
            assert_eq!(kind, TransportErrorKind::Timeout);
            assert_eq!(server, "127.0.0.1");
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    holder.abort();
}
