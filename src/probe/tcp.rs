//! TCP-based probe.
//!
//! Connects to a subsystem's metrics endpoint and reads one line of JSON.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

use super::MetricSource;
use crate::data::MetricMap;

/// A probe that fetches metrics from a TCP endpoint.
///
/// The endpoint is expected to write a single newline-terminated JSON object
/// per connection, mapping metric names to values. A fresh connection is made
/// on every check so a wedged endpoint only affects its own cycle.
#[derive(Debug)]
pub struct TcpProbe {
    subsystem: String,
    addr: String,
    description: String,
}

impl TcpProbe {
    /// Create a new TCP probe for the given subsystem and `host:port` address.
    pub fn new(subsystem: impl Into<String>, addr: impl Into<String>) -> Self {
        let subsystem = subsystem.into();
        let addr = addr.into();
        let description = format!("tcp: {}", addr);
        Self {
            subsystem,
            addr,
            description,
        }
    }
}

#[async_trait]
impl MetricSource for TcpProbe {
    async fn fetch(&self) -> Result<MetricMap> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .with_context(|| format!("failed to connect to {}", self.addr))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .with_context(|| format!("failed to read from {}", self.addr))?;
        if n == 0 {
            bail!("connection to {} closed without data", self.addr);
        }

        let metrics: MetricMap = serde_json::from_str(line.trim())
            .with_context(|| format!("malformed metrics from {}", self.addr))?;
        Ok(metrics)
    }

    fn subsystem(&self) -> &str {
        &self.subsystem
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn serve_once(payload: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(payload.as_bytes()).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_tcp_probe_fetches_metrics() {
        let addr = serve_once("{\"p95_latency_ms\": 80, \"error_rate\": 0.01}\n").await;

        let probe = TcpProbe::new("api", addr);
        let metrics = probe.fetch().await.unwrap();

        assert_eq!(metrics["p95_latency_ms"].as_number(), Some(80.0));
        assert_eq!(metrics["error_rate"].as_number(), Some(0.01));
    }

    #[tokio::test]
    async fn test_tcp_probe_connection_refused() {
        // Port 1 is essentially never listening
        let probe = TcpProbe::new("api", "127.0.0.1:1");
        let err = probe.fetch().await.unwrap_err();
        assert!(err.to_string().contains("failed to connect"));
    }

    #[tokio::test]
    async fn test_tcp_probe_empty_response() {
        let addr = serve_once("").await;

        let probe = TcpProbe::new("api", addr);
        let err = probe.fetch().await.unwrap_err();
        assert!(err.to_string().contains("closed without data"));
    }

    #[tokio::test]
    async fn test_tcp_probe_malformed_payload() {
        let addr = serve_once("not json\n").await;

        let probe = TcpProbe::new("api", addr);
        let err = probe.fetch().await.unwrap_err();
        assert!(err.to_string().contains("malformed metrics"));
    }

    #[test]
    fn test_tcp_probe_identity() {
        let probe = TcpProbe::new("api", "localhost:9090");
        assert_eq!(probe.subsystem(), "api");
        assert_eq!(probe.description(), "tcp: localhost:9090");
    }
}
