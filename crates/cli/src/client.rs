//! Client for the app's test and install endpoints
//!
//! `/test` is spoken over a raw TCP socket with a hand-framed request; the
//! JSON payload travels base64-encoded in a `data` header. `/install` uses
//! the same header convention over a regular HTTP client.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use vbook_common::url::split_host_port;
use vbook_common::{
    normalize_vbook_url, parse_test_response, Error, PluginData, Result, TestRequest,
    TestResponse,
};

/// Header carrying the base64 JSON payload
pub const DATA_HEADER: &str = "data";

const READ_CHUNK: usize = 4096;

/// Client for a single app
#[derive(Debug, Clone)]
pub struct VbookClient {
    timeout: Duration,
}

impl Default for VbookClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl VbookClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a test request and parse whatever the app answers.
    pub async fn send_test(&self, target_url: &str, request: &TestRequest) -> Result<TestResponse> {
        let base = normalize_vbook_url(target_url)
            .ok_or_else(|| Error::InvalidUrl(target_url.to_string()))?;
        let (host, port) = split_host_port(&base)?;
        let addr = format!("{}:{}", host, port);
        let deadline = Instant::now() + self.timeout;

        debug!("Connecting to {}", addr);
        let mut stream = tokio::time::timeout_at(deadline, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Timeout {
                operation: format!("connect to {}", addr),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| Error::network("connect", &addr, e))?;

        let payload = STANDARD.encode(serde_json::to_vec(request)?);
        let frame = format!(
            "GET /test HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n{}: {}\r\n\r\n",
            host, DATA_HEADER, payload
        );
        stream
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| Error::network("send", &addr, e))?;
        info!("Test request sent to {}", addr);

        let raw = read_until_close(&mut stream, deadline).await;
        if raw.is_empty() {
            return Ok(TestResponse::error("No response received"));
        }
        debug!("Received {} bytes from {}", raw.len(), addr);
        Ok(parse_test_response(&raw))
    }

    /// Push an extension to the app's `/install` endpoint.
    pub async fn send_install(&self, target_url: &str, plugin: &PluginData) -> Result<()> {
        let base = normalize_vbook_url(target_url)
            .ok_or_else(|| Error::InvalidUrl(target_url.to_string()))?;
        let url = format!("{}/install", base);
        let payload = STANDARD.encode(serde_json::to_vec(plugin)?);

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::InstallFailed(format!("failed to create HTTP client: {}", e)))?;

        debug!("Sending install request to {}", url);
        let response = http
            .get(&url)
            .header(DATA_HEADER, payload)
            .send()
            .await
            .map_err(|e| Error::InstallFailed(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::InstallFailed(format!(
                "install request failed with status: {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::InstallFailed(format!("failed to read install response: {}", e)))?;
        check_install_body(&body)
    }
}

/// Read until the peer closes or the deadline passes; partial data is kept.
async fn read_until_close(stream: &mut TcpStream, deadline: Instant) -> Vec<u8> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => raw.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => {
                warn!("Read interrupted after {} bytes: {}", raw.len(), e);
                break;
            }
            Err(_) => {
                warn!("Read deadline reached after {} bytes", raw.len());
                break;
            }
        }
    }
    raw
}

/// Decide whether an install response body reports success.
pub fn check_install_body(body: &str) -> Result<()> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("status").and_then(Value::as_f64) {
            Some(code) if code != 0.0 => Err(Error::InstallFailed(format!(
                "installation failed with status code: {}",
                code
            ))),
            _ => Ok(()),
        },
        // strings, arrays and scalars carry no status; judge them as text
        _ => check_install_text(body),
    }
}

fn check_install_text(body: &str) -> Result<()> {
    let lower = body.to_lowercase();
    if lower.contains("error") || lower.contains("failed") {
        Err(Error::InstallFailed(body.trim().to_string()))
    } else {
        Ok(())
    }
}
