//! HTTP client for the transaction relay.
//!
//! Endpoints:
//! - POST /single-chain/estimate
//! - POST /single-chain/execute

use async_trait::async_trait;
use bookie_types::{BookieError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::{EstimateRequest, ExecuteRequest, ExecutionReceipt, Quote, Relay, SignatureSet};

const ESTIMATE_PATH: &str = "/single-chain/estimate";
const EXECUTE_PATH: &str = "/single-chain/execute";
const API_KEY_HEADER: &str = "X-Api-Key";

/// Relay endpoint and credentials.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl RelayConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Error body returned by the relay on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
struct RelayErrorBody {
    message: Option<String>,
    data: Option<serde_json::Value>,
}

/// Relay client for estimating and executing call bundles.
pub struct RelayClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "relay request");

        let resp = self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BookieError::RelayUnavailable(format!("relay request failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BookieError::RelayUnavailable(format!("failed to read relay response: {}", e)))?;
        info!(path, status = status.as_u16(), "relay responded");

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| BookieError::InvalidResponse(format!("failed to parse relay response: {}", e)))
    }
}

/// Map a non-2xx response to `RelayRejected`, preferring the body's `message`.
fn rejection(status: u16, body: &str) -> BookieError {
    let parsed = serde_json::from_str::<RelayErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("relay returned status {}", status)
            } else {
                format!("relay returned status {}: {}", status, body.trim())
            }
        });
    let details = parsed.and_then(|b| b.data).filter(|d| !d.is_null());
    BookieError::RelayRejected { status, message, details }
}

#[async_trait]
impl Relay for RelayClient {
    /// POST /single-chain/estimate
    async fn estimate(&self, request: &EstimateRequest) -> Result<Quote> {
        let body = self.post_json(ESTIMATE_PATH, request).await?;
        Quote::from_estimate_response(body)
    }

    /// POST /single-chain/execute
    async fn execute(&self, quote: &Quote, signatures: &SignatureSet) -> Result<ExecutionReceipt> {
        signatures.ensure_complete(quote)?;
        let request = ExecuteRequest {
            quote: quote.raw(),
            signatures,
        };
        let body = self.post_json(EXECUTE_PATH, &request).await?;
        Ok(ExecutionReceipt(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answer exactly one HTTP request with a canned response; yields the raw request.
    async fn respond_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn request_body(raw: &str) -> serde_json::Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    fn estimate_request() -> EstimateRequest {
        EstimateRequest {
            source_chain: 137,
            destination_chain: Some(137),
            source_token: Address::ZERO,
            user_address: Address::ZERO,
            token_amount: "100000".into(),
            transactions: vec![],
            expected_erc20_tokens: vec![],
        }
    }

    fn client(base_url: &str) -> RelayClient {
        RelayClient::new(&RelayConfig::new(base_url, "test-key"))
    }

    #[test]
    fn test_rejection_uses_body_message() {
        let err = rejection(400, r#"{"message":"insufficient liquidity","data":{"field":"tokenAmount"}}"#);
        match err {
            BookieError::RelayRejected { status, message, details } => {
                assert_eq!(status, 400);
                assert_eq!(message, "insufficient liquidity");
                assert_eq!(details.unwrap()["field"], "tokenAmount");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_rejection_without_json_body() {
        let err = rejection(502, "Bad Gateway");
        assert_eq!(err.to_string(), "relay returned status 502: Bad Gateway");
        assert!(err.details().is_none());

        let err = rejection(503, "");
        assert_eq!(err.to_string(), "relay returned status 503");
    }

    #[tokio::test]
    async fn test_estimate_posts_request_and_parses_quote() {
        let body = include_str!("../../../tests/vectors/estimate_response.json").to_string();
        let (url, server) = respond_once("200 OK", body).await;

        let quote = client(&url).estimate(&estimate_request()).await.unwrap();
        assert_eq!(quote.roles().count(), 2);

        let raw = server.await.unwrap();
        let head = raw.to_lowercase();
        assert!(head.starts_with("post /single-chain/estimate "));
        assert!(head.contains("x-api-key: test-key"));

        let sent = request_body(&raw);
        assert_eq!(sent["sourceChain"], 137);
        assert_eq!(sent["destinationChain"], 137);
        assert_eq!(sent["tokenAmount"], "100000");
    }

    #[tokio::test]
    async fn test_estimate_rejected_with_message() {
        let (url, server) = respond_once(
            "400 Bad Request",
            r#"{"message":"insufficient liquidity"}"#.to_string(),
        )
        .await;

        let err = client(&url).estimate(&estimate_request()).await.unwrap_err();
        server.await.unwrap();
        match err {
            BookieError::RelayRejected { status, message, details } => {
                assert_eq!(status, 400);
                assert_eq!(message, "insufficient liquidity");
                assert!(details.is_none());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_estimate_unparseable_body() {
        let (url, server) = respond_once("200 OK", r#"{"quote":42}"#.to_string()).await;
        let err = client(&url).estimate(&estimate_request()).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, BookieError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{}", addr))
            .estimate(&estimate_request())
            .await
            .unwrap_err();
        assert!(matches!(err, BookieError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_execute_sends_quote_verbatim_with_signatures() {
        let fixture: serde_json::Value =
            serde_json::from_str(include_str!("../../../tests/vectors/estimate_response.json")).unwrap();
        let quote = Quote::from_estimate_response(fixture.clone()).unwrap();

        let mut sigs = SignatureSet::new();
        sigs.insert("funding", "0xaa".into());
        sigs.insert("peaze", "0xbb".into());

        let (url, server) = respond_once("201 Created", r#"{"txHash":"0x1234"}"#.to_string()).await;
        let receipt = client(&url).execute(&quote, &sigs).await.unwrap();
        assert_eq!(receipt.0["txHash"], "0x1234");

        let raw = server.await.unwrap();
        assert!(raw.to_lowercase().starts_with("post /single-chain/execute "));
        let sent = request_body(&raw);
        assert_eq!(sent["quote"], fixture["quote"]);
        assert_eq!(sent["signatures"]["fundingSignature"], "0xaa");
        assert_eq!(sent["signatures"]["peazeSignature"], "0xbb");
    }

    #[tokio::test]
    async fn test_execute_refuses_incomplete_signatures() {
        let fixture: serde_json::Value =
            serde_json::from_str(include_str!("../../../tests/vectors/estimate_response.json")).unwrap();
        let quote = Quote::from_estimate_response(fixture).unwrap();

        let mut sigs = SignatureSet::new();
        sigs.insert("peaze", "0xbb".into());

        // No server: the call must fail before any request is attempted.
        let err = client("http://127.0.0.1:9").execute(&quote, &sigs).await.unwrap_err();
        assert!(matches!(err, BookieError::IncompleteSignatures(ref m) if m == &vec!["funding".to_string()]));
    }
}
