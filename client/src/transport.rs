//! # Gateway Transport
//!
//! One HTTP POST per operation against `{base_url}/{operation path}`, JSON
//! in and JSON out.
//!
//! The transport only reports what happened on the wire. It never retries:
//! a purchase sent twice can charge twice, so retry policy belongs to the
//! caller. Failures are kept apart so the caller can act on them:
//!
//! - the deadline passed → [`TransportError::Timeout`]
//! - nothing was listening → [`TransportError::Connect`]
//! - non-2xx status → [`TransportError::HttpStatus`]
//! - a 2xx body that is not JSON → [`TransportError::MalformedResponse`]
//!
//! A 200 whose envelope reports a business failure is *not* a transport
//! error; that reading happens in [`crate::response`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use url::Url;

use crate::config::{ConfigError, GatewayConfig, MAX_ERROR_BODY_BYTES};
use crate::error::TransportError;
use crate::request::{Operation, SignedPayload};

/// Sends signed payloads to the gateway.
///
/// The production implementation is [`HttpTransport`]; tests substitute an
/// in-process gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs exactly one exchange for `payload` and returns the parsed
    /// JSON body.
    async fn send(&self, payload: &SignedPayload, timeout: Duration) -> Result<Value, TransportError>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `reqwest`-backed transport. Holds one connection pool for the life of
/// the client; the pool is never exposed.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Self::new(config.base_url().clone())
    }

    pub fn endpoint(&self, operation: Operation) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            operation.path()
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &SignedPayload, timeout: Duration) -> Result<Value, TransportError> {
        let operation = payload.operation();
        let url = self.endpoint(operation);
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let classify = |e: reqwest::Error| classify_error(e, timeout_ms);
        let started = Instant::now();

        let request = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(payload)
            .timeout(timeout);

        let exchange = async {
            let response = request.send().await.map_err(classify)?;
            let status = response.status();
            let body = response.bytes().await.map_err(classify)?;
            Ok::<_, TransportError>((status, body))
        };

        let (status, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout { timeout_ms })??;

        tracing::debug!(
            operation = %operation,
            http_status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway responded"
        );

        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        serde_json::from_slice(&body).map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }
}

fn classify_error(e: reqwest::Error, timeout_ms: u64) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout { timeout_ms }
    } else if e.is_connect() {
        TransportError::Connect(e.without_url().to_string())
    } else {
        TransportError::Network(e.without_url().to_string())
    }
}

/// First [`MAX_ERROR_BODY_BYTES`] of a body, lossily decoded.
fn excerpt(body: &[u8]) -> String {
    let end = body.len().min(MAX_ERROR_BODY_BYTES);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_paths() {
        let t = HttpTransport::new(Url::parse("https://gw.example.com/api/v1/").unwrap()).unwrap();
        assert_eq!(
            t.endpoint(Operation::CheckTransaction),
            "https://gw.example.com/api/v1/check-transaction-2"
        );

        let t = HttpTransport::new(Url::parse("https://gw.example.com/api/v1").unwrap()).unwrap();
        assert_eq!(t.endpoint(Operation::Purchase), "https://gw.example.com/api/v1/purchase");
    }

    #[test]
    fn excerpt_is_bounded() {
        let long = vec![b'x'; MAX_ERROR_BODY_BYTES * 2];
        assert_eq!(excerpt(&long).len(), MAX_ERROR_BODY_BYTES);
        assert_eq!(excerpt(b"oops"), "oops");
    }
}
