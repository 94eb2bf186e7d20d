//! Error types for the gateway client.
//!
//! Every fallible client operation returns a [`GatewayError`]. The variants
//! separate what the caller can fix (validation), what may be retried
//! (transport faults on idempotent reads), and what the gateway refused.
//! None of the messages carry the signing secret or a request hash.

use thiserror::Error;

use crate::config::ConfigError;
use crate::request::Operation;
use crate::transaction::verification::ValidationError;
use crate::transaction::GENERIC_FAILURE_MESSAGE;

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Failures of the HTTP exchange itself. The gateway may never have seen
/// the request, or its answer was unreadable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the per-call timeout.
    #[error("gateway did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection could not be established (refused, DNS, TLS).
    #[error("could not connect to gateway: {0}")]
    Connect(String),

    /// The connection broke while sending or receiving.
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered with a non-2xx HTTP status.
    #[error("gateway returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body was not JSON.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Missing or invalid credentials. Raised at construction only.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Bad input, rejected before any network call.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A well-formed response reporting business failure: bad signature,
    /// unknown merchant, duplicate order id, insufficient funds, ...
    #[error("gateway rejected request (status {code}): {message}")]
    Rejected { code: i64, message: String },

    /// The response was JSON but matched no expected shape. Never read as
    /// success.
    #[error("unrecognized gateway response: {0}")]
    UnknownResponse(String),

    /// A synthetic `MOCK-` id was passed to a real gateway call.
    #[error("transaction {0} was created by a mock payment and is unknown to the gateway")]
    MockTransaction(String),

    /// Mock payments were requested from a production client.
    #[error("mock payments are disabled in production")]
    MockInProduction,
}

impl GatewayError {
    /// Whether repeating the same call may succeed without the caller
    /// changing anything. Only transport faults on idempotent reads qualify;
    /// create and close are never retryable here.
    pub fn is_retryable(&self, operation: Operation) -> bool {
        matches!(self, Self::Transport(_)) && operation.is_idempotent()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout { .. }))
    }

    /// Message safe to show an end user: the gateway's own words for a
    /// rejection, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Validation(e) => e.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}
