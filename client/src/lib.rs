// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Paygate Client
//!
//! A client for a hosted card and mobile-payment gateway. Every request is
//! a flat JSON object whose fields, sorted by key and joined as
//! `key=value&...`, are hashed together with the merchant secret
//! (SHA-512, hex). The gateway answers with a `{status, message, data}`
//! envelope.
//!
//! ## Architecture
//!
//! - **config**: Constants and the immutable [`GatewayConfig`].
//! - **crypto**: SHA-512 helpers and the request [`Signer`].
//! - **transaction**: Payment requests, validation, and result types.
//! - **request**: One typed variant per gateway operation, signed into a
//!   [`SignedPayload`].
//! - **transport**: The [`Transport`] seam and its reqwest implementation.
//! - **response**: Envelope and payload decoding.
//! - **lifecycle**: Create, verify, check, close, exchange rate.
//! - **mock**: Synthetic payments for development without credentials.
//! - **metrics**: Prometheus counters and latency histograms.
//! - **client**: [`PaymentClient`], the facade a checkout flow holds.
//!
//! ## Ground Rules
//!
//! 1. The gateway is the system of record. Nothing is cached or persisted.
//! 2. Nothing is retried automatically. A repeated purchase can charge twice.
//! 3. Invalid input never reaches the network.
//! 4. The secret and request hashes never appear in logs, errors, or `Debug`.

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod mock;
pub mod request;
pub mod response;
pub mod transaction;
pub mod transport;

pub use client::PaymentClient;
pub use config::{ConfigError, Environment, GatewayConfig, GatewayConfigBuilder};
pub use crypto::Signer;
pub use error::{GatewayError, TransportError};
pub use metrics::{CallOutcome, GatewayMetrics};
pub use request::{GatewayRequest, Operation, RequestBuilder, SignedPayload};
pub use transaction::{
    CallbackNotice, CloseReceipt, Currency, Customer, ExchangeRate, LineItem, PaymentOutcome,
    PaymentRequest, PaymentRequestBuilder, PaymentState, TransactionRecord, TransactionStatus,
    ValidationError,
};
pub use transport::{HttpTransport, Transport};
