//! # Request Builder
//!
//! Turns domain inputs into the exact field set each gateway endpoint
//! expects, signs it, and attaches the hash as the final field.
//!
//! Every payload carries `req_time` (UTC, `YYYYMMDDHHmmss`) and
//! `merchant_id`, plus the operation's own fields:
//!
//! | Operation           | Path                  | Fields                                        |
//! |---------------------|-----------------------|-----------------------------------------------|
//! | Purchase            | `purchase`            | amount, currency, order id, customer, items…  |
//! | Transaction detail  | `transaction-detail`  | transaction_id                                |
//! | Check transaction   | `check-transaction-2` | transaction_id                                |
//! | Close transaction   | `close-transaction`   | transaction_id                                |
//! | Exchange rate       | `exchange-rate`       | from_currency, to_currency                    |
//!
//! All values are strings; the signed strings are the transmitted strings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::{
    ConfigError, GatewayConfig, CHECK_TRANSACTION_PATH, CLOSE_TRANSACTION_PATH,
    EXCHANGE_RATE_PATH, HASH_FIELD, PURCHASE_PATH, REQUEST_TIME_FORMAT, TRANSACTION_DETAIL_PATH,
};
use crate::crypto::signer::{Params, Signer};
use crate::transaction::builder::PaymentRequest;
use crate::transaction::types::Currency;
use crate::transaction::verification::{
    validate_payment_request, validate_transaction_id, ValidationError,
};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Gateway endpoints the client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Purchase,
    TransactionDetail,
    CheckTransaction,
    CloseTransaction,
    ExchangeRate,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Purchase,
        Self::TransactionDetail,
        Self::CheckTransaction,
        Self::CloseTransaction,
        Self::ExchangeRate,
    ];

    /// Path segment appended to the configured base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Purchase => PURCHASE_PATH,
            Self::TransactionDetail => TRANSACTION_DETAIL_PATH,
            Self::CheckTransaction => CHECK_TRANSACTION_PATH,
            Self::CloseTransaction => CLOSE_TRANSACTION_PATH,
            Self::ExchangeRate => EXCHANGE_RATE_PATH,
        }
    }

    /// Stable snake_case name for logs and metric labels.
    pub fn name(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::TransactionDetail => "transaction_detail",
            Self::CheckTransaction => "check_transaction",
            Self::CloseTransaction => "close_transaction",
            Self::ExchangeRate => "exchange_rate",
        }
    }

    /// Reads that can be repeated freely. Purchase and close change gateway
    /// state and are not.
    pub fn is_idempotent(self) -> bool {
        matches!(
            self,
            Self::TransactionDetail | Self::CheckTransaction | Self::ExchangeRate
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// GatewayRequest
// ---------------------------------------------------------------------------

/// One variant per endpoint, each carrying exactly the inputs that endpoint
/// needs.
#[derive(Debug, Clone, Copy)]
pub enum GatewayRequest<'a> {
    Purchase(&'a PaymentRequest),
    TransactionDetail { transaction_id: &'a str },
    CheckTransaction { transaction_id: &'a str },
    CloseTransaction { transaction_id: &'a str },
    ExchangeRate { from: Currency, to: Currency },
}

impl GatewayRequest<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Purchase(_) => Operation::Purchase,
            Self::TransactionDetail { .. } => Operation::TransactionDetail,
            Self::CheckTransaction { .. } => Operation::CheckTransaction,
            Self::CloseTransaction { .. } => Operation::CloseTransaction,
            Self::ExchangeRate { .. } => Operation::ExchangeRate,
        }
    }
}

// ---------------------------------------------------------------------------
// SignedPayload
// ---------------------------------------------------------------------------

/// A request body ready for the wire.
///
/// Serializes as a flat JSON object: the parameters in key order, then
/// `hash` last.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedPayload {
    operation: Operation,
    params: Params,
    hash: String,
}

impl SignedPayload {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The signed parameters, without the hash.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl Serialize for SignedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len() + 1))?;
        for (key, value) in &self.params {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(HASH_FIELD, &self.hash)?;
        map.end()
    }
}

impl fmt::Debug for SignedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedPayload")
            .field("operation", &self.operation)
            .field("params", &self.params)
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RequestBuilder
// ---------------------------------------------------------------------------

/// Assembles and signs gateway payloads for one merchant.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    merchant_id: String,
    signer: Signer,
}

impl RequestBuilder {
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            merchant_id: config.merchant_id().to_string(),
            signer: Signer::new(config.secret().clone())?,
        })
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Builds and signs a payload stamped with the current time.
    pub fn build(&self, request: &GatewayRequest<'_>) -> Result<SignedPayload, ValidationError> {
        self.build_at(request, Utc::now())
    }

    /// Builds and signs a payload with an explicit request time.
    ///
    /// Input is validated first; nothing invalid reaches the signer.
    pub fn build_at(
        &self,
        request: &GatewayRequest<'_>,
        at: DateTime<Utc>,
    ) -> Result<SignedPayload, ValidationError> {
        let mut params = Params::new();
        params.insert("req_time".into(), at.format(REQUEST_TIME_FORMAT).to_string());
        params.insert("merchant_id".into(), self.merchant_id.clone());

        match request {
            GatewayRequest::Purchase(payment) => purchase_fields(payment, &mut params)?,
            GatewayRequest::TransactionDetail { transaction_id }
            | GatewayRequest::CheckTransaction { transaction_id }
            | GatewayRequest::CloseTransaction { transaction_id } => {
                validate_transaction_id(transaction_id)?;
                params.insert("transaction_id".into(), transaction_id.trim().to_string());
            }
            GatewayRequest::ExchangeRate { from, to } => {
                params.insert("from_currency".into(), from.code().to_string());
                params.insert("to_currency".into(), to.code().to_string());
            }
        }

        let hash = self.signer.sign(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(SignedPayload {
            operation: request.operation(),
            params,
            hash,
        })
    }
}

fn purchase_fields(payment: &PaymentRequest, params: &mut Params) -> Result<(), ValidationError> {
    validate_payment_request(payment)?;

    let mut put = |key: &str, value: &str| {
        params.insert(key.to_string(), value.to_string());
    };

    put("order_id", payment.order_id.trim());
    put("amount", &payment.currency.format_amount(payment.amount));
    put("currency", payment.currency.code());
    put("customer_name", payment.customer.name.trim());
    put("customer_email", payment.customer.email.trim());

    let description = payment.description.trim();
    if !description.is_empty() {
        put("description", description);
    }
    if let Some(url) = &payment.return_url {
        put("return_url", url);
    }
    if let Some(url) = &payment.cancel_url {
        put("cancel_url", url);
    }
    if let Some(phone) = payment.customer.phone.as_deref().map(str::trim) {
        if !phone.is_empty() {
            put("customer_phone", phone);
        }
    }
    if let Some(items) = payment.encoded_items() {
        put("items", &items);
    }
    if let Some(option) = &payment.payment_option {
        put("payment_option", option);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
