//! Gateway response envelope and payload shapes.
//!
//! Every endpoint answers `{status, message, data?}`. Business success is
//! `status == 200` with a populated `data`; any other status is a rejection
//! carrying `message`. A body that fits neither reading is an unknown
//! response and is never taken as success.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::{GATEWAY_OK_STATUS, REQUEST_TIME_FORMAT};
use crate::error::GatewayError;
use crate::transaction::types::{CloseReceipt, Currency, ExchangeRate, TransactionRecord, TransactionStatus};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEnvelope {
    pub status: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl GatewayEnvelope {
    /// Reads the envelope out of a parsed JSON body.
    pub fn parse(body: Value) -> Result<Self, GatewayError> {
        let Value::Object(mut obj) = body else {
            return Err(GatewayError::UnknownResponse("body is not a JSON object".into()));
        };

        let status = match obj.get("status") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| GatewayError::UnknownResponse("missing or non-numeric status".into()))?;

        let message = match obj.remove("message") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };

        let data = match obj.remove("data") {
            None | Some(Value::Null) => None,
            Some(Value::Object(m)) if m.is_empty() => None,
            Some(v) => Some(v),
        };

        Ok(Self {
            status,
            message,
            data,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == GATEWAY_OK_STATUS
    }

    /// Splits the envelope into business success (`data`) or a rejection.
    pub fn into_data(self) -> Result<Value, GatewayError> {
        if !self.is_ok() {
            return Err(GatewayError::Rejected {
                code: self.status,
                message: self.message,
            });
        }
        self.data.ok_or_else(|| {
            GatewayError::UnknownResponse("success status without data".into())
        })
    }
}

fn decode<T: for<'de> Deserialize<'de>>(data: Value, what: &str) -> Result<T, GatewayError> {
    serde_json::from_value(data)
        .map_err(|e| GatewayError::UnknownResponse(format!("unexpected {what} payload: {e}")))
}

// ---------------------------------------------------------------------------
// Purchase
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PurchaseData {
    #[serde(alias = "checkout_url")]
    payment_url: Option<String>,
    #[serde(alias = "tran_id", default, deserialize_with = "scalar_string")]
    transaction_id: Option<String>,
}

/// `(payment_url, transaction_id)` of a successful purchase.
pub fn purchase_result(data: Value) -> Result<(String, String), GatewayError> {
    let parsed: PurchaseData = decode(data, "purchase")?;
    let payment_url = non_blank(parsed.payment_url)
        .ok_or_else(|| GatewayError::UnknownResponse("purchase response without payment_url".into()))?;
    let transaction_id = non_blank(parsed.transaction_id).ok_or_else(|| {
        GatewayError::UnknownResponse("purchase response without transaction_id".into())
    })?;
    Ok((payment_url, transaction_id))
}

// ---------------------------------------------------------------------------
// Transaction detail / check
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TransactionData {
    #[serde(alias = "tran_id", default, deserialize_with = "scalar_string")]
    transaction_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    order_id: Option<String>,
    amount: Option<Value>,
    currency: Option<String>,
    #[serde(
        alias = "payment_status",
        alias = "transaction_status",
        default,
        deserialize_with = "scalar_string"
    )]
    status: Option<String>,
    #[serde(alias = "payment_type")]
    payment_method: Option<String>,
    #[serde(alias = "transaction_date")]
    created_at: Option<String>,
    updated_at: Option<String>,
}

/// Maps a detail or check payload into a [`TransactionRecord`].
///
/// `requested_id` fills in the id when the gateway echoes none.
pub fn transaction_record(data: Value, requested_id: &str) -> Result<TransactionRecord, GatewayError> {
    let parsed: TransactionData = decode(data, "transaction")?;
    let gateway_status = non_blank(parsed.status)
        .ok_or_else(|| GatewayError::UnknownResponse("transaction response without status".into()))?;

    Ok(TransactionRecord {
        transaction_id: non_blank(parsed.transaction_id).unwrap_or_else(|| requested_id.to_string()),
        order_id: non_blank(parsed.order_id),
        amount: parsed.amount.as_ref().and_then(decimal_from_value),
        currency: non_blank(parsed.currency),
        status: TransactionStatus::from_gateway(&gateway_status),
        gateway_status,
        payment_method: non_blank(parsed.payment_method),
        created_at: parsed.created_at.as_deref().and_then(parse_timestamp),
        updated_at: parsed.updated_at.as_deref().and_then(parse_timestamp),
    })
}

// ---------------------------------------------------------------------------
// Close
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CloseData {
    #[serde(alias = "tran_id")]
    transaction_id: Option<String>,
    #[serde(
        alias = "payment_status",
        alias = "transaction_status",
        default,
        deserialize_with = "scalar_string"
    )]
    status: Option<String>,
}

pub fn close_receipt(data: Value, requested_id: &str) -> Result<CloseReceipt, GatewayError> {
    let parsed: CloseData = decode(data, "close")?;
    Ok(CloseReceipt {
        transaction_id: non_blank(parsed.transaction_id).unwrap_or_else(|| requested_id.to_string()),
        status: non_blank(parsed.status).map(|s| TransactionStatus::from_gateway(&s)),
    })
}

// ---------------------------------------------------------------------------
// Exchange rate
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ExchangeRateData {
    rate: Option<Value>,
}

pub fn exchange_rate(data: Value, from: Currency, to: Currency) -> Result<ExchangeRate, GatewayError> {
    let parsed: ExchangeRateData = decode(data, "exchange rate")?;
    let rate = parsed
        .rate
        .as_ref()
        .and_then(decimal_from_value)
        .filter(|r| *r > Decimal::ZERO)
        .ok_or_else(|| GatewayError::UnknownResponse("exchange rate missing or not positive".into()))?;
    Ok(ExchangeRate { from, to, rate })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Ids and status codes arrive as strings or bare numbers depending on
/// the endpoint.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// JSON numbers are parsed from their decimal text, never via float math.
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, and the compact request-time
/// layout. Naive times are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", REQUEST_TIME_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
