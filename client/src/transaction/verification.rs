//! Input validation for payment requests and transaction lookups.
//!
//! Everything here runs before a parameter reaches the signer, so a bad
//! request never costs a network round trip. Checks run cheapest first and
//! the first failure is returned.

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use super::builder::PaymentRequest;
use super::types::Currency;
use crate::config::MAX_ORDER_ID_LENGTH;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Input the caller can correct and resubmit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be greater than zero, got {amount}")]
    NonPositiveAmount { amount: Decimal },

    #[error("amount {amount} has more than {max_decimals} decimals allowed for {currency}")]
    ExcessPrecision {
        amount: Decimal,
        currency: Currency,
        max_decimals: u32,
    },

    #[error("amount {amount} is too large to express in {currency} minor units")]
    AmountOutOfRange { amount: Decimal, currency: Currency },

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("order id is required")]
    EmptyOrderId,

    #[error("order id is {len} characters, maximum is {max}")]
    OrderIdTooLong { len: usize, max: usize },

    #[error("customer name is required")]
    MissingCustomerName,

    #[error("customer email is required")]
    MissingCustomerEmail,

    #[error("malformed customer email: {0}")]
    InvalidEmail(String),

    #[error("invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("line item {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    #[error("transaction id is required")]
    EmptyTransactionId,

    #[error("callback is missing field {0}")]
    MissingCallbackField(&'static str),

    #[error("callback signature does not match")]
    SignatureMismatch,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates a [`PaymentRequest`] before it is signed.
///
/// The checks, in order:
///
/// 1. **Amount**: strictly positive.
/// 2. **Precision**: no more decimals than the currency's minor unit, and
///    small enough to be written with exactly that many.
/// 3. **Order id**: non-blank, at most [`MAX_ORDER_ID_LENGTH`] characters.
/// 4. **Customer**: name present, email present and shaped like one.
/// 5. **Callback URLs**: absolute http(s) URLs when given.
/// 6. **Line items**: named, positive quantity, positive price that fits
///    the currency. Their sum is not compared with the amount.
pub fn validate_payment_request(request: &PaymentRequest) -> Result<(), ValidationError> {
    validate_amount(request.amount, request.currency)?;

    let order_id = request.order_id.trim();
    if order_id.is_empty() {
        return Err(ValidationError::EmptyOrderId);
    }
    let len = order_id.chars().count();
    if len > MAX_ORDER_ID_LENGTH {
        return Err(ValidationError::OrderIdTooLong {
            len,
            max: MAX_ORDER_ID_LENGTH,
        });
    }

    if request.customer.name.trim().is_empty() {
        return Err(ValidationError::MissingCustomerName);
    }
    let email = request.customer.email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingCustomerEmail);
    }
    if !looks_like_email(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }

    if let Some(url) = &request.return_url {
        validate_url("return_url", url)?;
    }
    if let Some(url) = &request.cancel_url {
        validate_url("cancel_url", url)?;
    }

    for (index, item) in request.items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(ValidationError::InvalidLineItem {
                index,
                reason: "name is required".into(),
            });
        }
        if item.quantity == 0 {
            return Err(ValidationError::InvalidLineItem {
                index,
                reason: "quantity must be positive".into(),
            });
        }
        if item.price <= Decimal::ZERO {
            return Err(ValidationError::InvalidLineItem {
                index,
                reason: format!("price must be positive, got {}", item.price),
            });
        }
        if !request.currency.fits_fixed_scale(item.price) {
            return Err(ValidationError::InvalidLineItem {
                index,
                reason: format!("price {} is out of range for {}", item.price, request.currency),
            });
        }
        if !request.currency.accepts_precision(item.price) {
            return Err(ValidationError::InvalidLineItem {
                index,
                reason: format!(
                    "price {} exceeds {} decimals for {}",
                    item.price,
                    request.currency.exponent(),
                    request.currency
                ),
            });
        }
    }

    Ok(())
}

/// Positive and within the currency's precision.
pub fn validate_amount(amount: Decimal, currency: Currency) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount { amount });
    }
    if !currency.accepts_precision(amount) {
        return Err(ValidationError::ExcessPrecision {
            amount,
            currency,
            max_decimals: currency.exponent(),
        });
    }
    if !currency.fits_fixed_scale(amount) {
        return Err(ValidationError::AmountOutOfRange { amount, currency });
    }
    Ok(())
}

/// Transaction ids are opaque, but never blank.
pub fn validate_transaction_id(transaction_id: &str) -> Result<(), ValidationError> {
    if transaction_id.trim().is_empty() {
        return Err(ValidationError::EmptyTransactionId);
    }
    Ok(())
}

fn validate_url(field: &'static str, raw: &str) -> Result<(), ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::InvalidUrl {
            field,
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

// One '@', a non-empty local part, a dotted domain, no whitespace.
fn looks_like_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
