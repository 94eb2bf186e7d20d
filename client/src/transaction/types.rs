//! Core value types shared by the request builder, the lifecycle
//! coordinator, and callers.
//!
//! Monetary values are `rust_decimal::Decimal` scoped by a [`Currency`]
//! that knows its minor-unit exponent. No floating point touches an amount.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::verification::ValidationError;
use crate::config::MOCK_TRANSACTION_PREFIX;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Currencies the gateway settles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// United States Dollar (cent, 10^-2).
    USD,
    /// Euro (cent, 10^-2).
    EUR,
    /// Pound Sterling (penny, 10^-2).
    GBP,
    /// Brazilian Real (centavo, 10^-2).
    BRL,
    /// Cambodian Riel. Settled in whole riel.
    KHR,
    /// Japanese Yen. No minor unit.
    JPY,
}

impl Currency {
    /// Number of fractional digits the gateway accepts for this currency.
    pub fn exponent(self) -> u32 {
        match self {
            Self::USD | Self::EUR | Self::GBP | Self::BRL => 2,
            Self::KHR | Self::JPY => 0,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::BRL => "BRL",
            Self::KHR => "KHR",
            Self::JPY => "JPY",
        }
    }

    /// Formats an amount with exactly [`exponent`](Self::exponent) decimals,
    /// e.g. `25` USD becomes `"25.00"`.
    ///
    /// Callers validate first. An amount with more decimals than the
    /// currency allows is rounded here, and one too large for
    /// [`fits_fixed_scale`](Self::fits_fixed_scale) keeps fewer decimals.
    pub fn format_amount(self, amount: Decimal) -> String {
        let mut scaled = amount;
        scaled.rescale(self.exponent());
        scaled.to_string()
    }

    /// Returns `true` if `amount` fits the currency's minor unit.
    pub fn accepts_precision(self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.exponent()
    }

    /// Returns `true` if `amount` can be written with exactly
    /// [`exponent`](Self::exponent) decimals. Very large amounts cannot,
    /// since `Decimal` holds at most 28 significant digits.
    pub fn fits_fixed_scale(self, amount: Decimal) -> bool {
        let mut scaled = amount;
        scaled.rescale(self.exponent());
        scaled.scale() == self.exponent()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "BRL" => Ok(Self::BRL),
            "KHR" => Ok(Self::KHR),
            "JPY" => Ok(Self::JPY),
            _ => Err(ValidationError::UnsupportedCurrency(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Normalized gateway status.
///
/// The gateway's vocabulary is wider and not fully documented; everything
/// it reports is folded into these four. An unrecognized word becomes
/// `Pending`, never `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    /// Maps a gateway status word. Case and surrounding whitespace are ignored.
    pub fn from_gateway(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "APPROVED" | "SUCCESS" | "SUCCEEDED" | "COMPLETED" | "PAID" | "CAPTURED" | "0" => {
                Self::Succeeded
            }
            "DECLINED" | "FAILED" | "REJECTED" | "ERROR" | "EXPIRED" => Self::Failed,
            "CANCELLED" | "CANCELED" | "VOIDED" | "VOID" | "REFUNDED" => Self::Cancelled,
            "PENDING" | "PROCESSING" | "PRE-AUTH" | "PREAUTH" | "CREATED" | "WAITING" => {
                Self::Pending
            }
            _ => {
                tracing::warn!(
                    gateway_status = raw,
                    "unrecognized gateway status, treating as pending"
                );
                Self::Pending
            }
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentState
// ---------------------------------------------------------------------------

/// Local bookkeeping state of a payment.
///
/// ```text
/// Created ──► Pending ──► { Succeeded | Failed | Cancelled }
/// ```
///
/// `Created` is never reported by the gateway: it means a purchase call
/// returned a transaction id and no status has been fetched yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Created,
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl PaymentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl From<TransactionStatus> for PaymentState {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Succeeded => Self::Succeeded,
            TransactionStatus::Failed => Self::Failed,
            TransactionStatus::Cancelled => Self::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of a transaction as the gateway reports it.
///
/// The gateway is the system of record; nothing here is cached. Fields the
/// gateway omits stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub order_id: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: TransactionStatus,
    /// The status word exactly as the gateway sent it.
    pub gateway_status: String,
    pub payment_method: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    pub fn state(&self) -> PaymentState {
        self.status.into()
    }
}

// ---------------------------------------------------------------------------
// PaymentOutcome
// ---------------------------------------------------------------------------

/// Generic message shown when the gateway gave no usable reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Payment could not be processed. Please try again.";

/// Normalized result of a create call, the only type handed back to the
/// checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub success: bool,
    pub payment_url: Option<String>,
    pub transaction_id: Option<String>,
    pub error: Option<String>,
}

impl PaymentOutcome {
    pub fn created(payment_url: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            success: true,
            payment_url: Some(payment_url.into()),
            transaction_id: Some(transaction_id.into()),
            error: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            payment_url: None,
            transaction_id: None,
            error: (!message.trim().is_empty()).then_some(message),
        }
    }

    /// `Created` after a successful create call, `None` otherwise.
    pub fn state(&self) -> Option<PaymentState> {
        self.success.then_some(PaymentState::Created)
    }

    /// The message a UI should show: the gateway's own words when it gave
    /// any, a generic fallback otherwise.
    pub fn user_message(&self) -> &str {
        self.error.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE)
    }

    /// `true` when the transaction id was synthesized by a mock payment.
    pub fn is_mock(&self) -> bool {
        self.transaction_id
            .as_deref()
            .is_some_and(is_mock_transaction_id)
    }
}

/// Mock transaction ids carry [`MOCK_TRANSACTION_PREFIX`].
pub fn is_mock_transaction_id(transaction_id: &str) -> bool {
    transaction_id.starts_with(MOCK_TRANSACTION_PREFIX)
}

// ---------------------------------------------------------------------------
// Read-only lookups
// ---------------------------------------------------------------------------

/// Exchange rate quoted by the gateway: one unit of `from` buys `rate`
/// units of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

/// Result of a close-transaction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReceipt {
    pub transaction_id: String,
    /// Status after closing, when the gateway reports one.
    pub status: Option<TransactionStatus>,
}

/// A verified push-back notification from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackNotice {
    pub transaction_id: String,
    pub order_id: Option<String>,
    pub status: TransactionStatus,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn status_mapping() {
        assert_eq!(TransactionStatus::from_gateway("APPROVED"), TransactionStatus::Succeeded);
        assert_eq!(TransactionStatus::from_gateway("approved "), TransactionStatus::Succeeded);
        assert_eq!(TransactionStatus::from_gateway("DECLINED"), TransactionStatus::Failed);
        assert_eq!(TransactionStatus::from_gateway("Cancelled"), TransactionStatus::Cancelled);
        assert_eq!(TransactionStatus::from_gateway("PRE-AUTH"), TransactionStatus::Pending);
    }

    #[test]
    fn unknown_status_is_pending_never_success() {
        let status = TransactionStatus::from_gateway("SETTLED_MAYBE");
        assert_eq!(status, TransactionStatus::Pending);
        assert!(!status.is_terminal());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unknown_status_is_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TransactionStatus::from_gateway("SOMETHING_NEW");
            TransactionStatus::from_gateway("APPROVED");
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("unrecognized gateway status"));
        assert!(output.contains("SOMETHING_NEW"));
        assert_eq!(output.matches("unrecognized gateway status").count(), 1);
    }

    #[test]
    fn payment_state_terminality() {
        assert!(!PaymentState::Created.is_terminal());
        assert!(!PaymentState::Pending.is_terminal());
        assert!(PaymentState::Succeeded.is_terminal());
        assert!(PaymentState::Failed.is_terminal());
        assert!(PaymentState::Cancelled.is_terminal());
        assert_eq!(PaymentState::from(TransactionStatus::Failed), PaymentState::Failed);
    }

    #[test]
    fn currency_formatting() {
        assert_eq!(Currency::USD.format_amount(Decimal::new(25, 0)), "25.00");
        assert_eq!(Currency::USD.format_amount(Decimal::new(2550, 2)), "25.50");
        assert_eq!(Currency::KHR.format_amount(Decimal::new(4100, 0)), "4100");
    }

    #[test]
    fn currency_precision() {
        assert!(Currency::USD.accepts_precision(Decimal::new(2500, 2)));
        // 25.000 normalizes to 25.
        assert!(Currency::USD.accepts_precision(Decimal::new(25000, 3)));
        assert!(!Currency::USD.accepts_precision(Decimal::new(25001, 3)));
        assert!(!Currency::KHR.accepts_precision(Decimal::new(105, 1)));
        assert!(Currency::USD.fits_fixed_scale(Decimal::new(2500, 2)));
        assert!(!Currency::USD.fits_fixed_scale(Decimal::MAX));
        assert!(Currency::KHR.fits_fixed_scale(Decimal::MAX));
    }

    #[test]
    fn currency_parsing() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(ValidationError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn outcome_messages() {
        let ok = PaymentOutcome::created("https://gw/pay/abc", "abc");
        assert_eq!(ok.state(), Some(PaymentState::Created));
        assert!(!ok.is_mock());

        let rejected = PaymentOutcome::rejected("Invalid merchant");
        assert_eq!(rejected.user_message(), "Invalid merchant");
        assert_eq!(rejected.state(), None);

        let silent = PaymentOutcome::rejected("  ");
        assert_eq!(silent.error, None);
        assert_eq!(silent.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn mock_ids_are_marked() {
        assert!(is_mock_transaction_id("MOCK-1234"));
        assert!(!is_mock_transaction_id("abc"));
    }
}
