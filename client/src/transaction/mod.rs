//! # Transaction Module
//!
//! Domain types for payments the client creates and tracks.
//!
//! ## Architecture
//!
//! ```text
//! types.rs       : Currency, TransactionStatus, PaymentState, records and outcomes
//! builder.rs     : PaymentRequest and its fluent builder
//! verification.rs: Input validation run before anything is signed
//! ```
//!
//! ## Payment Lifecycle
//!
//! 1. **Build**: assemble a [`PaymentRequest`] with [`PaymentRequestBuilder`].
//! 2. **Validate**: [`validate_payment_request`] rejects bad input up front.
//! 3. **Create**: the purchase call returns a [`PaymentOutcome`]; a
//!    successful one puts the payment in [`PaymentState::Created`].
//! 4. **Track**: detail/check lookups return [`TransactionRecord`]
//!    snapshots until the status is terminal.

pub mod builder;
pub mod types;
pub mod verification;

pub use builder::{Customer, LineItem, PaymentRequest, PaymentRequestBuilder};
pub use types::{
    is_mock_transaction_id, CallbackNotice, CloseReceipt, Currency, ExchangeRate, PaymentOutcome,
    PaymentState, TransactionRecord, TransactionStatus, GENERIC_FAILURE_MESSAGE,
};
pub use verification::{
    validate_amount, validate_payment_request, validate_transaction_id, ValidationError,
};
