//! # Payment Lifecycle
//!
//! Drives the five gateway operations: build a signed payload, send it
//! once, and turn the envelope into a typed result.
//!
//! The coordinator keeps no transaction state between calls. Every verify
//! or check goes to the gateway, and the answer is returned as-is. The
//! detail and check endpoints may briefly disagree while the gateway
//! settles; whichever call the caller made last is the one it sees.
//! There is no reconciliation between them.
//!
//! Nothing is retried here. Whether a failed read is worth repeating is
//! answered by [`GatewayError::is_retryable`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::crypto::Signer;
use crate::error::GatewayError;
use crate::metrics::{CallOutcome, GatewayMetrics};
use crate::request::{GatewayRequest, RequestBuilder};
use crate::response::{self, GatewayEnvelope};
use crate::transaction::builder::PaymentRequest;
use crate::transaction::types::{
    is_mock_transaction_id, CloseReceipt, Currency, ExchangeRate, PaymentOutcome,
    TransactionRecord,
};
use crate::transport::Transport;

#[derive(Clone)]
pub struct LifecycleCoordinator {
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    metrics: GatewayMetrics,
}

impl LifecycleCoordinator {
    pub fn new(
        builder: RequestBuilder,
        transport: Arc<dyn Transport>,
        timeout: Duration,
        metrics: GatewayMetrics,
    ) -> Self {
        Self {
            builder,
            transport,
            timeout,
            metrics,
        }
    }

    /// Same coordinator with a different per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn signer(&self) -> &Signer {
        self.builder.signer()
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Starts a payment and returns where to send the customer.
    ///
    /// A gateway rejection is a normal outcome here and comes back as
    /// `Ok` with `success == false`. Transport faults and unreadable
    /// responses are errors; the caller must not assume the payment was
    /// not created and must not blindly resubmit.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentOutcome, GatewayError> {
        let result = self
            .call(&GatewayRequest::Purchase(request), response::purchase_result)
            .await;

        match result {
            Ok((payment_url, transaction_id)) => {
                tracing::info!(
                    order_id = %request.order_id,
                    transaction_id = %transaction_id,
                    "payment created"
                );
                Ok(PaymentOutcome::created(payment_url, transaction_id))
            }
            Err(GatewayError::Rejected { code, message }) => {
                tracing::warn!(
                    order_id = %request.order_id,
                    code,
                    message = %message,
                    "gateway rejected payment"
                );
                Ok(PaymentOutcome::rejected(message))
            }
            Err(e) => {
                tracing::error!(order_id = %request.order_id, error = %e, "payment creation failed");
                Err(e)
            }
        }
    }

    /// Current state of a transaction from the detail endpoint.
    pub async fn verify_payment(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError> {
        reject_mock(transaction_id)?;
        let id = transaction_id.trim();
        let record = self
            .call(&GatewayRequest::TransactionDetail { transaction_id }, |data| {
                response::transaction_record(data, id)
            })
            .await?;
        tracing::info!(transaction_id = %record.transaction_id, status = %record.status, "payment verified");
        Ok(record)
    }

    /// Current state of a transaction from the check endpoint.
    pub async fn check_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError> {
        reject_mock(transaction_id)?;
        let id = transaction_id.trim();
        let record = self
            .call(&GatewayRequest::CheckTransaction { transaction_id }, |data| {
                response::transaction_record(data, id)
            })
            .await?;
        tracing::info!(transaction_id = %record.transaction_id, status = %record.status, "transaction checked");
        Ok(record)
    }

    /// Asks the gateway to close a transaction. Whether a given status can
    /// be closed is the gateway's call; its refusal comes back as
    /// [`GatewayError::Rejected`].
    pub async fn close_transaction(&self, transaction_id: &str) -> Result<CloseReceipt, GatewayError> {
        reject_mock(transaction_id)?;
        let id = transaction_id.trim();
        let receipt = self
            .call(&GatewayRequest::CloseTransaction { transaction_id }, |data| {
                response::close_receipt(data, id)
            })
            .await?;
        tracing::info!(transaction_id = %receipt.transaction_id, "transaction closed");
        Ok(receipt)
    }

    pub async fn get_exchange_rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate, GatewayError> {
        self.call(&GatewayRequest::ExchangeRate { from, to }, |data| {
            response::exchange_rate(data, from, to)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Call pipeline
    // -----------------------------------------------------------------------

    /// Build, send once, read the envelope, then `parse` the data.
    ///
    /// Validation failures never reach the transport. Every call that does
    /// reach it is counted under its final outcome.
    async fn call<T>(
        &self,
        request: &GatewayRequest<'_>,
        parse: impl FnOnce(Value) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let operation = request.operation();

        let payload = match self.builder.build(request) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.record_validation_failure();
                tracing::warn!(operation = %operation, error = %e, "request failed validation");
                return Err(e.into());
            }
        };

        tracing::debug!(operation = %operation, "sending gateway request");
        let started = Instant::now();

        let result = match self.transport.send(&payload, self.timeout).await {
            Ok(body) => GatewayEnvelope::parse(body)
                .and_then(GatewayEnvelope::into_data)
                .and_then(parse),
            Err(e) => Err(e.into()),
        };

        let elapsed = started.elapsed();
        self.metrics
            .observe_call(operation, outcome_of(&result), elapsed.as_secs_f64());

        match &result {
            Err(e @ GatewayError::Transport(_)) => tracing::error!(
                operation = %operation,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "gateway unreachable"
            ),
            Err(e) => tracing::debug!(
                operation = %operation,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "gateway call failed"
            ),
            Ok(_) => {}
        }

        result
    }
}

fn outcome_of<T>(result: &Result<T, GatewayError>) -> CallOutcome {
    match result {
        Ok(_) => CallOutcome::Ok,
        Err(GatewayError::Rejected { .. }) => CallOutcome::Rejected,
        Err(GatewayError::Transport(_)) => CallOutcome::TransportError,
        Err(_) => CallOutcome::UnknownResponse,
    }
}

fn reject_mock(transaction_id: &str) -> Result<(), GatewayError> {
    let id = transaction_id.trim();
    if is_mock_transaction_id(id) {
        return Err(GatewayError::MockTransaction(id.to_string()));
    }
    Ok(())
}
