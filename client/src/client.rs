//! # Payment Client
//!
//! The one type a checkout flow holds. Construct it once at the
//! composition root from a [`GatewayConfig`] and pass it (or clones of it)
//! to whatever needs to take payments. Clones share the connection pool,
//! the signer and the metric series.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, GatewayConfig, HASH_FIELD, MOCK_PAYMENT_LATENCY};
use crate::crypto::Params;
use crate::error::GatewayError;
use crate::lifecycle::LifecycleCoordinator;
use crate::metrics::GatewayMetrics;
use crate::mock;
use crate::request::RequestBuilder;
use crate::transaction::builder::PaymentRequest;
use crate::transaction::types::{
    CallbackNotice, CloseReceipt, Currency, ExchangeRate, PaymentOutcome, TransactionRecord,
    TransactionStatus,
};
use crate::transaction::verification::ValidationError;
use crate::transport::{HttpTransport, Transport};

#[derive(Clone)]
pub struct PaymentClient {
    config: GatewayConfig,
    coordinator: LifecycleCoordinator,
    mock_latency: Duration,
}

impl PaymentClient {
    /// Creates a client talking HTTP to the configured base URL.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over any [`Transport`].
    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, GatewayError> {
        let builder = RequestBuilder::new(&config)?;
        let metrics = GatewayMetrics::new().map_err(|e| ConfigError::Metrics(e.to_string()))?;

        tracing::info!(
            merchant_id = %config.merchant_id(),
            environment = %config.environment(),
            base_url = %config.base_url(),
            rsa_public_key = config.rsa_public_key().is_some(),
            rsa_private_key = config.has_rsa_private_key(),
            "payment client ready"
        );

        let coordinator =
            LifecycleCoordinator::new(builder, transport, config.request_timeout(), metrics);
        Ok(Self {
            config,
            coordinator,
            mock_latency: MOCK_PAYMENT_LATENCY,
        })
    }

    /// A client sharing this one's transport and metrics with a different
    /// per-call timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            config: self.config.clone(),
            coordinator: self.coordinator.clone().with_timeout(timeout),
            mock_latency: self.mock_latency,
        }
    }

    /// Overrides the artificial delay of [`create_mock_payment`](Self::create_mock_payment).
    pub fn with_mock_latency(mut self, latency: Duration) -> Self {
        self.mock_latency = latency;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.coordinator.timeout()
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        self.coordinator.metrics()
    }

    // -----------------------------------------------------------------------
    // Gateway operations
    // -----------------------------------------------------------------------

    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentOutcome, GatewayError> {
        self.coordinator.create_payment(request).await
    }

    pub async fn verify_payment(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError> {
        self.coordinator.verify_payment(transaction_id).await
    }

    pub async fn check_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError> {
        self.coordinator.check_transaction(transaction_id).await
    }

    pub async fn close_transaction(&self, transaction_id: &str) -> Result<CloseReceipt, GatewayError> {
        self.coordinator.close_transaction(transaction_id).await
    }

    pub async fn get_exchange_rate(&self, from: Currency, to: Currency) -> Result<ExchangeRate, GatewayError> {
        self.coordinator.get_exchange_rate(from, to).await
    }

    // -----------------------------------------------------------------------
    // Local operations
    // -----------------------------------------------------------------------

    /// Synthetic payment for development without gateway access.
    ///
    /// Refused in production. The returned id starts with `MOCK-`, and the
    /// real-gateway operations refuse such ids.
    pub async fn create_mock_payment(&self, request: &PaymentRequest) -> Result<PaymentOutcome, GatewayError> {
        if self.config.environment().is_production() {
            tracing::error!(order_id = %request.order_id, "mock payment requested in production");
            return Err(GatewayError::MockInProduction);
        }
        let outcome = match mock::create_mock_payment(request, self.mock_latency).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics().record_validation_failure();
                return Err(e.into());
            }
        };
        self.metrics().record_mock_payment();
        Ok(outcome)
    }

    /// Authenticates a notification the gateway pushed to the merchant.
    ///
    /// `params` is every field of the notification, `hash` included. The
    /// hash must match the remaining fields signed with this merchant's
    /// secret.
    pub fn verify_callback<I, K, V>(&self, params: I) -> Result<CallbackNotice, GatewayError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let hash = params
            .remove(HASH_FIELD)
            .ok_or(ValidationError::MissingCallbackField(HASH_FIELD))?;

        let fields = params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        if !self.coordinator.signer().verify(fields, &hash) {
            tracing::warn!(fields = params.len(), "callback signature mismatch");
            return Err(ValidationError::SignatureMismatch.into());
        }

        let transaction_id = callback_field(&params, &["transaction_id", "tran_id"])
            .ok_or(ValidationError::MissingCallbackField("transaction_id"))?;
        let status = callback_field(&params, &["status", "payment_status"])
            .ok_or(ValidationError::MissingCallbackField("status"))?;

        let notice = CallbackNotice {
            transaction_id,
            order_id: callback_field(&params, &["order_id"]),
            status: TransactionStatus::from_gateway(&status),
        };
        tracing::info!(
            transaction_id = %notice.transaction_id,
            status = %notice.status,
            "callback verified"
        );
        Ok(notice)
    }
}

/// First non-blank value among `names`, trimmed.
fn callback_field(params: &Params, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| params.get(*name))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("config", &self.config)
            .field("timeout", &self.timeout())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::crypto::Signer;
    use crate::transaction::builder::{Customer, PaymentRequestBuilder};
    use rust_decimal::Decimal;

    fn config(environment: Environment) -> GatewayConfig {
        let mut builder = GatewayConfig::builder()
            .merchant_id("m-1")
            .secret("callback-secret")
            .environment(environment);
        if environment.is_production() {
            builder = builder.base_url("https://gateway.example.com/v1");
        }
        builder.build().unwrap()
    }

    fn request() -> PaymentRequest {
        PaymentRequestBuilder::new(Decimal::new(2500, 2), Currency::USD, "ORD-1")
            .customer(Customer::new("Jane Doe", "jane@example.com"))
            .build()
    }

    fn signed_callback(secret: &str, fields: &[(&str, &str)]) -> Params {
        let signer = Signer::new(secrecy::SecretString::new(secret.to_string())).unwrap();
        let mut params: Params = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let hash = signer.sign(fields.iter().copied());
        params.insert(HASH_FIELD.into(), hash);
        params
    }

    #[test]
    fn callback_with_valid_hash_is_accepted() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        let params = signed_callback(
            "callback-secret",
            &[("tran_id", "TX-1"), ("order_id", "ORD-1"), ("status", "APPROVED")],
        );

        let notice = client.verify_callback(params).unwrap();
        assert_eq!(notice.transaction_id, "TX-1");
        assert_eq!(notice.order_id.as_deref(), Some("ORD-1"));
        assert_eq!(notice.status, TransactionStatus::Succeeded);
    }

    #[test]
    fn callbacks_checked_with_the_request_signer() {
        let client = PaymentClient::new(config(Environment::Sandbox))
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        let fields = [("tran_id", "TX-9"), ("status", "PENDING")];
        let mut params: Params = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.insert(
            HASH_FIELD.into(),
            client.coordinator.signer().sign(fields.iter().copied()),
        );

        assert_eq!(params, signed_callback("callback-secret", &fields));
        let notice = client.verify_callback(params).unwrap();
        assert_eq!(notice.transaction_id, "TX-9");
        assert_eq!(notice.status, TransactionStatus::Pending);
    }

    #[test]
    fn callback_with_foreign_hash_is_refused() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        let params = signed_callback("other-secret", &[("tran_id", "TX-1"), ("status", "APPROVED")]);
        assert_eq!(
            client.verify_callback(params).unwrap_err(),
            GatewayError::Validation(ValidationError::SignatureMismatch)
        );
    }

    #[test]
    fn callback_tampered_after_signing_is_refused() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        let mut params = signed_callback("callback-secret", &[("tran_id", "TX-1"), ("status", "DECLINED")]);
        params.insert("status".into(), "APPROVED".into());
        assert!(client.verify_callback(params).is_err());
    }

    #[test]
    fn callback_requires_hash_and_ids() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        assert_eq!(
            client.verify_callback([("tran_id", "TX-1")]).unwrap_err(),
            GatewayError::Validation(ValidationError::MissingCallbackField("hash"))
        );

        let params = signed_callback("callback-secret", &[("status", "APPROVED")]);
        assert_eq!(
            client.verify_callback(params).unwrap_err(),
            GatewayError::Validation(ValidationError::MissingCallbackField("transaction_id"))
        );
    }

    #[tokio::test]
    async fn mock_refused_in_production() {
        let client = PaymentClient::new(config(Environment::Production)).unwrap();
        assert_eq!(
            client.create_mock_payment(&request()).await.unwrap_err(),
            GatewayError::MockInProduction
        );
        assert_eq!(client.metrics().mock_payments(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_counted_in_sandbox() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        let outcome = client.create_mock_payment(&request()).await.unwrap();
        assert!(outcome.is_mock());
        assert_eq!(client.metrics().mock_payments(), 1);
    }

    #[test]
    fn with_timeout_shares_metrics() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        let fast = client.with_timeout(Duration::from_secs(2));
        assert_eq!(fast.timeout(), Duration::from_secs(2));
        assert_eq!(client.timeout(), client.config().request_timeout());

        fast.metrics().record_validation_failure();
        assert_eq!(client.metrics().validation_failures(), 1);
    }

    #[test]
    fn debug_hides_secret() {
        let client = PaymentClient::new(config(Environment::Sandbox)).unwrap();
        assert!(!format!("{client:?}").contains("callback-secret"));
    }
}
