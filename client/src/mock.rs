//! Mock payments for environments without gateway credentials.
//!
//! A mock payment validates the request like a real one, waits a moment,
//! and always succeeds with a transaction id prefixed by
//! [`MOCK_TRANSACTION_PREFIX`]. No money moves and the gateway never hears
//! about it. Real-gateway lookups refuse mock ids.

use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::config::MOCK_TRANSACTION_PREFIX;
use crate::transaction::builder::PaymentRequest;
use crate::transaction::types::PaymentOutcome;
use crate::transaction::verification::{validate_payment_request, ValidationError};

/// Creates a synthetic, always-successful payment after `latency`.
///
/// The payment URL is the request's return URL tagged with
/// `mock_transaction_id`, or a `mock://` URL when there is none.
pub async fn create_mock_payment(
    request: &PaymentRequest,
    latency: Duration,
) -> Result<PaymentOutcome, ValidationError> {
    validate_payment_request(request)?;

    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    let transaction_id = format!("{}{}", MOCK_TRANSACTION_PREFIX, Uuid::new_v4().simple());
    let payment_url = mock_payment_url(request.return_url.as_deref(), &transaction_id);

    tracing::warn!(
        order_id = %request.order_id,
        transaction_id = %transaction_id,
        "created mock payment, no funds will move"
    );

    Ok(PaymentOutcome::created(payment_url, transaction_id))
}

fn mock_payment_url(return_url: Option<&str>, transaction_id: &str) -> String {
    // Validation already accepted the URL.
    match return_url.and_then(|raw| Url::parse(raw).ok()) {
        Some(mut url) => {
            url.query_pairs_mut()
                .append_pair("mock_transaction_id", transaction_id);
            url.into()
        }
        None => format!("mock://payment/{transaction_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::builder::{Customer, PaymentRequestBuilder};
    use crate::transaction::types::{is_mock_transaction_id, Currency};
    use rust_decimal::Decimal;

    fn request() -> PaymentRequestBuilder {
        PaymentRequestBuilder::new(Decimal::new(999, 2), Currency::USD, "ORD-MOCK")
            .customer(Customer::new("Jane Doe", "jane@example.com"))
    }

    #[tokio::test(start_paused = true)]
    async fn mock_payment_is_marked() {
        let outcome = create_mock_payment(&request().build(), Duration::from_millis(800))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.is_mock());
        let id = outcome.transaction_id.unwrap();
        assert!(is_mock_transaction_id(&id));
        assert_eq!(outcome.payment_url.unwrap(), format!("mock://payment/{id}"));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_payment_waits_for_latency() {
        let started = tokio::time::Instant::now();
        create_mock_payment(&request().build(), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn mock_payment_tags_return_url() {
        let req = request()
            .return_url("https://shop.example.com/done?cart=7")
            .build();
        let outcome = create_mock_payment(&req, Duration::ZERO).await.unwrap();
        let url = outcome.payment_url.unwrap();
        assert!(url.starts_with("https://shop.example.com/done?cart=7&mock_transaction_id=MOCK-"));
    }

    #[tokio::test]
    async fn mock_payment_still_validates() {
        let req = request().amount(Decimal::ZERO).build();
        let err = create_mock_payment(&req, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveAmount { .. }));
    }

    #[tokio::test]
    async fn mock_ids_are_unique() {
        let a = create_mock_payment(&request().build(), Duration::ZERO).await.unwrap();
        let b = create_mock_payment(&request().build(), Duration::ZERO).await.unwrap();
        assert_ne!(a.transaction_id, b.transaction_id);
    }
}
