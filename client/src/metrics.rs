//! # Prometheus Metrics
//!
//! Counters and latency histograms for gateway calls, registered in a
//! dedicated [`prometheus::Registry`] so an embedding service can merge or
//! expose them however it likes.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::request::Operation;

/// How a gateway call ended, as recorded in `gateway_requests_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Ok,
    Rejected,
    TransportError,
    UnknownResponse,
}

impl CallOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::TransportError => "transport_error",
            Self::UnknownResponse => "unknown_response",
        }
    }
}

/// Metric handles for one client. Cloning shares the underlying series.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    validation_failures_total: IntCounter,
    mock_payments_total: IntCounter,
}

impl GatewayMetrics {
    /// Creates and registers all metrics. Fails only if two metrics share a
    /// name, which would be a programming error in this module.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("paygate".into()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("gateway_requests_total", "Gateway calls by operation and outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gateway_request_duration_seconds",
                "Wall-clock duration of gateway calls",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["operation"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let validation_failures_total = IntCounter::new(
            "validation_failures_total",
            "Requests rejected locally before reaching the gateway",
        )?;
        registry.register(Box::new(validation_failures_total.clone()))?;

        let mock_payments_total =
            IntCounter::new("mock_payments_total", "Synthetic payments created")?;
        registry.register(Box::new(mock_payments_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            validation_failures_total,
            mock_payments_total,
        })
    }

    pub fn observe_call(&self, operation: Operation, outcome: CallOutcome, seconds: f64) {
        self.requests_total
            .with_label_values(&[operation.name(), outcome.label()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[operation.name()])
            .observe(seconds);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures_total.inc();
    }

    pub fn record_mock_payment(&self) {
        self.mock_payments_total.inc();
    }

    /// Number of calls recorded for an operation/outcome pair.
    pub fn calls(&self, operation: Operation, outcome: CallOutcome) -> u64 {
        self.requests_total
            .with_label_values(&[operation.name(), outcome.label()])
            .get()
    }

    pub fn validation_failures(&self) -> u64 {
        self.validation_failures_total.get()
    }

    pub fn mock_payments(&self) -> u64 {
        self.mock_payments_total.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format of every registered series.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_operation_and_outcome() {
        let m = GatewayMetrics::new().unwrap();
        m.observe_call(Operation::Purchase, CallOutcome::Ok, 0.2);
        m.observe_call(Operation::Purchase, CallOutcome::Rejected, 0.1);
        m.observe_call(Operation::Purchase, CallOutcome::Ok, 0.3);

        assert_eq!(m.calls(Operation::Purchase, CallOutcome::Ok), 2);
        assert_eq!(m.calls(Operation::Purchase, CallOutcome::Rejected), 1);
        assert_eq!(m.calls(Operation::TransactionDetail, CallOutcome::Ok), 0);
    }

    #[test]
    fn render_uses_namespace() {
        let m = GatewayMetrics::new().unwrap();
        m.observe_call(Operation::ExchangeRate, CallOutcome::TransportError, 1.0);
        m.record_validation_failure();
        let text = m.render();
        assert!(text.contains("paygate_gateway_requests_total"));
        assert!(text.contains("operation=\"exchange_rate\""));
        assert!(text.contains("paygate_validation_failures_total 1"));
    }
}
