//! ChainBind metrics definitions.
//!
//! All metrics use OpenTelemetry conventions and are exported through
//! whatever meter provider the application installs.

use chainbind_core::{BindError, Phase};
use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Central metrics handle for contract bindings.
#[derive(Clone)]
pub struct BindingMetrics {
    pub calls: Counter<u64>,
    pub call_errors: Counter<u64>,
    pub call_latency_ms: Histogram<f64>,
    pub logs_fetched: Histogram<u64>,
    pub events_delivered: Counter<u64>,
    pub subscriptions_opened: Counter<u64>,
    pub subscriptions_ended: Counter<u64>,
}

impl BindingMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            calls: meter
                .u64_counter("chainbind.calls")
                .with_description("Contract calls and transactions issued")
                .build(),
            call_errors: meter
                .u64_counter("chainbind.call_errors")
                .with_description("Contract calls and transactions that failed")
                .build(),
            call_latency_ms: meter
                .f64_histogram("chainbind.call_latency_ms")
                .with_description("Round-trip time of a contract call in milliseconds")
                .build(),
            logs_fetched: meter
                .u64_histogram("chainbind.logs_fetched")
                .with_description("Logs returned by one historical query")
                .build(),
            events_delivered: meter
                .u64_counter("chainbind.events_delivered")
                .with_description("Decoded events handed to consumers")
                .build(),
            subscriptions_opened: meter
                .u64_counter("chainbind.subscriptions_opened")
                .with_description("Live log subscriptions started")
                .build(),
            subscriptions_ended: meter
                .u64_counter("chainbind.subscriptions_ended")
                .with_description("Live log subscriptions ended, tagged with outcome")
                .build(),
        }
    }

    pub fn record_call(&self, method: &str, ms: f64, outcome: Result<(), &BindError>) {
        let method = KeyValue::new("method", method.to_string());
        self.calls.add(1, &[method.clone()]);
        self.call_latency_ms.record(ms, &[method.clone()]);
        if let Err(e) = outcome {
            self.call_errors
                .add(1, &[method, KeyValue::new("error_type", e.kind())]);
        }
    }

    pub fn record_logs_fetched(&self, event: &str, count: usize) {
        self.logs_fetched
            .record(count as u64, &[KeyValue::new("event", event.to_string())]);
    }

    pub fn record_delivered(&self, event: &str) {
        self.events_delivered
            .add(1, &[KeyValue::new("event", event.to_string())]);
    }

    pub fn record_subscription_opened(&self, event: &str) {
        self.subscriptions_opened
            .add(1, &[KeyValue::new("event", event.to_string())]);
    }

    /// Count a finished subscription by its terminal phase.
    pub fn record_subscription_end(&self, event: &str, phase: &Phase) {
        let outcome = match phase {
            Phase::Failed(e) => e.kind(),
            other => other.as_str(),
        };
        self.subscriptions_ended.add(
            1,
            &[
                KeyValue::new("event", event.to_string()),
                KeyValue::new("outcome", outcome),
            ],
        );
    }
}
