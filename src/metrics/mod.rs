/*!
 * # Metrics Module
 *
 * In-process counters and histograms for the checkout service, exported in
 * Prometheus text format at `/metrics` and as JSON at `/metrics/json`.
 */

use dashmap::DashMap;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CHECKOUT_REQUESTS_TOTAL: &str = "checkout_requests_total";
pub const CHECKOUT_SUCCESS_TOTAL: &str = "checkout_success_total";
pub const CHECKOUT_VALIDATION_FAILURES_TOTAL: &str = "checkout_validation_failures_total";
pub const CHECKOUT_INTERNAL_ERRORS_TOTAL: &str = "checkout_internal_errors_total";
pub const CHECKOUT_DURATION_MS: &str = "checkout_duration_ms";

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Count and sum only; buckets are left to the scraper.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    count: Arc<AtomicU64>,
    // f64 bits
    sum: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters.get(name).map(|c| c.get()).unwrap_or(0)
    }

    /// Prometheus text exposition, sorted by metric name.
    pub fn export_metrics(&self) -> String {
        let mut counters: Vec<(String, u64)> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().get()))
            .collect();
        counters.sort();

        let mut histograms: Vec<(String, u64, f64)> = self
            .histograms
            .iter()
            .map(|entry| {
                let h = entry.value();
                (entry.key().clone(), h.get_count(), h.get_sum())
            })
            .collect();
        histograms.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = String::new();
        for (name, value) in counters {
            let _ = writeln!(output, "# TYPE {} counter", name);
            let _ = writeln!(output, "{} {}", name, value);
        }
        for (name, count, sum) in histograms {
            let _ = writeln!(output, "# TYPE {} histogram", name);
            let _ = writeln!(output, "{}_count {}", name, count);
            let _ = writeln!(output, "{}_sum {}", name, sum);
        }
        output
    }

    pub fn export_metrics_json(&self) -> serde_json::Value {
        let counters: serde_json::Map<String, serde_json::Value> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), json!(entry.value().get())))
            .collect();

        let histograms: serde_json::Map<String, serde_json::Value> = self
            .histograms
            .iter()
            .map(|entry| {
                let h = entry.value();
                (
                    entry.key().clone(),
                    json!({ "count": h.get_count(), "sum": h.get_sum() }),
                )
            })
            .collect();

        json!({
            "counters": counters,
            "histograms": histograms,
        })
    }
}

// Global metrics registry
lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

pub fn increment_counter(name: &str) {
    METRICS.get_or_create_counter(name).inc();
}

pub fn observe_histogram(name: &str, value: f64) {
    METRICS.get_or_create_histogram(name).observe(value);
}

/// Outcome labels recorded for each checkout call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Success,
    ValidationFailure,
    InternalError,
}

pub fn record_checkout(outcome: CheckoutOutcome, elapsed: Duration) {
    increment_counter(CHECKOUT_REQUESTS_TOTAL);
    increment_counter(match outcome {
        CheckoutOutcome::Success => CHECKOUT_SUCCESS_TOTAL,
        CheckoutOutcome::ValidationFailure => CHECKOUT_VALIDATION_FAILURES_TOTAL,
        CheckoutOutcome::InternalError => CHECKOUT_INTERNAL_ERRORS_TOTAL,
    });
    observe_histogram(CHECKOUT_DURATION_MS, elapsed.as_secs_f64() * 1_000.0);
}

pub async fn metrics_handler() -> String {
    METRICS.export_metrics()
}

pub async fn metrics_json_handler() -> axum::Json<serde_json::Value> {
    axum::Json(METRICS.export_metrics_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("a_total").inc();
        registry.get_or_create_counter("a_total").inc();
        assert_eq!(registry.counter_value("a_total"), 2);
        assert_eq!(registry.counter_value("missing_total"), 0);
    }

    #[test]
    fn histogram_tracks_count_and_sum() {
        let histogram = Histogram::new();
        histogram.observe(1.5);
        histogram.observe(2.5);
        assert_eq!(histogram.get_count(), 2);
        assert!((histogram.get_sum() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn prometheus_export_is_sorted() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("b_total").inc();
        registry.get_or_create_counter("a_total").inc();
        registry.get_or_create_histogram("latency_ms").observe(3.0);

        let text = registry.export_metrics();
        let a = text.find("a_total 1").unwrap();
        let b = text.find("b_total 1").unwrap();
        assert!(a < b);
        assert!(text.contains("# TYPE latency_ms histogram"));
        assert!(text.contains("latency_ms_count 1"));
    }

    #[test]
    fn json_export_groups_by_kind() {
        let registry = MetricsRegistry::new();
        registry.get_or_create_counter("hits_total").inc();
        let value = registry.export_metrics_json();
        assert_eq!(value["counters"]["hits_total"], 1);
        assert!(value["histograms"].as_object().unwrap().is_empty());
    }
}
