//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cafe_requests_rate_limited_total` (counter): rejections by quota class
//! - `cafe_gate_rejections_total` (counter): access gate rejections by kind
//! - `cafe_contact_submissions_total` (counter): stored contact submissions
//! - `cafe_mail_failures_total` (counter): swallowed mail delivery failures
//! - `cafe_rate_limit_entries` (gauge): live entries per quota class

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rate_limited(class: &str) {
    counter!("cafe_requests_rate_limited_total", "class" => class.to_string()).increment(1);
}

pub fn record_gate_rejection(kind: &'static str) {
    counter!("cafe_gate_rejections_total", "kind" => kind).increment(1);
}

pub fn record_contact_submission() {
    counter!("cafe_contact_submissions_total").increment(1);
}

pub fn record_mail_failure() {
    counter!("cafe_mail_failures_total").increment(1);
}

pub fn record_rate_limit_entries(class: &str, entries: usize) {
    gauge!("cafe_rate_limit_entries", "class" => class.to_string()).set(entries as f64);
}
