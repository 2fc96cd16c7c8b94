// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the gateway.
//!
//! Metrics are registered in a registry owned by the application state so
//! several gateways (or tests) can live in one process.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Duration;

pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    upstream_latency: HistogramVec,
    rate_limit_entries: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("site_gateway_requests_total", "Requests by endpoint and outcome"),
            &["endpoint", "outcome"],
        )?;
        let upstream_latency = HistogramVec::new(
            HistogramOpts::new(
                "site_gateway_upstream_seconds",
                "Latency of outbound webhook and completion calls",
            ),
            &["target"],
        )?;
        let rate_limit_entries = IntGauge::new(
            "site_gateway_rate_limit_entries",
            "Client identifiers tracked by the rate limiter",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(upstream_latency.clone()))?;
        registry.register(Box::new(rate_limit_entries.clone()))?;

        Ok(Self {
            registry,
            requests,
            upstream_latency,
            rate_limit_entries,
        })
    }

    pub fn record_request(&self, endpoint: &str, outcome: &str) {
        self.requests.with_label_values(&[endpoint, outcome]).inc();
    }

    pub fn observe_upstream(&self, target: &str, elapsed: Duration) {
        self.upstream_latency
            .with_label_values(&[target])
            .observe(elapsed.as_secs_f64());
    }

    pub fn set_rate_limit_entries(&self, count: usize) {
        self.rate_limit_entries
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
