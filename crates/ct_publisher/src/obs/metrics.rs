// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Metrics for CT log submissions.
use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    HistogramVec, Registry, TextEncoder,
};

#[derive(Clone, Debug)]
pub struct Metrics {
    registry: Registry,

    /// Individual `add-chain` requests, by log and HTTP status (or
    /// `transport_error`).
    pub attempts: CounterVec,
    /// Per-log submission outcomes, by log and outcome.
    pub submissions: CounterVec,
    pub submission_duration: HistogramVec,
}

impl Metrics {
    /// Registers the publisher's metrics with `r`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(r: &Registry) -> prometheus::Result<Self> {
        let attempts = register_counter_vec_with_registry!(
            "ct_submission_attempts_total",
            "add-chain requests sent to CT logs, by log and response status.",
            &["log", "status"],
            r
        )?;
        let submissions = register_counter_vec_with_registry!(
            "ct_submissions_total",
            "Certificate submissions to CT logs, by log and outcome.",
            &["log", "outcome"],
            r
        )?;
        let submission_duration = register_histogram_vec_with_registry!(
            "ct_submission_duration_seconds",
            "Time from first attempt to outcome for a certificate at one log, including retries.",
            &["log"],
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 15.0, 60.0],
            r
        )?;
        Ok(Self {
            registry: r.clone(),
            attempts,
            submissions,
            submission_duration,
        })
    }

    /// Renders everything in the registry in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = String::new();
        let encoder = TextEncoder::new();
        encoder.encode_utf8(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
