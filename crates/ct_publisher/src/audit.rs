// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::publisher::{LogOutcome, OutcomeStatus};

/// Receives one record per (certificate, log) submission outcome.
pub trait AuditSink: Send + Sync {
    fn record(&self, serial: &str, outcome: &LogOutcome);
}

/// Writes audit records through `log` under the `audit` target, so they can
/// be routed separately from operational logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, serial: &str, outcome: &LogOutcome) {
        let log_uri = outcome.log_uri.as_str();
        let retries = outcome.retries;
        match &outcome.status {
            OutcomeStatus::Recorded => {
                log::info!(target: "audit", serial = serial, log_uri = log_uri, retries = retries; "SCT recorded");
            }
            OutcomeStatus::AlreadyRecorded => {
                log::info!(target: "audit", serial = serial, log_uri = log_uri, retries = retries; "SCT already recorded");
            }
            OutcomeStatus::Failed(e) => {
                let error = e.to_string();
                log::error!(
                    target: "audit",
                    serial = serial,
                    log_uri = log_uri,
                    retries = retries,
                    error = error.as_str();
                    "Submission failed"
                );
            }
            OutcomeStatus::Canceled => {
                log::warn!(target: "audit", serial = serial, log_uri = log_uri, retries = retries; "Submission canceled");
            }
        }
    }
}
