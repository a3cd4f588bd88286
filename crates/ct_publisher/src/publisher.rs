// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Fans a certificate out to every configured log and records the verified
//! SCTs that come back.

use crate::audit::{AuditSink, LogAuditSink};
use crate::cancel::Cancellation;
use crate::client::{add_chain_url, LogResponse, SubmissionClient, TransportError};
use crate::obs::metrics::Metrics;
use crate::receipts::{Receipt, ReceiptError, ReceiptStore};
use crate::retry::{submit_with_retries, RetryPolicy, Sleeper, SubmissionError, TokioSleeper};
use ct_log_verifier::{
    verify_sct, AddChainRequest, AddChainResponse, LogDescription, SignedCertificateTimestamp,
    VerificationError,
};
use ct_publisher_config::PublicationConfig;
use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// The chain sent to every log: the leaf, then the issuer bundle in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    chain: Vec<Vec<u8>>,
}

impl SubmissionPayload {
    #[must_use]
    pub fn new(leaf_der: &[u8], issuer_bundle: &[Vec<u8>]) -> Self {
        let mut chain = Vec::with_capacity(1 + issuer_bundle.len());
        chain.push(leaf_der.to_vec());
        chain.extend(issuer_bundle.iter().cloned());
        Self { chain }
    }

    #[must_use]
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    /// Serializes the payload as an `add-chain` request body.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&AddChainRequest {
            chain: self.chain.clone(),
        })
    }
}

/// Fails a whole [`Publisher::submit`] call, before any log is contacted.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("failed to parse certificate: {0}")]
    CertificateParse(#[from] der::Error),
    #[error("failed to encode add-chain request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a single log's submission failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("failed to decode add-chain response from {log_uri}: {reason}")]
    Decode { log_uri: String, reason: String },
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("failed to persist receipt: {0}")]
    Persistence(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Recorded,
    /// A receipt for this certificate and log was already stored.
    AlreadyRecorded,
    Failed(PublishError),
    Canceled,
}

impl OutcomeStatus {
    fn label(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::AlreadyRecorded => "already_recorded",
            Self::Failed(PublishError::Submission(_)) => "submission_error",
            Self::Failed(PublishError::Decode { .. }) => "decode_error",
            Self::Failed(PublishError::Verification(_)) => "verification_error",
            Self::Failed(PublishError::Persistence(_)) => "persistence_error",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recorded => write!(f, "recorded"),
            Self::AlreadyRecorded => write!(f, "already recorded"),
            Self::Failed(e) => write!(f, "failed: {e}"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOutcome {
    pub log_uri: String,
    pub retries: u32,
    pub status: OutcomeStatus,
}

impl LogOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Recorded | OutcomeStatus::AlreadyRecorded
        )
    }
}

pub struct Publisher<C, S, Z = TokioSleeper> {
    config: Arc<PublicationConfig>,
    client: C,
    store: S,
    sleeper: Z,
    metrics: Metrics,
    audit: Box<dyn AuditSink>,
}

impl<C: SubmissionClient, S: ReceiptStore> Publisher<C, S> {
    pub fn new(config: Arc<PublicationConfig>, client: C, store: S, metrics: Metrics) -> Self {
        Self {
            config,
            client,
            store,
            sleeper: TokioSleeper,
            metrics,
            audit: Box::new(LogAuditSink),
        }
    }
}

impl<C, S, Z> Publisher<C, S, Z> {
    #[must_use]
    pub fn with_sleeper<Z2: Sleeper>(self, sleeper: Z2) -> Publisher<C, S, Z2> {
        Publisher {
            config: self.config,
            client: self.client,
            store: self.store,
            sleeper,
            metrics: self.metrics,
            audit: self.audit,
        }
    }

    #[must_use]
    pub fn with_audit_sink(mut self, audit: impl AuditSink + 'static) -> Self {
        self.audit = Box::new(audit);
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<C: SubmissionClient, S: ReceiptStore, Z: Sleeper> Publisher<C, S, Z> {
    /// Submits a DER certificate to every configured log concurrently and
    /// returns one outcome per log, in configured order. A failing log
    /// doesn't affect the others, so this succeeds even if every log fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate can't be parsed or the request
    /// can't be encoded. No log is contacted in that case.
    pub async fn submit(
        &self,
        cert_der: &[u8],
        cancel: &Cancellation,
    ) -> Result<Vec<LogOutcome>, SubmitError> {
        let cert = x509_util::parse_certificate(cert_der)?;
        let serial = x509_util::serial_to_string(&cert);
        let body = SubmissionPayload::new(cert_der, &self.config.issuer_bundle).to_json()?;

        log::info!(serial = serial.as_str(), logs = self.config.logs.len(); "Publishing certificate");
        let outcomes = join_all(
            self.config
                .logs
                .iter()
                .map(|log| self.publish_to_log(log, cert_der, &serial, &body, cancel)),
        )
        .await;
        Ok(outcomes)
    }

    async fn publish_to_log(
        &self,
        log: &LogDescription,
        leaf_der: &[u8],
        serial: &str,
        body: &[u8],
        cancel: &Cancellation,
    ) -> LogOutcome {
        let start = Instant::now();
        let (retries, status) = self.try_publish(log, leaf_der, serial, body, cancel).await;

        self.metrics
            .submissions
            .with_label_values(&[log.uri(), status.label()])
            .inc();
        self.metrics
            .submission_duration
            .with_label_values(&[log.uri()])
            .observe(start.elapsed().as_secs_f64());

        let outcome = LogOutcome {
            log_uri: log.uri().to_string(),
            retries,
            status,
        };
        self.audit.record(serial, &outcome);
        outcome
    }

    async fn try_publish(
        &self,
        log: &LogDescription,
        leaf_der: &[u8],
        serial: &str,
        body: &[u8],
        cancel: &Cancellation,
    ) -> (u32, OutcomeStatus) {
        let client = MeteredClient {
            inner: &self.client,
            metrics: &self.metrics,
            log_uri: log.uri(),
        };
        let submitted = match submit_with_retries(
            &client,
            &self.sleeper,
            RetryPolicy::from(self.config.as_ref()),
            log.uri(),
            &add_chain_url(log.uri()),
            body,
            cancel,
        )
        .await
        {
            Ok(submitted) => submitted,
            Err(SubmissionError::Canceled { retries, .. }) => {
                return (retries, OutcomeStatus::Canceled)
            }
            Err(e) => return (e.retries(), OutcomeStatus::Failed(e.into())),
        };
        let retries = submitted.retries;

        let response: AddChainResponse = match serde_json::from_slice(&submitted.body) {
            Ok(response) => response,
            Err(e) => {
                return (
                    retries,
                    OutcomeStatus::Failed(PublishError::Decode {
                        log_uri: log.uri().to_string(),
                        reason: e.to_string(),
                    }),
                )
            }
        };
        let sct = SignedCertificateTimestamp::from(response);
        let verified = match verify_sct(&sct, leaf_der, serial, log) {
            Ok(verified) => verified,
            Err(e) => {
                log::warn!(log_uri = log.uri(), serial = serial; "Discarding SCT: {e}");
                return (retries, OutcomeStatus::Failed(e.into()));
            }
        };

        let status = match self.store.add(Receipt::new(log.uri(), verified)).await {
            Ok(()) => OutcomeStatus::Recorded,
            Err(ReceiptError::Duplicate) => {
                log::info!(log_uri = log.uri(), serial = serial; "SCT already recorded");
                OutcomeStatus::AlreadyRecorded
            }
            Err(ReceiptError::Storage(reason)) => {
                OutcomeStatus::Failed(PublishError::Persistence(reason))
            }
        };
        (retries, status)
    }
}

// Counts every attempt, including ones the retry loop goes on to repeat.
struct MeteredClient<'a, C> {
    inner: &'a C,
    metrics: &'a Metrics,
    log_uri: &'a str,
}

impl<C: SubmissionClient> SubmissionClient for MeteredClient<'_, C> {
    async fn post(&self, url: &str, body: &[u8]) -> Result<LogResponse, TransportError> {
        let result = self.inner.post(url, body).await;
        let status = match &result {
            Ok(response) => response.status.to_string(),
            Err(_) => "transport_error".to_string(),
        };
        self.metrics
            .attempts
            .with_label_values(&[self.log_uri, status.as_str()])
            .inc();
        result
    }
}
