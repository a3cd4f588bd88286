// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Publishes issued certificates to RFC 6962 Certificate Transparency logs.
//!
//! For each certificate, [`Publisher::submit`] posts the chain to every
//! configured log concurrently, retrying transient failures, verifies the
//! SCT each log returns, and stores a [`Receipt`] for every SCT that
//! verifies.

pub mod audit;
pub mod cancel;
pub mod client;
pub mod obs;
pub mod publisher;
pub mod receipts;
pub mod retry;

pub use audit::{AuditSink, LogAuditSink};
pub use cancel::{cancellation, CancelHandle, Cancellation};
pub use client::{add_chain_url, HttpSubmissionClient, LogResponse, SubmissionClient, TransportError};
pub use obs::metrics::Metrics;
pub use publisher::{
    LogOutcome, OutcomeStatus, PublishError, Publisher, SubmissionPayload, SubmitError,
};
pub use receipts::{MemoryReceiptStore, Receipt, ReceiptError, ReceiptStore};
pub use retry::{
    parse_retry_after, submit_with_retries, RetryPolicy, Sleeper, SubmissionError, Submitted,
    TokioSleeper,
};
