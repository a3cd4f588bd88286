// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Bounded retries of an `add-chain` submission to one log.
//!
//! Each attempt ends in one of three ways:
//! - 200: done, and the body is handed back for decoding.
//! - 408, 503 or a transport error: retried after a delay, up to
//!   `max_retries` times. A 408 or 503 with an integer `Retry-After` header
//!   sets the delay, capped at [`MAX_RETRY_AFTER`]; otherwise the configured
//!   backoff is used.
//! - any other status: rejected without further attempts.

use crate::cancel::Cancellation;
use crate::client::{LogResponse, SubmissionClient, TransportError};
use ct_publisher_config::PublicationConfig;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a delay requested by a log through `Retry-After`.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&PublicationConfig> for RetryPolicy {
    fn from(config: &PublicationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.backoff,
        }
    }
}

/// A 200 response body and the retries it took to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub body: Vec<u8>,
    pub retries: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("{log_uri} rejected the submission with status {status} after {retries} retries")]
    Rejected {
        log_uri: String,
        status: u16,
        retries: u32,
    },
    #[error("giving up on {log_uri} after {retries} retries: {last}")]
    RetriesExhausted {
        log_uri: String,
        retries: u32,
        last: String,
    },
    #[error("submission to {log_uri} canceled after {retries} retries")]
    Canceled { log_uri: String, retries: u32 },
}

impl SubmissionError {
    #[must_use]
    pub fn retries(&self) -> u32 {
        match self {
            Self::Rejected { retries, .. }
            | Self::RetriesExhausted { retries, .. }
            | Self::Canceled { retries, .. } => *retries,
        }
    }
}

/// Parses a `Retry-After` value given in whole seconds. HTTP dates are not
/// supported and yield `None`.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

enum Step {
    Done(Vec<u8>),
    Retry { delay: Duration, reason: String },
    Reject(u16),
}

fn classify(result: Result<LogResponse, TransportError>, backoff: Duration) -> Step {
    match result {
        Ok(response) if response.status == 200 => Step::Done(response.body),
        Ok(response) if matches!(response.status, 408 | 503) => Step::Retry {
            delay: response
                .retry_after
                .as_deref()
                .and_then(parse_retry_after)
                .map_or(backoff, |delay| delay.min(MAX_RETRY_AFTER)),
            reason: format!("status {}", response.status),
        },
        Ok(response) => Step::Reject(response.status),
        Err(e) => Step::Retry {
            delay: backoff,
            reason: e.to_string(),
        },
    }
}

/// Posts `body` to `url` until it succeeds, is rejected, runs out of
/// retries, or `cancel` fires. Makes at most `policy.max_retries + 1`
/// attempts and never sleeps after the last one.
///
/// # Errors
///
/// Returns a [`SubmissionError`] naming `log_uri` and the retries consumed.
pub async fn submit_with_retries<C: SubmissionClient, Z: Sleeper>(
    client: &C,
    sleeper: &Z,
    policy: RetryPolicy,
    log_uri: &str,
    url: &str,
    body: &[u8],
    cancel: &Cancellation,
) -> Result<Submitted, SubmissionError> {
    let canceled = |retries| SubmissionError::Canceled {
        log_uri: log_uri.to_string(),
        retries,
    };
    let mut retries = 0;
    loop {
        if cancel.is_canceled() {
            return Err(canceled(retries));
        }
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(canceled(retries)),
            result = client.post(url, body) => result,
        };
        match classify(result, policy.backoff) {
            Step::Done(body) => return Ok(Submitted { body, retries }),
            Step::Reject(status) => {
                log::warn!(log_uri = log_uri, status = status, retries = retries; "Log rejected submission");
                return Err(SubmissionError::Rejected {
                    log_uri: log_uri.to_string(),
                    status,
                    retries,
                });
            }
            Step::Retry { delay, reason } => {
                if retries >= policy.max_retries {
                    log::warn!(
                        log_uri = log_uri,
                        retries = retries,
                        reason = reason.as_str();
                        "Retries exhausted"
                    );
                    return Err(SubmissionError::RetriesExhausted {
                        log_uri: log_uri.to_string(),
                        retries,
                        last: reason,
                    });
                }
                retries += 1;
                log::info!(
                    log_uri = log_uri,
                    retry = retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    reason = reason.as_str();
                    "Retrying submission"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(canceled(retries)),
                    () = sleeper.sleep(delay) => {}
                }
            }
        }
    }
}
