// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! A single `add-chain` request to a CT log. Retries live in [`crate::retry`].

use ct_log_verifier::normalize_log_uri;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use std::time::Duration;
use thiserror::Error;

pub const ADD_CHAIN_PATH: &str = "/ct/v1/add-chain";

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const KEEP_ALIVE: &str = "timeout=15, max=100";

/// Returns the `add-chain` endpoint for a log's base URI, assuming https when
/// no scheme is given.
#[must_use]
pub fn add_chain_url(log_uri: &str) -> String {
    format!("{}{ADD_CHAIN_PATH}", normalize_log_uri(log_uri))
}

/// What came back from a log, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if present.
    pub retry_after: Option<String>,
    pub body: Vec<u8>,
}

impl LogResponse {
    #[must_use]
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body,
        }
    }

    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: Vec::new(),
        }
    }
}

/// The request never produced a response: connect, TLS, timeout or body
/// read failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("request to {url} failed: {reason}")]
pub struct TransportError {
    pub url: String,
    pub reason: String,
}

#[allow(async_fn_in_trait)]
pub trait SubmissionClient {
    /// Posts a JSON body to `url` once.
    async fn post(&self, url: &str, body: &[u8]) -> Result<LogResponse, TransportError>;
}

impl<T: SubmissionClient> SubmissionClient for &T {
    async fn post(&self, url: &str, body: &[u8]) -> Result<LogResponse, TransportError> {
        (**self).post(url, body).await
    }
}

/// [`SubmissionClient`] backed by a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpSubmissionClient {
    client: reqwest::Client,
}

impl HttpSubmissionClient {
    /// Builds a client whose requests each time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user agent isn't a valid header value or the
    /// TLS backend fails to initialize.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("keep-alive"),
            HeaderValue::from_static(KEEP_ALIVE),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT).to_string())
            .build()?;
        Ok(Self { client })
    }
}

impl SubmissionClient for HttpSubmissionClient {
    async fn post(&self, url: &str, body: &[u8]) -> Result<LogResponse, TransportError> {
        let transport_error = |e: reqwest::Error| TransportError {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .post(url)
            .body(body.to_vec())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(transport_error)?.to_vec();
        log::debug!(url = url, status = status; "add-chain response");
        Ok(LogResponse {
            status,
            retry_after,
            body,
        })
    }
}
