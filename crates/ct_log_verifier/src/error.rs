// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use thiserror::Error;

/// An error constructing a [`LogDescription`](crate::LogDescription) from
/// configuration.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("log description has an empty URI")]
    EmptyUri,

    #[error("invalid log key for '{uri}': invalid base64: {source}")]
    Base64 {
        uri: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid log key for '{uri}': {reason}")]
    Key { uri: String, reason: String },

    #[error("invalid log ID length [{len}] for '{uri}'")]
    IdLength { uri: String, len: usize },

    #[error("log '{0}' is configured more than once")]
    DuplicateUri(String),
}

/// An SCT that failed verification against the log that issued it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("SCT from log {log_uri} for certificate {serial} failed verification: {kind}")]
pub struct VerificationError {
    pub log_uri: String,
    pub serial: String,
    pub kind: VerificationErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationErrorKind {
    #[error("unsupported SCT version {0}")]
    UnsupportedVersion(u8),

    #[error("log ID does not match the configured log")]
    LogIdMismatch,

    #[error("certificate too large: {0} bytes (max 16MB)")]
    CertificateTooLarge(usize),

    #[error("extensions too large: {0} bytes (max 64KB)")]
    ExtensionsTooLarge(usize),

    #[error("malformed digitally-signed struct")]
    MalformedSignature,

    #[error("unsupported signature algorithm (hash {hash}, signature {signature})")]
    UnsupportedAlgorithm { hash: u8, signature: u8 },

    #[error("invalid ECDSA signature encoding")]
    InvalidEncoding,

    #[error("ECDSA signature verification failed")]
    BadSignature,
}
