// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Configured CT logs and their identities.

use std::collections::HashSet;

use crate::{error::LogError, VerifyingKey};
use base64::prelude::*;
use const_oid::db::rfc5912::ID_EC_PUBLIC_KEY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoRef;

/// Length of a base64-encoded SHA-256 digest.
const LOG_ID_B64_LEN: usize = 44;

/// A log entry as it appears in configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawLogDescription {
    pub uri: String,
    /// Base64 DER-encoded `SubjectPublicKeyInfo`.
    pub key: String,
}

/// A CT log to submit to. Immutable once constructed.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "RawLogDescription")]
pub struct LogDescription {
    id: String,
    raw_id: [u8; 32],
    uri: String,
    public_key: VerifyingKey,
}

impl LogDescription {
    /// Builds a log description from a URI and a base64 DER-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid base64, is not an ECDSA P-256
    /// `SubjectPublicKeyInfo`, or if the derived ID is malformed.
    pub fn new(uri: &str, key_b64: &str) -> Result<Self, LogError> {
        let key_der = BASE64_STANDARD
            .decode(key_b64.trim())
            .map_err(|source| LogError::Base64 {
                uri: uri.to_string(),
                source,
            })?;
        Self::from_der(uri, &key_der)
    }

    /// Builds a log description from a URI and a DER-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not an ECDSA P-256 `SubjectPublicKeyInfo`,
    /// or if the derived ID is malformed.
    pub fn from_der(uri: &str, key_der: &[u8]) -> Result<Self, LogError> {
        if uri.trim().is_empty() {
            return Err(LogError::EmptyUri);
        }
        let public_key = parse_verifying_key(uri, key_der)?;

        let raw_id: [u8; 32] = Sha256::digest(key_der).into();
        let id = BASE64_STANDARD.encode(raw_id);
        if id.len() != LOG_ID_B64_LEN {
            return Err(LogError::IdLength {
                uri: uri.to_string(),
                len: id.len(),
            });
        }

        Ok(Self {
            id,
            raw_id,
            uri: uri.to_string(),
            public_key,
        })
    }

    /// The base64 log ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The log ID as raw bytes, as it appears on the wire.
    #[must_use]
    pub fn raw_id(&self) -> &[u8; 32] {
        &self.raw_id
    }

    /// The configured base URI, exactly as given.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }
}

impl TryFrom<RawLogDescription> for LogDescription {
    type Error = LogError;

    fn try_from(raw: RawLogDescription) -> Result<Self, Self::Error> {
        Self::new(&raw.uri, &raw.key)
    }
}

/// Returns the base64 SHA-256 digest of a DER-encoded public key, which is the
/// log ID defined in RFC 6962 section 3.2.
#[must_use]
pub fn derive_log_id(key_der: &[u8]) -> String {
    BASE64_STANDARD.encode(Sha256::digest(key_der))
}

/// The canonical form of a log's base URI. https is assumed when no scheme is
/// given, and trailing slashes are dropped. Two URIs name the same log exactly
/// when their canonical forms are equal.
#[must_use]
pub fn normalize_log_uri(uri: &str) -> String {
    let base = uri.trim().trim_end_matches('/');
    if base.starts_with("https://") || base.starts_with("http://") {
        base.to_string()
    } else {
        format!("https://{base}")
    }
}

/// Parses every configured log. Fails on the first malformed entry, or if two
/// entries name the same log, since receipts are keyed by log.
///
/// # Errors
///
/// Returns the first [`LogError`] encountered.
pub fn parse_logs(raw: &[RawLogDescription]) -> Result<Vec<LogDescription>, LogError> {
    let mut seen = HashSet::new();
    let mut logs = Vec::with_capacity(raw.len());
    for entry in raw {
        if !seen.insert(normalize_log_uri(&entry.uri)) {
            return Err(LogError::DuplicateUri(entry.uri.clone()));
        }
        logs.push(LogDescription::new(&entry.uri, &entry.key)?);
    }
    log::debug!("Parsed {} CT log descriptions", logs.len());
    Ok(logs)
}

fn parse_verifying_key(uri: &str, key_der: &[u8]) -> Result<VerifyingKey, LogError> {
    let spki = SubjectPublicKeyInfoRef::try_from(key_der).map_err(|e| LogError::Key {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(LogError::Key {
            uri: uri.to_string(),
            reason: format!("unsupported public key type {}", spki.algorithm.oid),
        });
    }

    VerifyingKey::try_from(spki).map_err(|e| LogError::Key {
        uri: uri.to_string(),
        reason: format!("not a valid P-256 key: {e}"),
    })
}
