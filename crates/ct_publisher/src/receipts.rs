// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Persistence of verified SCTs.

use ct_log_verifier::{normalize_log_uri, VerifiedSct};
use parking_lot::Mutex;
use std::collections::{hash_map::Entry, HashMap};
use thiserror::Error;

/// Proof that a log accepted a certificate, keyed by serial and log. Log
/// URIs are compared in their [`normalize_log_uri`] form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    log_uri: String,
    sct: VerifiedSct,
}

impl Receipt {
    #[must_use]
    pub fn new(log_uri: &str, sct: VerifiedSct) -> Self {
        Self {
            log_uri: log_uri.to_string(),
            sct,
        }
    }

    #[must_use]
    pub fn serial(&self) -> &str {
        self.sct.certificate_serial()
    }

    #[must_use]
    pub fn log_uri(&self) -> &str {
        &self.log_uri
    }

    #[must_use]
    pub fn sct(&self) -> &VerifiedSct {
        &self.sct
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// A receipt for this certificate and log already exists.
    #[error("duplicate receipt")]
    Duplicate,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Stores receipts. Implementations handle their own concurrency control;
/// `add` may be called concurrently for different logs.
#[allow(async_fn_in_trait)]
pub trait ReceiptStore {
    async fn add(&self, receipt: Receipt) -> Result<(), ReceiptError>;
}

impl<T: ReceiptStore> ReceiptStore for &T {
    async fn add(&self, receipt: Receipt) -> Result<(), ReceiptError> {
        (**self).add(receipt).await
    }
}

/// An in-process [`ReceiptStore`], keyed by `(serial, normalized log URI)`.
#[derive(Debug, Default)]
pub struct MemoryReceiptStore {
    receipts: Mutex<HashMap<(String, String), Receipt>>,
}

impl MemoryReceiptStore {
    #[must_use]
    pub fn get(&self, serial: &str, log_uri: &str) -> Option<Receipt> {
        self.receipts
            .lock()
            .get(&(serial.to_string(), normalize_log_uri(log_uri)))
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.lock().is_empty()
    }
}

impl ReceiptStore for MemoryReceiptStore {
    async fn add(&self, receipt: Receipt) -> Result<(), ReceiptError> {
        let key = (receipt.serial().to_string(), normalize_log_uri(&receipt.log_uri));
        match self.receipts.lock().entry(key) {
            Entry::Occupied(_) => Err(ReceiptError::Duplicate),
            Entry::Vacant(entry) => {
                entry.insert(receipt);
                Ok(())
            }
        }
    }
}
