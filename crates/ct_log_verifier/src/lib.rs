// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Client-side building blocks for submitting to [RFC 6962](https://datatracker.ietf.org/doc/html/rfc6962)
//! Certificate Transparency logs.
//!
//! - [`LogDescription`]: a configured log (URI and ECDSA P-256 key), with its
//!   log ID derived from the key.
//! - [`AddChainRequest`] and [`AddChainResponse`]: the `add-chain` wire format.
//! - [`verify_sct`]: reconstructs the signed `certificate_timestamp` structure
//!   for an `x509_entry` and checks the log's signature over it.
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod registry;
pub mod sct;
pub mod verify;

pub use error::{LogError, VerificationError, VerificationErrorKind};
pub use registry::{
    derive_log_id, normalize_log_uri, parse_logs, LogDescription, RawLogDescription,
};
pub use sct::{AddChainRequest, AddChainResponse, SignedCertificateTimestamp};
pub use verify::{encode_digitally_signed, signed_data, verify_sct, VerifiedSct};

/// A public key used for verifying SCT signatures.
/// CT logs use ECDSA P-256.
pub type VerifyingKey = p256::ecdsa::VerifyingKey;
