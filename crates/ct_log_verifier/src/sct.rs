// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Data structures for the RFC 6962 [`add-chain`](https://datatracker.ietf.org/doc/html/rfc6962#section-4.1)
//! endpoint, and the SCT it returns.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Add-chain request. The leaf comes first, followed by the intermediates
/// needed to chain it to a root accepted by the log.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddChainRequest {
    #[serde_as(as = "Vec<Base64>")]
    pub chain: Vec<Vec<u8>>,
}

/// Add-chain response.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddChainResponse {
    pub sct_version: u8,
    #[serde_as(as = "Base64")]
    pub id: Vec<u8>,
    pub timestamp: u64,
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub extensions: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub signature: Vec<u8>,
}

/// A Signed Certificate Timestamp as returned by a log. Unverified until it
/// has been through [`verify_sct`](crate::verify_sct).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedCertificateTimestamp {
    pub version: u8,
    /// The log ID (SHA-256 hash of the log's public key).
    pub log_id: Vec<u8>,
    /// Timestamp in milliseconds since Unix epoch.
    pub timestamp: u64,
    pub extensions: Vec<u8>,
    /// An RFC 5246 `Digitally-signed` struct wrapping a DER ECDSA signature.
    pub signature: Vec<u8>,
}

impl From<AddChainResponse> for SignedCertificateTimestamp {
    fn from(resp: AddChainResponse) -> Self {
        Self {
            version: resp.sct_version,
            log_id: resp.id,
            timestamp: resp.timestamp,
            extensions: resp.extensions,
            signature: resp.signature,
        }
    }
}

impl From<&SignedCertificateTimestamp> for AddChainResponse {
    fn from(sct: &SignedCertificateTimestamp) -> Self {
        Self {
            sct_version: sct.version,
            id: sct.log_id.clone(),
            timestamp: sct.timestamp,
            extensions: sct.extensions.clone(),
            signature: sct.signature.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_add_chain_response() {
        let json = r#"{
            "sct_version": 0,
            "id": "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=",
            "timestamp": 1234567890123,
            "extensions": "",
            "signature": "BAMAAQI="
        }"#;
        let resp: AddChainResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, (0u8..32).collect::<Vec<_>>());
        assert!(resp.extensions.is_empty());
        assert_eq!(resp.signature, [4, 3, 0, 1, 2]);

        let sct = SignedCertificateTimestamp::from(resp);
        assert_eq!(sct.version, 0);
        assert_eq!(sct.timestamp, 1_234_567_890_123);
    }

    #[test]
    fn test_missing_extensions_default_to_empty() {
        let json = r#"{"sct_version": 0, "id": "", "timestamp": 1, "signature": ""}"#;
        let resp: AddChainResponse = serde_json::from_str(json).unwrap();
        assert!(resp.extensions.is_empty());
    }

    #[test]
    fn test_encode_add_chain_request() {
        let req = AddChainRequest {
            chain: vec![vec![1, 2, 3], vec![4, 5]],
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"chain":["AQID","BAU="]}"#
        );
    }
}
