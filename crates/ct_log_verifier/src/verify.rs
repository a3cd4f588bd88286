// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! SCT signature verification per RFC 6962, for `x509_entry` submissions.
//! Supports ECDSA P-256 with SHA-256.

use std::io::Cursor;
use std::mem::size_of;

use crate::error::{VerificationError, VerificationErrorKind};
use crate::registry::LogDescription;
use crate::sct::SignedCertificateTimestamp;
use byteorder::{BigEndian, ReadBytesExt};
use p256::ecdsa::{signature::hazmat::PrehashVerifier, Signature as P256Signature};
use sha2::{Digest, Sha256};

// RFC 6962 constants for the signed data structure
const SCT_VERSION_V1: u8 = 0;
const SIGNATURE_TYPE_CERTIFICATE_TIMESTAMP: u8 = 0;
const LOG_ENTRY_TYPE_X509_ENTRY: [u8; 2] = [0, 0];

// RFC 5246 section 7.4.1.4.1
const HASH_ALGORITHM_SHA256: u8 = 4;
const SIGNATURE_ALGORITHM_ECDSA: u8 = 3;

/// An SCT whose signature has been checked against the log that issued it.
/// Only [`verify_sct`] can produce one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSct {
    sct: SignedCertificateTimestamp,
    certificate_serial: String,
}

impl VerifiedSct {
    #[must_use]
    pub fn sct(&self) -> &SignedCertificateTimestamp {
        &self.sct
    }

    /// The serial of the certificate the SCT was issued for, set locally.
    #[must_use]
    pub fn certificate_serial(&self) -> &str {
        &self.certificate_serial
    }

    #[must_use]
    pub fn into_inner(self) -> SignedCertificateTimestamp {
        self.sct
    }
}

/// Verifies an SCT returned from `add-chain` for the leaf `leaf_der`.
///
/// # Errors
///
/// Returns a [`VerificationError`] naming the log and certificate if the SCT
/// is malformed, was issued under a different log ID, or its signature does
/// not verify under the log's key.
pub fn verify_sct(
    sct: &SignedCertificateTimestamp,
    leaf_der: &[u8],
    serial: &str,
    log: &LogDescription,
) -> Result<VerifiedSct, VerificationError> {
    check_sct(sct, leaf_der, log).map_err(|kind| VerificationError {
        log_uri: log.uri().to_string(),
        serial: serial.to_string(),
        kind,
    })?;

    Ok(VerifiedSct {
        sct: sct.clone(),
        certificate_serial: serial.to_string(),
    })
}

fn check_sct(
    sct: &SignedCertificateTimestamp,
    leaf_der: &[u8],
    log: &LogDescription,
) -> Result<(), VerificationErrorKind> {
    if sct.log_id != log.raw_id() {
        return Err(VerificationErrorKind::LogIdMismatch);
    }
    let data = signed_data(sct.version, sct.timestamp, leaf_der, &sct.extensions)?;
    let signature = decode_digitally_signed(&sct.signature)?;
    verify_ecdsa_p256(log.public_key(), &data, signature)
}

/// Builds the `digitally-signed` input of an SCT for an `x509_entry`:
/// ```text
/// digitally-signed struct {
///     Version sct_version;
///     SignatureType signature_type = certificate_timestamp;
///     uint64 timestamp;
///     LogEntryType entry_type;
///     ASN.1Cert certificate<1..2^24-1>;
///     CtExtensions extensions<0..2^16-1>;
/// };
/// ```
///
/// # Errors
///
/// Returns an error if the version is not v1 or a field is too long for its
/// length prefix.
pub fn signed_data(
    version: u8,
    timestamp: u64,
    leaf_der: &[u8],
    extensions: &[u8],
) -> Result<Vec<u8>, VerificationErrorKind> {
    if version != SCT_VERSION_V1 {
        return Err(VerificationErrorKind::UnsupportedVersion(version));
    }

    // Certificate length must fit in 24 bits (3 bytes)
    let cert_len = leaf_der.len();
    if cert_len > 0xFF_FFFF {
        return Err(VerificationErrorKind::CertificateTooLarge(cert_len));
    }
    let cert_len_bytes = [(cert_len >> 16) as u8, (cert_len >> 8) as u8, cert_len as u8];

    // Extensions length must fit in 16 bits (2 bytes)
    let ext_len = extensions.len();
    if ext_len > 0xFFFF {
        return Err(VerificationErrorKind::ExtensionsTooLarge(ext_len));
    }
    let ext_len_bytes = [(ext_len >> 8) as u8, ext_len as u8];

    let mut data = Vec::with_capacity(
        2 // version + signature type
            + size_of::<u64>()
            + LOG_ENTRY_TYPE_X509_ENTRY.len()
            + cert_len_bytes.len() + cert_len
            + ext_len_bytes.len() + ext_len,
    );

    data.push(SCT_VERSION_V1);
    data.push(SIGNATURE_TYPE_CERTIFICATE_TIMESTAMP);
    data.extend_from_slice(&timestamp.to_be_bytes());
    data.extend_from_slice(&LOG_ENTRY_TYPE_X509_ENTRY);
    data.extend_from_slice(&cert_len_bytes);
    data.extend_from_slice(leaf_der);
    data.extend_from_slice(&ext_len_bytes);
    data.extend_from_slice(extensions);

    Ok(data)
}

/// Wraps a DER ECDSA signature in an RFC 5246 `digitally-signed` struct, as
/// logs return it in `add-chain` responses.
///
/// # Panics
///
/// Panics if the signature is longer than `u16::MAX` bytes, which a DER
/// P-256 signature never is.
#[must_use]
pub fn encode_digitally_signed(der_signature: &[u8]) -> Vec<u8> {
    let len = u16::try_from(der_signature.len()).expect("signature too long");
    let mut buffer = Vec::with_capacity(4 + der_signature.len());
    buffer.push(HASH_ALGORITHM_SHA256);
    buffer.push(SIGNATURE_ALGORITHM_ECDSA);
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(der_signature);
    buffer
}

/// Returns the DER signature inside a `digitally-signed` struct, rejecting
/// anything but SHA-256/ECDSA and trailing data.
fn decode_digitally_signed(bytes: &[u8]) -> Result<&[u8], VerificationErrorKind> {
    let mut s = Cursor::new(bytes);
    let (Ok(hash), Ok(signature), Ok(len)) = (
        s.read_u8(),
        s.read_u8(),
        s.read_u16::<BigEndian>(),
    ) else {
        return Err(VerificationErrorKind::MalformedSignature);
    };
    if hash != HASH_ALGORITHM_SHA256 || signature != SIGNATURE_ALGORITHM_ECDSA {
        return Err(VerificationErrorKind::UnsupportedAlgorithm { hash, signature });
    }
    let start = usize::try_from(s.position()).map_err(|_| VerificationErrorKind::MalformedSignature)?;
    let rest = &bytes[start..];
    if rest.len() != usize::from(len) {
        return Err(VerificationErrorKind::MalformedSignature);
    }
    Ok(rest)
}

fn verify_ecdsa_p256(
    key: &p256::ecdsa::VerifyingKey,
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), VerificationErrorKind> {
    let signature = P256Signature::from_der(signature_bytes)
        .map_err(|_| VerificationErrorKind::InvalidEncoding)?;
    let digest = Sha256::digest(message);
    key.verify_prehash(&digest, &signature)
        .map_err(|_| VerificationErrorKind::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::{
        ecdsa::{signature::Signer, SigningKey},
        pkcs8::EncodePublicKey,
    };
    use rand::rngs::OsRng;

    const LEAF: &[u8] = b"test certificate";
    const TIMESTAMP: u64 = 1_234_567_890_123;

    fn test_log(signing_key: &SigningKey) -> LogDescription {
        let der = signing_key.verifying_key().to_public_key_der().unwrap();
        LogDescription::from_der("https://log.example", der.as_bytes()).unwrap()
    }

    fn sign(signing_key: &SigningKey, data: &[u8]) -> Vec<u8> {
        let sig: P256Signature = signing_key.sign(data);
        encode_digitally_signed(sig.to_der().as_bytes())
    }

    fn signed_sct(signing_key: &SigningKey, leaf: &[u8]) -> SignedCertificateTimestamp {
        let data = signed_data(0, TIMESTAMP, leaf, &[]).unwrap();
        SignedCertificateTimestamp {
            version: 0,
            log_id: test_log(signing_key).raw_id().to_vec(),
            timestamp: TIMESTAMP,
            extensions: vec![],
            signature: sign(signing_key, &data),
        }
    }

    #[test]
    fn test_signed_data_structure() {
        let data = signed_data(0, TIMESTAMP, LEAF, &[]).unwrap();

        // - Byte 0: version (0)
        // - Byte 1: signature type (0)
        // - Bytes 2-9: timestamp (8 bytes BE)
        // - Bytes 10-11: entry type (0, 0)
        // - Bytes 12-14: cert length (3 bytes)
        // - Bytes 15-30: cert data (16 bytes)
        // - Bytes 31-32: extensions length (2 bytes)
        assert_eq!(data[0], 0);
        assert_eq!(data[1], 0);
        assert_eq!(&data[2..10], &TIMESTAMP.to_be_bytes());
        assert_eq!(&data[10..12], &[0, 0]);
        assert_eq!(&data[12..15], &[0, 0, 16]);
        assert_eq!(&data[15..31], LEAF);
        assert_eq!(&data[31..33], &[0, 0]);
        assert_eq!(data.len(), 33);
    }

    #[test]
    fn test_signed_data_rejects_version() {
        assert_eq!(
            signed_data(1, TIMESTAMP, LEAF, &[]),
            Err(VerificationErrorKind::UnsupportedVersion(1))
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let signing_key = SigningKey::random(&mut OsRng);
        let log = test_log(&signing_key);
        let sct = signed_sct(&signing_key, LEAF);

        let verified = verify_sct(&sct, LEAF, "0102", &log).unwrap();
        assert_eq!(verified.certificate_serial(), "0102");
        assert_eq!(verified.sct(), &sct);
    }

    #[test]
    fn test_flipped_signed_data_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let data = signed_data(0, TIMESTAMP, LEAF, &[]).unwrap();
        let sig: P256Signature = signing_key.sign(&data);
        let der = sig.to_der();

        verify_ecdsa_p256(signing_key.verifying_key(), &data, der.as_bytes()).unwrap();
        for i in 0..data.len() {
            let mut flipped = data.clone();
            flipped[i] ^= 0x01;
            assert!(
                verify_ecdsa_p256(signing_key.verifying_key(), &flipped, der.as_bytes()).is_err(),
                "flip at byte {i} verified"
            );
        }
    }

    #[test]
    fn test_flipped_signature_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let log = test_log(&signing_key);
        let sct = signed_sct(&signing_key, LEAF);

        for i in 0..sct.signature.len() {
            let mut flipped = sct.clone();
            flipped.signature[i] ^= 0x01;
            assert!(
                verify_sct(&flipped, LEAF, "0102", &log).is_err(),
                "flip at byte {i} verified"
            );
        }
    }

    #[test]
    fn test_tampered_fields_fail() {
        let signing_key = SigningKey::random(&mut OsRng);
        let log = test_log(&signing_key);
        let sct = signed_sct(&signing_key, LEAF);

        let mut other_leaf = LEAF.to_vec();
        other_leaf[0] ^= 0xFF;
        let err = verify_sct(&sct, &other_leaf, "0102", &log).unwrap_err();
        assert_eq!(err.kind, VerificationErrorKind::BadSignature);
        assert_eq!(err.log_uri, "https://log.example");
        assert_eq!(err.serial, "0102");

        let mut later = sct.clone();
        later.timestamp += 1;
        assert_eq!(
            verify_sct(&later, LEAF, "0102", &log).unwrap_err().kind,
            VerificationErrorKind::BadSignature
        );

        let mut with_ext = sct.clone();
        with_ext.extensions = vec![0];
        assert_eq!(
            verify_sct(&with_ext, LEAF, "0102", &log).unwrap_err().kind,
            VerificationErrorKind::BadSignature
        );

        let mut v2 = sct.clone();
        v2.version = 1;
        assert_eq!(
            verify_sct(&v2, LEAF, "0102", &log).unwrap_err().kind,
            VerificationErrorKind::UnsupportedVersion(1)
        );
    }

    #[test]
    fn test_wrong_log_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let other_key = SigningKey::random(&mut OsRng);
        let sct = signed_sct(&signing_key, LEAF);

        // Another log's key, even with the SCT claiming that log's ID.
        let other_log = test_log(&other_key);
        assert_eq!(
            verify_sct(&sct, LEAF, "0102", &other_log).unwrap_err().kind,
            VerificationErrorKind::LogIdMismatch
        );
        let mut relabeled = sct.clone();
        relabeled.log_id = other_log.raw_id().to_vec();
        assert_eq!(
            verify_sct(&relabeled, LEAF, "0102", &other_log)
                .unwrap_err()
                .kind,
            VerificationErrorKind::BadSignature
        );
    }

    #[test]
    fn test_digitally_signed_wrapper() {
        let wrapped = encode_digitally_signed(&[0x30, 0x01, 0x02]);
        assert_eq!(wrapped, [4, 3, 0, 3, 0x30, 0x01, 0x02]);
        assert_eq!(
            decode_digitally_signed(&wrapped).unwrap(),
            &[0x30, 0x01, 0x02]
        );

        assert_eq!(
            decode_digitally_signed(&[4, 3, 0]),
            Err(VerificationErrorKind::MalformedSignature)
        );
        assert_eq!(
            decode_digitally_signed(&[4, 3, 0, 2, 0x30]),
            Err(VerificationErrorKind::MalformedSignature)
        );
        assert_eq!(
            decode_digitally_signed(&[4, 3, 0, 0, 0x30]),
            Err(VerificationErrorKind::MalformedSignature)
        );
        assert_eq!(
            decode_digitally_signed(&[2, 3, 0, 0]),
            Err(VerificationErrorKind::UnsupportedAlgorithm {
                hash: 2,
                signature: 3
            })
        );
    }
}
