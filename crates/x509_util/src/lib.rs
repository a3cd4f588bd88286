// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Utilities for X.509 operations.

use der::{Decode, Encode, Error as DerError};
use x509_cert::Certificate;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// Width of a rendered serial number, in hex digits.
const SERIAL_WIDTH: usize = 36;

/// Converts a vector of certificates into an array of DER-encoded certificates.
///
/// # Errors
///
/// Returns an error if any of the certificates cannot be DER-encoded.
pub fn certs_to_bytes(certs: &[Certificate]) -> Result<Vec<Vec<u8>>, DerError> {
    certs
        .iter()
        .map(der::Encode::to_der)
        .collect::<Result<_, _>>()
}

/// Decodes every certificate in a PEM bundle, in order, returning their DER
/// encodings. An empty input yields an empty bundle.
///
/// # Errors
///
/// Returns an error if the input contains malformed PEM or DER.
pub fn load_pem_bundle(input: &[u8]) -> Result<Vec<Vec<u8>>, DerError> {
    // load_pem_chain doesn't support an empty input:
    // https://github.com/RustCrypto/formats/pull/1965
    if input.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    certs_to_bytes(&Certificate::load_pem_chain(input)?)
}

/// Accepts either a single DER certificate or a PEM file holding one or more
/// certificates, returning the DER encodings.
///
/// # Errors
///
/// Returns an error if the input is neither.
pub fn decode_certificates(input: &[u8]) -> Result<Vec<Vec<u8>>, DerError> {
    let trimmed = input.trim_ascii_start();
    if trimmed.starts_with(PEM_PREFIX) {
        load_pem_bundle(trimmed)
    } else {
        Ok(vec![Certificate::from_der(input)?.to_der()?])
    }
}

/// Parses a DER-encoded leaf certificate.
///
/// # Errors
///
/// Returns an error if the input is not exactly one DER certificate.
pub fn parse_certificate(der: &[u8]) -> Result<Certificate, DerError> {
    Certificate::from_der(der)
}

/// Renders the certificate's serial number as zero-padded lowercase hex, the
/// form under which issued certificates are stored.
#[must_use]
pub fn serial_to_string(cert: &Certificate) -> String {
    let bytes = cert.tbs_certificate.serial_number.as_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    format!(
        "{:0>width$}",
        hex::encode(&bytes[first..]),
        width = SERIAL_WIDTH
    )
}
