// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Configuration for the CT publisher, in a separate crate so it can be
//! shared between the binary, tests, and tooling that validates configs.

use ct_log_verifier::{parse_logs, LogDescription, LogError, RawLogDescription};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const CONFIG_SCHEMA: &str = include_str!("../config.schema.json");

/// Per-attempt timeout applied when the config doesn't set one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config does not match schema: {0}")]
    Schema(String),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("invalid log URI '{uri}': {reason}")]
    LogUri { uri: String, reason: String },
    #[error("invalid duration '{value}': {reason}")]
    Duration { value: String, reason: String },
    #[error("intermediateBundleFilename must not be empty")]
    MissingBundle,
    #[error("failed to read intermediate bundle {path}: {source}")]
    BundleRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode intermediate bundle {path}: {source}")]
    BundleDecode { path: PathBuf, source: der::Error },
}

/// The on-disk JSON form of the config.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    pub logging_level: Option<String>,
    pub logs: Vec<RawLogDescription>,
    pub submission_retries: u32,
    pub submission_backoff: String,
    pub intermediate_bundle_filename: String,
    pub request_timeout: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything the publisher needs to submit a certificate.
#[derive(Debug, Clone)]
pub struct PublicationConfig {
    pub logs: Vec<LogDescription>,
    /// Retries after the first attempt, so at most `max_retries + 1`
    /// requests are made to each log.
    pub max_retries: u32,
    pub backoff: Duration,
    /// DER intermediates appended to the leaf in every submitted chain.
    pub issuer_bundle: Vec<Vec<u8>>,
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
}

impl PublicationConfig {
    #[must_use]
    pub fn new(
        logs: Vec<LogDescription>,
        max_retries: u32,
        backoff: Duration,
        issuer_bundle: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            logs,
            max_retries,
            backoff,
            issuer_bundle,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub logging_level: Option<String>,
    pub publication: PublicationConfig,
}

impl AppConfig {
    /// Loads the config at `path`. A relative bundle filename is resolved
    /// against the config's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or isn't a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&contents, base_dir)
    }

    /// Parses and validates a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON doesn't match the schema, a log entry is
    /// invalid, a duration can't be parsed, or the bundle can't be loaded.
    pub fn from_json(contents: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let json: serde_json::Value = serde_json::from_str(contents)?;
        validate_schema(&json)?;
        let raw: RawConfig = serde_json::from_value(json)?;
        raw.resolve(base_dir)
    }
}

impl RawConfig {
    /// Validates the raw config and loads the bundle it references.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_json`].
    pub fn resolve(self, base_dir: &Path) -> Result<AppConfig, ConfigError> {
        for log in &self.logs {
            check_url(&log.uri)?;
        }
        let logs = parse_logs(&self.logs)?;
        let backoff = parse_duration(&self.submission_backoff)?;
        let request_timeout = self
            .request_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        if self.intermediate_bundle_filename.is_empty() {
            return Err(ConfigError::MissingBundle);
        }
        let issuer_bundle = load_issuer_bundle(&base_dir.join(&self.intermediate_bundle_filename))?;

        Ok(AppConfig {
            logging_level: self.logging_level,
            publication: PublicationConfig {
                logs,
                max_retries: self.submission_retries,
                backoff,
                issuer_bundle,
                request_timeout,
                user_agent: self.user_agent,
            },
        })
    }
}

/// Loads a PEM bundle of intermediates, returning their DER encodings in
/// file order.
///
/// # Errors
///
/// Returns an error if the file can't be read or holds malformed PEM.
pub fn load_issuer_bundle(path: &Path) -> Result<Vec<Vec<u8>>, ConfigError> {
    let pem = fs::read(path).map_err(|source| ConfigError::BundleRead {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle =
        x509_util::load_pem_bundle(&pem).map_err(|source| ConfigError::BundleDecode {
            path: path.to_path_buf(),
            source,
        })?;
    if bundle.is_empty() {
        log::warn!(
            "Intermediate bundle {} holds no certificates; submitting bare leaves",
            path.display()
        );
    }
    Ok(bundle)
}

/// Parses a positive duration such as `1s`, `500ms` or `1m 30s`.
///
/// # Errors
///
/// Returns [`ConfigError::Duration`] if the string isn't a duration or is
/// zero.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let err = |reason: String| ConfigError::Duration {
        value: value.to_string(),
        reason,
    };
    let duration = humantime::parse_duration(value.trim()).map_err(|e| err(e.to_string()))?;
    if duration.is_zero() {
        return Err(err("duration must be positive".to_string()));
    }
    Ok(duration)
}

fn validate_schema(json: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA)?;
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::Schema(e.to_string()))?;
    validator
        .validate(json)
        .map_err(|e| ConfigError::Schema(e.to_string()))
}

// Log URIs may omit the scheme, in which case https is assumed.
fn check_url(uri: &str) -> Result<(), ConfigError> {
    let err = |reason: &str| ConfigError::LogUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };
    let full = if uri.contains("://") {
        uri.to_string()
    } else {
        format!("https://{uri}")
    };
    let url = Url::parse(&full).map_err(|e| err(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(err("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(err("missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(err("unexpected query or fragment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::*;
    use p256::ecdsa::SigningKey;
    use p256::pkcs8::EncodePublicKey;
    use rcgen::{CertificateParams, KeyPair};
    use tempfile::TempDir;

    fn log_key() -> String {
        let signing_key = SigningKey::from_slice(&[7u8; 32]).unwrap();
        let der = signing_key
            .verifying_key()
            .to_public_key_der()
            .unwrap();
        BASE64_STANDARD.encode(der.as_bytes())
    }

    fn intermediate_pem() -> String {
        let params = CertificateParams::new(vec!["intermediate.example".to_string()]).unwrap();
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().pem()
    }

    fn config_json(logs: &str, backoff: &str, bundle: &str) -> String {
        format!(
            r#"{{
                "logs": {logs},
                "submissionRetries": 2,
                "submissionBackoff": "{backoff}",
                "intermediateBundleFilename": "{bundle}"
            }}"#
        )
    }

    fn one_log() -> String {
        format!(r#"[{{"uri": "ct.example.com/2025", "key": "{}"}}]"#, log_key())
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bundle.pem"), intermediate_pem()).unwrap();
        dir
    }

    #[test]
    fn test_from_json() {
        let dir = setup();
        let config =
            AppConfig::from_json(&config_json(&one_log(), "1s", "bundle.pem"), dir.path())
                .unwrap();
        let publication = config.publication;
        assert_eq!(publication.logs.len(), 1);
        assert_eq!(publication.logs[0].uri(), "ct.example.com/2025");
        assert_eq!(publication.max_retries, 2);
        assert_eq!(publication.backoff, Duration::from_secs(1));
        assert_eq!(publication.issuer_bundle.len(), 1);
        assert_eq!(publication.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(publication.user_agent.is_none());
        assert!(config.logging_level.is_none());
    }

    #[test]
    fn test_load_resolves_bundle_relative_to_config() {
        let dir = setup();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            format!(
                r#"{{
                    "loggingLevel": "debug",
                    "logs": {},
                    "submissionRetries": 0,
                    "submissionBackoff": "250ms",
                    "intermediateBundleFilename": "bundle.pem",
                    "requestTimeout": "5s",
                    "userAgent": "ct-publisher-test"
                }}"#,
                one_log()
            ),
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.logging_level.as_deref(), Some("debug"));
        assert_eq!(config.publication.max_retries, 0);
        assert_eq!(config.publication.backoff, Duration::from_millis(250));
        assert_eq!(config.publication.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.publication.user_agent.as_deref(),
            Some("ct-publisher-test")
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppConfig::load(&dir.path().join("nope.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_no_logs() {
        let dir = setup();
        let config =
            AppConfig::from_json(&config_json("[]", "1s", "bundle.pem"), dir.path()).unwrap();
        assert!(config.publication.logs.is_empty());
    }

    #[test]
    fn test_empty_bundle_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.pem"), "").unwrap();
        let config =
            AppConfig::from_json(&config_json(&one_log(), "1s", "empty.pem"), dir.path()).unwrap();
        assert!(config.publication.issuer_bundle.is_empty());
    }

    #[test]
    fn test_bundle_errors() {
        let dir = setup();
        assert!(matches!(
            AppConfig::from_json(&config_json(&one_log(), "1s", ""), dir.path()),
            Err(ConfigError::MissingBundle)
        ));
        assert!(matches!(
            AppConfig::from_json(&config_json(&one_log(), "1s", "missing.pem"), dir.path()),
            Err(ConfigError::BundleRead { .. })
        ));
        fs::write(
            dir.path().join("bad.pem"),
            "-----BEGIN CERTIFICATE-----\nnot base64\n-----END CERTIFICATE-----\n",
        )
        .unwrap();
        assert!(matches!(
            AppConfig::from_json(&config_json(&one_log(), "1s", "bad.pem"), dir.path()),
            Err(ConfigError::BundleDecode { .. })
        ));
    }

    #[test]
    fn test_parse_duration() {
        for (input, want) in [
            ("1s", Duration::from_secs(1)),
            ("500ms", Duration::from_millis(500)),
            ("1m30s", Duration::from_secs(90)),
            ("1m 30s", Duration::from_secs(90)),
            ("2h", Duration::from_secs(7200)),
            ("10us", Duration::from_micros(10)),
            ("250ns", Duration::from_nanos(250)),
            (" 2s ", Duration::from_secs(2)),
        ] {
            assert_eq!(parse_duration(input).unwrap(), want, "{input}");
        }
    }

    #[test]
    fn test_parse_duration_errors() {
        // Fractions aren't accepted; write `1h 30m` rather than `1.5h`.
        for input in ["", "5", "s", "soon", "1.5h", "-1s", "0s", "0ms 0s"] {
            assert!(
                matches!(parse_duration(input), Err(ConfigError::Duration { .. })),
                "{input} parsed"
            );
        }
    }

    #[test]
    fn test_bad_backoff() {
        let dir = setup();
        for backoff in ["soon", "0s", "10", "1.5s"] {
            assert!(
                matches!(
                    AppConfig::from_json(&config_json(&one_log(), backoff, "bundle.pem"), dir.path()),
                    Err(ConfigError::Duration { .. })
                ),
                "{backoff}"
            );
        }
    }

    #[test]
    fn test_schema_violations() {
        let dir = setup();
        for json in [
            // Negative retries.
            config_json(&one_log(), "1s", "bundle.pem").replace("\"submissionRetries\": 2", "\"submissionRetries\": -1"),
            // Missing required field.
            config_json(&one_log(), "1s", "bundle.pem").replace("\"submissionBackoff\": \"1s\",", ""),
            // Unknown field.
            config_json(&one_log(), "1s", "bundle.pem").replace("\"logs\"", "\"extra\": 1, \"logs\""),
            // Log entry missing its key.
            config_json(r#"[{"uri": "ct.example.com"}]"#, "1s", "bundle.pem"),
        ] {
            assert!(
                matches!(
                    AppConfig::from_json(&json, dir.path()),
                    Err(ConfigError::Schema(_))
                ),
                "{json}"
            );
        }
        assert!(matches!(
            AppConfig::from_json("{", dir.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_bad_log() {
        let dir = setup();
        let bad_key = r#"[{"uri": "ct.example.com", "key": "not base64!"}]"#;
        assert!(matches!(
            AppConfig::from_json(&config_json(bad_key, "1s", "bundle.pem"), dir.path()),
            Err(ConfigError::Log(LogError::Base64 { .. }))
        ));

        let key = log_key();
        let duplicate = format!(
            r#"[{{"uri": "ct.example.com", "key": "{key}"}}, {{"uri": "ct.example.com", "key": "{key}"}}]"#
        );
        assert!(matches!(
            AppConfig::from_json(&config_json(&duplicate, "1s", "bundle.pem"), dir.path()),
            Err(ConfigError::Log(LogError::DuplicateUri(_)))
        ));
    }

    #[test]
    fn test_check_url() {
        for ok in [
            "ct.example.com",
            "ct.example.com/logs/2025h1/",
            "https://ct.example.com",
            "http://localhost:8080",
        ] {
            assert!(check_url(ok).is_ok(), "{ok}");
        }
        for bad in ["ftp://ct.example.com", "https://", "ct.example.com/?q=1", "https://ct.example.com#x"] {
            assert!(matches!(check_url(bad), Err(ConfigError::LogUri { .. })), "{bad}");
        }
    }
}
