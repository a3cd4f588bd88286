// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Submits certificates to the CT logs named in a config file and prints one
//! line per (certificate, log) outcome.

use anyhow::{bail, Context};
use clap::Parser;
use ct_publisher::obs::logs;
use ct_publisher::{
    cancellation, HttpSubmissionClient, MemoryReceiptStore, Metrics, Publisher,
};
use ct_publisher_config::AppConfig;
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Publisher config file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Print metrics in the Prometheus text format when done
    #[arg(long)]
    print_metrics: bool,

    /// Certificates to submit, each a DER file or a PEM file of one or more
    /// certificates
    #[arg(required = true)]
    certificates: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    logs::init(config.logging_level.as_deref());

    let publication = Arc::new(config.publication);
    if publication.logs.is_empty() {
        log::warn!("No logs configured; nothing will be submitted");
    }
    let client = HttpSubmissionClient::new(
        publication.request_timeout,
        publication.user_agent.as_deref(),
    )
    .context("building HTTP client")?;
    let metrics = Metrics::new(&Registry::new()).context("registering metrics")?;
    // Receipts are held in memory for the lifetime of the run.
    let publisher = Publisher::new(publication, client, MemoryReceiptStore::default(), metrics);

    let (handle, cancel) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, canceling outstanding submissions");
            handle.cancel();
        }
    });

    let mut failures = 0usize;
    for path in &args.certificates {
        let input = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let certs = x509_util::decode_certificates(&input)
            .with_context(|| format!("decoding {}", path.display()))?;
        for der in certs {
            match publisher.submit(&der, &cancel).await {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        println!(
                            "{}\t{}\t{}\t{}",
                            path.display(),
                            outcome.log_uri,
                            outcome.retries,
                            outcome.status
                        );
                        if !outcome.is_success() {
                            failures += 1;
                        }
                    }
                }
                Err(e) => {
                    log::error!("{}: {e}", path.display());
                    failures += 1;
                }
            }
        }
    }
    log::info!(receipts = publisher.store().len(); "Done");

    if args.print_metrics {
        print!("{}", publisher.metrics().encode()?);
    }
    if failures > 0 {
        bail!("{failures} submissions did not complete");
    }
    Ok(())
}
