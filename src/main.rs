// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Authorization Tester Worker
 * Reads captured requests as NDJSON and replays every identity swap they enable
 *
 * © 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lonkero_authz::bus::{run_tester_until, ObservationBus, ObservedRequest};
use lonkero_authz::config::{AuthzConfig, ConfigValidator};
use lonkero_authz::tester::AuthzTester;

#[derive(Parser)]
#[command(name = "lonkero-authz")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Replays captured traffic across identities to find broken access control", long_about = None)]
struct Cli {
    /// Configuration file path (yaml, toml or json)
    #[arg(short, long, env = "AUTHZ_CONFIG")]
    config: Option<PathBuf>,

    /// NDJSON file of observed requests (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Webhook receiving every finding as JSON
    #[arg(short, long)]
    webhook: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AuthzConfig::load(cli.config.as_deref())?;
    if let Some(webhook) = cli.webhook {
        config.reporting.webhook_url = Some(webhook);
        ConfigValidator::validate_authz_config(&config)?;
    }

    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.observability.log_level.clone()
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Authorization Tester");
    info!(
        "HTTP configuration: timeout={}s, retries={}, redirects={}",
        config.http.request_timeout_secs, config.http.max_retries, config.http.max_redirects
    );

    let mut tester = AuthzTester::from_config(&config)?;
    let bus = ObservationBus::new();
    let mut subscription = bus.subscribe();
    let (stop_tx, stop_rx) = watch::channel(false);

    let worker = tokio::spawn(async move {
        let outcome = run_tester_until(&mut tester, &mut subscription, stop_rx).await;
        (tester, outcome)
    });

    tokio::select! {
        result = publish_events(cli.input, &bus) => {
            let published = result?;
            info!("Input exhausted after {} event(s)", published);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, no further events will be processed");
            // The worker may already be gone; nothing to stop then
            let _ = stop_tx.send(true);
        }
    }

    // Once input is exhausted the tester drains what is queued and stops
    drop(bus);
    let (tester, outcome) = worker.await.context("Tester task panicked")?;

    let findings = tester.findings();
    let sent = findings.iter().filter(|r| r.was_sent()).count();
    let candidates: Vec<_> = findings.iter().filter(|r| r.is_escalation_candidate()).collect();

    for result in &candidates {
        println!("{}", serde_json::to_string(&result.to_finding())?);
    }

    info!(
        "Summary: {} identities, {} actions, {} tests planned, {} sent, {} granted",
        tester.graph().identity_count(),
        tester.templates().len(),
        findings.len(),
        sent,
        candidates.len()
    );

    tester.shutdown();

    if let Err(e) = outcome {
        error!("Tester error: {}", e);
        std::process::exit(1);
    }

    info!("Authorization Tester stopped");
    Ok(())
}

async fn publish_events(input: Option<PathBuf>, bus: &ObservationBus) -> Result<usize> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open input file: {:?}", path))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = reader.lines();
    let mut published = 0;
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ObservedRequest>(&line) {
            Ok(event) => {
                bus.publish(event);
                published += 1;
            }
            Err(e) => warn!("Skipping malformed event on line {}: {}", line_number, e),
        }
    }

    Ok(published)
}
