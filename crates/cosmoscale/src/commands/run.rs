use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, ensure};
use tokio::sync::watch;
use tracing::{info, warn};

use cosmoscale_autoscale::{Collaborators, Orchestrator, PassOptions, PassReport};
use cosmoscale_azure::AzureBackend;
use cosmoscale_core::Settings;

pub async fn run(config: &Path, dry_run: bool, concurrency: Option<usize>) -> anyhow::Result<()> {
    let settings = Settings::from_file(config)
        .with_context(|| format!("loading {}", config.display()))?;

    let mut options = PassOptions::from_settings(&settings)?;
    if dry_run {
        options.dry_run = true;
    }
    if let Some(n) = concurrency {
        ensure!(n >= 1, "--concurrency must be at least 1");
        options.concurrency = n;
    }

    let backend = Arc::new(AzureBackend::from_settings(&settings, options.call_timeout)?);
    let orchestrator = Orchestrator::new(
        settings.collections(),
        Collaborators::from_backend(backend),
        options,
    );
    info!(
        collections = orchestrator.collections().len(),
        concurrency = orchestrator.options().concurrency,
        dry_run = orchestrator.options().dry_run,
        "starting pass"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling pass");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = orchestrator.run_pass(shutdown_rx).await;
    print!("{}", format_report(&report));
    info!(
        resized = report.resized(),
        failed = report.failed(),
        "pass finished"
    );
    Ok(())
}

/// One line per collection followed by a totals line.
pub fn format_report(report: &PassReport) -> String {
    let mut out = String::new();
    for entry in &report.resources {
        let _ = writeln!(out, "{}: {}", entry.resource, entry.outcome);
    }
    let _ = writeln!(
        out,
        "{} collections: {} resized, {} unchanged, {} skipped, {} failed, {} cancelled",
        report.resources.len(),
        report.resized(),
        report.unchanged(),
        report.skipped(),
        report.failed(),
        report.cancelled(),
    );
    out
}
