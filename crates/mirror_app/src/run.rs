use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use mirror_core::{build_targets, parse_target_list, PathResolver, Report, RunState, TargetUrl};
use mirror_engine::{
    clean_output_dir, ensure_output_dir, AssetWriter, BrowserHost, BrowserSession, DirectFetcher,
    RenderedFetcher, Scheduler, SessionStore, TieredRetriever,
};
use mirror_logging::{mirror_info, mirror_warn};

use crate::config::Cli;
use crate::persistence::{load_report, save_report, PersistedReport, RunDelta};

/// Read targets, mirror them, print and persist the report.
pub(crate) async fn execute(cli: &Cli) -> Result<Report> {
    let started_at = Local::now();

    let raw = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading target list {}", cli.input.display()))?;
    let targets = build_targets(&cli.base_url, parse_target_list(&raw));
    for rejected in &targets.rejected {
        mirror_warn!("Skipping target: {}", rejected);
    }
    mirror_info!(
        "{} target(s) from {} ({} duplicate(s) dropped)",
        targets.targets.len(),
        cli.input.display(),
        targets.duplicates
    );

    // Read before cleaning; the report lives in the output directory.
    let previous = load_report(&cli.output);
    if cli.clean {
        clean_output_dir(&cli.output)
            .with_context(|| format!("cleaning {}", cli.output.display()))?;
    }
    ensure_output_dir(&cli.output)
        .with_context(|| format!("preparing output directory {}", cli.output.display()))?;

    let host = BrowserHost::launch(&cli.browser_settings())
        .await
        .context("launching browser")?;
    let mirrored = mirror(cli, &host, &targets.targets).await;
    host.shutdown().await;
    let state = mirrored?;

    let report = Report::from_state(&state);
    println!("{report}");
    let persisted = PersistedReport::from_state(&state, started_at, Local::now());
    if let Some(previous) = &previous {
        RunDelta::between(previous, &persisted).log(previous);
    }
    save_report(&cli.output, &persisted);
    Ok(report)
}

/// Everything holding the browser lives in here so shutdown can reclaim it.
async fn mirror(cli: &Cli, host: &BrowserHost, targets: &[TargetUrl]) -> Result<RunState> {
    let browser = host.browser();

    let source = Arc::new(BrowserSession::new(browser.clone(), cli.session_settings()));
    let session = SessionStore::bootstrap(source)
        .await
        .with_context(|| format!("establishing session with {}", cli.base_url))?;

    let direct = DirectFetcher::new(cli.fetch_settings()).context("building http client")?;
    let rendered = RenderedFetcher::new(browser, cli.fetch_settings(), cli.render_settings());
    let retriever = TieredRetriever::new(cli.statics(), Arc::new(direct), Arc::new(rendered));

    let scheduler = Scheduler::new(
        Arc::new(retriever),
        Arc::new(session),
        AssetWriter::new(PathResolver::new(&cli.output)),
        cli.scheduler_settings(),
    );
    Ok(scheduler.run(targets).await)
}
