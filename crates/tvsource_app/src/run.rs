use std::sync::Arc;

use anyhow::Context;
use chrono::Local;

use engine_logging::{engine_info, engine_warn};
use tvsource_core::{apply_backup_sources, Channel, SelectionLimits};
use tvsource_engine::{
    build_client, write_outputs, ExportOptions, ExportSummary, Harvester, HttpProber, OutputDir,
    PageFetcher, SearchDiscoverer, UrlExtractor,
};

use crate::config::AppConfig;
use crate::progress::LogProgress;

/// One full discover, probe, rank and export pass.
///
/// Channels without sources are not an error; only setup and write failures are.
pub async fn run(
    config: &AppConfig,
    channels: &[Channel],
    limits: SelectionLimits,
) -> anyhow::Result<ExportSummary> {
    // Fail on an unusable output directory before any network traffic.
    let out_dir = OutputDir::prepare(&config.output_dir).context("preparing output directory")?;

    let client = build_client(&config.client_settings()).context("building HTTP client")?;
    let pages = PageFetcher::new(client.clone(), config.page_settings());
    let extractor = UrlExtractor::with_settings(config.extractor_settings());
    let discoverer = SearchDiscoverer::new(pages, extractor, config.discovery_settings());
    let prober = HttpProber::new(client, config.probe_settings());
    let harvester = Harvester::new(
        Arc::new(discoverer),
        Arc::new(prober),
        config.pipeline_settings(limits),
    );

    engine_info!(
        "processing {} channel(s) against {} search endpoint(s)",
        channels.len(),
        config.search_urls.len()
    );
    let progress = LogProgress::default();
    let mut results = harvester.run(channels, &progress).await;
    let (probed, reachable) = progress.probe_counts();
    engine_info!("{} of {} probe(s) succeeded", reachable, probed);

    if apply_backup_sources(&mut results, &config.backup_sources, &limits) {
        engine_warn!("no live sources found, falling back to the configured backup URLs");
    }

    let options = ExportOptions {
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ..ExportOptions::default()
    };
    let exported = write_outputs(&out_dir, &results, &options).context("writing playlists")?;
    for path in &exported.files {
        engine_info!("wrote {}", path.display());
    }
    Ok(exported)
}
