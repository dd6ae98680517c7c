use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tvsource_core::{select, Channel, ChannelResult, ProbeResult, SelectionLimits};

use engine_logging::{engine_error, engine_info};

use crate::{Discoverer, EngineEvent, Prober, ProgressSink};

pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum number of probes in flight across all channels.
    pub workers: usize,
    pub limits: SelectionLimits,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            limits: SelectionLimits::default(),
        }
    }
}

struct ProbeJob {
    channel_idx: usize,
    order: usize,
    url: String,
}

/// Discover, probe and rank sources for a set of channels.
///
/// Discovery runs channel by channel with each keyword searched in turn.
/// Probes for every candidate of every channel then share one bounded pool.
pub struct Harvester {
    discoverer: Arc<dyn Discoverer>,
    prober: Arc<dyn Prober>,
    settings: PipelineSettings,
}

impl Harvester {
    pub fn new(
        discoverer: Arc<dyn Discoverer>,
        prober: Arc<dyn Prober>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            discoverer,
            prober,
            settings,
        }
    }

    /// Results come back in `channels` order, one per channel.
    pub async fn run(&self, channels: &[Channel], sink: &dyn ProgressSink) -> Vec<ChannelResult> {
        let mut jobs = Vec::new();
        for (channel_idx, channel) in channels.iter().enumerate() {
            let discovery = self.discoverer.discover(channel, sink).await;
            jobs.extend(
                discovery
                    .candidates
                    .into_iter()
                    .enumerate()
                    .map(|(order, candidate)| ProbeJob {
                        channel_idx,
                        order,
                        url: candidate.url,
                    }),
            );
        }

        engine_info!(
            "probing {} candidate(s) with {} worker(s)",
            jobs.len(),
            self.settings.workers.max(1)
        );
        let probed = self.probe_all(jobs, channels, sink).await;

        let mut per_channel: Vec<Vec<(usize, ProbeResult)>> = vec![Vec::new(); channels.len()];
        for (channel_idx, order, result) in probed {
            per_channel[channel_idx].push((order, result));
        }

        channels
            .iter()
            .zip(per_channel)
            .map(|(channel, mut results)| {
                // Completion order is arbitrary; ties must fall back to discovery order.
                results.sort_by_key(|(order, _)| *order);
                let results: Vec<ProbeResult> = results.into_iter().map(|(_, r)| r).collect();
                let sources = select(&results, &self.settings.limits);
                let ranked = ChannelResult::new(channel.clone(), sources);
                let valid = ranked.valid_count();
                engine_info!(
                    "[{}] {} of {} candidate(s) usable",
                    channel.name,
                    valid,
                    results.len()
                );
                sink.emit(EngineEvent::ChannelRanked {
                    channel: channel.name.clone(),
                    valid,
                });
                ranked
            })
            .collect()
    }

    async fn probe_all(
        &self,
        jobs: Vec<ProbeJob>,
        channels: &[Channel],
        sink: &dyn ProgressSink,
    ) -> Vec<(usize, usize, ProbeResult)> {
        let mut pending = stream::iter(jobs)
            .map(|job| {
                let prober = Arc::clone(&self.prober);
                async move {
                    let url = job.url.clone();
                    // A panicking probe must not take down the other channels.
                    let handle = tokio::spawn(async move { prober.probe(&url).await });
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(err) => {
                            engine_error!("probe task for {} aborted: {}", job.url, err);
                            ProbeResult::unreachable(job.url.clone())
                        }
                    };
                    (job.channel_idx, job.order, result)
                }
            })
            .buffer_unordered(self.settings.workers.max(1));

        let mut probed = Vec::new();
        while let Some((channel_idx, order, result)) = pending.next().await {
            sink.emit(EngineEvent::ProbeCompleted {
                channel: channels[channel_idx].name.clone(),
                result: result.clone(),
            });
            probed.push((channel_idx, order, result));
        }
        probed
    }
}

