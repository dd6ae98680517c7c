use std::sync::atomic::{AtomicUsize, Ordering};

use engine_logging::{engine_debug, engine_info, engine_warn};
use tvsource_engine::{EngineEvent, ProgressSink};

/// Reports engine progress as log lines.
#[derive(Debug, Default)]
pub struct LogProgress {
    probes_done: AtomicUsize,
    probes_ok: AtomicUsize,
}

impl LogProgress {
    /// `(completed, successful)` probe counts so far.
    pub fn probe_counts(&self) -> (usize, usize) {
        (
            self.probes_done.load(Ordering::Relaxed),
            self.probes_ok.load(Ordering::Relaxed),
        )
    }
}

impl ProgressSink for LogProgress {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::DiscoveryStarted { channel, keywords } => {
                engine_info!("[{}] searching with {} keyword(s)", channel, keywords);
            }
            EngineEvent::SearchFailed {
                channel,
                search_url,
                kind,
            } => {
                engine_warn!("[{}] search failed ({}): {}", channel, kind, search_url);
            }
            EngineEvent::CandidatesFound { channel, count } => {
                engine_info!("[{}] {} candidate URL(s)", channel, count);
            }
            EngineEvent::ProbeCompleted { channel, result } => {
                let done = self.probes_done.fetch_add(1, Ordering::Relaxed) + 1;
                match result.latency_ms() {
                    Some(ms) if result.success => {
                        self.probes_ok.fetch_add(1, Ordering::Relaxed);
                        engine_info!("#{} [{}] ok {} ms {}", done, channel, ms, result.url);
                    }
                    _ => engine_debug!("#{} [{}] unreachable {}", done, channel, result.url),
                }
            }
            EngineEvent::ChannelRanked { channel, valid } => {
                if valid == 0 {
                    engine_warn!("[{}] no usable sources", channel);
                } else {
                    engine_info!("[{}] {} usable source(s)", channel, valid);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tvsource_core::ProbeResult;

    use super::*;

    #[test]
    fn probe_events_are_counted() {
        engine_logging::initialize_for_tests();
        let progress = LogProgress::default();
        progress.emit(EngineEvent::ProbeCompleted {
            channel: "CCTV1".into(),
            result: ProbeResult::reachable("http://a.example/1.m3u8", Duration::from_millis(40)),
        });
        progress.emit(EngineEvent::ProbeCompleted {
            channel: "CCTV1".into(),
            result: ProbeResult::unreachable("http://b.example/1.m3u8"),
        });
        progress.emit(EngineEvent::ChannelRanked {
            channel: "CCTV1".into(),
            valid: 1,
        });

        assert_eq!(progress.probe_counts(), (2, 1));
    }
}
