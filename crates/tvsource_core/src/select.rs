use std::fmt;
use std::time::Duration;

use crate::{Channel, ProbeResult};

pub const DEFAULT_MIN_COUNT: usize = 2;
pub const DEFAULT_MAX_COUNT: usize = 8;

/// Inclusive bounds on how many sources a channel reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    min_count: usize,
    max_count: usize,
    max_latency: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitsError {
    ZeroMaximum,
    MinimumAboveMaximum { min_count: usize, max_count: usize },
}

impl fmt::Display for LimitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitsError::ZeroMaximum => write!(f, "maximum source count must be at least 1"),
            LimitsError::MinimumAboveMaximum {
                min_count,
                max_count,
            } => write!(
                f,
                "minimum source count {min_count} exceeds maximum {max_count}"
            ),
        }
    }
}

impl std::error::Error for LimitsError {}

impl SelectionLimits {
    pub fn new(min_count: usize, max_count: usize) -> Result<Self, LimitsError> {
        if max_count == 0 {
            return Err(LimitsError::ZeroMaximum);
        }
        if min_count > max_count {
            return Err(LimitsError::MinimumAboveMaximum {
                min_count,
                max_count,
            });
        }
        Ok(Self {
            min_count,
            max_count,
            max_latency: None,
        })
    }

    /// Successful probes slower than `ceiling` are treated as unusable.
    pub fn with_max_latency(mut self, ceiling: Option<Duration>) -> Self {
        self.max_latency = ceiling;
        self
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn max_latency(&self) -> Option<Duration> {
        self.max_latency
    }
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            min_count: DEFAULT_MIN_COUNT,
            max_count: DEFAULT_MAX_COUNT,
            max_latency: None,
        }
    }
}

/// Where a ranked entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Measured by a successful probe in this run.
    Probed,
    /// Static backup URL, not probed.
    Fallback,
    /// Padding entry with an empty URL.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSource {
    pub url: String,
    pub elapsed: Option<Duration>,
    /// 1-based position within the channel's list.
    pub rank: usize,
    pub kind: SourceKind,
}

impl RankedSource {
    pub fn placeholder(rank: usize) -> Self {
        Self {
            url: String::new(),
            elapsed: None,
            rank,
            kind: SourceKind::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.url.is_empty()
    }

    pub fn latency_ms(&self) -> Option<u128> {
        self.elapsed.map(|d| d.as_millis())
    }
}

/// A channel with its final ordered list of sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResult {
    pub channel: Channel,
    pub sources: Vec<RankedSource>,
}

impl ChannelResult {
    pub fn new(channel: Channel, sources: Vec<RankedSource>) -> Self {
        Self { channel, sources }
    }

    /// Entries that carry a real URL.
    pub fn playable(&self) -> impl Iterator<Item = &RankedSource> {
        self.sources.iter().filter(|s| !s.is_placeholder())
    }

    pub fn valid_count(&self) -> usize {
        self.playable().count()
    }

    pub fn probed_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.kind == SourceKind::Probed)
            .count()
    }
}

/// Filters to successful probes, sorts by latency, truncates to the maximum
/// and pads with placeholders up to the minimum.
///
/// The sort is stable, so equal latencies keep the order of `probe_results`
/// (discovery order). URLs are never altered.
pub fn select(probe_results: &[ProbeResult], limits: &SelectionLimits) -> Vec<RankedSource> {
    let mut reachable: Vec<(&str, Duration)> = probe_results
        .iter()
        .filter(|r| r.success && !r.url.is_empty())
        .filter_map(|r| r.elapsed.map(|elapsed| (r.url.as_str(), elapsed)))
        .filter(|(_, elapsed)| limits.max_latency.is_none_or(|ceiling| *elapsed <= ceiling))
        .collect();
    reachable.sort_by_key(|(_, elapsed)| *elapsed);
    reachable.truncate(limits.max_count);

    let mut ranked: Vec<RankedSource> = reachable
        .into_iter()
        .enumerate()
        .map(|(idx, (url, elapsed))| RankedSource {
            url: url.to_string(),
            elapsed: Some(elapsed),
            rank: idx + 1,
            kind: SourceKind::Probed,
        })
        .collect();
    pad_to_minimum(&mut ranked, limits.min_count);
    ranked
}

pub(crate) fn pad_to_minimum(sources: &mut Vec<RankedSource>, min_count: usize) {
    while sources.len() < min_count {
        let rank = sources.len() + 1;
        sources.push(RankedSource::placeholder(rank));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_reject_inverted_bounds() {
        assert_eq!(
            SelectionLimits::new(3, 2),
            Err(LimitsError::MinimumAboveMaximum {
                min_count: 3,
                max_count: 2
            })
        );
        assert_eq!(SelectionLimits::new(0, 0), Err(LimitsError::ZeroMaximum));
        assert!(SelectionLimits::new(0, 1).is_ok());
    }

    #[test]
    fn padding_continues_rank_numbering() {
        let mut sources = vec![RankedSource {
            url: "http://a.example/1.m3u8".into(),
            elapsed: Some(Duration::from_millis(5)),
            rank: 1,
            kind: SourceKind::Probed,
        }];
        pad_to_minimum(&mut sources, 3);
        let ranks: Vec<_> = sources.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(sources[1].is_placeholder());
        assert_eq!(sources[2].kind, SourceKind::Placeholder);
    }
}
