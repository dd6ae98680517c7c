use std::collections::BTreeMap;

use crate::select::pad_to_minimum;
use crate::{ChannelResult, RankedSource, SelectionLimits, SourceKind};

/// Replaces results with static backup URLs when the whole run found nothing.
///
/// Only applies when no channel has a probed source. Channels with backups get
/// them as unprobed `Fallback` entries, capped at the maximum and padded to
/// the minimum. Returns whether the backups were used.
pub fn apply_backup_sources(
    results: &mut [ChannelResult],
    backups: &BTreeMap<String, Vec<String>>,
    limits: &SelectionLimits,
) -> bool {
    if backups.is_empty() || results.iter().any(|r| r.probed_count() > 0) {
        return false;
    }

    let mut applied = false;
    for result in results.iter_mut() {
        let Some(urls) = backups.get(&result.channel.name) else {
            continue;
        };
        let mut sources: Vec<RankedSource> = Vec::new();
        for url in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            if sources.len() >= limits.max_count() {
                break;
            }
            if sources.iter().any(|s| s.url == url) {
                continue;
            }
            sources.push(RankedSource {
                url: url.to_string(),
                elapsed: None,
                rank: sources.len() + 1,
                kind: SourceKind::Fallback,
            });
        }
        if sources.is_empty() {
            continue;
        }
        pad_to_minimum(&mut sources, limits.min_count());
        result.sources = sources;
        applied = true;
    }
    applied
}
