use crate::ChannelResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCount {
    pub name: String,
    pub group: String,
    pub sources: usize,
}

/// Aggregate counts over one run, used for the final report and STATS.md.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub channel_count: usize,
    pub channels_with_sources: usize,
    pub total_sources: usize,
    pub per_channel: Vec<ChannelCount>,
}

impl RunSummary {
    pub fn from_results(results: &[ChannelResult]) -> Self {
        let per_channel: Vec<ChannelCount> = results
            .iter()
            .map(|r| ChannelCount {
                name: r.channel.name.clone(),
                group: r.channel.group.clone(),
                sources: r.valid_count(),
            })
            .collect();
        Self {
            channel_count: results.len(),
            channels_with_sources: per_channel.iter().filter(|c| c.sources > 0).count(),
            total_sources: per_channel.iter().map(|c| c.sources).sum(),
            per_channel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_sources == 0
    }
}
