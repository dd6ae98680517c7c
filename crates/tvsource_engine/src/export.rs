use std::fmt::Write as _;
use std::path::PathBuf;

use serde_json::json;
use tvsource_core::{ChannelResult, RankedSource, RunSummary, SourceKind};

use crate::filename::category_filename;
use crate::persist::{OutputDir, PersistError};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Stem for combined and per-category playlist files.
    pub file_prefix: String,
    pub generated_at: String,
    pub stats_filename: Option<String>,
    pub manifest_filename: Option<String>,
    pub per_category: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_prefix: "tv_sources".to_string(),
            generated_at: String::new(),
            stats_filename: Some("STATS.md".to_string()),
            manifest_filename: Some("manifest.json".to_string()),
            per_category: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub summary: RunSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// `#EXTM3U` playlist; placeholder entries are left out.
pub fn render_m3u(results: &[ChannelResult]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for result in results {
        let name = &result.channel.name;
        let group = &result.channel.group;
        for source in result.playable() {
            let _ = writeln!(
                out,
                "#EXTINF:-1 tvg-id=\"{name}\" tvg-name=\"{name}\" group-title=\"{group}\",{name} source{}",
                source.rank
            );
            let _ = writeln!(out, "{}", source.url);
        }
    }
    out
}

/// Human-readable `name,url` list grouped under `<category>,#genre#` markers.
pub fn render_txt(results: &[ChannelResult], generated_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Generated: {generated_at}");
    for (category, channels) in group_by_category(results) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{category},#genre#");
        for result in channels {
            let name = &result.channel.name;
            let _ = writeln!(out, "# {name} (valid sources: {})", result.valid_count());
            for source in &result.sources {
                let _ = writeln!(
                    out,
                    "# source{} | {} | {}",
                    source.rank,
                    latency_label(source),
                    status_label(source)
                );
                if !source.is_placeholder() {
                    let _ = writeln!(out, "{name},{}", source.url);
                }
            }
        }
    }
    out
}

pub fn render_stats(summary: &RunSummary, generated_at: &str) -> String {
    let mut out = String::from("# TV source statistics\n\n");
    let _ = writeln!(out, "Generated: {generated_at}\n");
    out.push_str("## Channels\n");
    let _ = writeln!(out, "- Total channels: {}", summary.channel_count);
    let _ = writeln!(out, "- Channels with sources: {}", summary.channels_with_sources);
    let _ = writeln!(out, "- Total sources: {}\n", summary.total_sources);
    out.push_str("## Sources per channel\n");
    let mut counts: Vec<_> = summary.per_channel.iter().collect();
    counts.sort_by(|a, b| a.name.cmp(&b.name));
    for count in counts {
        let _ = writeln!(out, "- {}: {}", count.name, count.sources);
    }
    out
}

pub fn render_manifest(results: &[ChannelResult], summary: &RunSummary, generated_at: &str) -> String {
    let manifest = json!({
        "generated_at": generated_at,
        "channel_count": summary.channel_count,
        "channels_with_sources": summary.channels_with_sources,
        "total_sources": summary.total_sources,
        "channels": results.iter().map(|r| {
            json!({
                "name": r.channel.name,
                "group": r.channel.group,
                "sources": r.playable().map(|s| {
                    json!({
                        "rank": s.rank,
                        "url": s.url,
                        "latency_ms": s.latency_ms().map(|ms| ms as u64),
                        "fallback": s.kind == SourceKind::Fallback,
                    })
                }).collect::<Vec<_>>()
            })
        }).collect::<Vec<_>>()
    });
    manifest.to_string()
}

/// Writes combined playlists, per-category playlists, stats and manifest.
///
/// Any write failure aborts the export.
pub fn write_outputs(
    out_dir: &OutputDir,
    results: &[ChannelResult],
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let summary = RunSummary::from_results(results);
    let prefix = &options.file_prefix;
    let mut files = vec![
        out_dir.write(&format!("{prefix}.m3u"), &render_m3u(results))?,
        out_dir.write(&format!("{prefix}.txt"), &render_txt(results, &options.generated_at))?,
    ];

    if options.per_category {
        for (category, channels) in group_by_category(results) {
            let owned: Vec<ChannelResult> = channels.into_iter().cloned().collect();
            files.push(out_dir.write(
                &category_filename(prefix, category, "m3u"),
                &render_m3u(&owned),
            )?);
            files.push(out_dir.write(
                &category_filename(prefix, category, "txt"),
                &render_txt(&owned, &options.generated_at),
            )?);
        }
    }

    if let Some(name) = options.stats_filename.as_deref() {
        files.push(out_dir.write(name, &render_stats(&summary, &options.generated_at))?);
    }
    if let Some(name) = options.manifest_filename.as_deref() {
        files.push(out_dir.write(
            name,
            &render_manifest(results, &summary, &options.generated_at),
        )?);
    }

    Ok(ExportSummary { files, summary })
}

/// Categories in first-seen order.
fn group_by_category(results: &[ChannelResult]) -> Vec<(&str, Vec<&ChannelResult>)> {
    let mut groups: Vec<(&str, Vec<&ChannelResult>)> = Vec::new();
    for result in results {
        let group = result.channel.group.as_str();
        match groups.iter_mut().find(|(name, _)| *name == group) {
            Some((_, members)) => members.push(result),
            None => groups.push((group, vec![result])),
        }
    }
    groups
}

fn latency_label(source: &RankedSource) -> String {
    match source.latency_ms() {
        Some(ms) => format!("{ms} ms"),
        None => "-".to_string(),
    }
}

fn status_label(source: &RankedSource) -> &'static str {
    match source.kind {
        SourceKind::Probed => "ok",
        SourceKind::Fallback => "fallback",
        SourceKind::Placeholder => "empty",
    }
}
