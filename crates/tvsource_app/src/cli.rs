use std::path::PathBuf;

use clap::Parser;

/// Search the web for live TV stream URLs, keep the fastest working ones and
/// write them out as M3U and TXT playlists.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tvsource", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (RON)
    #[arg(short, long, default_value = "./tvsource.ron")]
    pub config: PathBuf,

    /// Directory the playlists are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Minimum number of entries per channel (padded with empty slots)
    #[arg(long = "min")]
    pub min_sources: Option<usize>,

    /// Maximum number of sources kept per channel
    #[arg(long = "max")]
    pub max_sources: Option<usize>,

    /// Probes in flight at once
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Search URL template, `{query}` is replaced by the keyword. Repeatable.
    #[arg(long = "search-url")]
    pub search_urls: Vec<String>,

    /// Keyword variants searched per channel
    #[arg(long)]
    pub max_keywords: Option<usize>,

    /// Candidate URLs kept per channel before probing
    #[arg(long)]
    pub max_candidates: Option<usize>,

    /// Only process these channels. Repeatable.
    #[arg(long = "channel")]
    pub channels: Vec<String>,

    /// Expand HLS master playlists into their variant streams
    #[arg(long)]
    pub expand_variants: bool,

    /// Do not follow embedded frames on search result pages
    #[arg(long)]
    pub no_frames: bool,

    /// Also write the log to ./tvsource.log
    #[arg(long)]
    pub log_file: bool,

    /// Debug output
    #[arg(short, long, alias = "debug")]
    pub verbose: bool,
}
