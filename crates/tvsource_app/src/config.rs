//! Run configuration: a RON file with built-in defaults, overridden by CLI flags.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use url::Url;

use engine_logging::{engine_info, engine_warn};
use tvsource_core::{
    CategoryClassifier, CategoryRule, Channel, SelectionLimits, DEFAULT_MAX_COUNT,
    DEFAULT_MIN_COUNT,
};
use tvsource_engine::{
    ClientSettings, DiscoverySettings, ExtractorSettings, PageSettings, PipelineSettings,
    ProbeSettings, DEFAULT_USER_AGENT, DEFAULT_WORKERS, QUERY_PLACEHOLDER,
};

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Category; derived from the name when absent.
    #[serde(default)]
    pub group: Option<String>,
    /// Search keyword variants, in priority order.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ChannelConfig {
    fn named(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            group: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channels: Vec<ChannelConfig>,
    pub search_urls: Vec<String>,
    pub min_sources: usize,
    pub max_sources: usize,
    pub max_keywords: usize,
    pub max_candidates: usize,
    pub workers: usize,
    pub search_timeout_ms: u64,
    pub head_timeout_ms: u64,
    pub get_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub politeness_delay_ms: u64,
    pub politeness_jitter_ms: u64,
    pub follow_frames: bool,
    pub expand_variants: bool,
    /// Successful probes slower than this are dropped.
    pub max_latency_ms: Option<u64>,
    pub prefix_bytes: usize,
    pub user_agent: String,
    pub denied_hosts: Vec<String>,
    pub output_dir: PathBuf,
    /// Static URLs used only when a whole run finds nothing.
    pub backup_sources: BTreeMap<String, Vec<String>>,
    pub category_rules: Option<Vec<CategoryRule>>,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let discovery = DiscoverySettings::default();
        let probe = ProbeSettings::default();
        Self {
            channels: default_channels(),
            search_urls: vec![
                "https://tonkiang.us/?s={query}".to_string(),
                "https://tonkiang.us/hotellist.html?s={query}".to_string(),
            ],
            min_sources: DEFAULT_MIN_COUNT,
            max_sources: DEFAULT_MAX_COUNT,
            max_keywords: discovery.max_keywords,
            max_candidates: discovery.max_candidates,
            workers: DEFAULT_WORKERS,
            search_timeout_ms: 15_000,
            head_timeout_ms: millis(probe.head_timeout),
            get_timeout_ms: millis(probe.get_timeout),
            connect_timeout_ms: 5_000,
            politeness_delay_ms: millis(discovery.politeness_delay),
            politeness_jitter_ms: millis(discovery.politeness_jitter),
            follow_frames: discovery.follow_frames,
            expand_variants: discovery.expand_variants,
            max_latency_ms: None,
            prefix_bytes: probe.prefix_bytes,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            denied_hosts: ExtractorSettings::default().denied_hosts,
            output_dir: PathBuf::from("."),
            backup_sources: default_backups(),
            category_rules: None,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`, falling back to the defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(min) = cli.min_sources {
            self.min_sources = min;
        }
        if let Some(max) = cli.max_sources {
            self.max_sources = max;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if !cli.search_urls.is_empty() {
            self.search_urls = cli.search_urls.clone();
        }
        if let Some(max_keywords) = cli.max_keywords {
            self.max_keywords = max_keywords;
        }
        if let Some(max_candidates) = cli.max_candidates {
            self.max_candidates = max_candidates;
        }
        if cli.expand_variants {
            self.expand_variants = true;
        }
        if cli.no_frames {
            self.follow_frames = false;
        }
    }

    /// Checks everything that would otherwise only fail mid-run.
    pub fn validate(&self) -> anyhow::Result<SelectionLimits> {
        let limits = self.limits()?;
        if self.search_urls.is_empty() {
            bail!("no search URLs configured");
        }
        for template in &self.search_urls {
            if !template.contains(QUERY_PLACEHOLDER) {
                engine_warn!(
                    "search URL {} has no {} placeholder, the keyword will be appended",
                    template,
                    QUERY_PLACEHOLDER
                );
            }
        }
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.max_candidates == 0 {
            bail!("max_candidates must be at least 1");
        }
        if self.channels.iter().any(|c| c.name.trim().is_empty()) {
            bail!("channel names must not be empty");
        }
        if let Some(level) = &self.log_level {
            level
                .parse::<LevelFilter>()
                .map_err(|_| anyhow::anyhow!("unknown log level {level:?}"))?;
        }
        Ok(limits)
    }

    pub fn limits(&self) -> anyhow::Result<SelectionLimits> {
        let limits = SelectionLimits::new(self.min_sources, self.max_sources)
            .context("invalid source limits")?;
        Ok(limits.with_max_latency(self.max_latency_ms.map(Duration::from_millis)))
    }

    pub fn log_level(&self) -> Option<LevelFilter> {
        self.log_level.as_deref().and_then(|level| level.parse().ok())
    }

    pub fn classifier(&self) -> CategoryClassifier {
        match &self.category_rules {
            Some(rules) => CategoryClassifier::new(rules.clone()),
            None => CategoryClassifier::default(),
        }
    }

    /// Channels to process, in configured order.
    ///
    /// A non-empty `only` restricts the run to those names; names missing
    /// from the configuration are searched with the default keyword.
    pub fn channels(&self, only: &[String]) -> Vec<Channel> {
        let classifier = self.classifier();
        let to_channel = |config: &ChannelConfig| {
            let name = config.name.trim();
            let group = match config.group.as_deref().map(str::trim) {
                Some(group) if !group.is_empty() => group.to_string(),
                _ => classifier.classify(name).to_string(),
            };
            Channel::new(name, group).with_keywords(config.keywords.iter().cloned())
        };

        if only.is_empty() {
            return self.channels.iter().map(to_channel).collect();
        }
        let mut selected: Vec<Channel> = Vec::new();
        for name in only.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if selected.iter().any(|c| c.name == name) {
                continue;
            }
            match self.channels.iter().find(|c| c.name.trim() == name) {
                Some(config) => selected.push(to_channel(config)),
                None => {
                    engine_info!("channel {} is not configured, using default keywords", name);
                    selected.push(to_channel(&ChannelConfig::named(name, &[])));
                }
            }
        }
        selected
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            user_agent: self.user_agent.clone(),
            ..ClientSettings::default()
        }
    }

    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            request_timeout: Duration::from_millis(self.search_timeout_ms),
            ..PageSettings::default()
        }
    }

    /// Search endpoints are denylisted so their own links are never candidates.
    pub fn extractor_settings(&self) -> ExtractorSettings {
        let mut denied_hosts = self.denied_hosts.clone();
        for template in &self.search_urls {
            let sample = template.replace(QUERY_PLACEHOLDER, "");
            if let Some(host) = url_host(&sample) {
                if !denied_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
                    denied_hosts.push(host);
                }
            }
        }
        ExtractorSettings {
            denied_hosts,
            ..ExtractorSettings::default()
        }
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            search_urls: self.search_urls.clone(),
            max_keywords: self.max_keywords,
            max_candidates: self.max_candidates,
            politeness_delay: Duration::from_millis(self.politeness_delay_ms),
            politeness_jitter: Duration::from_millis(self.politeness_jitter_ms),
            follow_frames: self.follow_frames,
            expand_variants: self.expand_variants,
            ..DiscoverySettings::default()
        }
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            head_timeout: Duration::from_millis(self.head_timeout_ms),
            get_timeout: Duration::from_millis(self.get_timeout_ms),
            prefix_bytes: self.prefix_bytes,
            ..ProbeSettings::default()
        }
    }

    pub fn pipeline_settings(&self, limits: SelectionLimits) -> PipelineSettings {
        PipelineSettings {
            workers: self.workers,
            limits,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

fn url_host(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_ascii_lowercase)
}

fn default_channels() -> Vec<ChannelConfig> {
    let with_keywords: &[(&str, &[&str])] = &[
        ("CCTV1", &["CCTV-1", "CCTV1综合", "CCTV 1"]),
        ("CCTV2", &["CCTV-2", "CCTV2财经", "CCTV 2"]),
        ("CCTV3", &[]),
        ("CCTV4", &[]),
        ("CCTV5", &["CCTV-5", "CCTV5体育", "CCTV 5"]),
        ("CCTV5+", &["CCTV-5+", "CCTV5plus", "CCTV5+"]),
        ("CCTV6", &[]),
        ("CCTV7", &[]),
        ("CCTV8", &[]),
        ("CCTV9", &[]),
        ("CCTV10", &[]),
        ("CCTV11", &[]),
        ("CCTV12", &[]),
        ("CCTV13", &["CCTV-13", "CCTV13新闻", "CCTV 13"]),
        ("CCTV14", &[]),
        ("CCTV15", &[]),
        ("CCTV16", &[]),
        ("CCTV17", &[]),
        ("北京卫视", &["北京电视台", "BTV", "北京卫视"]),
        ("湖南卫视", &["湖南电视台", "Hunan TV"]),
        ("浙江卫视", &[]),
        ("江苏卫视", &[]),
        ("东方卫视", &[]),
        ("安徽卫视", &[]),
        ("山东卫视", &[]),
        ("天津卫视", &[]),
        ("深圳卫视", &[]),
        ("广东卫视", &[]),
        ("凤凰中文", &["凤凰中文台", "凤凰卫视频道"]),
        ("凤凰资讯", &["凤凰资讯台", "凤凰信息台"]),
        ("凤凰香港", &[]),
        ("翡翠台", &["TVB翡翠", "TVB"]),
        ("明珠台", &[]),
        ("香港卫视", &[]),
    ];
    with_keywords
        .iter()
        .map(|(name, keywords)| ChannelConfig::named(name, keywords))
        .collect()
}

fn default_backups() -> BTreeMap<String, Vec<String>> {
    let entries: &[(&str, &[&str])] = &[
        (
            "CCTV1",
            &[
                "http://ivi.bupt.edu.cn/hls/cctv1hd.m3u8",
                "https://cctvcnch5c.v.wscdns.com/live/cctv1_2/playlist.m3u8",
            ],
        ),
        (
            "CCTV5",
            &[
                "http://ivi.bupt.edu.cn/hls/cctv5hd.m3u8",
                "https://cctvcnch5c.v.wscdns.com/live/cctv5_2/playlist.m3u8",
            ],
        ),
        (
            "湖南卫视",
            &[
                "http://ivi.bupt.edu.cn/hls/hunanhd.m3u8",
                "https://hnws.tvpal.com/hunanstv/04.m3u8",
            ],
        ),
        ("浙江卫视", &["http://ivi.bupt.edu.cn/hls/zhejianghd.m3u8"]),
        ("江苏卫视", &["http://ivi.bupt.edu.cn/hls/jiangsuhd.m3u8"]),
        ("北京卫视", &["http://ivi.bupt.edu.cn/hls/beijinghd.m3u8"]),
        ("东方卫视", &["http://ivi.bupt.edu.cn/hls/dongfanghd.m3u8"]),
    ];
    entries
        .iter()
        .map(|(name, urls)| (name.to_string(), urls.iter().map(|u| u.to_string()).collect()))
        .collect()
}
