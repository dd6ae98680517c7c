use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// `http(s)` URLs whose path ends in `.m3u` or `.m3u8`, with an optional query.
///
/// The path run is lazy and stops at commas and CJK punctuation, so URLs
/// listed back to back stay separate.
pub const STREAM_FILE_PATTERN: &str = r#"(?i)https?://[^\s'"<>\\?#,，。；、：！（）【】「」《》]+?\.m3u8?(?:\?[^\s'"<>\\#,，。；、：！（）【】「」《》]*)?"#;
/// Streaming protocol URLs.
pub const STREAM_SCHEME_PATTERN: &str =
    r#"(?i)(?:rtmp|rtsp)://[^\s'"<>\\,，。；、：！（）【】「」《》]+"#;
/// `http(s)` URLs that only mention `m3u8` in their query string.
pub const QUERY_EMBEDDED_PATTERN: &str = r#"(?i)https?://[^\s'"<>\\?#,，。；、：！（）【】「」《》]+?\?[^\s'"<>\\#,，。；、：！（）【】「」《》]*m3u8[^\s'"<>\\#,，。；、：！（）【】「」《》]*"#;

const STREAM_INDICATORS: &[&str] = &[".m3u", "m3u8", "rtmp://", "rtsp://"];
const NETWORK_SCHEMES: &[&str] = &["http", "https", "rtmp", "rtsp"];
const SCHEME_MARKERS: &[&str] = &["http://", "https://", "rtmp://", "rtsp://"];

static DEFAULT_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    [
        ("stream-file", STREAM_FILE_PATTERN, RuleMode::Always),
        ("stream-scheme", STREAM_SCHEME_PATTERN, RuleMode::Always),
        ("query-embedded", QUERY_EMBEDDED_PATTERN, RuleMode::WhenEmpty),
    ]
    .into_iter()
    .filter_map(|(name, pattern, mode)| PatternRule::new(name, pattern, mode).ok())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    /// Always applied.
    Always,
    /// Applied only while no earlier rule produced an accepted URL.
    WhenEmpty,
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub name: String,
    regex: Regex,
    pub mode: RuleMode,
}

impl PatternRule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        mode: RuleMode,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: Regex::new(pattern)?,
            mode,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub min_len: usize,
    /// Hosts rejected together with their subdomains.
    pub denied_hosts: Vec<String>,
    /// Path suffixes rejected regardless of query string.
    pub denied_extensions: Vec<String>,
    /// Markup attributes scanned for (possibly relative) URLs.
    pub attributes: Vec<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            min_len: 12,
            denied_hosts: ["localhost", "127.0.0.1", "0.0.0.0", "tonkiang.us"]
                .map(String::from)
                .to_vec(),
            denied_extensions: [
                ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico", ".css", ".js",
            ]
            .map(String::from)
            .to_vec(),
            attributes: ["href", "src", "data-src", "data-href", "data-url", "data-source"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Finds candidate stream URLs in page text and markup.
///
/// Pure: the same input always yields the same set.
#[derive(Debug, Clone)]
pub struct UrlExtractor {
    rules: Vec<PatternRule>,
    settings: ExtractorSettings,
}

impl UrlExtractor {
    pub fn new(rules: Vec<PatternRule>, settings: ExtractorSettings) -> Self {
        Self { rules, settings }
    }

    pub fn with_settings(settings: ExtractorSettings) -> Self {
        Self::new(DEFAULT_RULES.clone(), settings)
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        self.extract_from_page(text, None)
    }

    /// Like [`extract`](Self::extract), resolving relative attribute values
    /// against `base_url`.
    pub fn extract_from_page(&self, text: &str, base_url: Option<&str>) -> BTreeSet<String> {
        let base = base_url.and_then(|b| Url::parse(b).ok());
        let segments = self.collect_segments(text, base.as_ref());

        let mut found = BTreeSet::new();
        for rule in &self.rules {
            if rule.mode == RuleMode::WhenEmpty && !found.is_empty() {
                continue;
            }
            for segment in &segments {
                for m in rule.regex.find_iter(segment) {
                    for candidate in split_glued(m.as_str().trim()) {
                        if self.accept(candidate) {
                            found.insert(candidate.to_string());
                        }
                    }
                }
            }
        }
        found
    }

    /// One level of embedded `iframe`/`frame` targets worth fetching.
    pub fn frame_links(&self, html: &str, base_url: Option<&str>) -> Vec<String> {
        let Ok(selector) = Selector::parse("iframe[src], frame[src]") else {
            return Vec::new();
        };
        let base = base_url.and_then(|b| Url::parse(b).ok());
        let doc = Html::parse_document(html);
        let mut links: Vec<String> = Vec::new();
        for element in doc.select(&selector) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            let Some(url) = resolve_url(src, base.as_ref()) else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }
            let url = String::from(url);
            if !links.contains(&url) {
                links.push(url);
            }
        }
        links
    }

    fn collect_segments(&self, text: &str, base: Option<&Url>) -> Vec<String> {
        let mut segments = vec![normalize(text)];
        if !text.contains('<') {
            return segments;
        }

        let doc = Html::parse_document(text);
        let Ok(any) = Selector::parse("*") else {
            return segments;
        };
        for element in doc.select(&any) {
            let value = element.value();
            for attr in &self.settings.attributes {
                let Some(raw) = value.attr(attr) else {
                    continue;
                };
                if let Some(url) = resolve_url(raw, base) {
                    segments.push(normalize(url.as_str()));
                }
            }
            if value.name().eq_ignore_ascii_case("script") {
                let script: String = element.text().collect();
                if !script.trim().is_empty() {
                    segments.push(normalize(&script));
                }
            }
        }
        segments
    }

    fn accept(&self, candidate: &str) -> bool {
        if candidate.len() < self.settings.min_len {
            return false;
        }
        let lower = candidate.to_ascii_lowercase();
        if !STREAM_INDICATORS.iter().any(|i| lower.contains(i)) {
            return false;
        }
        let Ok(url) = Url::parse(candidate) else {
            return false;
        };
        if !NETWORK_SCHEMES.contains(&url.scheme()) {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        if self.settings.denied_hosts.iter().any(|denied| {
            let denied = denied.to_ascii_lowercase();
            host == denied || host.ends_with(&format!(".{denied}"))
        }) {
            return false;
        }
        let path = url.path().to_ascii_lowercase();
        !self
            .settings
            .denied_extensions
            .iter()
            .any(|ext| path.ends_with(&ext.to_ascii_lowercase()))
    }
}

impl Default for UrlExtractor {
    fn default() -> Self {
        Self::with_settings(ExtractorSettings::default())
    }
}

/// Undoes the escaping commonly found around URLs in markup and inline scripts.
fn normalize(text: &str) -> String {
    text.replace("\\/", "/").replace("&amp;", "&")
}

/// Splits a match where URLs were written with no separator at all, such as
/// `rtmp://a/1rtmp://b/2`. Only the part before the query is searched, so
/// URLs passed as query parameters stay intact.
fn split_glued(candidate: &str) -> Vec<&str> {
    let head_len = candidate.find('?').unwrap_or(candidate.len());
    let head = candidate[..head_len].to_ascii_lowercase();
    let mut starts: Vec<usize> = SCHEME_MARKERS
        .iter()
        .flat_map(|marker| head.match_indices(marker).map(|(i, _)| i))
        .filter(|&i| i > 0)
        .collect();
    starts.sort_unstable();

    let mut pieces = Vec::with_capacity(starts.len() + 1);
    let mut from = 0;
    for start in starts {
        pieces.push(&candidate[from..start]);
        from = start;
    }
    pieces.push(&candidate[from..]);
    pieces
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("data:")
        || lower.starts_with("mailto:")
    {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}
