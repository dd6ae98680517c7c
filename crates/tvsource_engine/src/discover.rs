use std::time::Duration;

use rand::Rng;
use tvsource_core::{Candidate, Channel};

use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::decode::decode_page;
use crate::variants::expand_master_playlists;
use crate::{Discovery, EngineEvent, PageFetcher, ProgressSink, UrlExtractor};

/// Replaced by the URL-escaped keyword in search URL templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Search endpoint templates containing [`QUERY_PLACEHOLDER`].
    pub search_urls: Vec<String>,
    pub max_keywords: usize,
    pub max_candidates: usize,
    pub politeness_delay: Duration,
    pub politeness_jitter: Duration,
    pub follow_frames: bool,
    pub max_frames: usize,
    pub expand_variants: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            search_urls: vec!["https://tonkiang.us/?s={query}".to_string()],
            max_keywords: 3,
            max_candidates: 20,
            politeness_delay: Duration::from_millis(1_000),
            politeness_jitter: Duration::from_millis(1_000),
            follow_frames: true,
            max_frames: 3,
            expand_variants: false,
        }
    }
}

/// Fills `template` with the form-url-encoded `keyword`.
///
/// Templates without a placeholder get the keyword appended.
pub fn search_url(template: &str, keyword: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    if template.contains(QUERY_PLACEHOLDER) {
        template.replace(QUERY_PLACEHOLDER, &encoded)
    } else {
        format!("{template}{encoded}")
    }
}

/// `delay` plus a random share of `jitter`; saturates instead of overflowing.
fn pause_length(delay: Duration, jitter: Duration) -> Duration {
    let jitter_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
    let extra = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    delay.saturating_add(Duration::from_millis(extra))
}

#[async_trait::async_trait]
pub trait Discoverer: Send + Sync {
    /// Never fails: transport errors are logged and reported through `sink`.
    async fn discover(&self, channel: &Channel, sink: &dyn ProgressSink) -> Discovery;
}

/// Keyword search against the configured endpoints, one request at a time.
#[derive(Debug, Clone)]
pub struct SearchDiscoverer {
    pages: PageFetcher,
    extractor: UrlExtractor,
    settings: DiscoverySettings,
}

impl SearchDiscoverer {
    pub fn new(pages: PageFetcher, extractor: UrlExtractor, settings: DiscoverySettings) -> Self {
        Self {
            pages,
            extractor,
            settings,
        }
    }

    async fn pause(&self) {
        let delay = pause_length(self.settings.politeness_delay, self.settings.politeness_jitter);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn scrape_frames(&self, html: &str, page_url: &str, found: &mut CandidateList) {
        let frames = self.extractor.frame_links(html, Some(page_url));
        for frame in frames.into_iter().take(self.settings.max_frames) {
            if found.is_full() {
                return;
            }
            match self.pages.fetch(&frame).await {
                Ok(output) => {
                    let page =
                        decode_page(&output.bytes, output.metadata.content_type.as_deref());
                    let urls = self
                        .extractor
                        .extract_from_page(&page.text, Some(&output.metadata.final_url));
                    engine_debug!("frame {} yielded {} urls", frame, urls.len());
                    found.extend(urls);
                }
                Err(err) => engine_debug!("frame {} skipped: {}", frame, err),
            }
        }
    }
}

#[async_trait::async_trait]
impl Discoverer for SearchDiscoverer {
    async fn discover(&self, channel: &Channel, sink: &dyn ProgressSink) -> Discovery {
        let terms = channel.search_terms(self.settings.max_keywords);
        sink.emit(EngineEvent::DiscoveryStarted {
            channel: channel.name.clone(),
            keywords: terms.len(),
        });

        let mut discovery = Discovery::default();
        let mut found = CandidateList::new(self.settings.max_candidates);

        'search: for term in &terms {
            for template in &self.settings.search_urls {
                if found.is_full() {
                    break 'search;
                }
                if discovery.searches_attempted > 0 {
                    self.pause().await;
                }
                discovery.searches_attempted += 1;

                let url = search_url(template, term);
                engine_debug!("[{}] searching {}", channel.name, url);
                let output = match self.pages.fetch(&url).await {
                    Ok(output) => output,
                    Err(err) => {
                        engine_warn!("[{}] search {} failed: {}", channel.name, url, err);
                        discovery.searches_failed += 1;
                        sink.emit(EngineEvent::SearchFailed {
                            channel: channel.name.clone(),
                            search_url: url,
                            kind: err.kind,
                        });
                        continue;
                    }
                };

                let page = decode_page(&output.bytes, output.metadata.content_type.as_deref());
                if page.lossy {
                    engine_debug!(
                        "[{}] {} decoded lossily as {}",
                        channel.name,
                        url,
                        page.encoding_label
                    );
                }
                let urls = self
                    .extractor
                    .extract_from_page(&page.text, Some(&output.metadata.final_url));
                engine_debug!("[{}] {} yielded {} urls", channel.name, url, urls.len());
                found.extend(urls);

                if self.settings.follow_frames && !found.is_full() {
                    self.scrape_frames(&page.text, &output.metadata.final_url, &mut found)
                        .await;
                }
            }
        }

        let mut urls = found.into_urls();
        if self.settings.expand_variants && !urls.is_empty() {
            urls = expand_master_playlists(&self.pages, urls, self.settings.max_candidates).await;
        }

        engine_info!("[{}] {} candidate(s) found", channel.name, urls.len());
        sink.emit(EngineEvent::CandidatesFound {
            channel: channel.name.clone(),
            count: urls.len(),
        });
        discovery.candidates = urls
            .into_iter()
            .map(|url| Candidate::new(channel.name.clone(), url))
            .collect();
        discovery
    }
}

/// Insertion-ordered, de-duplicated and capped URL list.
struct CandidateList {
    urls: Vec<String>,
    cap: usize,
}

impl CandidateList {
    fn new(cap: usize) -> Self {
        Self {
            urls: Vec::new(),
            cap,
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }

    fn extend(&mut self, urls: impl IntoIterator<Item = String>) {
        for url in urls {
            if self.is_full() {
                return;
            }
            if !self.urls.contains(&url) {
                self.urls.push(url);
            }
        }
    }

    fn into_urls(self) -> Vec<String> {
        self.urls
    }
}
