use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tvsource_core::Channel;
use tvsource_engine::{
    build_client, ClientSettings, Discoverer, DiscoverySettings, EngineEvent, ExtractorSettings,
    FailureKind, PageFetcher, PageSettings, ProgressSink, SearchDiscoverer, UrlExtractor,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn settings(search_urls: Vec<String>) -> DiscoverySettings {
    DiscoverySettings {
        search_urls,
        politeness_delay: Duration::ZERO,
        politeness_jitter: Duration::ZERO,
        ..DiscoverySettings::default()
    }
}

fn discoverer(settings: DiscoverySettings) -> SearchDiscoverer {
    let client = build_client(&ClientSettings::default()).unwrap();
    let pages = PageFetcher::new(client, PageSettings::default());
    // The mock server lives on loopback, so nothing is denylisted here.
    let extractor = UrlExtractor::with_settings(ExtractorSettings {
        denied_hosts: Vec::new(),
        ..ExtractorSettings::default()
    });
    SearchDiscoverer::new(pages, extractor, settings)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

fn urls(discovery: &tvsource_engine::Discovery) -> Vec<&str> {
    discovery
        .candidates
        .iter()
        .map(|c| c.url.as_str())
        .collect()
}

#[tokio::test]
async fn failed_keyword_does_not_stop_the_next_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "CCTV1 高清"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "CCTV-1"))
        .respond_with(html(
            r#"<p>http://live.example.net/cctv1/index.m3u8</p>
               <a href="http://backup.example.net/cctv1.m3u8">backup</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let channel = Channel::new("CCTV1", "央视").with_keywords(["CCTV1 高清", "CCTV-1"]);
    let discoverer = discoverer(settings(vec![format!("{}/search?q={{query}}", server.uri())]));
    let sink = TestSink::default();

    let discovery = discoverer.discover(&channel, &sink).await;

    assert_eq!(
        urls(&discovery),
        vec![
            "http://backup.example.net/cctv1.m3u8",
            "http://live.example.net/cctv1/index.m3u8",
        ]
    );
    assert!(discovery.candidates.iter().all(|c| c.channel == "CCTV1"));
    assert_eq!(discovery.searches_attempted, 2);
    assert_eq!(discovery.searches_failed, 1);

    let events = sink.take();
    assert_eq!(
        events.first(),
        Some(&EngineEvent::DiscoveryStarted {
            channel: "CCTV1".into(),
            keywords: 2
        })
    );
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::SearchFailed { kind: FailureKind::HttpStatus(500), .. }
    )));
    assert_eq!(
        events.last(),
        Some(&EngineEvent::CandidatesFound {
            channel: "CCTV1".into(),
            count: 2
        })
    );
}

#[tokio::test]
async fn channel_without_keywords_searches_default_phrase() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("s", "湖南卫视 直播源"))
        .respond_with(html("rtmp://media.example.net/live/hunan"))
        .expect(1)
        .mount(&server)
        .await;

    let discoverer = discoverer(settings(vec![format!("{}/?s={{query}}", server.uri())]));
    let discovery = discoverer
        .discover(&Channel::new("湖南卫视", "卫视"), &TestSink::default())
        .await;

    assert_eq!(urls(&discovery), vec!["rtmp://media.example.net/live/hunan"]);
}

#[tokio::test]
async fn candidate_cap_stops_further_searches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(
            "http://s1.example.net/1.m3u8 http://s2.example.net/2.m3u8 \
             http://s3.example.net/3.m3u8 http://s4.example.net/4.m3u8",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("http://s5.example.net/5.m3u8"))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = settings(vec![
        format!("{}/a?s={{query}}", server.uri()),
        format!("{}/b?q={{query}}", server.uri()),
    ]);
    settings.max_candidates = 3;
    let discoverer = discoverer(settings);

    let discovery = discoverer
        .discover(&Channel::new("CCTV5", "央视"), &TestSink::default())
        .await;

    assert_eq!(discovery.candidates.len(), 3);
    assert_eq!(discovery.searches_attempted, 1);
}

#[tokio::test]
async fn embedded_frames_are_followed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(r#"<iframe src="/player/1"></iframe>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/player/1"))
        .respond_with(html(
            r#"<video data-src="http://cdn.example.net/p1.m3u8"></video>
               <iframe src="/player/2"></iframe>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/player/2"))
        .respond_with(html("http://cdn.example.net/p2.m3u8"))
        .expect(0)
        .mount(&server)
        .await;

    let discoverer = discoverer(settings(vec![format!("{}/search?q={{query}}", server.uri())]));
    let discovery = discoverer
        .discover(&Channel::new("翡翠台", "香港"), &TestSink::default())
        .await;

    assert_eq!(urls(&discovery), vec!["http://cdn.example.net/p1.m3u8"]);
}

#[tokio::test]
async fn frames_are_ignored_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(r#"<iframe src="/player/1"></iframe>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/player/1"))
        .respond_with(html("http://cdn.example.net/p1.m3u8"))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = settings(vec![format!("{}/search?q={{query}}", server.uri())]);
    settings.follow_frames = false;
    let discovery = discoverer(settings)
        .discover(&Channel::new("翡翠台", "香港"), &TestSink::default())
        .await;

    assert!(discovery.candidates.is_empty());
}

#[tokio::test]
async fn master_playlists_expand_into_variants() {
    let server = MockServer::start().await;
    let master = format!("{}/hls/master.m3u8", server.uri());
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(&format!("<p>{master}</p>")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n\
             low/index.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2400000,RESOLUTION=1280x720\n\
             high/index.m3u8\n",
            "application/vnd.apple.mpegurl",
        ))
        .mount(&server)
        .await;

    let mut settings = settings(vec![format!("{}/search?q={{query}}", server.uri())]);
    settings.expand_variants = true;
    let discovery = discoverer(settings)
        .discover(&Channel::new("CCTV13", "央视"), &TestSink::default())
        .await;

    let expected = vec![
        format!("{}/hls/low/index.m3u8", server.uri()),
        format!("{}/hls/high/index.m3u8", server.uri()),
        master,
    ];
    assert_eq!(urls(&discovery), expected);
}

#[tokio::test]
async fn unreachable_search_endpoint_yields_no_candidates() {
    let discoverer = discoverer(settings(vec![
        "http://127.0.0.1:9/search?q={query}".to_string(),
    ]));
    let sink = TestSink::default();

    let discovery = discoverer.discover(&Channel::new("CCTV2", "央视"), &sink).await;

    assert!(discovery.candidates.is_empty());
    assert_eq!(discovery.searches_failed, 1);
    assert!(sink
        .take()
        .iter()
        .any(|event| matches!(event, EngineEvent::SearchFailed { .. })));
}

#[tokio::test]
async fn searches_are_spaced_by_the_politeness_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html("<p>nothing here</p>"))
        .expect(3)
        .mount(&server)
        .await;

    let channel = Channel::new("CCTV9", "央视").with_keywords(["CCTV-9", "CCTV9纪录", "CCTV 9"]);
    let discoverer = discoverer(DiscoverySettings {
        politeness_delay: Duration::from_millis(150),
        ..settings(vec![format!("{}/search?q={{query}}", server.uri())])
    });

    let started = std::time::Instant::now();
    let discovery = discoverer.discover(&channel, &TestSink::default()).await;

    assert_eq!(discovery.searches_attempted, 3);
    // Two gaps between three searches; none before the first.
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn first_search_is_not_delayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html("http://live.example.net/cctv10/index.m3u8"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = Channel::new("CCTV10", "央视").with_keywords(["CCTV-10"]);
    let discoverer = discoverer(DiscoverySettings {
        politeness_delay: Duration::from_secs(5),
        ..settings(vec![format!("{}/search?q={{query}}", server.uri())])
    });

    let started = std::time::Instant::now();
    discoverer.discover(&channel, &TestSink::default()).await;

    assert!(started.elapsed() < Duration::from_secs(2));
}
