use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tvsource_core::{select, ProbeResult, RankedSource, SelectionLimits, SourceKind};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn ok(url: &str, ms: u64) -> ProbeResult {
    ProbeResult::reachable(url, Duration::from_millis(ms))
}

fn urls(sources: &[RankedSource]) -> Vec<&str> {
    sources.iter().map(|s| s.url.as_str()).collect()
}

#[test]
fn failed_probes_are_dropped_and_rest_sorted_by_latency() {
    init_logging();
    let results = vec![
        ok("http://a.example/120.m3u8", 120),
        ProbeResult::unreachable("http://b.example/dead.m3u8"),
        ok("http://c.example/80.m3u8", 80),
    ];
    let limits = SelectionLimits::new(2, 8).unwrap();

    let ranked = select(&results, &limits);

    assert_eq!(
        urls(&ranked),
        vec!["http://c.example/80.m3u8", "http://a.example/120.m3u8"]
    );
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[1].rank, 2);
    assert!(ranked.iter().all(|s| s.kind == SourceKind::Probed));
}

#[test]
fn no_successes_yield_placeholders_up_to_minimum() {
    let results = vec![
        ProbeResult::unreachable("http://a.example/x.m3u8"),
        ProbeResult::unreachable("http://b.example/y.m3u8"),
    ];
    let limits = SelectionLimits::new(2, 8).unwrap();

    let ranked = select(&results, &limits);

    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(RankedSource::is_placeholder));
    assert!(ranked.iter().all(|s| s.elapsed.is_none()));
    assert!(ranked.iter().all(|s| s.kind == SourceKind::Placeholder));
}

#[test]
fn slowest_entry_is_discarded_beyond_maximum() {
    let results: Vec<ProbeResult> = (1..=9u64)
        .rev()
        .map(|i| ok(&format!("http://s{i}.example/live.m3u8"), i * 10))
        .collect();
    let limits = SelectionLimits::new(2, 8).unwrap();

    let ranked = select(&results, &limits);

    assert_eq!(ranked.len(), 8);
    let latencies: Vec<u128> = ranked.iter().filter_map(|s| s.latency_ms()).collect();
    assert_eq!(latencies, vec![10, 20, 30, 40, 50, 60, 70, 80]);
    assert!(!urls(&ranked).contains(&"http://s9.example/live.m3u8"));
}

#[test]
fn equal_latencies_keep_discovery_order() {
    let results = vec![
        ok("http://first.example/a.m3u8", 50),
        ok("http://second.example/b.m3u8", 50),
        ok("http://fast.example/c.m3u8", 10),
        ok("http://third.example/d.m3u8", 50),
    ];
    let ranked = select(&results, &SelectionLimits::default());

    assert_eq!(
        urls(&ranked),
        vec![
            "http://fast.example/c.m3u8",
            "http://first.example/a.m3u8",
            "http://second.example/b.m3u8",
            "http://third.example/d.m3u8",
        ]
    );
}

#[test]
fn single_success_is_followed_by_one_placeholder() {
    let results = vec![
        ProbeResult::unreachable("http://a.example/x.m3u8"),
        ok("http://b.example/y.m3u8", 300),
    ];
    let ranked = select(&results, &SelectionLimits::new(2, 8).unwrap());

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].url, "http://b.example/y.m3u8");
    assert!(ranked[1].is_placeholder());
    assert_eq!(ranked[1].rank, 2);
}

#[test]
fn latency_ceiling_excludes_slow_successes() {
    let results = vec![
        ok("http://quick.example/a.m3u8", 200),
        ok("http://slow.example/b.m3u8", 6_000),
    ];
    let limits = SelectionLimits::new(1, 8)
        .unwrap()
        .with_max_latency(Some(Duration::from_secs(5)));

    let ranked = select(&results, &limits);

    assert_eq!(urls(&ranked), vec!["http://quick.example/a.m3u8"]);
}

#[test]
fn output_length_and_order_hold_across_mixed_inputs() {
    let limits = SelectionLimits::new(3, 5).unwrap();
    for success_count in 0..10u64 {
        let mut results = Vec::new();
        for i in 0..success_count {
            // Latencies deliberately out of order.
            results.push(ok(&format!("http://h{i}.example/s.m3u8"), (i * 37) % 11 + 1));
            results.push(ProbeResult::unreachable(format!("http://dead{i}.example/s.m3u8")));
        }

        let ranked = select(&results, &limits);

        let lower = limits.min_count().min(success_count as usize);
        assert!(ranked.len() >= lower, "len {} < {lower}", ranked.len());
        assert!(ranked.len() <= limits.max_count().max(limits.min_count()));

        let real: Vec<&RankedSource> = ranked.iter().filter(|s| !s.is_placeholder()).collect();
        assert!(real.windows(2).all(|w| w[0].elapsed <= w[1].elapsed));

        // Placeholders only ever trail real entries.
        if let Some(first_placeholder) = ranked.iter().position(RankedSource::is_placeholder) {
            assert!(ranked[first_placeholder..].iter().all(RankedSource::is_placeholder));
        }
    }
}
