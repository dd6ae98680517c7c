//! Tvsource engine: discovery, probing and playlist output.
mod decode;
mod discover;
mod export;
mod extract;
mod fetch;
mod filename;
mod persist;
mod pipeline;
mod probe;
mod types;
mod variants;

pub use decode::{decode_page, DecodedPage};
pub use discover::{search_url, Discoverer, DiscoverySettings, SearchDiscoverer, QUERY_PLACEHOLDER};
pub use export::{
    render_m3u, render_manifest, render_stats, render_txt, write_outputs, ExportError,
    ExportOptions, ExportSummary,
};
pub use extract::{
    ExtractorSettings, PatternRule, RuleMode, UrlExtractor, QUERY_EMBEDDED_PATTERN,
    STREAM_FILE_PATTERN, STREAM_SCHEME_PATTERN,
};
pub use fetch::{
    build_client, ClientSettings, NullProgressSink, PageFetcher, PageSettings, ProgressSink,
    DEFAULT_USER_AGENT,
};
pub use filename::category_filename;
pub use persist::{OutputDir, PersistError};
pub use pipeline::{Harvester, PipelineSettings, DEFAULT_WORKERS};
pub use probe::{HttpProber, ProbeSettings, Prober};
pub use types::{Discovery, EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use variants::{expand_master_playlists, master_variants};
