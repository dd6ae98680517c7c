//! Tvsource core: pure domain model and source selection.
mod category;
mod channel;
mod fallback;
mod probe;
mod select;
mod summary;

pub use category::{CategoryClassifier, CategoryRule, MatchKind, DEFAULT_CATEGORY};
pub use channel::{Candidate, Channel, DEFAULT_KEYWORD_SUFFIX};
pub use fallback::apply_backup_sources;
pub use probe::{has_network_scheme, ProbeResult};
pub use select::{
    select, ChannelResult, LimitsError, RankedSource, SelectionLimits, SourceKind,
    DEFAULT_MAX_COUNT, DEFAULT_MIN_COUNT,
};
pub use summary::{ChannelCount, RunSummary};
