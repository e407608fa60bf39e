pub mod api;
pub mod index;
pub mod probe;
pub mod scheduler;
pub mod source;
pub mod sources;

pub use index::{RedisIndex, ScoredIndex, INIT_SCORE, MAX_SCORE, MIN_SCORE};
pub use probe::{HttpProbe, LivenessProbe};
pub use scheduler::{ProxyScheduler, ProxySchedulerConfig};
pub use source::{CandidateSource, PageWalker, PagedSource, SourceOptions, SourceSink};
pub use sources::default_sources;
