mod config;
mod date;
mod paths;
mod zstd_jsonl;
mod json_utils;
mod record;

mod store;
mod loader;
mod cache;
mod pairs;
mod clean;

mod ndjson;
mod progress;
mod mem;
mod util;
mod pipeline;

pub use crate::config::{Pagination, PipelineOptions};
pub use crate::paths::RecordKind;
pub use crate::pipeline::RedditPairs;

// decoder
pub use crate::zstd_jsonl::{open_archive, FrameError, FrameLines};

// normalizer
pub use crate::record::{link_of, normalize, Comment, NormalizedRow, RecordError, Submission};
pub use crate::date::format_created;

// storage + stages
pub use crate::store::Store;
pub use crate::loader::{load_archive, LoadStats};
pub use crate::cache::LruCache;
pub use crate::pairs::{
    build_pairs, is_valid, JsonlSink, Parent, PairSink, PairStats, ParentResolver, Scored, TableSink,
    TrainingPair,
};
pub use crate::clean::clean_text;

// helpers binaries use
pub use crate::util::init_tracing_once;
pub use crate::ndjson::NdjsonWriter;
