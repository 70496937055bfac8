use crate::paths::RecordKind;
use std::str::FromStr;

/// How the pair builder walks the comments table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pagination {
    /// `LIMIT ? OFFSET ?` in insertion order.
    Offset,
    /// `WHERE id > ? ORDER BY id LIMIT ?`; cheaper on deep pages.
    Keyset,
}

impl FromStr for Pagination {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offset" => Ok(Pagination::Offset),
            "keyset" => Ok(Pagination::Keyset),
            other => Err(format!("unknown pagination '{other}' (expected offset|keyset)")),
        }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    // decoder
    pub chunk_bytes: usize,           // decompressed bytes per read
    pub max_window_bytes: usize,      // ceiling on accumulated undecoded bytes
    pub window_log_max: u32,          // zstd window log (31 = 2 GiB)

    // loader
    pub record_kind: Option<RecordKind>, // None = infer from archive path
    pub commit_every: u64,
    pub log_every: u64,

    // pair builder
    pub page_size: usize,
    pub pair_commit_every: u64,
    pub pair_log_every: u64,
    pub cache_capacity: usize,        // per table
    pub min_score: i64,
    pub clean_text: bool,
    pub pagination: Pagination,

    pub progress: bool,
    pub write_buffer_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_bytes: 1 << 27,
            max_window_bytes: 1 << 30,
            window_log_max: 31,

            record_kind: None,
            commit_every: 10_000,
            log_every: 100_000,

            page_size: 10_000,
            pair_commit_every: 10_000,
            pair_log_every: 10_000,
            cache_capacity: 10_000,
            min_score: 5,
            clean_text: false,
            pagination: Pagination::Offset,

            progress: false,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl PipelineOptions {
    /// Defaults overlaid with any `RPAIRS_*` environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `RPAIRS_*` overrides. Values that fail to parse are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<usize>("RPAIRS_CHUNK_BYTES") { self = self.with_chunk_bytes(v); }
        if let Some(v) = env_parse::<usize>("RPAIRS_MAX_WINDOW_BYTES") { self = self.with_max_window_bytes(v); }
        if let Some(v) = env_parse::<u64>("RPAIRS_COMMIT_EVERY") { self = self.with_commit_every(v); }
        if let Some(v) = env_parse::<u64>("RPAIRS_LOG_EVERY") { self = self.with_log_every(v); }
        if let Some(v) = env_parse::<usize>("RPAIRS_PAGE_SIZE") { self = self.with_page_size(v); }
        if let Some(v) = env_parse::<usize>("RPAIRS_CACHE_CAPACITY") { self = self.with_cache_capacity(v); }
        if let Some(v) = env_parse::<i64>("RPAIRS_MIN_SCORE") { self = self.with_min_score(v); }
        if let Some(v) = env_parse::<Pagination>("RPAIRS_PAGINATION") { self = self.with_pagination(v); }
        self
    }

    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }
    pub fn with_max_window_bytes(mut self, bytes: usize) -> Self {
        self.max_window_bytes = bytes.max(1);
        self
    }
    pub fn with_window_log_max(mut self, log: u32) -> Self {
        self.window_log_max = log;
        self
    }
    pub fn with_record_kind(mut self, kind: RecordKind) -> Self {
        self.record_kind = Some(kind);
        self
    }
    pub fn with_commit_every(mut self, n: u64) -> Self {
        self.commit_every = n.max(1);
        self
    }
    pub fn with_log_every(mut self, n: u64) -> Self {
        self.log_every = n.max(1);
        self
    }
    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }
    pub fn with_pair_commit_every(mut self, n: u64) -> Self {
        self.pair_commit_every = n.max(1);
        self
    }
    pub fn with_pair_log_every(mut self, n: u64) -> Self {
        self.pair_log_every = n.max(1);
        self
    }
    pub fn with_cache_capacity(mut self, n: usize) -> Self {
        self.cache_capacity = n.max(1);
        self
    }
    pub fn with_min_score(mut self, score: i64) -> Self {
        self.min_score = score;
        self
    }
    pub fn with_clean_text(mut self, yes: bool) -> Self {
        self.clean_text = yes;
        self
    }
    pub fn with_pagination(mut self, p: Pagination) -> Self {
        self.pagination = p;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{} is set but cannot be parsed ({}): {}", key, e, raw);
            None
        }
    }
}
