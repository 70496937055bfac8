use crate::config::{Pagination, PipelineOptions};
use crate::loader::{load_archive, LoadStats};
use crate::pairs::{build_pairs, JsonlSink, PairSink, PairStats, TableSink};
use crate::paths::RecordKind;
use crate::store::Store;
use crate::util::init_tracing_once;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Builder facade over the loader and the pair builder.
///
/// ```no_run
/// use reddit_pairs::RedditPairs;
/// # fn main() -> anyhow::Result<()> {
/// let etl = RedditPairs::new().store("reddit.db");
/// etl.clone().load("RS_2023-01.zst")?;
/// etl.clone().load("RC_2023-01.zst")?;
/// etl.clean_text(true).build_pairs_jsonl("train.jsonl")?;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug, Default)]
pub struct RedditPairs {
    pub(crate) opts: PipelineOptions,
    pub(crate) store_path: Option<PathBuf>,
}

impl RedditPairs {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default(), store_path: None }
    }

    /// Start from `RPAIRS_*` environment overrides instead of plain defaults.
    pub fn from_env() -> Self {
        Self { opts: PipelineOptions::from_env(), store_path: None }
    }

    pub fn with_options(opts: PipelineOptions) -> Self {
        Self { opts, store_path: None }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn store(mut self, path: impl AsRef<Path>) -> Self { self.store_path = Some(path.as_ref().to_path_buf()); self }
    pub fn record_kind(mut self, kind: RecordKind) -> Self { self.opts = self.opts.with_record_kind(kind); self }
    pub fn chunk_bytes(mut self, bytes: usize) -> Self { self.opts = self.opts.with_chunk_bytes(bytes); self }
    pub fn max_window_bytes(mut self, bytes: usize) -> Self { self.opts = self.opts.with_max_window_bytes(bytes); self }
    pub fn commit_every(mut self, n: u64) -> Self { self.opts = self.opts.with_commit_every(n); self }
    pub fn log_every(mut self, n: u64) -> Self { self.opts = self.opts.with_log_every(n); self }
    pub fn page_size(mut self, n: usize) -> Self { self.opts = self.opts.with_page_size(n); self }
    pub fn cache_capacity(mut self, n: usize) -> Self { self.opts = self.opts.with_cache_capacity(n); self }
    pub fn min_score(mut self, score: i64) -> Self { self.opts = self.opts.with_min_score(score); self }
    pub fn clean_text(mut self, yes: bool) -> Self { self.opts = self.opts.with_clean_text(yes); self }
    pub fn pagination(mut self, p: Pagination) -> Self { self.opts = self.opts.with_pagination(p); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    fn open_store(&self) -> Result<Store> {
        let path = self.store_path.as_deref().ok_or_else(|| anyhow!("store path is required"))?;
        Store::open(path)
    }

    /// Load one RS/RC archive into the store.
    pub fn load(self, archive: impl AsRef<Path>) -> Result<LoadStats> {
        init_tracing_once();
        let mut store = self.open_store()?;
        let stats = load_archive(&mut store, archive.as_ref(), &self.opts)?;
        store.close()?;
        Ok(stats)
    }

    /// Join comments to parents and append pairs to the store's `train` table.
    pub fn build_pairs_table(self) -> Result<PairStats> {
        init_tracing_once();
        let mut store = self.open_store()?;
        let mut sink = TableSink::new(&store)?;
        let stats = build_pairs(&mut store, &mut sink, &self.opts)?;
        store.close()?;
        Ok(stats)
    }

    /// Join comments to parents and write pairs as JSON lines to `out`.
    pub fn build_pairs_jsonl(self, out: impl AsRef<Path>) -> Result<PairStats> {
        init_tracing_once();
        let mut store = self.open_store()?;
        let mut sink = JsonlSink::create(out.as_ref(), self.opts.write_buffer_bytes)?;
        let stats = build_pairs(&mut store, &mut sink, &self.opts)?;
        sink.finish()?;
        store.close()?;
        Ok(stats)
    }

    /// Join into any caller-supplied sink.
    pub fn build_pairs_into(self, sink: &mut dyn PairSink) -> Result<PairStats> {
        init_tracing_once();
        let mut store = self.open_store()?;
        let stats = build_pairs(&mut store, sink, &self.opts)?;
        store.close()?;
        Ok(stats)
    }
}
