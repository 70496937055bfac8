//! Pair builder: joins every comment to its parent and emits (input, output) pairs.
//!
//! The comments table is walked page by page. Each comment's `parent_id` is dispatched
//! on its prefix (`t1_` comment, `t3_` submission) and resolved through a per-table LRU
//! before falling back to a point query. A pair is emitted only when both the comment
//! and its parent pass [`is_valid`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

use crate::cache::LruCache;
use crate::clean::clean_text;
use crate::config::{Pagination, PipelineOptions};
use crate::ndjson::NdjsonWriter;
use crate::paths::RecordKind;
use crate::progress::{make_count_bar, percent};
use crate::record::{Comment, Submission};
use crate::store::Store;

/// One training example: parent text in, reply text out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPair {
    /// parent id (`t1_…` or `t3_…`)
    pub id: String,
    /// replying comment id
    pub output_id: String,
    pub input: String,
    pub output: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PairStats {
    pub rows: u64,
    pub pairs: u64,
    pub missing_parent: u64,
    pub rejected: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

// ----------------------------- Validity ------------------------------------

/// The columns the validity predicate looks at.
pub trait Scored {
    fn score(&self) -> i64;
    fn body(&self) -> &str;
    fn distinguished(&self) -> Option<&str>;
}

impl Scored for Comment {
    fn score(&self) -> i64 { self.score }
    fn body(&self) -> &str { &self.body }
    fn distinguished(&self) -> Option<&str> { self.distinguished.as_deref() }
}

impl Scored for Submission {
    fn score(&self) -> i64 { self.score }
    fn body(&self) -> &str { &self.body }
    fn distinguished(&self) -> Option<&str> { self.distinguished.as_deref() }
}

/// Score at least `min_score`, body not starting with `[removed]`/`[deleted]`,
/// and not moderator-distinguished.
pub fn is_valid<T: Scored + ?Sized>(row: &T, min_score: i64) -> bool {
    if row.score() < min_score {
        return false;
    }
    let body = row.body();
    if body.starts_with("[removed]") || body.starts_with("[deleted]") {
        return false;
    }
    row.distinguished() != Some("moderator")
}

// ----------------------------- Parents ------------------------------------

#[derive(Clone, Debug)]
pub enum Parent {
    Submission(Rc<Submission>),
    Comment(Rc<Comment>),
}

impl Parent {
    pub fn is_valid(&self, min_score: i64) -> bool {
        match self {
            Parent::Submission(s) => is_valid(s.as_ref(), min_score),
            Parent::Comment(c) => is_valid(c.as_ref(), min_score),
        }
    }

    /// Submission: `title\n\nbody` with trailing whitespace stripped. Comment: body verbatim.
    pub fn input_text(&self) -> String {
        match self {
            Parent::Submission(s) => format!("{}\n\n{}", s.title, s.body).trim_end().to_string(),
            Parent::Comment(c) => c.body.clone(),
        }
    }
}

/// Read-through parent lookup: cache first, store on miss, populate on hit in store.
/// Absent parents are not cached.
pub struct ParentResolver {
    comments: LruCache<String, Rc<Comment>>,
    submissions: LruCache<String, Rc<Submission>>,
    hits: u64,
    misses: u64,
}

impl ParentResolver {
    pub fn new(capacity: usize) -> Self {
        Self {
            comments: LruCache::new(capacity),
            submissions: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn resolve(&mut self, store: &Store, parent_id: &str) -> Result<Option<Parent>> {
        match RecordKind::from_parent_id(parent_id) {
            Some(RecordKind::Comment) => {
                if let Some(c) = self.comments.get(parent_id) {
                    self.hits += 1;
                    return Ok(Some(Parent::Comment(Rc::clone(c))));
                }
                self.misses += 1;
                let Some(c) = store.comment(parent_id)? else { return Ok(None) };
                let c = Rc::new(c);
                self.comments.put(parent_id.to_owned(), Rc::clone(&c));
                Ok(Some(Parent::Comment(c)))
            }
            Some(RecordKind::Submission) => {
                if let Some(s) = self.submissions.get(parent_id) {
                    self.hits += 1;
                    return Ok(Some(Parent::Submission(Rc::clone(s))));
                }
                self.misses += 1;
                let Some(s) = store.submission(parent_id)? else { return Ok(None) };
                let s = Rc::new(s);
                self.submissions.put(parent_id.to_owned(), Rc::clone(&s));
                Ok(Some(Parent::Submission(s)))
            }
            None => Ok(None),
        }
    }

    pub fn hits(&self) -> u64 { self.hits }
    pub fn misses(&self) -> u64 { self.misses }
}

// ----------------------------- Sinks ------------------------------------

/// Where emitted pairs go.
pub trait PairSink {
    fn emit(&mut self, store: &Store, pair: TrainingPair) -> Result<()>;
}

/// Append to the store's `train` table (created on construction).
pub struct TableSink;

impl TableSink {
    pub fn new(store: &Store) -> Result<Self> {
        store.ensure_train_table()?;
        Ok(TableSink)
    }
}

impl PairSink for TableSink {
    fn emit(&mut self, store: &Store, pair: TrainingPair) -> Result<()> {
        store.insert_pair(&pair)?;
        Ok(())
    }
}

/// One JSON object per line, promoted into place by [`JsonlSink::finish`].
pub struct JsonlSink {
    writer: NdjsonWriter,
}

impl JsonlSink {
    pub fn create(path: &Path, buf_bytes: usize) -> Result<Self> {
        Ok(Self { writer: NdjsonWriter::create(path, buf_bytes)? })
    }

    pub fn finish(self) -> Result<()> {
        self.writer.finish()
    }
}

impl PairSink for JsonlSink {
    fn emit(&mut self, _store: &Store, pair: TrainingPair) -> Result<()> {
        self.writer.write_record(&pair)
    }
}

impl PairSink for Vec<TrainingPair> {
    fn emit(&mut self, _store: &Store, pair: TrainingPair) -> Result<()> {
        self.push(pair);
        Ok(())
    }
}

// ----------------------------- Join ------------------------------------

pub fn build_pairs(store: &mut Store, sink: &mut dyn PairSink, opts: &PipelineOptions) -> Result<PairStats> {
    let total = store.count(RecordKind::Comment)?;
    tracing::info!(comments = total, pagination = ?opts.pagination, "building pairs");
    let pb = if opts.progress { Some(make_count_bar(total, "Pairing")) } else { None };

    let mut resolver = ParentResolver::new(opts.cache_capacity);
    let mut stats = PairStats::default();
    let mut offset = 0u64;
    let mut after: Option<String> = None;
    let mut unflushed = 0u64;

    store.begin()?;
    loop {
        let page = match opts.pagination {
            Pagination::Offset => store.comments_page(opts.page_size, offset)?,
            Pagination::Keyset => store.comments_after(after.as_deref(), opts.page_size)?,
        };
        let Some(last) = page.last() else { break };
        after = Some(last.id.clone());
        offset += page.len() as u64;

        for comment in &page {
            stats.rows += 1;
            if is_valid(comment, opts.min_score) {
                match resolver.resolve(store, &comment.parent_id)? {
                    None => stats.missing_parent += 1,
                    Some(parent) if parent.is_valid(opts.min_score) => {
                        sink.emit(store, make_pair(&parent, comment, opts.clean_text))?;
                        stats.pairs += 1;
                        unflushed += 1;
                    }
                    Some(_) => stats.rejected += 1,
                }
            } else {
                stats.rejected += 1;
            }

            if unflushed >= opts.pair_commit_every {
                store.commit()?;
                store.begin()?;
                unflushed = 0;
            }
            if stats.rows % opts.pair_log_every == 0 {
                tracing::info!(
                    "{} : {} : {} : {}%",
                    comment.created,
                    stats.pairs,
                    stats.rows,
                    percent(stats.rows, total)
                );
            }
        }
        if let Some(pb) = &pb {
            pb.set_position(stats.rows);
        }
    }
    store.commit()?;

    stats.cache_hits = resolver.hits();
    stats.cache_misses = resolver.misses();
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    tracing::info!("Complete : {}", stats.pairs);
    Ok(stats)
}

fn make_pair(parent: &Parent, comment: &Comment, clean: bool) -> TrainingPair {
    let input = parent.input_text();
    let (input, output) = if clean {
        (clean_text(&input), clean_text(&comment.body))
    } else {
        (input, comment.body.clone())
    };
    TrainingPair {
        id: comment.parent_id.clone(),
        output_id: comment.id.clone(),
        input,
        output,
    }
}
