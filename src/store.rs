//! SQLite-backed relational store: `submissions`, `comments` and `train`.
//!
//! The handle is explicit and owned by whichever stage runs; nothing is global.
//! Batches are framed with manual `BEGIN`/`COMMIT` so a failed row insert only
//! aborts its own statement, never the surrounding batch.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::pairs::TrainingPair;
use crate::paths::RecordKind;
use crate::record::{Comment, NormalizedRow, Submission};

const SUBMISSIONS_DDL: &str = "CREATE TABLE IF NOT EXISTS submissions (\
    id TEXT UNIQUE PRIMARY KEY, author TEXT, title TEXT, score INTEGER, created TEXT, \
    body TEXT, flair TEXT, distinguished TEXT, subreddit TEXT, link TEXT)";

const COMMENTS_DDL: &str = "CREATE TABLE IF NOT EXISTS comments (\
    id TEXT UNIQUE PRIMARY KEY, parent_id TEXT, post_id TEXT, author TEXT, score INTEGER, \
    created TEXT, body TEXT, distinguished TEXT, subreddit TEXT, link TEXT)";

const TRAIN_DDL: &str =
    "CREATE TABLE IF NOT EXISTS train (id TEXT, output_id TEXT, input TEXT, output TEXT)";

const SUBMISSION_COLS: &str =
    "id, author, title, score, created, body, flair, distinguished, subreddit, link";
const COMMENT_COLS: &str =
    "id, parent_id, post_id, author, score, created, body, distinguished, subreddit, link";

pub struct Store {
    conn: Connection,
    in_tx: bool,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path).with_context(|| format!("open store {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             PRAGMA busy_timeout=5000;",
        )?;
        Ok(Self { conn, in_tx: false })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()?, in_tx: false })
    }

    /// Create the table a record kind loads into, if missing.
    pub fn ensure_table(&self, kind: RecordKind) -> Result<()> {
        let ddl = match kind {
            RecordKind::Submission => SUBMISSIONS_DDL,
            RecordKind::Comment => COMMENTS_DDL,
        };
        self.conn.execute_batch(ddl).with_context(|| format!("create table {}", kind.table()))
    }

    pub fn ensure_train_table(&self) -> Result<()> {
        self.conn.execute_batch(TRAIN_DDL).context("create table train")
    }

    /// Open a batch if none is open.
    pub fn begin(&mut self) -> Result<()> {
        if !self.in_tx {
            self.conn.execute_batch("BEGIN").context("begin batch")?;
            self.in_tx = true;
        }
        Ok(())
    }

    /// Commit the open batch, if any.
    pub fn commit(&mut self) -> Result<()> {
        if self.in_tx {
            self.conn.execute_batch("COMMIT").context("commit batch")?;
            self.in_tx = false;
        }
        Ok(())
    }

    /// Commit any open batch and release the handle. Prefer this over a plain drop,
    /// which can only log a failed final commit.
    pub fn close(mut self) -> Result<()> {
        self.commit()
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Insert one normalized row. Constraint violations come back as errors for the
    /// caller to count; the open batch is unaffected.
    pub fn insert_row(&self, row: &NormalizedRow) -> rusqlite::Result<()> {
        match row {
            NormalizedRow::Submission(s) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "INSERT INTO submissions ({SUBMISSION_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ))?;
                stmt.execute(params![
                    s.id, s.author, s.title, s.score, s.created, s.body, s.flair, s.distinguished,
                    s.subreddit, s.link
                ])?;
            }
            NormalizedRow::Comment(c) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "INSERT INTO comments ({COMMENT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ))?;
                stmt.execute(params![
                    c.id, c.parent_id, c.post_id, c.author, c.score, c.created, c.body,
                    c.distinguished, c.subreddit, c.link
                ])?;
            }
        }
        Ok(())
    }

    pub fn insert_pair(&self, pair: &TrainingPair) -> rusqlite::Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO train (id, output_id, input, output) VALUES (?1, ?2, ?3, ?4)")?;
        stmt.execute(params![pair.id, pair.output_id, pair.input, pair.output])?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn count(&self, kind: RecordKind) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", kind.table()), [], |row| row.get(0))
            .with_context(|| format!("count {}", kind.table()))?;
        Ok(n.max(0) as u64)
    }

    pub fn count_pairs(&self) -> Result<u64> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM train", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    /// One page of comments in storage order.
    pub fn comments_page(&self, limit: usize, offset: u64) -> Result<Vec<Comment>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {COMMENT_COLS} FROM comments LIMIT ?1 OFFSET ?2"))?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], comment_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("read comments page")
    }

    /// One page of comments ordered by id, strictly after `after`.
    pub fn comments_after(&self, after: Option<&str>, limit: usize) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {COMMENT_COLS} FROM comments WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![after.unwrap_or(""), limit as i64], comment_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("read comments page")
    }

    pub fn comment(&self, id: &str) -> Result<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {COMMENT_COLS} FROM comments WHERE id = ?1 LIMIT 1"))?;
        stmt.query_row(params![id], comment_from_row)
            .optional()
            .with_context(|| format!("lookup comment {id}"))
    }

    pub fn submission(&self, id: &str) -> Result<Option<Submission>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SUBMISSION_COLS} FROM submissions WHERE id = ?1 LIMIT 1"
        ))?;
        stmt.query_row(params![id], submission_from_row)
            .optional()
            .with_context(|| format!("lookup submission {id}"))
    }

    /// All training pairs in insertion order.
    pub fn pairs(&self) -> Result<Vec<TrainingPair>> {
        let mut stmt = self.conn.prepare("SELECT id, output_id, input, output FROM train")?;
        let rows = stmt.query_map([], |row| {
            Ok(TrainingPair {
                id: text(row, "id")?,
                output_id: text(row, "output_id")?,
                input: text(row, "input")?,
                output: text(row, "output")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("read train")
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.in_tx {
            if let Err(e) = self.conn.execute_batch("COMMIT") {
                tracing::warn!(error = %e, "failed to flush open batch while closing store");
            }
        }
    }
}

fn text(row: &Row<'_>, col: &str) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(col)?.unwrap_or_default())
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: text(row, "id")?,
        parent_id: text(row, "parent_id")?,
        post_id: text(row, "post_id")?,
        author: text(row, "author")?,
        score: row.get::<_, Option<i64>>("score")?.unwrap_or(0),
        created: text(row, "created")?,
        body: text(row, "body")?,
        distinguished: row.get("distinguished")?,
        subreddit: text(row, "subreddit")?,
        link: text(row, "link")?,
    })
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: text(row, "id")?,
        author: text(row, "author")?,
        title: text(row, "title")?,
        score: row.get::<_, Option<i64>>("score")?.unwrap_or(0),
        created: text(row, "created")?,
        body: text(row, "body")?,
        flair: row.get("flair")?,
        distinguished: row.get("distinguished")?,
        subreddit: text(row, "subreddit")?,
        link: text(row, "link")?,
    })
}
