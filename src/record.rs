//! Record normalizer: one raw JSON line of an RS/RC dump → one typed row.
//!
//! Derivation rules (applied per column):
//! - `created`: `created_utc` epoch seconds → `YYYY-MM-DD HH:MM` (UTC)
//! - `link`: `https://www.reddit.com<permalink>` when a permalink exists, otherwise
//!   synthesized from subreddit, `link_id` (type prefix stripped) and `id`
//! - `author`: prefixed with `u/`
//! - submission `body`: `selftext`, or empty when absent
//! - comment `id`: `name`, or `t1_<id>` when absent; submission `id`: always `t3_<id>`
//! - `distinguished` (and submission `flair`): NULL when absent
//! - everything else is copied and rendered as text

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::date::format_created;
use crate::json_utils::{repair_lone_surrogates, require_int, require_text, text_of, Object};
use crate::paths::RecordKind;

/// Per-record failure. Never fatal: the loader counts it and moves on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a JSON object")]
    NotObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` has an unusable value")]
    InvalidField(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub author: String,
    pub title: String,
    pub score: i64,
    pub created: String,
    pub body: String,
    pub flair: Option<String>,
    pub distinguished: Option<String>,
    pub subreddit: String,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    pub post_id: String,
    pub author: String,
    pub score: i64,
    pub created: String,
    pub body: String,
    pub distinguished: Option<String>,
    pub subreddit: String,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedRow {
    Submission(Submission),
    Comment(Comment),
}

impl NormalizedRow {
    pub fn kind(&self) -> RecordKind {
        match self {
            NormalizedRow::Submission(_) => RecordKind::Submission,
            NormalizedRow::Comment(_) => RecordKind::Comment,
        }
    }
    pub fn id(&self) -> &str {
        match self {
            NormalizedRow::Submission(s) => &s.id,
            NormalizedRow::Comment(c) => &c.id,
        }
    }
    pub fn created(&self) -> &str {
        match self {
            NormalizedRow::Submission(s) => &s.created,
            NormalizedRow::Comment(c) => &c.created,
        }
    }
}

/// Parse and normalize one line. `kind` is decided once per archive, not per row.
pub fn normalize(line: &str, kind: RecordKind) -> Result<NormalizedRow, RecordError> {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => match repair_lone_surrogates(line) {
            Some(fixed) => serde_json::from_str(&fixed)?,
            None => return Err(e.into()),
        },
    };
    let obj = value.as_object().ok_or(RecordError::NotObject)?;
    match kind {
        RecordKind::Submission => normalize_submission(obj).map(NormalizedRow::Submission),
        RecordKind::Comment => normalize_comment(obj).map(NormalizedRow::Comment),
    }
}

pub fn normalize_submission(obj: &Object) -> Result<Submission, RecordError> {
    Ok(Submission {
        id: format!("t3_{}", require_text(obj, "id")?),
        author: author_of(obj)?,
        title: require_text(obj, "title")?,
        score: require_int(obj, "score")?,
        created: created_of(obj)?,
        body: obj.get("selftext").and_then(text_of).unwrap_or_default(),
        flair: obj.get("link_flair_text").and_then(text_of),
        distinguished: obj.get("distinguished").and_then(text_of),
        subreddit: require_text(obj, "subreddit")?,
        link: link_of(obj)?,
    })
}

pub fn normalize_comment(obj: &Object) -> Result<Comment, RecordError> {
    let id = match obj.get("name").and_then(text_of) {
        Some(name) => name,
        None => format!("t1_{}", require_text(obj, "id")?),
    };
    Ok(Comment {
        id,
        parent_id: require_text(obj, "parent_id")?,
        post_id: require_text(obj, "link_id")?,
        author: author_of(obj)?,
        score: require_int(obj, "score")?,
        created: created_of(obj)?,
        body: require_text(obj, "body")?,
        distinguished: obj.get("distinguished").and_then(text_of),
        subreddit: require_text(obj, "subreddit")?,
        link: link_of(obj)?,
    })
}

fn author_of(obj: &Object) -> Result<String, RecordError> {
    Ok(format!("u/{}", require_text(obj, "author")?))
}

fn created_of(obj: &Object) -> Result<String, RecordError> {
    Ok(format_created(require_int(obj, "created_utc")?))
}

/// Permalink when present, else `/r/<sub>/comments/<post>/_/<id>/`.
pub fn link_of(obj: &Object) -> Result<String, RecordError> {
    if let Some(permalink) = obj.get("permalink").and_then(text_of) {
        return Ok(format!("https://www.reddit.com{permalink}"));
    }
    let subreddit = require_text(obj, "subreddit")?;
    let link_id = require_text(obj, "link_id")?;
    let id = require_text(obj, "id")?;
    let post: String = link_id.chars().skip(3).collect();
    Ok(format!("https://www.reddit.com/r/{subreddit}/comments/{post}/_/{id}/"))
}
