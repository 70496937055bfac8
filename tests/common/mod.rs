#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Write a compressed `.zst` file containing the provided JSONL lines.
/// Mirrors the dump's RC_/RS_ monthly files but with tiny content.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    write_zst_raw(path, lines.iter().map(|l| format!("{l}\n")).collect::<String>().as_bytes());
}

/// Compress raw bytes as-is (no newline handling), for boundary/edge-case archives.
pub fn write_zst_raw(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap();
}

/// Read a JSONL file into values (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<Value> {
    let f = File::open(path).unwrap();
    BufReader::new(f)
        .lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

/// Scratch directory that outlives the test body.
pub fn scratch_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// A submission record in the dump's shape.
pub fn submission(id: &str, score: i64, title: &str, selftext: &str) -> Value {
    json!({
        "id": id, "author": "bob", "title": title, "score": score, "selftext": selftext,
        "created_utc": 1136073600, "link_flair_text": null, "subreddit": "programming",
        "permalink": format!("/r/programming/comments/{id}/x/"), "distinguished": null
    })
}

/// A comment record in the dump's shape (no `name`, so the id is synthesized).
pub fn comment(id: &str, parent_id: &str, score: i64, body: &str) -> Value {
    json!({
        "id": id, "parent_id": parent_id, "link_id": "t3_p1", "author": "alice",
        "score": score, "body": body, "created_utc": 1136074600,
        "subreddit": "programming", "distinguished": null
    })
}

/// Tiny corpus under a temp dir:
/// - RS_2006-01.zst: p1 (score 10, "T"/"B"), p2 (score 1), plus one malformed line
/// - RC_2006-01.zst: c1 → t3_p1 (6, "hello"), c2 → t1_c1 (7), c3 → t3_p2 (low-score parent),
///   c4 → t3_gone (missing parent), c5 → t1_c1 ("[deleted]"), plus one record missing `body`
pub fn make_corpus_basic() -> PathBuf {
    let base = scratch_dir();
    let rs = vec![
        submission("p1", 10, "T", "B").to_string(),
        submission("p2", 1, "low", "").to_string(),
        "{not json".to_string(),
    ];
    write_zst_lines(&base.join("submissions").join("RS_2006-01.zst"), &rs);

    let mut no_body = comment("c6", "t3_p1", 9, "x");
    no_body.as_object_mut().unwrap().remove("body");
    let rc = vec![
        comment("c1", "t3_p1", 6, "hello").to_string(),
        comment("c2", "t1_c1", 7, "reply to hello").to_string(),
        comment("c3", "t3_p2", 50, "parent too low").to_string(),
        comment("c4", "t3_gone", 50, "orphan").to_string(),
        comment("c5", "t1_c1", 50, "[deleted]").to_string(),
        no_body.to_string(),
    ];
    write_zst_lines(&base.join("comments").join("RC_2006-01.zst"), &rc);
    base
}
