#[path = "common/mod.rs"]
mod common;

use common::*;
use reddit_pairs::{
    build_pairs, is_valid, normalize, Comment, Pagination, ParentResolver, PipelineOptions,
    RecordKind, RedditPairs, Store, TrainingPair,
};
use serde_json::Value;

fn comment_row(score: i64, body: &str, distinguished: Option<&str>) -> Comment {
    Comment {
        id: "t1_x".into(),
        parent_id: "t3_p".into(),
        post_id: "t3_p".into(),
        author: "u/a".into(),
        score,
        created: "2006-01-01 00:00".into(),
        body: body.into(),
        distinguished: distinguished.map(str::to_owned),
        subreddit: "s".into(),
        link: "l".into(),
    }
}

fn store_with(records: &[(RecordKind, Value)]) -> Store {
    let store = Store::open_in_memory().unwrap();
    store.ensure_table(RecordKind::Submission).unwrap();
    store.ensure_table(RecordKind::Comment).unwrap();
    for (kind, v) in records {
        let row = normalize(&v.to_string(), *kind).unwrap();
        store.insert_row(&row).unwrap();
    }
    store
}

#[test]
fn validity_boundaries() {
    assert!(!is_valid(&comment_row(4, "ok", None), 5));
    assert!(is_valid(&comment_row(5, "ok", None), 5));
    assert!(!is_valid(&comment_row(100, "[deleted]", None), 5));
    assert!(!is_valid(&comment_row(100, "[deleted] edit: typo", None), 5));
    assert!(!is_valid(&comment_row(100, "[removed]", None), 5));
    assert!(is_valid(&comment_row(100, "not [deleted]", None), 5));
    assert!(!is_valid(&comment_row(1000, "ok", Some("moderator")), 5));
    assert!(is_valid(&comment_row(5, "ok", Some("admin")), 5));
}

/// One submission and one reply produce exactly one pair with `title\n\nbody` as input.
#[test]
fn single_submission_reply_pair() {
    let mut store = store_with(&[
        (RecordKind::Submission, submission("p1", 10, "T", "B")),
        (RecordKind::Comment, comment("c1", "t3_p1", 6, "hello")),
    ]);
    let mut out: Vec<TrainingPair> = Vec::new();
    let stats = build_pairs(&mut store, &mut out, &PipelineOptions::default()).unwrap();

    assert_eq!(stats.pairs, 1);
    assert_eq!(
        out,
        vec![TrainingPair {
            id: "t3_p1".into(),
            output_id: "t1_c1".into(),
            input: "T\n\nB".into(),
            output: "hello".into(),
        }]
    );
}

/// Empty selftext leaves just the title; comment parents contribute their body verbatim.
#[test]
fn input_text_by_parent_kind() {
    let mut store = store_with(&[
        (RecordKind::Submission, submission("p1", 10, "Title only", "")),
        (RecordKind::Comment, comment("c1", "t3_p1", 6, "  spaced body  ")),
        (RecordKind::Comment, comment("c2", "t1_c1", 6, "child")),
    ]);
    let mut out: Vec<TrainingPair> = Vec::new();
    build_pairs(&mut store, &mut out, &PipelineOptions::default()).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].input, "Title only");
    assert_eq!(out[1].id, "t1_c1");
    assert_eq!(out[1].input, "  spaced body  ");
}

/// Full corpus through the facade into the `train` table; see `make_corpus_basic` for
/// which comments survive.
#[test]
fn corpus_to_train_table() {
    let base = make_corpus_basic();
    let db = base.join("reddit.db");
    let etl = RedditPairs::new().store(&db);
    etl.clone().load(base.join("submissions").join("RS_2006-01.zst")).unwrap();
    etl.clone().load(base.join("comments").join("RC_2006-01.zst")).unwrap();

    let stats = etl.clone().page_size(2).build_pairs_table().unwrap();
    assert_eq!(stats.rows, 5);
    assert_eq!(stats.pairs, 2);
    assert_eq!(stats.missing_parent, 1);
    assert_eq!(stats.rejected, 2);

    let store = Store::open(&db).unwrap();
    let pairs = store.pairs().unwrap();
    let got: Vec<(&str, &str, &str)> =
        pairs.iter().map(|p| (p.id.as_str(), p.output_id.as_str(), p.input.as_str())).collect();
    assert_eq!(got, vec![("t3_p1", "t1_c1", "T\n\nB"), ("t1_c1", "t1_c2", "hello")]);
}

/// Keyset paging visits the same rows as offset paging.
#[test]
fn keyset_and_offset_agree() {
    let mut records = vec![(RecordKind::Submission, submission("p1", 10, "T", "B"))];
    for i in 0..23 {
        records.push((RecordKind::Comment, comment(&format!("c{i:02}"), "t3_p1", 5 + i, "reply")));
    }

    let mut a = store_with(&records);
    let mut offset_out: Vec<TrainingPair> = Vec::new();
    let opts = PipelineOptions::default().with_page_size(4);
    build_pairs(&mut a, &mut offset_out, &opts).unwrap();

    let mut b = store_with(&records);
    let mut keyset_out: Vec<TrainingPair> = Vec::new();
    build_pairs(&mut b, &mut keyset_out, &opts.clone().with_pagination(Pagination::Keyset)).unwrap();

    assert_eq!(offset_out.len(), 23);
    let mut x: Vec<_> = offset_out.into_iter().map(|p| p.output_id).collect();
    let mut y: Vec<_> = keyset_out.into_iter().map(|p| p.output_id).collect();
    x.sort();
    y.sort();
    assert_eq!(x, y);
}

/// Repeat parents come from the cache, not the store.
#[test]
fn resolver_reads_through_cache() {
    let store = store_with(&[
        (RecordKind::Submission, submission("p1", 10, "T", "B")),
        (RecordKind::Comment, comment("c1", "t3_p1", 6, "hello")),
    ]);
    let mut r = ParentResolver::new(1);

    assert!(r.resolve(&store, "t3_p1").unwrap().is_some());
    assert!(r.resolve(&store, "t3_p1").unwrap().is_some());
    assert!(r.resolve(&store, "t1_c1").unwrap().is_some());
    assert!(r.resolve(&store, "t1_c1").unwrap().is_some());
    assert_eq!((r.hits(), r.misses()), (2, 2));

    assert!(r.resolve(&store, "t3_absent").unwrap().is_none());
    assert!(r.resolve(&store, "t5_sub").unwrap().is_none());
    assert_eq!(r.misses(), 3);
}

/// JSONL output carries the four fields and, when asked, cleaned text.
#[test]
fn jsonl_output_with_cleaning() {
    let base = make_corpus_basic();
    let db = base.join("clean.db");
    let etl = RedditPairs::new().store(&db);
    etl.clone().load(base.join("submissions").join("RS_2006-01.zst")).unwrap();
    etl.clone().load(base.join("comments").join("RC_2006-01.zst")).unwrap();

    {
        let store = Store::open(&db).unwrap();
        store
            .insert_row(
                &normalize(
                    &comment("c9", "t3_p1", 8, "look [here](http://x.com/y) &amp;amp; 😀").to_string(),
                    RecordKind::Comment,
                )
                .unwrap(),
            )
            .unwrap();
    }

    let out = base.join("out").join("train.jsonl");
    let stats = etl.clean_text(true).build_pairs_jsonl(&out).unwrap();
    assert_eq!(stats.pairs, 3);

    let rows = read_jsonl_values(&out);
    assert_eq!(rows.len(), 3);
    for r in &rows {
        for k in ["id", "output_id", "input", "output"] {
            assert!(r.get(k).is_some(), "missing {k} in {r}");
        }
    }
    let c9 = rows.iter().find(|r| r["output_id"] == "t1_c9").unwrap();
    assert_eq!(c9["output"], "look  & ");
    assert!(!base.join("out").join("train.jsonl.tmp").exists());
}
