//! Bulk loader: archive lines → normalized rows → `submissions` / `comments`.
//!
//! Per-line failures (bad JSON, missing keys, rejected inserts such as duplicate ids)
//! are counted and skipped. Decode failures and batch commit failures end the run, after
//! the rows inserted so far have been committed.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;

use crate::config::PipelineOptions;
use crate::paths::RecordKind;
use crate::progress::{make_bytes_bar, percent};
use crate::record::normalize;
use crate::store::Store;
use crate::zstd_jsonl::{log_decode_failure, open_archive, FrameError};

/// Totals for one load. `inserted + bad_lines == lines` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub lines: u64,
    pub bad_lines: u64,
    pub inserted: u64,
    pub bytes_processed: u64,
}

/// Stream one zstd archive into `store`. The target table comes from
/// `opts.record_kind`, or the archive path when that is unset.
pub fn load_archive(store: &mut Store, archive: &Path, opts: &PipelineOptions) -> Result<LoadStats> {
    let kind = opts.record_kind.unwrap_or_else(|| RecordKind::infer_from_path(archive));
    let (lines, total_bytes) = open_archive(archive, opts)?;
    tracing::info!(path = %archive.display(), table = kind.table(), bytes = total_bytes, "loading archive");

    let pb = if opts.progress {
        Some(make_bytes_bar(total_bytes, &format!("Loading {}", kind.table())))
    } else {
        None
    };
    let res = load_lines(store, lines, total_bytes, kind, opts, archive, pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    res
}

/// Core loop over `(line, bytes_consumed)` items; `total_bytes` is the percent denominator.
pub(crate) fn load_lines<I>(
    store: &mut Store,
    lines: I,
    total_bytes: u64,
    kind: RecordKind,
    opts: &PipelineOptions,
    source: &Path,
    pb: Option<&ProgressBar>,
) -> Result<LoadStats>
where
    I: IntoIterator<Item = Result<(String, u64), FrameError>>,
{
    store.ensure_table(kind)?;
    store.begin()?;

    let mut stats = LoadStats::default();
    let mut last_created = String::from("-");

    for item in lines {
        let (line, pos) = match item {
            Ok(v) => v,
            Err(e) => {
                log_decode_failure(source, &e);
                store.commit()?;
                tracing::info!("Complete : {} : {}", stats.lines, stats.bad_lines);
                return Err(e).with_context(|| format!("decoding {}", source.display()));
            }
        };
        stats.bytes_processed = pos;

        match normalize(&line, kind) {
            Ok(row) => match store.insert_row(&row) {
                Ok(()) => {
                    stats.inserted += 1;
                    last_created.clear();
                    last_created.push_str(row.created());
                }
                Err(e) => {
                    stats.bad_lines += 1;
                    tracing::debug!(id = row.id(), error = %e, "insert rejected");
                }
            },
            Err(e) => {
                stats.bad_lines += 1;
                tracing::debug!(error = %e, "bad record");
            }
        }
        stats.lines += 1;

        if stats.lines % opts.commit_every == 0 {
            if let Err(e) = store.commit().and_then(|_| store.begin()) {
                tracing::error!(line = %line, "batch commit failed");
                return Err(e);
            }
        }
        if stats.lines % opts.log_every == 0 {
            tracing::info!(
                "{} : {} : {} : {}%",
                last_created,
                stats.lines,
                stats.bad_lines,
                percent(pos, total_bytes)
            );
        }
        if let Some(pb) = pb {
            pb.set_position(pos);
        }
    }

    store.commit()?;
    tracing::info!("Complete : {} : {}", stats.lines, stats.bad_lines);
    Ok(stats)
}
