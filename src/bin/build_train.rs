use anyhow::Result;
use reddit_pairs::{init_tracing_once, RedditPairs};
use std::path::PathBuf;

/// `--table` appends to the store's `train` table; any other output is a JSONL path
/// and gets the text cleaner applied.
fn main() -> Result<()> {
    init_tracing_once();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        let prog = args.first().map(String::as_str).unwrap_or("build_train");
        tracing::error!("Usage: {} <db file> <output.jsonl | --table>", prog);
        std::process::exit(1);
    }
    let db = PathBuf::from(&args[1]);
    let etl = RedditPairs::from_env().store(&db);

    let stats = if args[2] == "--table" {
        etl.build_pairs_table()?
    } else {
        etl.clean_text(true).build_pairs_jsonl(&args[2])?
    };
    println!(
        "Built {} pairs from {} comments (cache hits {}, misses {})",
        stats.pairs, stats.rows, stats.cache_hits, stats.cache_misses
    );
    Ok(())
}
