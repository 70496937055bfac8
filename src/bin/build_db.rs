use anyhow::Result;
use reddit_pairs::{init_tracing_once, RedditPairs};
use std::path::PathBuf;

fn main() -> Result<()> {
    init_tracing_once();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        let prog = args.first().map(String::as_str).unwrap_or("build_db");
        tracing::error!("Usage: {} <zst file> <db file>", prog);
        std::process::exit(1);
    }
    let archive = PathBuf::from(&args[1]);
    let db = PathBuf::from(&args[2]);

    let stats = RedditPairs::from_env().store(&db).load(&archive)?;
    println!(
        "Loaded {} lines ({} inserted, {} bad) from {}",
        stats.lines,
        stats.inserted,
        stats.bad_lines,
        archive.display()
    );
    Ok(())
}
