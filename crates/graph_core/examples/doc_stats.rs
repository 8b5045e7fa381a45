//! A slightly larger demonstration: computes per-document word-count and
//! average word-length statistics, then left-joins them against a separate
//! file of document titles, printing the combined records.
//!
//! Usage: `cargo run --example doc_stats -- docs.jsonl titles.jsonl`
//!
//! `docs.jsonl` holds `{"doc": <id>, "text": <string>}` records;
//! `titles.jsonl` holds `{"doc": <id>, "title": <string>}` records. A
//! document with no matching title still appears, with `title: null`.

use std::path::PathBuf;

use graph_core::pipeline::{JoinStrategy, Source};
use graph_core::{Pipeline, Record, Value};

fn main() -> graph_core::Result<()> {
    logutil::init_logging();

    let mut args = std::env::args().skip(1);
    let (docs_path, titles_path) = match (args.next(), args.next()) {
        (Some(d), Some(t)) => (d, t),
        _ => {
            eprintln!("usage: doc_stats <docs.jsonl> <titles.jsonl>");
            std::process::exit(1);
        }
    };

    let stats = Pipeline::new();
    stats.set_source(Source::File(PathBuf::from(docs_path)))?;
    stats.map(words)?;
    stats.sort(&["doc"])?;
    stats.reduce(summarize, &["doc"])?;
    stats.finalize()?;

    let titles = Pipeline::new();
    titles.set_source(Source::File(PathBuf::from(titles_path)))?;
    titles.finalize()?;

    let joined = Pipeline::new();
    joined.set_source(Source::Pipeline(stats))?;
    joined.join(&titles, &["doc"], JoinStrategy::Left)?;
    joined.finalize()?;

    for record in joined.run()? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

/// One output record per word: `{doc, len}`, `len` being that word's length.
/// `reduce` groups these back up per document to compute the aggregate.
fn words(record: &Record) -> Vec<Record> {
    let doc = record.get("doc").cloned().unwrap_or(Value::Null);
    let text = match record.get("text") {
        Some(Value::Str(s)) => s.clone(),
        _ => String::new(),
    };
    text.split_whitespace()
        .map(|word| {
            Record::new()
                .with("doc", doc.clone())
                .with("len", word.chars().count() as i64)
        })
        .collect()
}

fn summarize(group: &[Record]) -> Vec<Record> {
    let doc = group[0].get("doc").cloned().unwrap_or(Value::Null);
    let total: i64 = group
        .iter()
        .filter_map(|r| match r.get("len") {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        })
        .sum();
    let n = group.len() as i64;
    let avg_len = if n > 0 { total as f64 / n as f64 } else { 0.0 };
    vec![Record::new()
        .with("doc", doc)
        .with("n_words", n)
        .with("avg_len", avg_len)]
}
