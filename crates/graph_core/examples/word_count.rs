//! Runs a `map -> sort -> reduce` word-count pipeline over a JSON Lines file
//! of `{"doc": <id>, "text": <string>}` records and prints the result, one
//! JSON object per line, to stdout.
//!
//! Usage: `cargo run --example word_count -- path/to/docs.jsonl`

use std::path::PathBuf;

use graph_core::pipeline::Source;
use graph_core::{Pipeline, Record, Value};

fn main() -> graph_core::Result<()> {
    logutil::init_logging();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: word_count <input.jsonl>");
        std::process::exit(1);
    });

    let pipeline = Pipeline::new();
    pipeline.set_source(Source::File(PathBuf::from(path)))?;
    pipeline.map(tokenize)?;
    pipeline.sort(&["doc", "word"])?;
    pipeline.reduce(count_group, &["doc", "word"])?;
    pipeline.finalize()?;

    for record in pipeline.run()? {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn tokenize(record: &Record) -> Vec<Record> {
    let doc = record.get("doc").cloned().unwrap_or(Value::Null);
    let text = match record.get("text") {
        Some(Value::Str(s)) => s.clone(),
        _ => String::new(),
    };
    text.split_whitespace()
        .map(|word| Record::new().with("doc", doc.clone()).with("word", word))
        .collect()
}

fn count_group(group: &[Record]) -> Vec<Record> {
    let first = &group[0];
    vec![Record::new()
        .with("doc", first.get("doc").cloned().unwrap_or(Value::Null))
        .with("word", first.get("word").cloned().unwrap_or(Value::Null))
        .with("n", group.len() as i64)]
}
