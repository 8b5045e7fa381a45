//! End-to-end scenarios (S1-S6) and the cross-operator invariants of the
//! compute graph's public contract. Per-operator edge cases live next to
//! each operator instead; this file only exercises behavior that spans
//! several operators or pipelines.

use std::cell::RefCell;
use std::rc::Rc;

use graph_core::pipeline::{JoinStrategy, Source};
use graph_core::{Pipeline, Record, Value};
use similar_asserts::assert_eq as sim_assert_eq;

fn rec(fields: &[(&str, Value)]) -> Record {
    let mut r = Record::new();
    for (k, v) in fields {
        r.set(*k, v.clone());
    }
    r
}

// S1 - map + sort + reduce (word count).
#[test]
fn s1_word_count() {
    let input = vec![
        rec(&[("doc", Value::Int(1)), ("text", Value::Str("a a b".into()))]),
        rec(&[("doc", Value::Int(2)), ("text", Value::Str("b c".into()))]),
    ];

    let p = Pipeline::new();
    p.set_source(Source::InMemory(input)).unwrap();
    p.map(|r| {
        let doc = r.get("doc").cloned().unwrap();
        let text = match r.get("text") {
            Some(Value::Str(s)) => s.clone(),
            _ => String::new(),
        };
        text.split_whitespace()
            .map(|word| {
                Record::new()
                    .with("doc", doc.clone())
                    .with("word", word)
            })
            .collect()
    })
    .unwrap();
    p.sort(&["doc", "word"]).unwrap();
    p.reduce(
        |group| {
            let first = &group[0];
            vec![Record::new()
                .with("doc", first.get("doc").cloned().unwrap())
                .with("word", first.get("word").cloned().unwrap())
                .with("n", group.len() as i64)]
        },
        &["doc", "word"],
    )
    .unwrap();
    p.finalize().unwrap();

    let out = p.run().unwrap();

    let expected = vec![
        rec(&[("doc", Value::Int(1)), ("word", Value::Str("a".into())), ("n", Value::Int(2))]),
        rec(&[("doc", Value::Int(1)), ("word", Value::Str("b".into())), ("n", Value::Int(1))]),
        rec(&[("doc", Value::Int(2)), ("word", Value::Str("b".into())), ("n", Value::Int(1))]),
        rec(&[("doc", Value::Int(2)), ("word", Value::Str("c".into())), ("n", Value::Int(1))]),
    ];
    sim_assert_eq!(out, expected);
}

// S2 - fold counting.
#[test]
fn s2_fold_counts_records() {
    let input = vec![Record::new(), Record::new(), Record::new()];

    let p = Pipeline::new();
    p.set_source(Source::InMemory(input)).unwrap();
    p.fold(
        |_r, acc| {
            let n = match acc.get("count") {
                Some(Value::Int(n)) => *n,
                _ => 0,
            };
            Record::new().with("count", n + 1)
        },
        Record::new().with("count", 0i64),
    )
    .unwrap();
    p.finalize().unwrap();

    let out = p.run().unwrap();
    assert_eq!(out, vec![Record::new().with("count", 3i64)]);
}

fn left_right_fixtures() -> (Pipeline, Pipeline) {
    let left = Pipeline::new();
    left.set_source(Source::InMemory(vec![
        rec(&[("id", Value::Int(1)), ("name", Value::Str("A".into()))]),
        rec(&[("id", Value::Int(2)), ("name", Value::Str("B".into()))]),
    ]))
    .unwrap();
    left.finalize().unwrap();

    let right = Pipeline::new();
    right
        .set_source(Source::InMemory(vec![
            rec(&[("id", Value::Int(2)), ("city", Value::Str("X".into()))]),
            rec(&[("id", Value::Int(3)), ("city", Value::Str("Y".into()))]),
        ]))
        .unwrap();
    right.finalize().unwrap();

    (left, right)
}

// S3 - inner join.
#[test]
fn s3_inner_join() {
    let (left, right) = left_right_fixtures();
    // The join operator's *input* stream is the left side; give it the
    // fixture left pipeline as its source.
    let joined = Pipeline::new();
    joined.set_source(Source::Pipeline(left)).unwrap();
    joined.join(&right, &["id"], JoinStrategy::Inner).unwrap();
    joined.finalize().unwrap();

    let out = joined.run().unwrap();
    let expected = vec![rec(&[
        ("id", Value::Int(2)),
        ("name", Value::Str("B".into())),
        ("city", Value::Str("X".into())),
    ])];
    sim_assert_eq!(out, expected);
}

// S4 - left join.
#[test]
fn s4_left_join() {
    let (left, right) = left_right_fixtures();
    let joined = Pipeline::new();
    joined.set_source(Source::Pipeline(left)).unwrap();
    joined.join(&right, &["id"], JoinStrategy::Left).unwrap();
    joined.finalize().unwrap();

    let out = joined.run().unwrap();
    let expected = vec![
        rec(&[
            ("id", Value::Int(2)),
            ("name", Value::Str("B".into())),
            ("city", Value::Str("X".into())),
        ]),
        rec(&[
            ("id", Value::Int(1)),
            ("name", Value::Str("A".into())),
            ("city", Value::Null),
        ]),
    ];
    sim_assert_eq!(out, expected);
}

// S5 - outer join.
#[test]
fn s5_outer_join() {
    let (left, right) = left_right_fixtures();
    let joined = Pipeline::new();
    joined.set_source(Source::Pipeline(left)).unwrap();
    joined.join(&right, &["id"], JoinStrategy::Outer).unwrap();
    joined.finalize().unwrap();

    let out = joined.run().unwrap();
    assert_eq!(out.len(), 3);
    let inner = out.iter().find(|r| r.get("id") == Some(&Value::Int(2))).unwrap();
    assert_eq!(inner.get("city"), Some(&Value::Str("X".into())));
    let left_addition = out.iter().find(|r| r.get("id") == Some(&Value::Int(1))).unwrap();
    assert_eq!(left_addition.get("city"), Some(&Value::Null));
    let right_addition = out.iter().find(|r| r.get("id") == Some(&Value::Int(3))).unwrap();
    assert_eq!(right_addition.get("name"), Some(&Value::Null));
}

// S6 - a shared dependency materializes exactly once across two consumers.
#[test]
fn s6_shared_dependency_materializes_once() {
    let pull_count = Rc::new(RefCell::new(0));

    let a = Pipeline::new();
    a.set_source(Source::InMemory(vec![
        rec(&[("id", Value::Int(1))]),
        rec(&[("id", Value::Int(2))]),
    ]))
    .unwrap();
    {
        let pull_count = pull_count.clone();
        a.map(move |r| {
            *pull_count.borrow_mut() += 1;
            vec![r.clone()]
        })
        .unwrap();
    }
    a.sort(&["id"]).unwrap();
    a.finalize().unwrap();

    let b = Pipeline::new();
    b.set_source(Source::Pipeline(a.clone())).unwrap();
    b.finalize().unwrap();

    let c = Pipeline::new();
    c.set_source(Source::Pipeline(a.clone())).unwrap();
    c.finalize().unwrap();

    assert_eq!(a.refcount(), 2);

    let out_b = b.run().unwrap();
    let out_c = c.run().unwrap();
    assert_eq!(out_b, out_c);
    // `a`'s mapper ran exactly twice total (once per input record), not
    // once per (record, consumer) pair.
    assert_eq!(*pull_count.borrow(), 2);
}

// Boundary: empty source.
#[test]
fn empty_source_every_operator_is_empty_except_fold() {
    let p = Pipeline::new();
    p.set_source(Source::InMemory(vec![])).unwrap();
    p.map(|r| vec![r.clone()]).unwrap();
    p.finalize().unwrap();
    assert!(p.run().unwrap().is_empty());

    let f = Pipeline::new();
    f.set_source(Source::InMemory(vec![])).unwrap();
    f.fold(|_r, acc| acc.clone(), Record::new().with("count", 0i64))
        .unwrap();
    f.finalize().unwrap();
    assert_eq!(f.run().unwrap(), vec![Record::new().with("count", 0i64)]);
}

// Boundary: a mapper that drops its only input record yields an empty result.
#[test]
fn single_record_mapped_to_nothing_is_empty() {
    let p = Pipeline::new();
    p.set_source(Source::InMemory(vec![rec(&[("id", Value::Int(1))])]))
        .unwrap();
    p.map(|_r| Vec::new()).unwrap();
    p.finalize().unwrap();
    assert!(p.run().unwrap().is_empty());
}

// Invariant: a mapper that yields its input unchanged is a no-op.
#[test]
fn identity_mapper_does_not_change_output() {
    let base_records = vec![
        rec(&[("id", Value::Int(1))]),
        rec(&[("id", Value::Int(2))]),
    ];

    let plain = Pipeline::new();
    plain.set_source(Source::InMemory(base_records.clone())).unwrap();
    plain.finalize().unwrap();

    let mapped = Pipeline::new();
    mapped.set_source(Source::InMemory(base_records)).unwrap();
    mapped.map(|r| vec![r.clone()]).unwrap();
    mapped.finalize().unwrap();

    assert_eq!(plain.run().unwrap(), mapped.run().unwrap());
}

// Invariant: sort is stable, and re-sorting an already-sorted stream is a
// no-op.
#[test]
fn sort_is_stable_and_idempotent() {
    let input = vec![
        rec(&[("k", Value::Int(1)), ("tag", Value::Str("first".into()))]),
        rec(&[("k", Value::Int(0)), ("tag", Value::Str("only".into()))]),
        rec(&[("k", Value::Int(1)), ("tag", Value::Str("second".into()))]),
    ];

    let once = Pipeline::new();
    once.set_source(Source::InMemory(input.clone())).unwrap();
    once.sort(&["k"]).unwrap();
    once.finalize().unwrap();
    let once_out = once.run().unwrap();

    let twice = Pipeline::new();
    twice.set_source(Source::InMemory(input)).unwrap();
    twice.sort(&["k"]).unwrap();
    twice.sort(&["k"]).unwrap();
    twice.finalize().unwrap();
    let twice_out = twice.run().unwrap();

    sim_assert_eq!(once_out, twice_out);
    assert_eq!(once_out[1].get("tag"), Some(&Value::Str("first".into())));
    assert_eq!(once_out[2].get("tag"), Some(&Value::Str("second".into())));
}

// Invariant: running a finalized pipeline twice returns the same records.
#[test]
fn run_is_idempotent_within_an_execution_context() {
    let p = Pipeline::new();
    p.set_source(Source::InMemory(vec![rec(&[("id", Value::Int(1))])]))
        .unwrap();
    p.finalize().unwrap();

    let first = p.run().unwrap();
    let second = p.run().unwrap();
    assert_eq!(first, second);
}

// save_output fails until the pipeline has actually been run.
#[test]
fn save_output_before_run_fails() {
    let p = Pipeline::new();
    p.set_source(Source::InMemory(vec![])).unwrap();
    p.finalize().unwrap();

    let path = std::env::temp_dir().join("graph_core_save_output_before_run_test.jsonl");
    let err = p.save_output(&path).unwrap_err();
    assert_eq!(err.kind(), graph_error::ErrorKind::NotExecuted);
}

// A cyclic dependency is rejected rather than recursing forever.
#[test]
fn cyclic_dependency_is_rejected() {
    let a = Pipeline::new();
    let b = Pipeline::new();
    a.join(&b, &["id"], JoinStrategy::Inner).unwrap();
    b.join(&a, &["id"], JoinStrategy::Inner).unwrap();
    a.finalize().unwrap();
    b.finalize().unwrap();

    let err = a.run().unwrap_err();
    assert_eq!(err.kind(), graph_error::ErrorKind::CyclicDependency);
}
