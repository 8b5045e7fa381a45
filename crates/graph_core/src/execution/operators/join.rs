use std::cmp::Ordering;
use std::collections::VecDeque;

use graph_error::Result;

use crate::execution::{drain, open, RecordStream};
use crate::pipeline::{JoinStrategy, Pipeline};
use crate::record::Record;
use crate::value::{KeyTuple, Value};

/// Keyed relational join between the stream it wraps (*left*) and another
/// pipeline's result (*right*), per §4.4.
///
/// Both sides are fully buffered up front (a join cannot be computed without
/// seeing every right-side row with a given key before the first left row
/// with that key is emitted), sorted and grouped by `keys`, then merged like
/// a sort-merge join: a two-pointer walk over both ascending-key group lists,
/// rather than a hash table, because key equality here follows `Value`'s
/// numeric-aware `Ord` (an `Int` and a `Float` key of the same number must
/// land in the same group) and `Value` has no `Hash` impl consistent with
/// that rule.
#[derive(Debug)]
pub struct JoinStream {
    pending: VecDeque<Record>,
}

type KeyGroup = (KeyTuple, Vec<Record>);

impl JoinStream {
    pub fn new(
        input: Box<dyn RecordStream>,
        other: Pipeline,
        keys: Vec<String>,
        strategy: JoinStrategy,
    ) -> Result<Self> {
        let left = drain(input)?;
        let right = drain(open(&other)?)?;
        tracing::debug!(
            left_rows = left.len(),
            right_rows = right.len(),
            ?strategy,
            "joining buffered sides"
        );

        let left_groups = group_by_key(&left, &keys)?;
        let right_groups = group_by_key(&right, &keys)?;

        let mut pending = VecDeque::new();
        pending.extend(inner_pairs(&left_groups, &right_groups));

        if matches!(strategy, JoinStrategy::Left | JoinStrategy::Outer) {
            let right_template = right.first();
            for (_, l) in only_in_first(&left_groups, &right_groups) {
                pending.extend(l.iter().map(|r| extend_with_nulls(r, right_template)));
            }
        }

        if matches!(strategy, JoinStrategy::Right | JoinStrategy::Outer) {
            let left_template = left.first();
            for (_, r) in only_in_first(&right_groups, &left_groups) {
                pending.extend(r.iter().map(|row| extend_with_nulls(row, left_template)));
            }
        }

        Ok(JoinStream { pending })
    }
}

impl RecordStream for JoinStream {
    fn next(&mut self) -> Result<Option<Record>> {
        Ok(self.pending.pop_front())
    }
}

/// Sorts `records` by `keys` (stably, so within-group order matches input
/// order) and folds adjacent equal keys into contiguous groups. Equality is
/// `Value::cmp(..) == Equal`, not derived `PartialEq`, so that an `Int` and
/// a `Float` key of the same number group together.
fn group_by_key(records: &[Record], keys: &[String]) -> Result<Vec<KeyGroup>> {
    let mut keyed: Vec<(KeyTuple, Record)> = Vec::with_capacity(records.len());
    for r in records {
        keyed.push((r.key_tuple(keys)?, r.clone()));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut groups: Vec<KeyGroup> = Vec::new();
    for (key, record) in keyed {
        match groups.last_mut() {
            Some((last_key, rows)) if last_key.cmp(&key) == Ordering::Equal => rows.push(record),
            _ => groups.push((key, vec![record])),
        }
    }
    Ok(groups)
}

/// Cross-joins every pair of groups sharing a key, in ascending key order
/// (left-group-order then right-group-order within a key — §4.4 point 5).
fn inner_pairs(left: &[KeyGroup], right: &[KeyGroup]) -> Vec<Record> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].0.cmp(&right[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                for l in &left[i].1 {
                    for r in &right[j].1 {
                        // `r`'s fields win on collision outside the join keys.
                        out.push(l.merged_over(r));
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Returns the groups of `first` whose key has no counterpart in `second`,
/// in ascending key order.
fn only_in_first<'a>(first: &'a [KeyGroup], second: &[KeyGroup]) -> Vec<&'a KeyGroup> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < first.len() {
        match second.get(j) {
            Some(other) => match first[i].0.cmp(&other.0) {
                Ordering::Less => {
                    out.push(&first[i]);
                    i += 1;
                }
                Ordering::Greater => j += 1,
                Ordering::Equal => i += 1,
            },
            None => {
                out.push(&first[i]);
                i += 1;
            }
        }
    }
    out
}

/// Extends `base` with a `null` for every field present in `template` but
/// absent from `base` — the left/right-addition half of an outer join.
/// With no template (the other side was empty), `base` passes through
/// unchanged, per §4.4's resolution of the empty-side ambiguity.
fn extend_with_nulls(base: &Record, template: Option<&Record>) -> Record {
    let mut out = base.clone();
    if let Some(template) = template {
        for (field, _) in template.iter() {
            if !out.contains(field) {
                out.set(field, Value::Null);
            }
        }
    }
    out
}
