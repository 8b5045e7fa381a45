use std::collections::VecDeque;

use graph_error::Result;

use crate::execution::RecordStream;
use crate::pipeline::Reducer;
use crate::record::Record;
use crate::value::KeyTuple;

/// Walks a (presumed pre-grouped) input, breaking on every change of the
/// `keys` tuple and invoking the caller's reducer once per contiguous group.
///
/// Does not itself sort or verify grouping — §4.4 makes that the caller's
/// responsibility, typically discharged by a preceding `sort` on the same
/// keys. A stream that isn't actually grouped just produces extra, smaller
/// groups; it never panics or mis-keys.
pub struct ReduceStream {
    input: Box<dyn RecordStream>,
    reducer: Reducer,
    keys: Vec<String>,
    pending: VecDeque<Record>,
    carry: Option<(KeyTuple, Record)>,
    done: bool,
}

impl ReduceStream {
    pub fn new(input: Box<dyn RecordStream>, reducer: Reducer, keys: Vec<String>) -> Self {
        ReduceStream {
            input,
            reducer,
            keys,
            pending: VecDeque::new(),
            carry: None,
            done: false,
        }
    }

    /// Accumulates the next contiguous group and runs the reducer over it,
    /// queuing its output records. Returns `false` once the input (and any
    /// carried-over first row of the next group) is exhausted.
    fn advance(&mut self) -> Result<bool> {
        let mut group = Vec::new();
        let group_key;

        if let Some((key, record)) = self.carry.take() {
            group_key = key;
            group.push(record);
        } else {
            match self.input.next()? {
                Some(record) => {
                    group_key = record.key_tuple(&self.keys)?;
                    group.push(record);
                }
                None => return Ok(false),
            }
        }

        loop {
            match self.input.next()? {
                Some(record) => {
                    let key = record.key_tuple(&self.keys)?;
                    // Compare via `Ord`, not derived `PartialEq`: an `Int`
                    // and a `Float` key of the same number must stay in the
                    // same group, matching sort/join key equality (§4.4).
                    if key.cmp(&group_key) == std::cmp::Ordering::Equal {
                        group.push(record);
                    } else {
                        self.carry = Some((key, record));
                        break;
                    }
                }
                None => break,
            }
        }

        self.pending.extend((self.reducer)(&group));
        Ok(true)
    }
}

impl RecordStream for ReduceStream {
    fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(r) = self.pending.pop_front() {
                return Ok(Some(r));
            }
            if self.done {
                return Ok(None);
            }
            if !self.advance()? {
                self.done = true;
            }
        }
    }
}
