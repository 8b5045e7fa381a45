//! Per-operation stream adapters. Each operator wraps an upstream
//! [`RecordStream`] and implements the same trait, so the executor builds a
//! pipeline's full chain by folding [`apply`] over its operation list.

mod fold;
mod join;
mod map;
mod reduce;
mod sort;

use graph_error::Result;

use super::RecordStream;
use crate::pipeline::Operation;

/// Wraps `input` with the stream adapter for a single operation.
pub fn apply(op: Operation, input: Box<dyn RecordStream>) -> Result<Box<dyn RecordStream>> {
    match op {
        Operation::Map(f) => Ok(Box::new(map::MapStream::new(input, f))),
        Operation::Sort(keys) => Ok(Box::new(sort::SortStream::new(input, keys))),
        Operation::Fold(f, initial) => Ok(Box::new(fold::FoldStream::new(input, f, initial))),
        Operation::Reduce(f, keys) => Ok(Box::new(reduce::ReduceStream::new(input, f, keys))),
        Operation::Join(other, keys, strategy) => {
            Ok(Box::new(join::JoinStream::new(input, other, keys, strategy)?))
        }
    }
}
