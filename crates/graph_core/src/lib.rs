//! An in-process DAG engine for streaming relational operations over
//! dynamically typed records: map, sort, fold, reduce, join.
//!
//! The public surface is small on purpose: build one or more [`Pipeline`]s
//! with [`Pipeline::new`], wire up sources and operators, [`Pipeline::finalize`]
//! them, then pull results with [`run`]/[`open`]. Everything else (the
//! planner's DAG traversal, the pull-based operator chain) is an
//! implementation detail reachable only for diagnostics.

pub mod execution;
pub mod io;
pub mod pipeline;
pub mod planner;
pub mod record;
pub mod value;

pub use execution::{open, run, RecordStream};
pub use pipeline::{JoinStrategy, Pipeline, Source};
pub use record::Record;
pub use value::Value;

pub use graph_error::{ErrorKind, GraphError, Result};
