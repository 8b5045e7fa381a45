//! The streaming executor: builds and drives the pull-based operator chain,
//! deciding per pipeline whether to materialize its result.

pub mod operators;

use graph_error::{GraphError, Result};
use tracing::{debug, trace};

use crate::pipeline::{Pipeline, Source};
use crate::planner;
use crate::record::Record;

/// A lazy, single-pass, pull-driven sequence of records.
///
/// The synchronous counterpart of an async batch-pulling operator: no
/// `Context`/`Waker`, no partitioning, because this engine never drives more
/// than one stream concurrently.
pub trait RecordStream {
    fn next(&mut self) -> Result<Option<Record>>;
}

/// A stream over an already-in-memory vector of records.
pub struct VecStream {
    records: std::vec::IntoIter<Record>,
}

impl VecStream {
    pub fn new(records: Vec<Record>) -> Self {
        VecStream {
            records: records.into_iter(),
        }
    }
}

impl RecordStream for VecStream {
    fn next(&mut self) -> Result<Option<Record>> {
        Ok(self.records.next())
    }
}

/// Drains a stream into a `Vec`, the eager analogue of `run`.
pub fn drain(mut stream: Box<dyn RecordStream>) -> Result<Vec<Record>> {
    let mut out = Vec::new();
    while let Some(record) = stream.next()? {
        out.push(record);
    }
    Ok(out)
}

/// Plans and fully executes `pipeline`, returning its output records.
///
/// This is the public entry point described as `pipeline.run()`: it re-plans
/// the dependency graph every call (cheap — it is a pointer-chasing DFS) so
/// that a changed source is picked up, then evaluates the pipeline under the
/// materialization rules computed by the planner.
pub fn run(pipeline: &Pipeline) -> Result<Vec<Record>> {
    if !pipeline.is_finalized() {
        return Err(GraphError::run_before_finalize(
            "cannot run a pipeline before it is finalized",
        ));
    }
    planner::plan(pipeline)?;
    let records = drain(open(pipeline)?)?;
    pipeline.inner.borrow_mut().last_result = Some(records.clone());
    Ok(records)
}

/// Returns a stream over `pipeline`'s output, consulting and updating its
/// materialization state (§4.3): a cached result is replayed and its
/// reference count decremented; an uncached result with remaining consumers
/// is drained once, cached, and handed out; a pipeline with no further
/// consumers streams directly with no buffering.
pub fn open(pipeline: &Pipeline) -> Result<Box<dyn RecordStream>> {
    let cached = pipeline.inner.borrow_mut().materialized.take();
    if let Some(cached) = cached {
        let mut inner = pipeline.inner.borrow_mut();
        if inner.refcount > 0 {
            inner.refcount -= 1;
        }
        if inner.refcount > 0 {
            inner.materialized = Some(cached.clone());
        } else {
            trace!(pipeline_id = pipeline.id(), "materialized result exhausted");
        }
        drop(inner);
        return Ok(Box::new(VecStream::new(cached)));
    }

    let refcount = pipeline.inner.borrow().refcount;
    if refcount == 0 {
        trace!(pipeline_id = pipeline.id(), "streaming without materialization");
        return build_chain(pipeline);
    }

    debug!(pipeline_id = pipeline.id(), refcount, "materializing shared pipeline");
    let all = drain(build_chain(pipeline)?)?;

    let mut inner = pipeline.inner.borrow_mut();
    let remaining = refcount.saturating_sub(1);
    if remaining > 0 {
        inner.materialized = Some(all.clone());
    }
    inner.refcount = remaining;
    drop(inner);
    Ok(Box::new(VecStream::new(all)))
}

/// Builds the operator chain over `pipeline`'s own source: the part of
/// execution that never consults materialization state, used both by `open`
/// (when a fresh evaluation is needed) and recursively for join inputs.
fn build_chain(pipeline: &Pipeline) -> Result<Box<dyn RecordStream>> {
    let (source, operations) = {
        let inner = pipeline.inner.borrow();
        if !inner.finalized {
            return Err(GraphError::run_before_finalize(
                "cannot execute a pipeline before it is finalized",
            ));
        }
        let source = inner
            .source
            .as_ref()
            .ok_or_else(|| GraphError::source_missing("pipeline has no source assigned"))?;
        let source = clone_source(source);
        (source, inner.operations.clone())
    };

    let mut stream: Box<dyn RecordStream> = match source {
        ClonedSource::File(path) => Box::new(crate::io::FileRecordStream::open(&path)?),
        ClonedSource::InMemory(records) => Box::new(VecStream::new(records)),
        ClonedSource::Pipeline(other) => open(&other)?,
    };

    for op in operations {
        stream = operators::apply(op, stream)?;
    }
    Ok(stream)
}

enum ClonedSource {
    File(std::path::PathBuf),
    InMemory(Vec<Record>),
    Pipeline(Pipeline),
}

fn clone_source(source: &Source) -> ClonedSource {
    match source {
        Source::File(path) => ClonedSource::File(path.clone()),
        Source::InMemory(records) => ClonedSource::InMemory(records.clone()),
        Source::Pipeline(p) => ClonedSource::Pipeline(p.clone()),
    }
}
