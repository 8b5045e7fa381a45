//! The graph builder: pipelines, their operation lists, and their sources.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use graph_error::{GraphError, Result};

use crate::record::Record;

/// How a join reconciles rows that exist on only one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    Inner,
    Left,
    Right,
    Outer,
}

/// Where a pipeline pulls its input records from.
pub enum Source {
    File(PathBuf),
    InMemory(Vec<Record>),
    Pipeline(Pipeline),
}

pub(crate) type Mapper = Rc<dyn Fn(&Record) -> Vec<Record>>;
pub(crate) type Folder = Rc<dyn Fn(&Record, &Record) -> Record>;
pub(crate) type Reducer = Rc<dyn Fn(&[Record]) -> Vec<Record>>;

/// One step in a pipeline's operation list.
///
/// Callback fields are `Rc`-wrapped rather than boxed so that building the
/// operator chain (which may happen on every `run`) can clone the list out of
/// the pipeline's operation log without needing the log itself to move or be
/// consumed.
pub enum Operation {
    Map(Mapper),
    Sort(Vec<String>),
    Fold(Folder, Record),
    Reduce(Reducer, Vec<String>),
    Join(Pipeline, Vec<String>, JoinStrategy),
}

impl Clone for Operation {
    fn clone(&self) -> Self {
        match self {
            Operation::Map(f) => Operation::Map(f.clone()),
            Operation::Sort(keys) => Operation::Sort(keys.clone()),
            Operation::Fold(f, initial) => Operation::Fold(f.clone(), initial.clone()),
            Operation::Reduce(f, keys) => Operation::Reduce(f.clone(), keys.clone()),
            Operation::Join(p, keys, strategy) => Operation::Join(p.clone(), keys.clone(), *strategy),
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Map(_) => write!(f, "Map"),
            Operation::Sort(keys) => write!(f, "Sort({keys:?})"),
            Operation::Fold(_, _) => write!(f, "Fold"),
            Operation::Reduce(_, keys) => write!(f, "Reduce({keys:?})"),
            Operation::Join(_, keys, strategy) => write!(f, "Join({keys:?}, {strategy:?})"),
        }
    }
}

pub(crate) struct PipelineInner {
    pub(crate) id: u64,
    pub(crate) source: Option<Source>,
    pub(crate) operations: Vec<Operation>,
    pub(crate) join_dependencies: Vec<Pipeline>,
    pub(crate) finalized: bool,
    pub(crate) materialized: Option<Vec<Record>>,
    /// Number of declared-but-not-yet-consumed references to this pipeline's
    /// result, maintained incrementally as dependency edges are declared
    /// (`join`, or `set_source` with a pipeline source) and decremented by
    /// the executor each time the result is actually pulled (§4.3). This is
    /// the "planner publishes reference counts up front" design picked for
    /// sharing (see DESIGN.md): counting declared edges at build time, rather
    /// than only within a single run's traversal, is what lets two separate
    /// `run()` calls on different consumers of the same upstream pipeline
    /// still materialize it exactly once.
    pub(crate) refcount: usize,
    /// The most recent complete output of `run()`/`iter()` on this exact
    /// pipeline, kept for `save_output` independent of the sharing cache
    /// above (`materialized`, which is consumed and released as other
    /// pipelines pull from it). A pipeline with `refcount == 0` never
    /// populates `materialized`, but `save_output` still needs something to
    /// write once the caller has run it.
    pub(crate) last_result: Option<Vec<Record>>,
}

/// A handle to a pipeline under construction or already finalized.
///
/// Cheap to clone; clones refer to the same underlying pipeline (identity is
/// by reference, matching the fact that the same pipeline may be joined
/// against from several other pipelines).
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) inner: Rc<RefCell<PipelineInner>>,
}

impl Pipeline {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Pipeline {
            inner: Rc::new(RefCell::new(PipelineInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                source: None,
                operations: Vec::new(),
                join_dependencies: Vec::new(),
                finalized: false,
                materialized: None,
                refcount: 0,
                last_result: None,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    pub fn same_as(&self, other: &Pipeline) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn push_operation(&self, op: Operation) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.finalized {
            return Err(GraphError::already_finalized(
                "cannot add an operation to a finalized pipeline",
            ));
        }
        inner.operations.push(op);
        Ok(())
    }

    pub fn set_source(&self, source: Source) -> Result<&Self> {
        if self.inner.borrow().finalized {
            return Err(GraphError::already_finalized(
                "cannot change the source of a finalized pipeline",
            ));
        }

        let previous_dependency = match &self.inner.borrow().source {
            Some(Source::Pipeline(p)) => Some(p.clone()),
            _ => None,
        };
        if let Some(old) = previous_dependency {
            if !old.same_as(self) {
                let mut old_inner = old.inner.borrow_mut();
                old_inner.refcount = old_inner.refcount.saturating_sub(1);
            }
        }
        if let Source::Pipeline(ref p) = source {
            if !p.same_as(self) {
                p.inner.borrow_mut().refcount += 1;
            }
        }

        self.inner.borrow_mut().source = Some(source);
        Ok(self)
    }

    pub fn map(&self, f: impl Fn(&Record) -> Vec<Record> + 'static) -> Result<&Self> {
        self.push_operation(Operation::Map(Rc::new(f)))?;
        Ok(self)
    }

    pub fn sort(&self, keys: &[&str]) -> Result<&Self> {
        let keys = keys.iter().map(|s| s.to_string()).collect();
        self.push_operation(Operation::Sort(keys))?;
        Ok(self)
    }

    pub fn fold(
        &self,
        f: impl Fn(&Record, &Record) -> Record + 'static,
        initial: Record,
    ) -> Result<&Self> {
        self.push_operation(Operation::Fold(Rc::new(f), initial))?;
        Ok(self)
    }

    pub fn reduce(
        &self,
        f: impl Fn(&[Record]) -> Vec<Record> + 'static,
        keys: &[&str],
    ) -> Result<&Self> {
        let keys = keys.iter().map(|s| s.to_string()).collect();
        self.push_operation(Operation::Reduce(Rc::new(f), keys))?;
        Ok(self)
    }

    pub fn join(&self, other: &Pipeline, keys: &[&str], strategy: JoinStrategy) -> Result<&Self> {
        let keys_vec = keys.iter().map(|s| s.to_string()).collect();
        {
            let mut inner = self.inner.borrow_mut();
            if inner.finalized {
                return Err(GraphError::already_finalized(
                    "cannot add an operation to a finalized pipeline",
                ));
            }
            inner.join_dependencies.push(other.clone());
        }
        if !other.same_as(self) {
            other.inner.borrow_mut().refcount += 1;
        }
        self.push_operation(Operation::Join(other.clone(), keys_vec, strategy))?;
        Ok(self)
    }

    pub fn finalize(&self) -> Result<&Self> {
        let mut inner = self.inner.borrow_mut();
        if inner.finalized {
            return Err(GraphError::already_finalized("pipeline is already finalized"));
        }
        inner.finalized = true;
        Ok(self)
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.borrow().finalized
    }

    /// The number of not-yet-consumed references to this pipeline's result
    /// (§3's "reference count"), maintained as dependency edges are declared
    /// and decremented as the executor actually pulls from them. Exposed for
    /// diagnostics and tests; not needed to drive normal execution.
    pub fn refcount(&self) -> usize {
        self.inner.borrow().refcount
    }

    /// Plans and fully executes this pipeline, returning its output records.
    pub fn run(&self) -> Result<Vec<Record>> {
        crate::execution::run(self)
    }

    /// Returns a one-shot lazy stream over this pipeline's output, honoring
    /// the same materialization rules as [`Pipeline::run`].
    pub fn iter(&self) -> Result<Box<dyn crate::execution::RecordStream>> {
        crate::execution::open(self)
    }

    /// Runs this pipeline (if not already materialized from a prior `run`)
    /// and writes its result to `path` as newline-delimited JSON.
    ///
    /// Fails with [`graph_error::ErrorKind::NotExecuted`] if the pipeline
    /// hasn't produced a result yet.
    pub fn save_output(&self, path: &std::path::Path) -> Result<()> {
        let records = self.inner.borrow().last_result.clone();
        let records = match records {
            Some(r) => r,
            None => {
                return Err(GraphError::not_executed(
                    "pipeline has not been run; call run() before save_output()",
                ))
            }
        };
        crate::io::save_records(path, &records)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-written rather than derived: `PipelineInner` holds `Rc<dyn Fn(..)>`
/// callback fields (via `Operation`) that don't implement `Debug`, and
/// recursing into `join_dependencies`/`Source::Pipeline` here would walk the
/// whole dependency graph on every print.
impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Pipeline")
            .field("id", &inner.id)
            .field("operations", &inner.operations)
            .field("finalized", &inner.finalized)
            .field("refcount", &inner.refcount)
            .finish()
    }
}
