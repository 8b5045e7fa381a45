//! Depth-first traversal that validates the dependency graph and reports the
//! evaluation order the executor will follow.
//!
//! Reference counting for shared-result materialization is *not* done here:
//! it is maintained incrementally as dependency edges are declared
//! (`Pipeline::join`, `Pipeline::set_source`) so that it survives across
//! separate `run()` calls on different consumers of the same upstream
//! pipeline (see the `refcount` field doc on `PipelineInner`, and DESIGN.md).
//! This module's job is purely to catch a cycle before execution would spin
//! forever recursing through it, and to expose the order pipelines will be
//! visited in for diagnostics.

use std::collections::HashSet;

use graph_error::{GraphError, Result};

use crate::pipeline::{Pipeline, Source};

/// Defense-in-depth recursion cap. Real cycles are caught precisely by the
/// on-stack ("gray") set below; this guards only against pathologically deep
/// legitimate chains blowing the call stack.
const MAX_DEPTH: usize = 10_000;

/// Validates `root`'s dependency graph for cycles and returns the order a
/// depth-first evaluation will visit pipelines in, including repeats for
/// shared dependencies.
pub fn plan(root: &Pipeline) -> Result<Vec<Pipeline>> {
    let mut seq = Vec::new();
    let mut gray = HashSet::new();
    let mut black = HashSet::new();
    traverse(root, &mut seq, &mut gray, &mut black, 0)?;
    Ok(seq)
}

fn effective_dependencies(source: &Option<Source>, join_dependencies: &[Pipeline]) -> Vec<Pipeline> {
    let mut deps = Vec::with_capacity(join_dependencies.len() + 1);
    if let Some(Source::Pipeline(s)) = source {
        deps.push(s.clone());
    }
    deps.extend(join_dependencies.iter().cloned());
    deps
}

fn traverse(
    p: &Pipeline,
    seq: &mut Vec<Pipeline>,
    gray: &mut HashSet<u64>,
    black: &mut HashSet<u64>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(GraphError::cyclic_dependency(
            "dependency recursion exceeded the maximum depth; the graph likely contains a cycle",
        ));
    }

    seq.push(p.clone());

    let id = p.id();
    if black.contains(&id) {
        // Already fully expanded via another path; this is legitimate
        // sharing (a diamond), not a cycle.
        return Ok(());
    }
    if !gray.insert(id) {
        return Err(GraphError::cyclic_dependency(format!(
            "pipeline {id} depends on itself, directly or indirectly"
        )));
    }

    let deps = {
        let inner = p.inner.borrow();
        effective_dependencies(&inner.source, &inner.join_dependencies)
    };
    for d in &deps {
        traverse(d, seq, gray, black, depth + 1)?;
    }

    gray.remove(&id);
    black.insert(id);
    Ok(())
}
