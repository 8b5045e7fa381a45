//! Error type shared across the compute graph engine.

use std::fmt;

/// The kind of failure a [`GraphError`] represents.
///
/// Kept as a flat enum (rather than one error type per module) so that
/// callers can match on "what went wrong" without caring which layer of the
/// engine raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An operation was appended to, or `finalize` was called on, a pipeline
    /// that was already finalized.
    AlreadyFinalized,
    /// `run`/`iter` was called on a pipeline that hasn't been finalized.
    RunBeforeFinalize,
    /// A pipeline was executed without a source ever being assigned.
    SourceMissing,
    /// A line from a record source file could not be decoded.
    SourceParse,
    /// A sort/reduce/join key was missing from a record.
    MissingField,
    /// A join was declared with a strategy outside {inner, left, right, outer}.
    UnknownJoinStrategy,
    /// The planner's dependency traversal did not terminate.
    CyclicDependency,
    /// `save_output` was called before the pipeline produced a result.
    NotExecuted,
    /// Anything else, usually a wrapped I/O failure.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::AlreadyFinalized => "AlreadyFinalized",
            ErrorKind::RunBeforeFinalize => "RunBeforeFinalize",
            ErrorKind::SourceMissing => "SourceMissing",
            ErrorKind::SourceParse => "SourceParse",
            ErrorKind::MissingField => "MissingField",
            ErrorKind::UnknownJoinStrategy => "UnknownJoinStrategy",
            ErrorKind::CyclicDependency => "CyclicDependency",
            ErrorKind::NotExecuted => "NotExecuted",
            ErrorKind::Other => "Other",
        };
        f.write_str(s)
    }
}

/// The error type returned by every fallible operation in this crate family.
#[derive(Debug)]
pub struct GraphError {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl GraphError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        GraphError {
            kind,
            msg: msg.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        msg: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        GraphError {
            kind,
            msg: msg.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn already_finalized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyFinalized, msg)
    }

    pub fn run_before_finalize(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RunBeforeFinalize, msg)
    }

    pub fn source_missing(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceMissing, msg)
    }

    pub fn source_parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceParse, msg)
    }

    pub fn missing_field(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingField, msg)
    }

    pub fn unknown_join_strategy(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownJoinStrategy, msg)
    }

    pub fn cyclic_dependency(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::CyclicDependency, msg)
    }

    pub fn not_executed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotExecuted, msg)
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError::with_source(ErrorKind::Other, "I/O failure", Box::new(e))
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::with_source(ErrorKind::SourceParse, "failed to decode record", Box::new(e))
    }
}

/// The `Result` alias used throughout the engine.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Adds `.context(...)` to any `Result`, preserving the original error as the
/// source and attaching a higher-level message.
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| GraphError::with_source(ErrorKind::Other, msg, Box::new(e)))
    }
}

/// Adds `.required(...)` to `Option<T>`, turning a missing value into a
/// [`GraphError`] instead of forcing the caller to `ok_or_else` by hand.
pub trait OptionExt<T> {
    fn required(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, what: &str) -> Result<T> {
        self.ok_or_else(|| GraphError::new(ErrorKind::MissingField, format!("missing {what}")))
    }
}
