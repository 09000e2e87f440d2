use thiserror::Error;

/// Everything the lock core can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Malformed lock face: wrong length, out-of-range symbol or unparsable text.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The target is outside the component reachable from the initial state.
    #[error("no solution found, target is unreachable from the initial state")]
    NoSolution,

    /// A state or time limit stopped the search before it could finish.
    #[error("search aborted after exploring {explored} states")]
    SearchAborted { explored: usize },
}

pub type LockResult<T> = Result<T, LockError>;
