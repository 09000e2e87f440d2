//! Shortest-path solver for the eight-slot dots lock.
//!
//! The face is rotated with `L2`/`R2` and the middle three slots are cycled with `X`.

pub mod config;
pub mod error;
pub mod lock;
pub mod solver;

pub use config::{SearchLimits, SolverConfig};
pub use error::{LockError, LockResult};
pub use lock::{scramble, Operator, State, MAX_SYMBOL, SLOTS};
pub use solver::{bounded_search, breadth_first, reachable_states, Solution, Step};

/// Shortest operator sequence turning `initial` into `target`.
pub fn solve_shortest_path(initial: State, target: State) -> LockResult<Solution> {
    solve_with(initial, target, &SolverConfig::default())
}

pub fn solve_with(initial: State, target: State, config: &SolverConfig) -> LockResult<Solution> {
    breadth_first(initial, target, &config.limits)
}

/// Minimum distance found by the depth-first solver, `None` when the target is unreachable.
pub fn verify_with_bounded_search(initial: State, target: State) -> Option<usize> {
    // Unlimited searches cannot abort.
    verify_with(initial, target, &SolverConfig::default())
        .ok()
        .flatten()
}

pub fn verify_with(
    initial: State,
    target: State,
    config: &SolverConfig,
) -> LockResult<Option<usize>> {
    Ok(bounded_search(initial, target, config)?.map(|solution| solution.distance))
}
