use std::time::{Duration, Instant};

use crate::error::{LockError, LockResult};

/// Caps checked each time a solver takes the next state off its frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_states: Option<usize>,
    pub deadline: Option<Instant>,
}

impl SearchLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = Some(max_states);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Fails with `SearchAborted` once `explored` passes the state cap or the deadline is gone.
    pub fn check(&self, explored: usize) -> LockResult<()> {
        let over_budget = self.max_states.is_some_and(|max| explored > max);
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);

        if over_budget || expired {
            log::warn!(
                "search aborted after {} states (over budget: {}, expired: {})",
                explored,
                over_budget,
                expired
            );
            return Err(LockError::SearchAborted { explored });
        }
        Ok(())
    }
}

/// Solver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverConfig {
    pub limits: SearchLimits,

    /// Seeds the depth-first solver's best bound. `None` leaves it at infinity.
    pub dfs_depth_bound: Option<usize>,
}

impl SolverConfig {
    pub fn new(limits: SearchLimits) -> Self {
        Self {
            limits,
            dfs_depth_bound: None,
        }
    }

    pub fn with_dfs_depth_bound(mut self, bound: usize) -> Self {
        self.dfs_depth_bound = Some(bound);
        self
    }
}
