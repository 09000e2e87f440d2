use log::{debug, trace};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::{SearchLimits, SolverConfig};
use crate::error::{LockError, LockResult};
use crate::lock::{Operator, State};

/// One entry of a path. The first step carries no operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    pub state: State,
    pub operator: Option<Operator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub distance: usize,
    pub path: Vec<Step>,
    pub states_explored: usize,
}

impl Solution {
    fn from_path(path: Vec<Step>, states_explored: usize) -> Self {
        Self {
            distance: path.len().saturating_sub(1),
            path,
            states_explored,
        }
    }

    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.path.iter().map(|step| &step.state)
    }

    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        self.path.iter().filter_map(|step| step.operator)
    }

    /// Replays the path from `initial`, checking every move is legal and lands on the recorded state.
    pub fn validate(&self, initial: &State, target: &State) -> Result<(), String> {
        let (first, rest) = self
            .path
            .split_first()
            .ok_or_else(|| "path is empty".to_string())?;

        if first.state != *initial || first.operator.is_some() {
            return Err(format!("path starts at {} instead of {}", first.state, initial));
        }
        if self.path.len() != self.distance + 1 {
            return Err(format!(
                "path has {} states for distance {}",
                self.path.len(),
                self.distance
            ));
        }

        let mut current = first.state;
        for (i, step) in rest.iter().enumerate() {
            let op = step
                .operator
                .ok_or_else(|| format!("step {} has no operator", i + 1))?;
            let next = op
                .try_apply(&current)
                .ok_or_else(|| format!("step {}: {} is illegal on {}", i + 1, op, current))?;
            if next != step.state {
                return Err(format!(
                    "step {}: {} on {} gives {}, path says {}",
                    i + 1,
                    op,
                    current,
                    next,
                    step.state
                ));
            }
            current = next;
        }

        if current != *target {
            return Err(format!("path ends at {} instead of {}", current, target));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Parent {
    state: State,
    operator: Option<Operator>,
    depth: usize,
}

/// Per-run map from every discovered state to how it was reached.
#[derive(Debug, Clone)]
pub(crate) struct SearchRecord {
    initial: State,
    parents: HashMap<State, Parent>,
}

impl SearchRecord {
    pub fn new(initial: State) -> Self {
        Self {
            initial,
            parents: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn contains(&self, state: &State) -> bool {
        self.parents.contains_key(state)
    }

    pub fn depth(&self, state: &State) -> Option<usize> {
        self.parents.get(state).map(|p| p.depth)
    }

    /// Overwrites whatever was recorded for `state`.
    fn record(&mut self, state: State, parent: State, operator: Option<Operator>, depth: usize) {
        self.parents.insert(
            state,
            Parent {
                state: parent,
                operator,
                depth,
            },
        );
    }

    /// Records `state` only if it has not been seen. Returns whether it was new.
    fn discover(
        &mut self,
        state: State,
        parent: State,
        operator: Option<Operator>,
        depth: usize,
    ) -> bool {
        if self.contains(&state) {
            return false;
        }
        self.record(state, parent, operator, depth);
        true
    }

    pub fn states(&self) -> HashSet<State> {
        self.parents.keys().copied().collect()
    }

    /// Walks parents back from `target` to the initial state and returns the forward path.
    ///
    /// `None` when `target` was never recorded.
    pub fn path_to(&self, target: &State) -> Option<Vec<Step>> {
        let mut path = Vec::new();
        let mut current = *target;

        loop {
            let parent = self.parents.get(&current)?;
            path.push(Step {
                state: current,
                operator: parent.operator,
            });
            if current == self.initial {
                break;
            }
            // Each hop moves strictly closer to the initial state.
            if path.len() > self.parents.len() {
                return None;
            }
            current = parent.state;
        }

        path.reverse();
        Some(path)
    }
}

/// Breadth-first expansion from `initial`, stopping once `target` is dequeued.
///
/// With no target the whole reachable component is recorded.
fn breadth_first_record(
    initial: State,
    target: Option<&State>,
    limits: &SearchLimits,
) -> LockResult<(SearchRecord, usize)> {
    let mut record = SearchRecord::new(initial);
    record.record(initial, initial, None, 0);

    let mut frontier = VecDeque::from([(initial, 0usize)]);
    let mut explored = 0;

    while let Some((current, depth)) = frontier.pop_front() {
        explored += 1;
        limits.check(explored)?;

        if target == Some(&current) {
            break;
        }

        for (next, op) in current.successors() {
            if record.discover(next, current, Some(op), depth + 1) {
                frontier.push_back((next, depth + 1));
            }
        }
    }

    trace!("bfs explored {} states, recorded {}", explored, record.len());
    Ok((record, explored))
}

/// Shortest operator sequence from `initial` to `target`.
pub fn breadth_first(initial: State, target: State, limits: &SearchLimits) -> LockResult<Solution> {
    debug!("bfs: {} -> {}", initial, target);

    let (record, explored) = breadth_first_record(initial, Some(&target), limits)?;
    let path = record.path_to(&target).ok_or(LockError::NoSolution)?;
    let solution = Solution::from_path(path, explored);

    debug!(
        "bfs: distance {} after {} states",
        solution.distance, solution.states_explored
    );
    Ok(solution)
}

/// Every state reachable from `initial`.
pub fn reachable_states(initial: State, limits: &SearchLimits) -> LockResult<HashSet<State>> {
    let (record, _) = breadth_first_record(initial, None, limits)?;
    Ok(record.states())
}

struct Frame {
    state: State,
    parent: State,
    operator: Option<Operator>,
    step: usize,
}

/// Depth-first solver state for one run: the record doubles as the best-step memo.
struct BoundedSearch<'a> {
    target: State,
    limits: &'a SearchLimits,
    depth_bound: Option<usize>,
    best: Option<usize>,
    record: SearchRecord,
    explored: usize,
}

impl<'a> BoundedSearch<'a> {
    fn new(initial: State, target: State, config: &'a SolverConfig) -> Self {
        Self {
            target,
            limits: &config.limits,
            depth_bound: config.dfs_depth_bound,
            best: None,
            record: SearchRecord::new(initial),
            explored: 0,
        }
    }

    fn bound(&self) -> Option<usize> {
        self.best.or(self.depth_bound)
    }

    /// Frames are popped in the order a recursive walk would enter them.
    fn run(&mut self, initial: State) -> LockResult<()> {
        let mut stack = vec![Frame {
            state: initial,
            parent: initial,
            operator: None,
            step: 0,
        }];

        while let Some(frame) = stack.pop() {
            self.explored += 1;
            self.limits.check(self.explored)?;

            if self.bound().is_some_and(|bound| frame.step > bound) {
                continue;
            }

            if self
                .record
                .depth(&frame.state)
                .is_some_and(|seen| seen <= frame.step)
            {
                continue;
            }
            self.record
                .record(frame.state, frame.parent, frame.operator, frame.step);

            if frame.state == self.target {
                self.best = Some(frame.step);
                continue;
            }

            let successors: Vec<(State, Operator)> = frame.state.successors().collect();
            for (next, op) in successors.into_iter().rev() {
                stack.push(Frame {
                    state: next,
                    parent: frame.state,
                    operator: Some(op),
                    step: frame.step + 1,
                });
            }
        }
        Ok(())
    }
}

/// Memoized depth-first search. Slower than `breadth_first`, used to cross-check it.
///
/// `Ok(None)` means the target was not reached within `config.dfs_depth_bound`.
pub fn bounded_search(
    initial: State,
    target: State,
    config: &SolverConfig,
) -> LockResult<Option<Solution>> {
    debug!(
        "dfs: {} -> {} (depth bound {:?})",
        initial, target, config.dfs_depth_bound
    );

    let mut search = BoundedSearch::new(initial, target, config);
    search.run(initial)?;

    let Some(best) = search.best else {
        debug!("dfs: target not reached after {} states", search.explored);
        return Ok(None);
    };

    let solution = search
        .record
        .path_to(&target)
        .map(|path| Solution::from_path(path, search.explored));
    debug_assert_eq!(solution.as_ref().map(|s| s.distance), Some(best));

    debug!("dfs: distance {} after {} states", best, search.explored);
    Ok(solution)
}
